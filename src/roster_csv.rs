//! Tabular roster interchange. The canonical roster is a CSV document with
//! a fixed column set; imports are merged through a fresh snapshot and the
//! canonical file is rewritten so disk and memory stay in step.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::error::{AttestaError, AttestaResult};
use crate::record::{StudentRecord, parse_batch_date};
use crate::roster::{ImportReport, Roster, RosterBuilder, RosterHandle};

pub const ROSTER_COLUMNS: [&str; 5] = [
    "student_name",
    "batch_number",
    "batch_start_date",
    "batch_end_date",
    "student_id",
];

/// Bootstrap dataset written by [`seed_roster`].
const SAMPLE_ROSTER_CSV: &str = "\
student_name,batch_number,batch_start_date,batch_end_date,student_id
Rahul Sharma,AWS-2024-001,2024-01-15,2024-04-15,SIX001
Priya Patel,AWS-2024-001,2024-01-15,2024-04-15,SIX002
Amit Kumar,AWS-2024-002,2024-02-01,2024-05-01,SIX003
";

#[derive(Debug, serde::Deserialize)]
struct RawRow {
    student_name: String,
    batch_number: String,
    batch_start_date: String,
    batch_end_date: String,
    student_id: String,
}

fn convert(raw: RawRow) -> AttestaResult<StudentRecord> {
    Ok(StudentRecord {
        student_name: raw.student_name,
        batch_number: raw.batch_number,
        batch_start_date: parse_batch_date(&raw.batch_start_date)?,
        batch_end_date: parse_batch_date(&raw.batch_end_date)?,
        student_id: raw.student_id,
    })
}

/// Reads data rows, returning each with its 1-based row number. The header
/// must carry every required column (extras are ignored); a row that fails
/// to parse becomes an `Err` entry instead of aborting the read.
pub fn read_roster_rows<R: std::io::Read>(
    reader: R,
) -> AttestaResult<Vec<(usize, AttestaResult<StudentRecord>)>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|err| AttestaError::import(format!("unreadable header row: {err}")))?
        .clone();
    let missing: Vec<&str> = ROSTER_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(AttestaError::import(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }
    let mut rows = Vec::new();
    for (idx, row) in csv_reader.deserialize::<RawRow>().enumerate() {
        let outcome = match row {
            Ok(raw) => convert(raw),
            Err(err) => Err(AttestaError::import(format!("unparseable row: {err}"))),
        };
        rows.push((idx + 1, outcome));
    }
    Ok(rows)
}

pub fn write_roster<W: std::io::Write>(roster: &Roster, writer: W) -> AttestaResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer
        .write_record(ROSTER_COLUMNS)
        .context("write roster header")?;
    for record in roster.records() {
        csv_writer.serialize(record).context("write roster row")?;
    }
    csv_writer.flush().context("flush roster")?;
    Ok(())
}

fn write_file_atomic(path: &Path, bytes: &[u8]) -> AttestaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create roster dir {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

pub fn load_roster(path: &Path) -> AttestaResult<(Roster, ImportReport)> {
    let file = fs::File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AttestaError::asset_missing(format!("roster file {} not found", path.display()))
        } else {
            AttestaError::Other(
                anyhow::Error::new(err).context(format!("open roster {}", path.display())),
            )
        }
    })?;
    let rows = read_roster_rows(file)?;
    let mut builder = RosterBuilder::new();
    for (line, row) in rows {
        builder.push(line, row);
    }
    let (roster, report) = builder.finish();
    tracing::info!(
        students = roster.len(),
        rejected = report.rejected_total,
        path = %path.display(),
        "roster loaded"
    );
    Ok((roster, report))
}

pub fn save_roster(roster: &Roster, path: &Path) -> AttestaResult<()> {
    let mut buf = Vec::new();
    write_roster(roster, &mut buf)?;
    write_file_atomic(path, &buf)
}

/// Writes the bootstrap dataset to `path` and returns it as a snapshot.
pub fn seed_roster(path: &Path) -> AttestaResult<(Roster, ImportReport)> {
    write_file_atomic(path, SAMPLE_ROSTER_CSV.as_bytes())?;
    let rows = read_roster_rows(SAMPLE_ROSTER_CSV.as_bytes())?;
    let mut builder = RosterBuilder::new();
    for (line, row) in rows {
        builder.push(line, row);
    }
    tracing::info!(path = %path.display(), "seeded sample roster");
    Ok(builder.finish())
}

pub fn load_or_seed_roster(path: &Path) -> AttestaResult<(Roster, ImportReport)> {
    if path.exists() {
        load_roster(path)
    } else {
        seed_roster(path)
    }
}

/// Merges rows from `import_path` into the live snapshot, persists the
/// merged roster to `roster_path`, then swaps the handle. Persist happens
/// first so a failed write leaves both disk and memory unchanged.
pub fn import_roster(
    handle: &RosterHandle,
    roster_path: &Path,
    import_path: &Path,
) -> AttestaResult<ImportReport> {
    let file = fs::File::open(import_path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            AttestaError::asset_missing(format!("import file {} not found", import_path.display()))
        } else {
            AttestaError::Other(
                anyhow::Error::new(err).context(format!("open import {}", import_path.display())),
            )
        }
    })?;
    let rows = read_roster_rows(file)?;
    let (next, report) = handle.load().with_imported(rows);
    let next = Arc::new(next);
    save_roster(&next, roster_path)?;
    handle.replace(next);
    tracing::info!(
        added = report.accepted,
        rejected = report.rejected_total,
        "roster import applied"
    );
    Ok(report)
}

pub fn export_filename(now: chrono::NaiveDateTime) -> String {
    format!("students_export_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Writes a timestamped export of the snapshot into `dir`.
pub fn export_roster(roster: &Roster, dir: &Path) -> AttestaResult<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("create export dir {}", dir.display()))?;
    let path = dir.join(export_filename(chrono::Local::now().naive_local()));
    let mut buf = Vec::new();
    write_roster(roster, &mut buf)?;
    fs::write(&path, buf).with_context(|| format!("write export {}", path.display()))?;
    Ok(path)
}
