use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AttestaError, AttestaResult};
use crate::record::{StudentRecord, normalize_field};

/// Fixed authentication-failure message. Reused verbatim for every miss so
/// callers cannot tell which of the three fields mismatched.
pub const AUTH_FAILURE_MSG: &str = "student not found; check the details and try again";

/// Bulk loads report at most this many rejected rows in detail; the total
/// rejection count is always exact.
pub const MAX_REPORTED_REJECTIONS: usize = 5;

#[derive(Clone, Debug)]
pub struct RejectedRow {
    pub line: usize, // 1-based data row
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected_total: usize,
    pub rejected: Vec<RejectedRow>,
}

impl ImportReport {
    fn reject(&mut self, line: usize, reason: impl Into<String>) {
        self.rejected_total += 1;
        if self.rejected.len() < MAX_REPORTED_REJECTIONS {
            self.rejected.push(RejectedRow {
                line,
                reason: reason.into(),
            });
        }
    }
}

/// Immutable roster snapshot. Built once, shared behind an `Arc`; a bulk
/// import derives a fresh snapshot instead of mutating this one.
#[derive(Debug, Default)]
pub struct Roster {
    records: Vec<StudentRecord>,
    by_id: HashMap<String, usize>,
}

/// Accumulates rows into a snapshot, rejecting invalid records and
/// duplicate ids (first occurrence wins, later ones are reported).
pub struct RosterBuilder {
    records: Vec<StudentRecord>,
    by_id: HashMap<String, usize>,
    report: ImportReport,
}

impl RosterBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            by_id: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    /// Seeds the builder with an existing snapshot's rows. The seeded rows
    /// do not count toward the report; new rows colliding with them do.
    pub fn with_base(base: &Roster) -> Self {
        let mut builder = Self::new();
        for record in &base.records {
            let idx = builder.records.len();
            builder.by_id.insert(record.normalized_id(), idx);
            builder.records.push(record.clone());
        }
        builder
    }

    pub fn push(&mut self, line: usize, row: AttestaResult<StudentRecord>) {
        let record = match row {
            Ok(record) => record,
            Err(err) => {
                self.report.reject(line, err.to_string());
                return;
            }
        };
        if let Err(err) = record.validate() {
            self.report.reject(line, err.to_string());
            return;
        }
        let key = record.normalized_id();
        if self.by_id.contains_key(&key) {
            self.report
                .reject(line, format!("duplicate student_id '{}'", record.student_id));
            return;
        }
        let idx = self.records.len();
        self.by_id.insert(key, idx);
        self.records.push(record);
        self.report.accepted += 1;
    }

    pub fn finish(self) -> (Roster, ImportReport) {
        (
            Roster {
                records: self.records,
                by_id: self.by_id,
            },
            self.report,
        )
    }
}

impl Default for RosterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = StudentRecord>) -> (Self, ImportReport) {
        let mut builder = RosterBuilder::new();
        for (idx, record) in records.into_iter().enumerate() {
            builder.push(idx + 1, Ok(record));
        }
        builder.finish()
    }

    /// Derives a new snapshot with `rows` appended. `self` is untouched;
    /// readers holding it keep a consistent view.
    pub fn with_imported(
        &self,
        rows: impl IntoIterator<Item = (usize, AttestaResult<StudentRecord>)>,
    ) -> (Self, ImportReport) {
        let mut builder = RosterBuilder::with_base(self);
        for (line, row) in rows {
            builder.push(line, row);
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn get(&self, student_id: &str) -> Option<&StudentRecord> {
        self.by_id
            .get(&normalize_field(student_id))
            .map(|&idx| &self.records[idx])
    }

    /// Triple-field check: id looked up under normalization, then name and
    /// batch verified against the stored row. Any miss yields the same
    /// [`AUTH_FAILURE_MSG`]; blank input is rejected before lookup.
    pub fn authenticate(
        &self,
        student_name: &str,
        batch_number: &str,
        student_id: &str,
    ) -> AttestaResult<&StudentRecord> {
        if student_name.trim().is_empty()
            || batch_number.trim().is_empty()
            || student_id.trim().is_empty()
        {
            return Err(AttestaError::validation(
                "student name, batch number and student id are all required",
            ));
        }
        let record = self
            .get(student_id)
            .ok_or_else(|| AttestaError::not_found(AUTH_FAILURE_MSG))?;
        let name_ok = normalize_field(&record.student_name) == normalize_field(student_name);
        let batch_ok = normalize_field(&record.batch_number) == normalize_field(batch_number);
        if !name_ok || !batch_ok {
            return Err(AttestaError::not_found(AUTH_FAILURE_MSG));
        }
        Ok(record)
    }
}

/// Shared mount point for the current snapshot. Readers clone the `Arc`
/// and never block each other; an import replaces the whole snapshot in
/// one write so no reader observes a half-applied roster.
#[derive(Debug)]
pub struct RosterHandle {
    current: RwLock<Arc<Roster>>,
}

impl RosterHandle {
    pub fn new(roster: Roster) -> Self {
        Self {
            current: RwLock::new(Arc::new(roster)),
        }
    }

    pub fn load(&self) -> Arc<Roster> {
        self.current.read().clone()
    }

    pub fn replace(&self, roster: Arc<Roster>) {
        *self.current.write() = roster;
    }
}
