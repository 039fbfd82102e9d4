use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use attesta::roster::ImportReport;
use attesta::roster_csv;
use attesta::store::CertificateStore;
use attesta::template::{TemplateAsset, default_template_candidates};
use attesta::{FontLibrary, IssueService, IssuerPaths, TemplateLayout, render_calibration_sheet};

#[derive(Parser, Debug)]
#[command(name = "attesta", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate a student and issue their completion certificate.
    Issue(IssueArgs),
    /// Copy a stored certificate out of the artifact directory by name.
    Fetch(FetchArgs),
    /// Render a calibration sheet for tuning a position table.
    Calibrate(CalibrateArgs),
    /// Roster maintenance.
    #[command(subcommand)]
    Roster(RosterCommand),
    /// Report roster, template and font readiness.
    Status(StatusArgs),
}

#[derive(Parser, Debug)]
struct IssueArgs {
    /// Student's full name as enrolled.
    #[arg(long)]
    name: String,

    /// Batch number, e.g. AWS-2024-001.
    #[arg(long)]
    batch: String,

    /// Student id, e.g. SIX001.
    #[arg(long)]
    id: String,

    /// Roster CSV; seeded with sample data when missing.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,

    /// Template image (png, jpg or svg). Defaults to probing the
    /// conventional locations.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Position table JSON. Defaults to the built-in calibrated table.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Extra font directory scanned in addition to system fonts.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Directory certificates are written to.
    #[arg(long, default_value = "certificates")]
    out_dir: PathBuf,

    /// Issue a plain-text certificate instead of failing when the template
    /// is unavailable.
    #[arg(long)]
    allow_degraded: bool,

    /// Issue date override (YYYY-MM-DD); defaults to today.
    #[arg(long)]
    issued_on: Option<String>,
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Artifact file name, e.g. certificate_SIX001_Rahul_Sharma.png.
    #[arg(long = "handle")]
    name: String,

    /// Directory certificates are stored in.
    #[arg(long, default_value = "certificates")]
    out_dir: PathBuf,

    /// Destination path; defaults to the artifact name in the current
    /// directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CalibrateArgs {
    /// Template image (png, jpg or svg). Defaults to probing the
    /// conventional locations.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Position table JSON. Defaults to the built-in calibrated table.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Extra font directory scanned in addition to system fonts.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long, default_value = "calibration_grid.png")]
    out: PathBuf,
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Merge students from a CSV file into the roster.
    Import(RosterImportArgs),
    /// Write a timestamped CSV export of the roster.
    Export(RosterExportArgs),
    /// Write the bundled sample roster.
    Seed(RosterSeedArgs),
    /// Print the roster contents.
    List(RosterPathArgs),
}

#[derive(Parser, Debug)]
struct RosterImportArgs {
    /// CSV file to merge in.
    #[arg(long)]
    file: PathBuf,

    /// Roster CSV; seeded with sample data when missing.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,
}

#[derive(Parser, Debug)]
struct RosterExportArgs {
    /// Roster CSV to export.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,

    /// Directory the timestamped export is written into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct RosterSeedArgs {
    /// Roster CSV to write.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,

    /// Overwrite an existing roster file.
    #[arg(long)]
    force: bool,
}

#[derive(Parser, Debug)]
struct RosterPathArgs {
    /// Roster CSV to read.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Roster CSV.
    #[arg(long, default_value = "students.csv")]
    roster: PathBuf,

    /// Template image (png, jpg or svg). Defaults to probing the
    /// conventional locations.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Extra font directory scanned in addition to system fonts.
    #[arg(long)]
    fonts: Option<PathBuf>,

    /// Directory certificates are written to.
    #[arg(long, default_value = "certificates")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Issue(args) => cmd_issue(args),
        Command::Fetch(args) => cmd_fetch(args),
        Command::Calibrate(args) => cmd_calibrate(args),
        Command::Roster(cmd) => match cmd {
            RosterCommand::Import(args) => cmd_roster_import(args),
            RosterCommand::Export(args) => cmd_roster_export(args),
            RosterCommand::Seed(args) => cmd_roster_seed(args),
            RosterCommand::List(args) => cmd_roster_list(args),
        },
        Command::Status(args) => cmd_status(args),
    }
}

fn cmd_issue(args: IssueArgs) -> anyhow::Result<()> {
    let paths = IssuerPaths {
        roster: args.roster,
        template: args.template,
        layout: args.layout,
        fonts_dir: args.fonts,
        out_dir: args.out_dir,
    };
    let (service, report) = IssueService::from_paths(&paths, args.allow_degraded)?;
    print_rejections(&report);

    let grant = service.authenticate(&args.name, &args.batch, &args.id)?;
    let issued = match args.issued_on {
        Some(raw) => {
            let date = chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("parse issue date '{raw}' (expected YYYY-MM-DD)"))?;
            service.issue_on(&grant, date)?
        }
        None => service.issue(&grant)?,
    };

    if issued.degraded {
        eprintln!("note: certificate rendered as plain text (template or fonts unavailable)");
    }
    eprintln!("issued {}", issued.path.display());
    println!("{}", issued.handle);
    Ok(())
}

fn cmd_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let store = CertificateStore::open(&args.out_dir)?;
    let bytes = store.resolve_name(&args.name)?;
    let out = args.out.unwrap_or_else(|| PathBuf::from(&args.name));
    fs::write(&out, bytes).with_context(|| format!("write '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_calibrate(args: CalibrateArgs) -> anyhow::Result<()> {
    let template = match args.template {
        Some(path) => TemplateAsset::open(&path)?,
        None => TemplateAsset::locate(&default_template_candidates())?.1,
    };
    let layout = match args.layout {
        Some(path) => TemplateLayout::load(&path)?,
        None => TemplateLayout::classic_1056x816(),
    };
    let font_dirs: Vec<PathBuf> = args.fonts.into_iter().collect();
    let fonts = FontLibrary::open(&font_dirs);

    let png = render_calibration_sheet(&template, &layout, &fonts)?;
    fs::write(&args.out, png).with_context(|| format!("write '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_roster_import(args: RosterImportArgs) -> anyhow::Result<()> {
    let (roster, load_report) = roster_csv::load_or_seed_roster(&args.roster)?;
    print_rejections(&load_report);

    let handle = attesta::roster::RosterHandle::new(roster);
    let report = roster_csv::import_roster(&handle, &args.roster, &args.file)?;
    eprintln!(
        "imported {} student(s), rejected {}; roster now has {}",
        report.accepted,
        report.rejected_total,
        handle.load().len()
    );
    for row in &report.rejected {
        eprintln!("  line {}: {}", row.line, row.reason);
    }
    if report.rejected_total > report.rejected.len() {
        eprintln!(
            "  ... and {} more",
            report.rejected_total - report.rejected.len()
        );
    }
    Ok(())
}

fn cmd_roster_export(args: RosterExportArgs) -> anyhow::Result<()> {
    let (roster, report) = roster_csv::load_roster(&args.roster)?;
    print_rejections(&report);
    let path = roster_csv::export_roster(&roster, &args.out_dir)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_roster_seed(args: RosterSeedArgs) -> anyhow::Result<()> {
    if args.roster.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            args.roster.display()
        );
    }
    let (roster, _) = roster_csv::seed_roster(&args.roster)?;
    eprintln!(
        "seeded {} with {} sample student(s)",
        args.roster.display(),
        roster.len()
    );
    Ok(())
}

fn cmd_roster_list(args: RosterPathArgs) -> anyhow::Result<()> {
    let (roster, report) = roster_csv::load_roster(&args.roster)?;
    print_rejections(&report);
    for record in roster.records() {
        println!(
            "{}  {}  {}  {}  {}",
            record.student_id,
            record.batch_number,
            record.batch_start_date,
            record.batch_end_date,
            record.student_name
        );
    }
    Ok(())
}

fn cmd_status(args: StatusArgs) -> anyhow::Result<()> {
    match roster_csv::load_roster(&args.roster) {
        Ok((roster, _)) => eprintln!(
            "roster:   {} student(s) from {}",
            roster.len(),
            args.roster.display()
        ),
        Err(err) => eprintln!("roster:   unavailable ({err})"),
    }

    let located = match &args.template {
        Some(path) => TemplateAsset::open(path).map(|asset| (path.clone(), asset)),
        None => TemplateAsset::locate(&default_template_candidates()),
    };
    match located {
        Ok((path, asset)) => {
            let (width, height) = asset.dimensions();
            eprintln!(
                "template: {} {}x{} from {}",
                asset.kind(),
                width,
                height,
                path.display()
            );
        }
        Err(err) => eprintln!("template: unavailable ({err}); certificates degrade to plain text"),
    }

    let font_dirs: Vec<PathBuf> = args.fonts.into_iter().collect();
    let fonts = FontLibrary::open(&font_dirs);
    eprintln!("fonts:    {} face(s)", fonts.face_count());
    eprintln!("output:   {}", args.out_dir.display());
    Ok(())
}

fn print_rejections(report: &ImportReport) {
    if report.rejected_total == 0 {
        return;
    }
    eprintln!("warning: {} roster row(s) rejected", report.rejected_total);
    for row in &report.rejected {
        eprintln!("  line {}: {}", row.line, row.reason);
    }
}
