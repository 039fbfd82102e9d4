use attesta::{IssueService, IssuerPaths};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let dir = std::env::temp_dir().join("attesta_demo");
    let paths = IssuerPaths {
        roster: dir.join("students.csv"),
        template: None,
        layout: None,
        fonts_dir: None,
        out_dir: dir.join("certificates"),
    };
    let (service, report) = IssueService::from_paths(&paths, true)?;
    println!(
        "roster: {} student(s), {} row(s) rejected",
        service.roster().len(),
        report.rejected_total
    );

    let grant = service.authenticate("Rahul Sharma", "AWS-2024-001", "SIX001")?;
    let issued = service.issue(&grant)?;
    println!("issued {} (degraded: {})", issued.path.display(), issued.degraded);
    Ok(())
}
