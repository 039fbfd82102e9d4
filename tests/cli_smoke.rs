use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_attesta")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "attesta.exe"
            } else {
                "attesta"
            });
            p
        })
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "attesta_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn cli_issues_and_fetches_a_certificate() {
    let tmp = temp_dir("cli_issue");
    std::fs::create_dir_all(&tmp).unwrap();
    let roster = tmp.join("students.csv");
    let certs = tmp.join("certificates");

    let output = std::process::Command::new(exe())
        .args([
            "issue",
            "--name",
            "Rahul Sharma",
            "--batch",
            "AWS-2024-001",
            "--id",
            "SIX001",
            "--allow-degraded",
            "--issued-on",
            "2024-04-20",
        ])
        .arg("--roster")
        .arg(&roster)
        .arg("--template")
        .arg(tmp.join("missing.png"))
        .arg("--out-dir")
        .arg(&certs)
        .output()
        .unwrap();
    assert!(output.status.success(), "issue failed: {output:?}");

    let artifact = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert_eq!(artifact, "certificate_SIX001_Rahul_Sharma.txt");
    assert!(certs.join(&artifact).is_file());
    assert!(roster.is_file(), "roster was not seeded");

    let fetched = tmp.join("fetched.txt");
    let output = std::process::Command::new(exe())
        .args(["fetch", "--handle", artifact.as_str()])
        .arg("--out-dir")
        .arg(&certs)
        .arg("--out")
        .arg(&fetched)
        .output()
        .unwrap();
    assert!(output.status.success(), "fetch failed: {output:?}");
    let body = std::fs::read_to_string(&fetched).unwrap();
    assert!(body.contains("RAHUL SHARMA"));
    assert!(body.contains("Issued: April 20, 2024"));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn cli_rejects_wrong_details_with_nonzero_exit() {
    let tmp = temp_dir("cli_reject");
    std::fs::create_dir_all(&tmp).unwrap();

    let output = std::process::Command::new(exe())
        .args([
            "issue",
            "--name",
            "Rahul Sharma",
            "--batch",
            "AWS-2024-001",
            "--id",
            "SIX999",
            "--allow-degraded",
        ])
        .arg("--roster")
        .arg(tmp.join("students.csv"))
        .arg("--template")
        .arg(tmp.join("missing.png"))
        .arg("--out-dir")
        .arg(tmp.join("certificates"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("student not found"),
        "unexpected stderr: {stderr}"
    );

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn cli_roster_seed_guards_and_lists() {
    let tmp = temp_dir("cli_roster");
    std::fs::create_dir_all(&tmp).unwrap();
    let roster = tmp.join("students.csv");

    let output = std::process::Command::new(exe())
        .args(["roster", "seed"])
        .arg("--roster")
        .arg(&roster)
        .output()
        .unwrap();
    assert!(output.status.success(), "seed failed: {output:?}");

    // A second seed must refuse to clobber without --force.
    let output = std::process::Command::new(exe())
        .args(["roster", "seed"])
        .arg("--roster")
        .arg(&roster)
        .output()
        .unwrap();
    assert!(!output.status.success());

    let output = std::process::Command::new(exe())
        .args(["roster", "list"])
        .arg("--roster")
        .arg(&roster)
        .output()
        .unwrap();
    assert!(output.status.success(), "list failed: {output:?}");
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("SIX001"));
    assert!(stdout.contains("Amit Kumar"));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn cli_status_reports_even_with_nothing_deployed() {
    let tmp = temp_dir("cli_status");
    std::fs::create_dir_all(&tmp).unwrap();

    let output = std::process::Command::new(exe())
        .args(["status"])
        .arg("--roster")
        .arg(tmp.join("students.csv"))
        .arg("--out-dir")
        .arg(tmp.join("certificates"))
        .output()
        .unwrap();
    assert!(output.status.success(), "status failed: {output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("roster:"));
    assert!(stderr.contains("fonts:"));

    std::fs::remove_dir_all(&tmp).ok();
}
