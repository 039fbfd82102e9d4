use std::path::PathBuf;

use attesta::roster::RosterHandle;
use attesta::roster_csv::{
    export_filename, export_roster, import_roster, load_roster, seed_roster,
};

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
fn import_merges_persists_and_swaps() {
    let tmp = temp_dir("import_merge");
    std::fs::create_dir_all(&tmp).unwrap();

    let roster_path = tmp.join("students.csv");
    let (roster, _) = seed_roster(&roster_path).unwrap();
    let handle = RosterHandle::new(roster);
    let before = handle.load();

    // Two new students, one duplicate of a seeded id, one unparseable date.
    let import_path = tmp.join("newcomers.csv");
    std::fs::write(
        &import_path,
        "student_name,batch_number,batch_start_date,batch_end_date,student_id\n\
         Sneha Reddy,AWS-2024-002,2024-02-01,2024-05-01,SIX004\n\
         Rahul Sharma,AWS-2024-001,2024-01-15,2024-04-15,six001\n\
         Vikram Singh,AWS-2024-002,2024-02-01,2024-05-01,SIX005\n\
         Broken Row,AWS-2024-002,not-a-date,2024-05-01,SIX006\n",
    )
    .unwrap();

    let report = import_roster(&handle, &roster_path, &import_path).unwrap();
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected_total, 2);
    assert!(report.rejected.iter().any(|r| r.reason.contains("duplicate")));

    // The live snapshot swapped; the earlier snapshot is untouched.
    assert_eq!(before.len(), 3);
    assert_eq!(handle.load().len(), 5);

    // The canonical file was rewritten with the merged set.
    let (reloaded, reload_report) = load_roster(&roster_path).unwrap();
    assert_eq!(reload_report.rejected_total, 0);
    assert_eq!(reloaded.len(), 5);
    assert!(reloaded.get("SIX004").is_some());
    assert!(reloaded.get("SIX005").is_some());
    assert_eq!(reloaded.get("SIX001").unwrap().student_name, "Rahul Sharma");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn failed_import_leaves_disk_and_memory_unchanged() {
    let tmp = temp_dir("import_atomic");
    std::fs::create_dir_all(&tmp).unwrap();

    let roster_path = tmp.join("students.csv");
    let (roster, _) = seed_roster(&roster_path).unwrap();
    let on_disk_before = std::fs::read_to_string(&roster_path).unwrap();
    let handle = RosterHandle::new(roster);

    let err = import_roster(&handle, &roster_path, &tmp.join("absent.csv")).unwrap_err();
    assert!(matches!(err, attesta::AttestaError::AssetMissing(_)));
    assert_eq!(handle.load().len(), 3);
    assert_eq!(std::fs::read_to_string(&roster_path).unwrap(), on_disk_before);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn header_with_missing_columns_is_rejected() {
    let tmp = temp_dir("import_header");
    std::fs::create_dir_all(&tmp).unwrap();

    let roster_path = tmp.join("students.csv");
    let (roster, _) = seed_roster(&roster_path).unwrap();
    let handle = RosterHandle::new(roster);

    let import_path = tmp.join("bad_header.csv");
    std::fs::write(&import_path, "name,id\nRahul,SIX009\n").unwrap();

    let err = import_roster(&handle, &roster_path, &import_path).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("student_name"), "missing column not named: {msg}");
    assert_eq!(handle.load().len(), 3);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn export_writes_a_timestamped_round_trippable_file() {
    let tmp = temp_dir("export_rt");
    std::fs::create_dir_all(&tmp).unwrap();

    let roster_path = tmp.join("students.csv");
    let (roster, _) = seed_roster(&roster_path).unwrap();

    let out = export_roster(&roster, &tmp.join("exports")).unwrap();
    let name = out.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("students_export_"));
    assert!(name.ends_with(".csv"));

    let (reloaded, report) = load_roster(&out).unwrap();
    assert_eq!(report.rejected_total, 0);
    assert_eq!(reloaded.len(), 3);
    assert!(reloaded.get("SIX003").is_some());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn export_filename_encodes_the_timestamp() {
    let at = chrono::NaiveDate::from_ymd_opt(2024, 4, 20)
        .unwrap()
        .and_hms_opt(9, 5, 7)
        .unwrap();
    assert_eq!(export_filename(at), "students_export_20240420_090507.csv");
}
