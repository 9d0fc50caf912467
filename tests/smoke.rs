//! Smoke tests -- verify the binary runs and its subcommands work end to end.

use assert_cmd::Command;
use predicates::str::contains;

fn cli(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("tams-dashboard").unwrap();
    cmd.env_remove("TAMS_CONFIG")
        .env("RUST_LOG", "warn")
        .arg("--db")
        .arg(db);
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("tams-dashboard")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Industrial anomaly tracking dashboard"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("tams-dashboard")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("tams-dashboard"));
}

#[test]
fn test_subcommands_exist() {
    for sub in ["serve", "kpis", "chart", "services", "chat", "import"] {
        Command::cargo_bin("tams-dashboard")
            .unwrap()
            .args([sub, "--help"])
            .assert()
            .success();
    }
}

#[test]
fn test_empty_database_reports() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tams.db");

    cli(&db)
        .args(["kpis", "--json"])
        .assert()
        .success()
        .stdout(contains("\"total_anomalies\": 0"));

    cli(&db).arg("services").assert().success().stdout(contains("No anomalies recorded."));

    cli(&db)
        .args(["chart", "--json"])
        .assert()
        .success()
        .stdout(contains("\"label\": \"Déc\""));
}

#[test]
fn test_import_then_report() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tams.db");
    let file = dir.path().join("reports.json");
    std::fs::write(
        &file,
        r#"[
            {"num_equipement": "P-101", "systeme": "Hydraulic", "description": "Fuite sur la garniture", "section_proprietaire": "Utilités"},
            {"num_equipement": "K-7", "systeme": "Electrical", "description": "Calibration overdue", "section_proprietaire": "Utilités"}
        ]"#,
    )
    .unwrap();

    cli(&db)
        .args(["import", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("2 anomalies stored"));

    cli(&db)
        .args(["services", "--json"])
        .assert()
        .success()
        .stdout(contains("Utilités"))
        .stdout(contains("100.0"));

    cli(&db)
        .args(["chat", "Quel est l'état de P-101 ?"])
        .assert()
        .success()
        .stdout(contains("P-101"));
}

#[test]
fn test_import_rejects_incomplete_records() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tams.db");
    let file = dir.path().join("bad.json");
    std::fs::write(&file, r#"[{"num_equipement": "P-1", "systeme": "x"}]"#).unwrap();

    cli(&db)
        .args(["import", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("description"));
}

#[test]
fn test_import_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tams.db");
    let file = dir.path().join("releve.CSV");
    std::fs::write(
        &file,
        "Num_equipement,Systeme,Description,Date de détéction de l'anomalie,Section propriétaire\n\
         M-12,Électrique,Échauffement moteur,2025-03-04,Utilités\n",
    )
    .unwrap();

    cli(&db)
        .args(["import", "--file"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("1 anomalies stored"));

    cli(&db)
        .args(["chat", "recherche ÉCHAUFFEMENT"])
        .assert()
        .success()
        .stdout(contains("M-12"));
}

#[test]
fn test_import_csv_without_required_columns() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("tams.db");
    let file = dir.path().join("releve.csv");
    std::fs::write(&file, "Num_equipement,Description\nP-1,Fuite\n").unwrap();

    cli(&db)
        .args(["import", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("missing required columns: Systeme"));
}

#[test]
fn test_chat_help() {
    let dir = tempfile::tempdir().unwrap();
    cli(&dir.path().join("tams.db"))
        .args(["chat", "aide"])
        .assert()
        .success()
        .stdout(contains("Je peux vous aider"));
}
