use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_population_summary() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--reference-date")
        .arg("2026-10-19");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Demographic Pyramid Results"))
        .stdout(predicate::str::contains("Unique persons: 4"))
        .stdout(predicate::str::contains("Rows without ID: 1"))
        .stdout(predicate::str::contains("Unreadable IDs: 1"))
        .stdout(predicate::str::contains("Persons by Age"));
}

#[test]
fn test_salary_variant_prints_bands() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("run")
        .arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--variant")
        .arg("salary_age")
        .arg("--reference-date")
        .arg("2026-10-19");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Variant: salary_age"))
        .stdout(predicate::str::contains("Salary Bands"))
        .stdout(predicate::str::contains("Lower-Middle"));
}

#[test]
fn test_json_input() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("--data")
        .arg("tests/data/payroll.json")
        .arg("--reference-date")
        .arg("2026-10-19");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Unique persons: 2"))
        .stdout(predicate::str::contains("Unknown gender: 1"));
}

#[test]
fn test_exports() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let json_path = dir.path().join("pyramid.json");
    let md_path = dir.path().join("pyramid.md");

    let mut cmd = Command::cargo_bin("pyramid-cli")?;
    cmd.arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--reference-date")
        .arg("2026-10-19")
        .arg("--output-json")
        .arg(&json_path)
        .arg("--output-markdown")
        .arg(&md_path);
    cmd.assert().success();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path)?)?;
    assert_eq!(json["unique_persons"], 4);
    assert_eq!(json["invalid_id_count"], 1);
    assert_eq!(json["view"]["kind"], "chart");

    let md = std::fs::read_to_string(&md_path)?;
    assert!(md.contains("| Age | Women | Men |"));
    assert!(md.contains("| 38 | 1 | 0 |"));
    Ok(())
}

#[test]
fn test_html_report() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("pyramid.html");

    let mut cmd = Command::cargo_bin("pyramid-cli")?;
    cmd.arg("report")
        .arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--output")
        .arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Report successfully generated at:"));

    let html = std::fs::read_to_string(&out)?;
    assert!(html.contains("<title>Population Pyramid</title>"));
    Ok(())
}

#[test]
fn test_curp_subcommand() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("curp")
        .arg("AAAA950615HAAAAA01")
        .arg("xyz")
        .arg("--reference-date")
        .arg("2026-10-19");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("AAAA950615HAAAAA01"))
        .stdout(predicate::str::contains("1995-06-15"))
        .stdout(predicate::str::contains("XYZ"));
}

#[test]
fn test_missing_file_fails() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("--data").arg("tests/data/does_not_exist.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_age_bounds_fail() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--min-age")
        .arg("70")
        .arg("--max-age")
        .arg("20");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_unknown_variant_rejected() {
    let mut cmd = Command::cargo_bin("pyramid-cli").unwrap();
    cmd.arg("--data")
        .arg("tests/data/payroll.csv")
        .arg("--variant")
        .arg("histogram");

    cmd.assert().failure();
}
