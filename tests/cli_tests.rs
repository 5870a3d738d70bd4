//! Integration tests for the `run` command against a local artifact store

use std::fs;

use assert_cmd::Command;
use basic_cleaning::store::ArtifactStore;
use basic_cleaning::LocalArtifactStore;
use predicates::prelude::*;
use tempfile::TempDir;

const RAW: &str = "\
id,name,price,last_review,longitude,latitude
1,Cozy loft,150,2019-05-21,-73.95,40.72
1,Cozy loft,150,2019-05-21,-73.95,40.72
2,Penthouse,5000,2019-06-01,-73.98,40.75
3,Far away,120,2019-06-01,-75.0,40.7
4,Quiet room,80,not-a-date,-73.9,40.8
";

fn store_in(tmp: &TempDir) -> LocalArtifactStore {
    LocalArtifactStore::new(tmp.path().join("store"), tmp.path().join("downloads"))
}

fn seed_input(tmp: &TempDir) {
    let src = tmp.path().join("sample.csv");
    fs::write(&src, RAW).unwrap();
    let mut store = store_in(tmp);
    let mut artifact = store
        .create_artifact("sample.csv", "raw_data", "Raw listings")
        .unwrap();
    store.attach_file(&mut artifact, &src).unwrap();
    store.register(artifact).unwrap();
    fs::remove_file(&src).unwrap();
}

fn cleaning_cmd(tmp: &TempDir, input: &str) -> Command {
    let mut cmd = Command::cargo_bin("basic-cleaning").unwrap();
    cmd.current_dir(tmp.path())
        .env("ARTIFACT_STORE_DIR", tmp.path().join("store"))
        .env("ARTIFACT_DOWNLOAD_DIR", tmp.path().join("downloads"))
        .args([
            "run",
            "--input_artifact",
            input,
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "Data with outliers and null values removed",
            "--min_price",
            "10",
            "--max_price",
            "350",
        ]);
    cmd
}

#[test]
fn test_run_logs_clean_artifact() {
    let tmp = TempDir::new().unwrap();
    seed_input(&tmp);

    cleaning_cmd(&tmp, "sample.csv:latest")
        .assert()
        .success()
        .stdout(predicate::str::contains("clean_sample.csv:v0"));

    let store = store_in(&tmp);
    let manifest = store.manifest("clean_sample.csv", 0).unwrap();
    assert_eq!(manifest.kind, "clean_sample");
    assert_eq!(manifest.derived_from, vec!["sample.csv:latest"]);

    let content = fs::read_to_string(
        tmp.path()
            .join("store/clean_sample.csv/v0")
            .join("clean_sample.csv"),
    )
    .unwrap();
    assert_eq!(
        content,
        "id,name,price,last_review,longitude,latitude\n\
         1,Cozy loft,150,2019-05-21,-73.95,40.72\n\
         4,Quiet room,80,,-73.9,40.8\n"
    );

    // The local copy is removed once the artifact is logged.
    assert!(!tmp.path().join("clean_sample.csv").exists());
}

#[test]
fn test_rerun_on_same_input_reuses_version() {
    let tmp = TempDir::new().unwrap();
    seed_input(&tmp);

    cleaning_cmd(&tmp, "sample.csv:latest").assert().success();
    cleaning_cmd(&tmp, "sample.csv:v0")
        .assert()
        .success()
        .stdout(predicate::str::contains("clean_sample.csv:v0"));
}

#[test]
fn test_missing_input_artifact_fails() {
    let tmp = TempDir::new().unwrap();

    cleaning_cmd(&tmp, "missing.csv:latest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
    assert!(!tmp.path().join("store/clean_sample.csv").exists());
}

#[test]
fn test_malformed_input_fails_without_output() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("bad.csv");
    fs::write(&src, "id,price\n1,100\n").unwrap();
    let mut store = store_in(&tmp);
    let mut artifact = store.create_artifact("bad.csv", "raw_data", "").unwrap();
    store.attach_file(&mut artifact, &src).unwrap();
    store.register(artifact).unwrap();

    cleaning_cmd(&tmp, "bad.csv:latest")
        .assert()
        .failure()
        .stderr(predicate::str::contains("last_review"));
    assert!(!tmp.path().join("store/clean_sample.csv").exists());
}

#[test]
fn test_missing_flag_is_usage_error() {
    Command::cargo_bin("basic-cleaning")
        .unwrap()
        .args(["run", "--input_artifact", "sample.csv:latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--output_artifact"));
}
