//! End-to-end tests for the `smartx` binary. None of them reach the network.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command running in an empty directory, with no API key and an explicit
/// default config so the user's files never leak in.
fn smartx(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }

    let mut cmd = Command::cargo_bin("smartx").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("OPENAI_API_KEY")
        .arg("--config")
        .arg(&config);
    cmd
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("smartx")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("schema"));
}

#[test]
fn schema_show_prints_transport_template() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["schema", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"templateSchemaName\": \"Transport\""))
        .stdout(predicate::str::contains("Fuel Type"));
}

#[test]
fn schema_fields_lists_display_names() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["schema", "fields"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Distance Travelled (in km)"))
        .stdout(predicate::str::contains("11 fields"));
}

#[test]
fn schema_show_rejects_template_with_empty_slot() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("broken.json");
    fs::write(
        &template,
        r#"{"templateSchemaId": 1, "templateSchemaName": "Broken",
            "templateSchemaProp": [{"category": "normal", "ctrlName": "Name",
            "ctrlDisplayName": "Name", "ctrlType": "textbox", "ctrlData": [], "ctrlApi": ""}]}"#,
    )
    .unwrap();

    smartx(&dir)
        .args(["schema", "show", "--template"])
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Name"));
}

#[test]
fn schema_prompt_embeds_page() {
    let dir = TempDir::new().unwrap();
    let page = dir.path().join("page.txt");
    fs::write(&page, "Diesel 120 km").unwrap();

    smartx(&dir)
        .args(["schema", "prompt"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("=========\nDiesel 120 km\n========="));
}

#[test]
fn schema_prompt_truncates_to_configured_length() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{"extraction":{"max_page_chars":5}}"#,
    )
    .unwrap();
    let page = dir.path().join("page.txt");
    fs::write(&page, "Diesel 120 km").unwrap();

    smartx(&dir)
        .args(["schema", "prompt"])
        .arg(&page)
        .assert()
        .success()
        .stdout(predicate::str::contains("=========\nDiese\n========="))
        .stdout(predicate::str::contains("120 km").not());
}

#[test]
fn process_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["process", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn process_without_api_key_fails_before_reading() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("invoice.pdf"), b"%PDF-1.4 not really").unwrap();

    smartx(&dir)
        .args(["process", "invoice.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn process_rejects_non_pdf() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    smartx(&dir)
        .args(["process", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn batch_without_matches_fails() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["batch", "*.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn config_set_then_get() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["config", "set", "retrieval.strategy", "consensus"])
        .assert()
        .success();

    smartx(&dir)
        .args(["config", "get", "retrieval.strategy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consensus"));
}

#[test]
fn config_get_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    smartx(&dir)
        .args(["config", "get", "llm.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}
