//! CLI contract tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const CARD_JSON: &str = r#"{"cards":[{"card_number":1,"confidence":0.95,"extracted_data":{"name":"Ada Lovelace","email":"ada@engines.io","company":"Difference Ltd"}}]}"#;

/// Command isolated from the developer's home directory and environment.
fn cardsync(home: &TempDir) -> Command {
    let mut cmd = match Command::cargo_bin("cardsync") {
        Ok(cmd) => cmd,
        Err(err) => panic!("binary should be built: {err}"),
    };
    cmd.env("HOME", home.path())
        .env("CARDSYNC_CONFIG", home.path().join("missing.toml"))
        .env("RUST_LOG", "off")
        .env_remove("OPENAI_API_KEY")
        .env_remove("NOTION_TOKEN")
        .env_remove("CARDSYNC_NOTION_DATABASE_ID")
        .env_remove("CARDSYNC_LOG_DIR")
        .arg("--env-file")
        .arg(home.path().join("absent.env"));
    cmd
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    assert!(fs::write(&path, contents).is_ok());
    path
}

fn run(cmd: &mut Command) -> Output {
    match cmd.output() {
        Ok(output) => output,
        Err(err) => panic!("command should run: {err}"),
    }
}

fn stdout_json(output: &Output) -> Value {
    match serde_json::from_slice(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!(
            "stdout should be JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        ),
    }
}

#[test]
fn interpret_prints_validated_records() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "card.txt", CARD_JSON);

    let output = run(cardsync(&home).arg("interpret").arg(&response));
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["records"][0]["name"], "Ada Lovelace");
    assert_eq!(json["records"][0]["email"], "ada@engines.io");
    assert!(json.get("review").is_some());
    assert!(json.get("coverage").is_some());
}

#[test]
fn interpret_reports_unreadable_response() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "refusal.txt", "Sorry, I cannot read this card.");

    let output = run(cardsync(&home).arg("interpret").arg(&response));
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["error"].is_string());
    assert_eq!(json["cards"], Value::Array(Vec::new()));
    assert_eq!(json["raw_response"], "Sorry, I cannot read this card.");
}

#[test]
fn project_maps_onto_schema_file() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "card.txt", CARD_JSON);
    let schema = write(
        home.path(),
        "schema.json",
        r#"{"Full Name":"title","E-mail":"email","Organization":"select","Scanned":"date"}"#,
    );

    let output = run(
        cardsync(&home)
            .arg("project")
            .arg(&response)
            .arg("--schema")
            .arg(&schema)
            .arg("--at")
            .arg("2024-03-01T12:00:00Z"),
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    let payload = &json[0];
    assert_eq!(payload["Full Name"]["title"][0]["text"]["content"], "Ada Lovelace");
    assert_eq!(payload["E-mail"]["email"], "ada@engines.io");
    assert_eq!(payload["Organization"]["select"]["name"], "Difference Ltd");
    assert_eq!(payload["Scanned"]["date"]["start"], "2024-03-01T12:00:00Z");
}

#[test]
fn project_fails_when_nothing_is_recovered() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "refusal.txt", "Sorry, I cannot read this card.");
    let schema = write(home.path(), "schema.json", r#"{"Name":"title"}"#);

    let output = run(
        cardsync(&home)
            .arg("project")
            .arg(&response)
            .arg("--schema")
            .arg(&schema),
    );
    assert!(!output.status.success());
}

#[test]
fn verify_key_rejects_malformed_key_offline() {
    let home = tempfile::tempdir().expect("should create temp dir");

    let output = run(
        cardsync(&home)
            .env("OPENAI_API_KEY", "sk-short")
            .env("CARDSYNC_OPENAI_BASE_URL", "http://127.0.0.1:9/")
            .arg("verify-key"),
    );
    assert!(!output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], false);
    assert_eq!(json["failure"], "malformed_key");
}

#[test]
fn verify_key_skip_accepts_well_formed_key() {
    let home = tempfile::tempdir().expect("should create temp dir");

    let output = run(
        cardsync(&home)
            .env("OPENAI_API_KEY", "sk-test_abcdefghijklmnopqrstuvwxyz")
            .arg("verify-key")
            .arg("--skip"),
    );
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["valid"], true);
    assert_eq!(json["verified"], false);
}

#[test]
fn verify_key_requires_a_key() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let output = run(cardsync(&home).arg("verify-key"));
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("OPENAI_API_KEY"));
}

#[test]
fn upload_requires_a_destination() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "card.txt", CARD_JSON);

    let output = run(
        cardsync(&home)
            .env("OPENAI_API_KEY", "sk-test_abcdefghijklmnopqrstuvwxyz")
            .arg("upload")
            .arg(&response)
            .arg("--skip-verification"),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("database_id"));
}

#[test]
fn project_explains_malformed_schema_file() {
    let home = tempfile::tempdir().expect("should create temp dir");
    let response = write(home.path(), "card.txt", CARD_JSON);
    let schema = write(home.path(), "schema.json", r#"["Name", "title"]"#);

    let output = run(
        cardsync(&home)
            .arg("project")
            .arg(&response)
            .arg("--schema")
            .arg(&schema),
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("name to type"));
}
