//! Validate command integration tests

mod common;

use common::TestWorkspace;
use predicates::prelude::*;

#[test]
fn test_valid_skill() {
    let workspace = TestWorkspace::new();
    workspace.create_skill("pdf");

    workspace
        .cmd()
        .args(["validate", "skills/pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_missing_description_is_single_error() {
    let workspace = TestWorkspace::new();
    workspace.write_file("skills/pdf/SKILL.md", "---\nname: pdf\n---\n# PDF\n");

    let output = workspace
        .cmd()
        .args(["validate", "skills/pdf", "--json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let findings = json["findings"].as_array().unwrap();
    let errors: Vec<_> = findings
        .iter()
        .filter(|f| f["severity"] == "error")
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["kind"], "MissingField");
}

#[test]
fn test_findings_printed_as_text() {
    let workspace = TestWorkspace::new();
    workspace.write_file("skills/pdf/SKILL.md", "---\nname: other\ndescription: x\n---\n");

    workspace
        .cmd()
        .args(["validate", "skills/pdf"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error[InvalidName] name:"))
        .stdout(predicate::str::contains("1 error(s)"));
}

#[test]
fn test_warnings_only_succeeds() {
    let workspace = TestWorkspace::new();
    workspace.create_skill("pdf");
    std::fs::create_dir_all(workspace.path.join("skills/pdf/assets")).unwrap();

    workspace
        .cmd()
        .args(["validate", "skills/pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("warning"));
}

#[test]
fn test_missing_directory_is_io_error() {
    let workspace = TestWorkspace::new();

    workspace
        .cmd()
        .args(["validate", "skills/nope"])
        .assert()
        .code(2);
}

#[test]
fn test_config_file_changes_bounds() {
    let workspace = TestWorkspace::new();
    workspace.create_skill("pdf");
    workspace.write_file(
        "skillfork.yaml",
        "validation:\n  max-description-length: 10\n  description-warning-length: 5\n",
    );

    workspace
        .cmd()
        .args(["validate", "skills/pdf", "--config", "skillfork.yaml"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_config_is_environment_error() {
    let workspace = TestWorkspace::new();
    workspace.create_skill("pdf");
    workspace.write_file("skillfork.yaml", "validation:\n  unknown-key: 1\n");

    workspace
        .cmd()
        .env("SKILLFORK_CONFIG", workspace.path.join("skillfork.yaml"))
        .args(["validate", "skills/pdf"])
        .assert()
        .code(2);
}
