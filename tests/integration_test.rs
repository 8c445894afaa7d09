//! Integration tests for the complaint-lens binary

use std::process::Command;

#[test]
fn test_help_command() {
    let output = Command::new("cargo")
        .args(["run", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Complaint analytics assistant"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--data"));
    assert!(stdout.contains("analyze"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_version_command() {
    let output = Command::new("cargo")
        .args(["run", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("complaint-lens"));
    assert!(stdout.contains("0.1.0"));
}
