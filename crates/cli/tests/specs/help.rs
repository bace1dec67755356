//! Black-box CLI checks.

use assert_cmd::Command;

#[test]
fn help_lists_core_commands() {
    let output = Command::cargo_bin("factory")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["create", "advance", "checkin", "queue", "triage", "event"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("factory")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}
