//! CLI surface tests.

use std::process::Command;

#[test]
fn run_help_lists_core_flags() {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--", "run", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{stdout}{stderr}");

    assert!(combined.contains("--url"), "Help should mention --url flag");
    assert!(combined.contains("--dag"), "Help should mention --dag flag");
    assert!(
        combined.contains("--conf"),
        "Help should mention --conf flag"
    );
    assert!(
        combined.contains("--interval"),
        "Help should mention --interval flag"
    );
}
