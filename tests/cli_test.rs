//! Integration tests for the binary's argument handling: the version flag
//! and the malformed-bootstrap fast path.

use std::process::Command;

#[test]
fn version_flag_shows_cargo_version() {
    let cargo_version = env!("CARGO_PKG_VERSION");

    let output = Command::new(env!("CARGO_BIN_EXE_ringward"))
        .arg("--version")
        .output()
        .expect("Failed to execute ringward --version");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        output.status.success(),
        "ringward --version should exit successfully"
    );
    assert!(
        stdout.contains(cargo_version),
        "Output '{}' should contain version '{}'",
        stdout.trim(),
        cargo_version
    );
}

#[test]
fn incomplete_bootstrap_exits_nonzero_without_joining() {
    // One or two bootstrap integers is malformed: the process must refuse
    // to join the ring and exit immediately
    for args in [&["2"][..], &["2", "37"][..]] {
        let output = Command::new(env!("CARGO_BIN_EXE_ringward"))
            .args(args)
            .output()
            .expect("Failed to execute ringward");

        assert!(
            !output.status.success(),
            "ringward {:?} should exit with a failure status",
            args
        );
        // exit(-1) maps to 255 on Unix
        assert_eq!(output.status.code(), Some(255));
    }
}

#[test]
fn negative_sentinel_handles_are_accepted_as_arguments() {
    // A full bootstrap with -1 sentinels must parse; pair it with a bogus
    // config path so the process exits before joining the ring
    let output = Command::new(env!("CARGO_BIN_EXE_ringward"))
        .args(["2", "37", "12345", "-1", "-1", "-1", "-1", "-1"])
        .args(["--config", "/nonexistent/ringward.toml"])
        .output()
        .expect("Failed to execute ringward");

    // Exit code 1 is the config error path, not the malformed-bootstrap
    // fast path
    assert_eq!(output.status.code(), Some(1));
}
