// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

pub const LINE: &str = "2024-03-01T12:30:45Z web01 sshd info Accepted publickey for deploy\n";

/// `n` copies of a well-formed fancy line.
pub fn fancy_lines(n: usize) -> String {
    LINE.repeat(n)
}

/// Run the fancy binary with `args`, feeding `input` on stdin.
///
/// HOME and XDG_CONFIG_HOME point at an empty directory so a user config
/// file on the test machine cannot leak in.
pub fn run_fancy_with_input(args: &[&str], input: &str) -> (String, String, i32) {
    let home = TempDir::new().expect("Failed to create temp home");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fancy"))
        .args(args)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start fancy");

    if let Some(mut stdin) = cmd.stdin.take() {
        // The process may exit before reading everything.
        let _ = stdin.write_all(input.as_bytes());
    }

    let output = cmd.wait_with_output().expect("Failed to read output");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Metric-only flags that never collide with a port in use.
pub fn metric_only_args() -> Vec<&'static str> {
    vec!["--ignore-config", "--metric-only", "--prom-addr", "127.0.0.1:0"]
}
