//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

/// Run the `clipwise` binary with `home` as its home directory, so logs and
/// config stay inside the test's temp dir.
pub fn run_clipwise(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clipwise"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("CLIPWISE_IDLE_TIMEOUT_SECS")
        .output()
        .expect("failed to run clipwise binary")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Write `~/.clipwise/config.toml` under `home`.
pub fn write_config(home: &Path, contents: &str) {
    let dir = home.join(".clipwise");
    std::fs::create_dir_all(&dir).expect("create config dir");
    std::fs::write(dir.join("config.toml"), contents).expect("write config");
}
