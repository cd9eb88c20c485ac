//! Test support utilities for launcher integration tests.
//!
//! Provides an isolated working directory and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;

use assert_cmd::Command;
use std::process::Output;
use tempfile::TempDir;

/// Variables that would otherwise leak flag values into the launcher.
const FLAG_ENV: &[&str] = &[
    "AWS_SECRET_ARN",
    "AZURE_KEY_VAULT_NAME",
    "ULIMIT_SOFT",
    "ULIMIT_HARD",
    "LOG_LEVEL",
    "LOG_MODE",
    "LAUNCHER_LOG",
];

/// Test environment with an isolated temp directory.
///
/// Child processes use `.current_dir()` so tests can run in parallel.
pub struct Test {
    pub dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    /// A launcher command with flag variables cleared and colour disabled.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("launcher").expect("failed to find launcher binary");
        for var in FLAG_ENV {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run the launcher with `args`.
    pub fn launch(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run launcher")
    }
}
