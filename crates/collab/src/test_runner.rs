// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell test-command execution (§4.3.2).

use incrementum_core::TestCommandResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestRunError {
    #[error("spawning test command {command:?}: {source}")]
    Spawn { command: String, #[source] source: std::io::Error },
}

/// Outcome of running every configured test command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub results: Vec<TestCommandResult>,
    pub combined_output: String,
}

impl TestOutcome {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.exit_code == 0)
    }
}

/// Runs the configured test commands in a workspace. Each command is run
/// to completion regardless of earlier failures (§4.3.2 step 2).
pub trait TestRunner: Send + Sync {
    fn run_all(&self, workspace: &std::path::Path, commands: &[String]) -> Result<TestOutcome, TestRunError>;
}

#[cfg(test)]
#[path = "test_runner_tests.rs"]
mod tests;
