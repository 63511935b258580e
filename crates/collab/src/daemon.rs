// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The AI daemon collaborator: locating a repo's running daemon and
//! spawning run calls against it. The orchestrator never implements the
//! daemon subprocess itself — it calls this small interface (§4.5).

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("no daemon running for repo at {0}")]
    NotRunning(String),
    #[error("spawning daemon run command: {0}")]
    Spawn(String),
}

/// The literal commands used to talk to a repo's daemon, kept around for
/// error diagnostics (§4.5 step 8: "the literal daemon serve and run
/// invocations, used for error diagnostics").
#[derive(Debug, Clone)]
pub struct DaemonHandle {
    pub serve_cmd: String,
    pub run_cmd: String,
}

/// How a run call actually exited: a signal death is reported as `-1`, a
/// non-exit error (e.g. the process could not be waited on) as `1`,
/// otherwise the process's real exit code (§4.5 step 6).
#[derive(Debug, Clone, Default)]
pub struct AgentExit {
    pub code: i32,
    pub stderr: String,
}

/// One in-flight run of the daemon's run command against a prompt. The raw
/// line stream is the daemon's event bus (§4.5 step 5); the interpreter
/// (`incrementum-ai-session`) consumes it, but the runner preserves the raw
/// bytes in the session log regardless.
#[async_trait]
pub trait AgentProcess: Send {
    /// Next raw line of the daemon's event-bus stdout, or `None` at EOF.
    async fn next_line(&mut self) -> Option<String>;

    /// Await process exit. Only meaningful once `next_line` has returned
    /// `None`.
    async fn wait(&mut self) -> AgentExit;
}

/// Locates a repo's running daemon and spawns run calls against it.
#[async_trait]
pub trait DaemonClient: Send + Sync {
    /// Look up the daemon for `repo_path`; fails if none is running
    /// (§4.5 step 1).
    async fn locate(&self, repo_path: &Path) -> Result<DaemonHandle, DaemonError>;

    /// Spawn the daemon run command with `prompt`, routing stdout/stderr
    /// both to the terminal and to the session log file (§4.5 step 5) —
    /// terminal/log routing is the caller's responsibility; this returns
    /// the process handle the caller reads from and waits on.
    async fn spawn(&self, daemon: &DaemonHandle, prompt: &str) -> Result<Box<dyn AgentProcess>, DaemonError>;
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
