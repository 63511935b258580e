// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The AI Session Runner (§4.5): supervises exactly one AI "run" call
//! against a repo's local daemon, recording the session and streaming its
//! event bus into the job's event log.

use crate::interpreter::{Interpreter, Rendering};
use incrementum_collab::{DaemonClient, DaemonError, EventSink, EventSinkError};
use incrementum_core::{Clock, Event, Purpose, SessionId};
use incrementum_state::{rfc3339_nanos, StateError, Store};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiSessionError {
    #[error(transparent)]
    Daemon(#[from] DaemonError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    EventSink(#[from] EventSinkError),
}

/// The outcome of one supervised run (§4.5 step 8). `serve_cmd`/`run_cmd`
/// are the literal daemon invocations, kept for error diagnostics.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: SessionId,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub serve_cmd: String,
    pub run_cmd: String,
}

impl RunOutcome {
    /// A negative exit code means the process died to a signal (§4.5 step
    /// 6, §4.3.1 step 6).
    pub fn signal_killed(&self) -> bool {
        self.exit_code < 0
    }
}

/// Supervises AI subprocess runs for one repo. `D` is the daemon
/// collaborator; `C` is the clock, generic the way Stage Workers take
/// `&impl Clock` (Design Notes §9).
pub struct AiSessionRunner<D, C> {
    daemon: Arc<D>,
    clock: C,
}

impl<D, C> AiSessionRunner<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub fn new(daemon: Arc<D>, clock: C) -> Self {
        Self { daemon, clock }
    }

    /// Run `prompt` against `repo_path`'s daemon, recording the session in
    /// `store` and appending its events to `event_log`. Follows §4.5 steps
    /// 1-8 in order.
    pub async fn run(
        &self,
        repo_path: &Path,
        store: &Store,
        event_log: &dyn EventSink,
        purpose: Purpose,
        prompt: &str,
    ) -> Result<RunOutcome, AiSessionError> {
        let handle = self.daemon.locate(repo_path).await?;

        let started_at = self.clock.epoch_ms();
        let session_id = SessionId::generate(&[prompt, &rfc3339_nanos(started_at)]);
        store.create_session(session_id, purpose, started_at)?;

        let correlation = Some(session_id.to_string());
        event_log.append(Event::OpencodeStart { purpose }, correlation.clone())?;

        let mut process = self.daemon.spawn(&handle, prompt).await?;
        let mut interpreter = Interpreter::new(Some(repo_path.to_path_buf()));
        let mut stdout = String::new();
        let mut transcript_lines = Vec::new();

        while let Some(line) = process.next_line().await {
            for rendering in interpreter.handle_line(&line) {
                transcript_lines.push(render_text(rendering));
            }
            let raw = raw_value(&line);
            event_log.append(
                Event::Passthrough { original_name: passthrough_name(&raw), raw },
                correlation.clone(),
            )?;
            stdout.push_str(&line);
            stdout.push('\n');
        }

        let exit = process.wait().await;
        let finished_at = self.clock.epoch_ms();
        store.finish_session(session_id, exit.code, finished_at)?;

        if !transcript_lines.is_empty() {
            event_log.append(
                Event::Transcript { purpose, transcript: transcript_lines.join("\n") },
                correlation.clone(),
            )?;
        }
        event_log.append(
            Event::OpencodeEnd { purpose, session_id: session_id.to_string(), exit_code: exit.code },
            correlation,
        )?;

        Ok(RunOutcome {
            session_id,
            exit_code: exit.code,
            stdout,
            stderr: exit.stderr,
            serve_cmd: handle.serve_cmd,
            run_cmd: handle.run_cmd,
        })
    }
}

fn render_text(rendering: Rendering) -> String {
    match rendering {
        Rendering::Prompt(text) => text,
        Rendering::Thinking(text) => text,
        Rendering::Response(text) => text,
        Rendering::ToolStart(line) => line,
        Rendering::ToolEnd(line) => line,
    }
}

fn raw_value(line: &str) -> serde_json::Value {
    serde_json::from_str(line).unwrap_or_else(|_| serde_json::Value::String(line.to_string()))
}

fn passthrough_name(raw: &serde_json::Value) -> String {
    raw.get("type").and_then(|t| t.as_str()).map(str::to_string).unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
