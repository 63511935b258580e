// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log payload types.
//!
//! `Event` is what the Event Log (`incrementum-eventlog`) serializes one
//! per line. The log itself has no schema of its own — each variant here
//! defines the shape for one `name` (§6). Unlike the wider system-event
//! enum this is modeled on, a passthrough variant carries the AI daemon's
//! raw event verbatim rather than trying to typecheck a protocol we don't
//! own (§1 Non-goals: the AI subprocess's streaming event protocol is a
//! contract boundary, not something we parse exhaustively here).

use crate::job::{CommitId, Purpose, ReviewOutcome, Stage};
use serde::{Deserialize, Serialize};

/// Result of running one configured test command (§4.3.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCommandResult {
    pub command: String,
    pub exit_code: i32,
}

/// One line of the per-job event log. `name` identifies which payload
/// shape `data` holds (§6); `id` is an optional caller-supplied
/// correlation id (e.g. the session id a `prompt`/`transcript` pair shares).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// The payload, pre-serialized to a JSON string (the log itself has no
    /// schema — see module docs).
    pub data: String,
}

/// Typed event payloads, one per `name` in §6's table. Convert to/from
/// [`LogLine`] via [`Event::name`] / [`Event::into_log_line`] /
/// [`Event::from_log_line`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum Event {
    #[serde(rename = "job.stage")]
    Stage { stage: Stage },

    #[serde(rename = "job.prompt")]
    Prompt { purpose: Purpose, template: String, prompt: String },

    #[serde(rename = "job.transcript")]
    Transcript { purpose: Purpose, transcript: String },

    #[serde(rename = "job.commit_message")]
    CommitMessage { label: CommitMessageLabel, message: String, preformatted: Option<bool> },

    #[serde(rename = "job.review")]
    Review { purpose: Purpose, outcome: ReviewOutcome, details: Option<String> },

    #[serde(rename = "job.tests")]
    Tests { results: Vec<TestCommandResult> },

    #[serde(rename = "job.opencode.start")]
    OpencodeStart { purpose: Purpose },

    #[serde(rename = "job.opencode.end")]
    OpencodeEnd { purpose: Purpose, session_id: String, exit_code: i32 },

    /// A full diagnosis of a failed AI session, logged immediately before
    /// the stage fails once its retry budget is spent (§4.3.1 step 6).
    #[serde(rename = "job.opencode.error")]
    OpencodeError {
        session_id: String,
        exit_code: i32,
        prompt_name: String,
        pre: CommitId,
        post: Option<CommitId>,
        restored: bool,
        stderr: String,
    },

    /// Raw daemon event, name copied verbatim from the upstream stream.
    #[serde(rename = "passthrough")]
    Passthrough { original_name: String, raw: serde_json::Value },
}

/// Which draft a `commit_message` event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMessageLabel {
    Draft,
    Final,
}

impl Event {
    /// The wire `name` this event serializes as (§6's table, left column).
    pub fn name(&self) -> &'static str {
        match self {
            Event::Stage { .. } => "job.stage",
            Event::Prompt { .. } => "job.prompt",
            Event::Transcript { .. } => "job.transcript",
            Event::CommitMessage { .. } => "job.commit_message",
            Event::Review { .. } => "job.review",
            Event::Tests { .. } => "job.tests",
            Event::OpencodeStart { .. } => "job.opencode.start",
            Event::OpencodeEnd { .. } => "job.opencode.end",
            Event::OpencodeError { .. } => "job.opencode.error",
            Event::Passthrough { original_name, .. } => {
                // Leaked 'static via Box::leak would be wasteful here; callers that
                // need the exact passthrough name use `original_name` directly.
                let _ = original_name;
                "passthrough"
            }
        }
    }

    /// Render this event as a `LogLine` ready to append to the event log.
    pub fn into_log_line(self, id: Option<String>) -> Result<LogLine, serde_json::Error> {
        let name = match &self {
            Event::Passthrough { original_name, .. } => original_name.clone(),
            other => other.name().to_string(),
        };
        let data = self.into_data_json()?;
        Ok(LogLine { id, name, data })
    }

    /// Reconstruct an `Event` from a log line. Lines whose `name` does not
    /// match one of the known shapes above become `Passthrough`, preserving
    /// the raw payload and original name verbatim.
    pub fn from_log_line(line: &LogLine) -> Result<Event, serde_json::Error> {
        let raw: serde_json::Value = serde_json::from_str(&line.data)?;
        let event = match line.name.as_str() {
            "job.stage" => serde_json::from_value(raw).map(|stage| Event::Stage { stage })?,
            "job.prompt" => {
                #[derive(Deserialize)]
                struct P {
                    purpose: Purpose,
                    template: String,
                    prompt: String,
                }
                let p: P = serde_json::from_value(raw)?;
                Event::Prompt { purpose: p.purpose, template: p.template, prompt: p.prompt }
            }
            "job.transcript" => {
                #[derive(Deserialize)]
                struct T {
                    purpose: Purpose,
                    transcript: String,
                }
                let t: T = serde_json::from_value(raw)?;
                Event::Transcript { purpose: t.purpose, transcript: t.transcript }
            }
            "job.commit_message" => {
                #[derive(Deserialize)]
                struct C {
                    label: CommitMessageLabel,
                    message: String,
                    preformatted: Option<bool>,
                }
                let c: C = serde_json::from_value(raw)?;
                Event::CommitMessage { label: c.label, message: c.message, preformatted: c.preformatted }
            }
            "job.review" => {
                #[derive(Deserialize)]
                struct R {
                    purpose: Purpose,
                    outcome: ReviewOutcome,
                    details: Option<String>,
                }
                let r: R = serde_json::from_value(raw)?;
                Event::Review { purpose: r.purpose, outcome: r.outcome, details: r.details }
            }
            "job.tests" => {
                #[derive(Deserialize)]
                struct T {
                    results: Vec<TestCommandResult>,
                }
                let t: T = serde_json::from_value(raw)?;
                Event::Tests { results: t.results }
            }
            "job.opencode.start" => {
                #[derive(Deserialize)]
                struct S {
                    purpose: Purpose,
                }
                let s: S = serde_json::from_value(raw)?;
                Event::OpencodeStart { purpose: s.purpose }
            }
            "job.opencode.end" => {
                #[derive(Deserialize)]
                struct E {
                    purpose: Purpose,
                    session_id: String,
                    exit_code: i32,
                }
                let e: E = serde_json::from_value(raw)?;
                Event::OpencodeEnd { purpose: e.purpose, session_id: e.session_id, exit_code: e.exit_code }
            }
            "job.opencode.error" => {
                #[derive(Deserialize)]
                struct E {
                    session_id: String,
                    exit_code: i32,
                    prompt_name: String,
                    pre: CommitId,
                    post: Option<CommitId>,
                    restored: bool,
                    stderr: String,
                }
                let e: E = serde_json::from_value(raw)?;
                Event::OpencodeError {
                    session_id: e.session_id,
                    exit_code: e.exit_code,
                    prompt_name: e.prompt_name,
                    pre: e.pre,
                    post: e.post,
                    restored: e.restored,
                    stderr: e.stderr,
                }
            }
            other => Event::Passthrough { original_name: other.to_string(), raw },
        };
        Ok(event)
    }

    fn into_data_json(self) -> Result<String, serde_json::Error> {
        // Re-serialize just the payload (without the {"name":...,"data":...}
        // envelope serde's `tag`/`content` representation would otherwise add),
        // matching §6's "data is itself a JSON document encoded as a string".
        #[derive(Serialize)]
        #[serde(untagged)]
        enum Payload {
            Stage { stage: Stage },
            Prompt { purpose: Purpose, template: String, prompt: String },
            Transcript { purpose: Purpose, transcript: String },
            CommitMessage { label: CommitMessageLabel, message: String, preformatted: Option<bool> },
            Review { purpose: Purpose, outcome: ReviewOutcome, details: Option<String> },
            Tests { results: Vec<TestCommandResult> },
            OpencodeStart { purpose: Purpose },
            OpencodeEnd { purpose: Purpose, session_id: String, exit_code: i32 },
            OpencodeError {
                session_id: String,
                exit_code: i32,
                prompt_name: String,
                pre: CommitId,
                post: Option<CommitId>,
                restored: bool,
                stderr: String,
            },
            Passthrough(serde_json::Value),
        }

        let payload = match self {
            Event::Stage { stage } => Payload::Stage { stage },
            Event::Prompt { purpose, template, prompt } => {
                Payload::Prompt { purpose, template, prompt }
            }
            Event::Transcript { purpose, transcript } => Payload::Transcript { purpose, transcript },
            Event::CommitMessage { label, message, preformatted } => {
                Payload::CommitMessage { label, message, preformatted }
            }
            Event::Review { purpose, outcome, details } => Payload::Review { purpose, outcome, details },
            Event::Tests { results } => Payload::Tests { results },
            Event::OpencodeStart { purpose } => Payload::OpencodeStart { purpose },
            Event::OpencodeEnd { purpose, session_id, exit_code } => {
                Payload::OpencodeEnd { purpose, session_id, exit_code }
            }
            Event::OpencodeError { session_id, exit_code, prompt_name, pre, post, restored, stderr } => {
                Payload::OpencodeError { session_id, exit_code, prompt_name, pre, post, restored, stderr }
            }
            Event::Passthrough { raw, .. } => Payload::Passthrough(raw),
        };
        serde_json::to_string(&payload)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
