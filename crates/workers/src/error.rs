// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage Worker errors (§4.3, §7). Lookup/validation failures from the
//! collaborators are passed through verbatim; everything the workers
//! themselves detect carries the contextual diagnosis §7 asks for
//! (session id, prompt name, before/after commit ids, restore outcome).

use incrementum_ai_session::AiSessionError;
use incrementum_collab::{
    ConfigError, EventSinkError, SourceError, TestRunError, TranscriptError, VcsError,
};
use incrementum_core::{CommitId, JobId};
use incrementum_feedback::FeedbackError;
use incrementum_prompts::PromptError;
use incrementum_state::StateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Vcs(#[from] VcsError),
    #[error(transparent)]
    TestRun(#[from] TestRunError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    EventSink(#[from] EventSinkError),
    #[error(transparent)]
    AiSession(#[from] AiSessionError),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(
        "commit message file missing at {path} after implement produced a change \
         (session {session_id}, pre-commit {pre}, post-commit {post}, restored: {restored})"
    )]
    MissingCommitMessageFile { path: String, session_id: String, pre: CommitId, post: CommitId, restored: bool },

    #[error("job {0} reached the committing stage with no draft commit message recorded")]
    MissingDraftMessage(JobId),

    #[error(
        "AI session {session_id} exited {exit_code} after the retry budget was spent \
         (prompt {prompt_name}, pre-commit {pre}, post-commit {post:?}, restored: {restored}, stderr: {stderr})"
    )]
    AiSessionFailed {
        session_id: String,
        exit_code: i32,
        prompt_name: String,
        pre: CommitId,
        post: Option<CommitId>,
        restored: bool,
        stderr: String,
    },

    #[error("reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}
