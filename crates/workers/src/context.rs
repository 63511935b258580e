// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Stage Workers' shared collaborator bundle (§4.3's "common contract":
//! workspace path, commit lookup, test runner, AI runner, event log,
//! source store, prompts, transcripts).

use incrementum_ai_session::AiSessionRunner;
use incrementum_collab::{DaemonClient, PromptSource, SourceItem, SourceStore, TestRunner, TranscriptSource, Vcs};
use incrementum_core::{Clock, Job};
use incrementum_state::Store;
use std::sync::Arc;

/// Read-then-deleted on each implement iteration; re-written by the AI on
/// every run (§4.5 Shared-resource policy).
pub const COMMIT_MESSAGE_FILE: &str = ".incrementum-commit-message";

/// Read-then-deleted at the start of implement (stale) and after review
/// produces a verdict (§4.5 Shared-resource policy, §4.6).
pub const FEEDBACK_FILE: &str = ".incrementum-feedback";

/// Collaborators every Stage Worker needs (§4.3). One instance is shared
/// across a job's whole run; `D`/`C` mirror [`AiSessionRunner`]'s daemon
/// and clock type parameters.
pub struct StageWorkers<D, C> {
    pub(crate) vcs: Arc<dyn Vcs>,
    pub(crate) test_runner: Arc<dyn TestRunner>,
    pub(crate) source_store: Arc<dyn SourceStore>,
    pub(crate) transcripts: Arc<dyn TranscriptSource>,
    pub(crate) prompts: Arc<dyn PromptSource>,
    pub(crate) ai: AiSessionRunner<D, C>,
    pub(crate) store: Arc<Store>,
    pub(crate) clock: C,
}

impl<D, C> StageWorkers<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vcs: Arc<dyn Vcs>,
        test_runner: Arc<dyn TestRunner>,
        source_store: Arc<dyn SourceStore>,
        transcripts: Arc<dyn TranscriptSource>,
        prompts: Arc<dyn PromptSource>,
        daemon: Arc<D>,
        store: Arc<Store>,
        clock: C,
    ) -> Self {
        let ai = AiSessionRunner::new(daemon, clock.clone());
        Self { vcs, test_runner, source_store, transcripts, prompts, ai, store, clock }
    }

    /// The job record store, for callers (the Stage Pipeline) that need to
    /// write stage transitions between worker calls.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The clock, for callers that need timestamps between worker calls.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The todo/habit store, for callers that centralize the "reopen on
    /// failure, finish on completion" bookkeeping (§4.2 invariants).
    pub fn source_store(&self) -> &dyn SourceStore {
        self.source_store.as_ref()
    }
}

/// Render a source item into the "source item" prompt variable (§4.7).
pub(crate) fn render_source_item(item: &SourceItem) -> String {
    match item {
        SourceItem::Todo { id, title, kind, priority, description } => format!(
            "Todo {id}: {title}\nType: {kind}\nPriority: {priority}\nDescription:\n{description}"
        ),
        SourceItem::Habit { name, instructions } => {
            format!("Habit '{name}':\n{instructions}")
        }
    }
}

/// Render the job's commit history (one commit id + draft message per
/// line) into the "commit log" prompt variable (§4.7).
pub(crate) fn render_commit_log(job: &Job) -> String {
    job.changes
        .iter()
        .flat_map(|change| change.commits.iter())
        .map(|commit| format!("{}: {}", commit.id, commit.draft_message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the "prior transcripts" prompt variable: every session this job
/// has already run, in order, skipping any the transcript store can no
/// longer produce.
pub(crate) fn render_prior_transcripts(job: &Job, transcripts: &dyn TranscriptSource) -> String {
    job.sessions
        .iter()
        .filter_map(|session| transcripts.transcript(&session.id).ok())
        .collect::<Vec<_>>()
        .join("\n\n")
}
