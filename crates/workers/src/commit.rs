// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Commit stage worker (§4.3.4).

use crate::commit_message::format_final_commit_message;
use crate::context::StageWorkers;
use crate::error::WorkerError;
use incrementum_collab::{diff_stat_has_changes, DaemonClient};
use incrementum_core::{Clock, CommitMessageLabel, Event, Job, Stage};
use incrementum_state::UpdateOptions;
use std::path::Path;

/// Outcome of one commit iteration (§4.3.4 steps 2, 6, 7).
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub job: Job,
    /// `None` when the diff was empty and nothing was committed.
    pub commit_id: Option<incrementum_core::CommitId>,
}

impl CommitOutcome {
    /// An empty diff means nothing was committed, so the job just goes
    /// back to implementing (§4.3.4 step 2). A real commit on an active
    /// (todo) job falls through to a project-scope review next; habits
    /// are already terminal by the time this returns (§4.2 step 5).
    pub fn next_stage(&self) -> Option<Stage> {
        if !self.job.is_active() {
            return None;
        }
        if self.commit_id.is_none() {
            Some(Stage::Implementing)
        } else {
            Some(Stage::Reviewing)
        }
    }
}

impl<D, C> StageWorkers<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub async fn commit(
        &self,
        job: &Job,
        workspace: &Path,
        review_comments: &str,
        event_log: &dyn incrementum_collab::EventSink,
    ) -> Result<CommitOutcome, WorkerError> {
        self.vcs.update_stale(workspace)?;

        let change = job.last_change().ok_or_else(|| WorkerError::MissingDraftMessage(job.id))?;
        let parent = self.vcs.commit_id_at(workspace, &change.id)?;
        let new_commit_id = self.vcs.current_commit_id(workspace)?;
        let stat = self.vcs.diff_stat(workspace, &parent, &new_commit_id)?;

        if !diff_stat_has_changes(&stat) {
            let job = self.store.find(&job.repo, job.id.as_str())?;
            return Ok(CommitOutcome { job, commit_id: None });
        }

        let draft_message = job
            .current_commit()
            .map(|c| c.draft_message.clone())
            .filter(|m| !m.trim().is_empty())
            .ok_or(WorkerError::MissingDraftMessage(job.id))?;

        let source_item = self.source_store.find(&job.source_id)?;
        let (summary, body) = crate::commit_message::parse_commit_message_file(&draft_message);
        let final_message = format_final_commit_message(&summary, &body, &source_item, review_comments);

        event_log.append(
            Event::CommitMessage {
                label: CommitMessageLabel::Final,
                message: final_message.clone(),
                preformatted: Some(true),
            },
            None,
        )?;

        let committed_id = self.vcs.commit(workspace, &final_message)?;

        let now = self.clock.epoch_ms();
        let job = self.store.finalize_current_commit(&job.repo, job.id.as_str(), committed_id.clone(), now)?;
        let job = self.store.seal_current_change(&job.repo, job.id.as_str(), now)?;

        let job = if source_item.is_habit() {
            self.source_store.create_artifact(&job.source_id, &final_message)?;
            self.store.update(
                &job.repo,
                job.id.as_str(),
                UpdateOptions { status: Some(incrementum_core::Status::Completed), ..Default::default() },
                now,
            )?
        } else {
            job
        };

        Ok(CommitOutcome { job, commit_id: Some(committed_id) })
    }
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
