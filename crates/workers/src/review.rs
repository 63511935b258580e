// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Review stage worker (§4.3.3): step scope reviews the most recent
//! commit, project scope reviews the whole job once implement/test/review
//! have cycled to completion.

use crate::context::{render_commit_log, render_prior_transcripts, render_source_item, StageWorkers, FEEDBACK_FILE};
use crate::error::WorkerError;
use incrementum_collab::{DaemonClient, EventSink};
use incrementum_core::{Clock, Job, Purpose, Review, ReviewOutcome, Stage, Status};
use incrementum_prompts::{render_prompt, PromptVars, TemplateName};
use incrementum_state::UpdateOptions;
use std::path::Path;

/// Which commit(s) a review call is judging (§4.3.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewScope {
    Step,
    Project,
}

/// Outcome of one review iteration. `abandoned` is carried as data rather
/// than an error — the worker itself already wrote the terminal status
/// (§4.3.3 step 7), so there is nothing exceptional left for the caller to
/// recover from.
#[derive(Debug, Clone)]
pub struct ReviewOutcomeResult {
    pub job: Job,
    pub verdict: ReviewOutcome,
    pub abandoned: bool,
}

impl ReviewOutcomeResult {
    /// The stage the pipeline should dispatch next. Only meaningful when
    /// `self.job.is_active()` — a project-scope accept or an abandon
    /// verdict leaves the job in a terminal status instead.
    pub fn next_stage(&self) -> Option<Stage> {
        if !self.job.is_active() {
            return None;
        }
        match self.verdict {
            ReviewOutcome::Accept => Some(Stage::Committing),
            ReviewOutcome::RequestChanges => Some(Stage::Implementing),
            ReviewOutcome::Abandon => None,
        }
    }
}

impl<D, C> StageWorkers<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub async fn review(
        &self,
        job: &Job,
        workspace: &Path,
        scope: ReviewScope,
        event_log: &dyn EventSink,
    ) -> Result<ReviewOutcomeResult, WorkerError> {
        self.vcs.update_stale(workspace)?;
        let feedback_path = workspace.join(FEEDBACK_FILE);
        remove_if_present(&feedback_path)?;

        let draft_message = self.resolve_draft_message(job, workspace)?;

        let source_item = self.source_store.find(&job.source_id)?;
        let template = match scope {
            ReviewScope::Step => TemplateName::ReviewStep,
            ReviewScope::Project => TemplateName::ReviewProject,
        };
        let source_item_text = render_source_item(&source_item);
        let vars = PromptVars {
            source_item: source_item_text.clone(),
            feedback: job.feedback.clone(),
            prior_message: draft_message.clone(),
            commit_log: render_commit_log(job),
            prior_transcripts: render_prior_transcripts(job, self.transcripts.as_ref()),
            workspace_path: workspace.display().to_string(),
            review_instructions: String::new(),
            todo_block: source_item_text,
            feedback_block: job.feedback.clone(),
            commit_message_block: draft_message,
        };
        let prompt = render_prompt(self.prompts.as_ref(), workspace, template, &vars)?;

        let purpose = match scope {
            ReviewScope::Step => Purpose::Review,
            ReviewScope::Project => Purpose::ProjectReview,
        };
        event_log.append(
            incrementum_core::Event::Prompt { purpose, template: template.file_name().to_string(), prompt: prompt.clone() },
            None,
        )?;

        let outcome = self.ai.run(workspace, &self.store, event_log, purpose, &prompt).await?;
        if outcome.exit_code != 0 {
            return Err(WorkerError::AiSessionFailed {
                session_id: outcome.session_id.to_string(),
                exit_code: outcome.exit_code,
                prompt_name: template.file_name().to_string(),
                pre: self.vcs.current_commit_id(workspace)?,
                post: None,
                restored: false,
                stderr: outcome.stderr,
            });
        }

        self.store.update(
            &job.repo,
            job.id.as_str(),
            UpdateOptions { push_session: Some((purpose, outcome.session_id)), ..Default::default() },
            self.clock.epoch_ms(),
        )?;

        let feedback = incrementum_feedback::read_and_consume(&feedback_path)?;

        event_log.append(
            incrementum_core::Event::Review {
                purpose,
                outcome: feedback.outcome,
                details: if feedback.details.is_empty() { None } else { Some(feedback.details.clone()) },
            },
            None,
        )?;

        self.apply_verdict(job, scope, feedback.outcome, feedback.details, outcome.session_id)
    }

    fn resolve_draft_message(&self, job: &Job, workspace: &Path) -> Result<String, WorkerError> {
        if let Some(commit) = job.current_commit() {
            if !commit.draft_message.trim().is_empty() {
                return Ok(commit.draft_message.clone());
            }
        }
        let path = workspace.join(crate::context::COMMIT_MESSAGE_FILE);
        std::fs::read_to_string(&path)
            .map(|text| text.trim().to_string())
            .map_err(|_| WorkerError::MissingDraftMessage(job.id))
    }

    fn apply_verdict(
        &self,
        job: &Job,
        scope: ReviewScope,
        outcome: ReviewOutcome,
        details: String,
        reviewer_session_id: incrementum_core::SessionId,
    ) -> Result<ReviewOutcomeResult, WorkerError> {
        let now = self.clock.epoch_ms();
        let review = Review { outcome, comments: details.clone(), reviewer_session_id, reviewed_at: now };

        match (scope, outcome) {
            (ReviewScope::Step, ReviewOutcome::Accept) => {
                self.store.update_current_commit(&job.repo, job.id.as_str(), None, Some(review), now)?;
                let job = self.store.update(
                    &job.repo,
                    job.id.as_str(),
                    UpdateOptions { feedback: Some(String::new()), ..Default::default() },
                    now,
                )?;
                Ok(ReviewOutcomeResult { job, verdict: outcome, abandoned: false })
            }
            (ReviewScope::Project, ReviewOutcome::Accept) => {
                let job = self.store.set_project_review(&job.repo, job.id.as_str(), review, now)?;
                let job = self.store.update(
                    &job.repo,
                    job.id.as_str(),
                    UpdateOptions { status: Some(Status::Completed), ..Default::default() },
                    now,
                )?;
                Ok(ReviewOutcomeResult { job, verdict: outcome, abandoned: false })
            }
            (_, ReviewOutcome::RequestChanges) => {
                let job = self.store.update(
                    &job.repo,
                    job.id.as_str(),
                    UpdateOptions { feedback: Some(details), ..Default::default() },
                    now,
                )?;
                Ok(ReviewOutcomeResult { job, verdict: outcome, abandoned: false })
            }
            (_, ReviewOutcome::Abandon) => {
                let job = self.store.update(
                    &job.repo,
                    job.id.as_str(),
                    UpdateOptions { status: Some(Status::Abandoned), ..Default::default() },
                    now,
                )?;
                Ok(ReviewOutcomeResult { job, verdict: outcome, abandoned: true })
            }
        }
    }
}

fn remove_if_present(path: &Path) -> Result<(), WorkerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkerError::Io { path: path.display().to_string(), source }),
    }
}

#[cfg(test)]
#[path = "review_tests.rs"]
mod tests;
