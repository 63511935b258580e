// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Implement stage worker (§4.3.1).

use crate::context::{
    render_commit_log, render_prior_transcripts, render_source_item, StageWorkers, COMMIT_MESSAGE_FILE,
    FEEDBACK_FILE,
};
use crate::error::WorkerError;
use incrementum_ai_session::RunOutcome;
use incrementum_collab::{DaemonClient, EventSink, SourceItem};
use incrementum_core::{Clock, CommitId, CommitMessageLabel, Event, Job, Purpose, Stage};
use incrementum_prompts::{render_prompt, PromptVars, TemplateName};
use incrementum_state::UpdateOptions;
use std::path::Path;

/// Outcome of one implement iteration (§4.3.1 steps 7-10).
#[derive(Debug, Clone)]
pub struct ImplementOutcome {
    pub job: Job,
    pub changed: bool,
}

impl ImplementOutcome {
    /// The stage the pipeline should dispatch next: `testing` if the
    /// iteration produced a change, `reviewing` otherwise (there is
    /// nothing for the test worker to exercise).
    pub fn next_stage(&self) -> Stage {
        if self.changed {
            Stage::Testing
        } else {
            Stage::Reviewing
        }
    }
}

impl<D, C> StageWorkers<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub async fn implement(
        &self,
        job: &Job,
        workspace: &Path,
        event_log: &dyn EventSink,
    ) -> Result<ImplementOutcome, WorkerError> {
        self.vcs.update_stale(workspace)?;

        let commit_message_path = workspace.join(COMMIT_MESSAGE_FILE);
        let feedback_path = workspace.join(FEEDBACK_FILE);
        remove_if_present(&feedback_path)?;

        let pre_commit_id = self.vcs.current_commit_id(workspace)?;
        let source_item = self.source_store.find(&job.source_id)?;

        let (template, prompt_vars) = self.implement_prompt_vars(job, workspace, &source_item);
        let prompt = render_prompt(self.prompts.as_ref(), workspace, template, &prompt_vars)?;

        event_log.append(
            Event::Prompt {
                purpose: Purpose::Implement,
                template: template.file_name().to_string(),
                prompt: prompt.clone(),
            },
            None,
        )?;

        let (outcome, restored) =
            self.run_with_restore_retry(workspace, Purpose::Implement, &prompt, &pre_commit_id, event_log).await?;

        self.store.update(
            &job.repo,
            job.id.as_str(),
            UpdateOptions { push_session: Some((Purpose::Implement, outcome.session_id)), ..Default::default() },
            self.clock.epoch_ms(),
        )?;

        if outcome.exit_code != 0 {
            event_log.append(
                Event::OpencodeError {
                    session_id: outcome.session_id.to_string(),
                    exit_code: outcome.exit_code,
                    prompt_name: template.file_name().to_string(),
                    pre: pre_commit_id.clone(),
                    post: None,
                    restored,
                    stderr: outcome.stderr.clone(),
                },
                None,
            )?;
            return Err(WorkerError::AiSessionFailed {
                session_id: outcome.session_id.to_string(),
                exit_code: outcome.exit_code,
                prompt_name: template.file_name().to_string(),
                pre: pre_commit_id,
                post: None,
                restored,
                stderr: outcome.stderr,
            });
        }

        let post_commit_id = self.vcs.current_commit_id(workspace)?;
        let mut changed = post_commit_id != pre_commit_id;
        if changed && self.vcs.current_change_empty(workspace)? {
            changed = false;
        }

        let now = self.clock.epoch_ms();
        let updated_job = if changed {
            self.record_change(
                job,
                workspace,
                &commit_message_path,
                &pre_commit_id,
                &post_commit_id,
                &outcome,
                restored,
                now,
                event_log,
            )?
        } else {
            remove_if_present(&commit_message_path)?;
            self.store.find(&job.repo, job.id.as_str())?
        };

        Ok(ImplementOutcome { job: updated_job, changed })
    }

    #[allow(clippy::too_many_arguments)]
    fn record_change(
        &self,
        job: &Job,
        workspace: &Path,
        commit_message_path: &Path,
        pre_commit_id: &CommitId,
        post_commit_id: &CommitId,
        outcome: &RunOutcome,
        restored: bool,
        now: u64,
        event_log: &dyn EventSink,
    ) -> Result<Job, WorkerError> {
        let message = read_commit_message_file(commit_message_path).map_err(|_| WorkerError::MissingCommitMessageFile {
            path: commit_message_path.display().to_string(),
            session_id: outcome.session_id.to_string(),
            pre: pre_commit_id.clone(),
            post: post_commit_id.clone(),
            restored,
        })?;

        event_log.append(
            Event::CommitMessage { label: CommitMessageLabel::Draft, message: message.clone(), preformatted: Some(false) },
            None,
        )?;

        if job.needs_new_change() {
            let change_id = self.vcs.current_change_id(workspace)?;
            self.store.append_change(&job.repo, job.id.as_str(), change_id, now)?;
        }

        Ok(self.store.append_commit_to_current_change(
            &job.repo,
            job.id.as_str(),
            post_commit_id.clone(),
            message,
            outcome.session_id,
            now,
        )?)
    }

    fn implement_prompt_vars(&self, job: &Job, workspace: &Path, source_item: &SourceItem) -> (TemplateName, PromptVars) {
        let template = if job.feedback.trim().is_empty() { TemplateName::Implement } else { TemplateName::Feedback };
        let source_item_text = render_source_item(source_item);
        let prior_message = job.current_commit().map(|c| c.draft_message.clone()).unwrap_or_default();
        let vars = PromptVars {
            source_item: source_item_text.clone(),
            feedback: job.feedback.clone(),
            prior_message: prior_message.clone(),
            commit_log: render_commit_log(job),
            prior_transcripts: render_prior_transcripts(job, self.transcripts.as_ref()),
            workspace_path: workspace.display().to_string(),
            review_instructions: String::new(),
            todo_block: source_item_text,
            feedback_block: job.feedback.clone(),
            commit_message_block: prior_message,
        };
        (template, vars)
    }

    /// §4.3.1 step 6: run once; if the process was signal-killed and it
    /// produced a change, restore the workspace to `pre_commit_id` and
    /// retry exactly once.
    pub(crate) async fn run_with_restore_retry(
        &self,
        workspace: &Path,
        purpose: Purpose,
        prompt: &str,
        pre_commit_id: &CommitId,
        event_log: &dyn EventSink,
    ) -> Result<(RunOutcome, bool), WorkerError> {
        let outcome = self.ai.run(workspace, &self.store, event_log, purpose, prompt).await?;
        if !outcome.signal_killed() {
            return Ok((outcome, false));
        }
        let post_commit_id = self.vcs.current_commit_id(workspace)?;
        if post_commit_id == *pre_commit_id {
            return Ok((outcome, false));
        }
        self.vcs.restore_workspace(workspace, pre_commit_id)?;
        let retried = self.ai.run(workspace, &self.store, event_log, purpose, prompt).await?;
        Ok((retried, true))
    }
}

fn remove_if_present(path: &Path) -> Result<(), WorkerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkerError::Io { path: path.display().to_string(), source }),
    }
}

fn read_commit_message_file(path: &Path) -> std::io::Result<String> {
    let text = std::fs::read_to_string(path)?;
    std::fs::remove_file(path)?;
    Ok(text.trim().to_string())
}

#[cfg(test)]
#[path = "implement_tests.rs"]
mod tests;
