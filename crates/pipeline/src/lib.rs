// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Stage Pipeline (§4.2): the job-level state machine that sequences
//! the implement/test/review/commit stage workers for either a todo or a
//! habit job, writing each stage transition to the State Manager and the
//! Event Log before the worker for the new stage begins.

pub mod error;

pub use error::PipelineError;

use incrementum_collab::{Config, DaemonClient, EventSink};
use incrementum_core::{Clock, Event, Job, Stage, Status};
use incrementum_state::UpdateOptions;
use incrementum_workers::{ReviewScope, StageWorkers};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a completed run produced. `no_op` is set when a habit job reached
/// `completed` without ever producing a change (§4.2 Habit jobs) — the
/// job's own status is still `completed`, this just tells the caller no
/// work actually happened.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub job: Job,
    pub no_op: bool,
}

/// One step of the dispatch loop. `Review` carries which scope the next
/// review call judges — step scope arrives from testing, project scope
/// arrives from committing, and the pipeline is the only component that
/// knows which edge it took to get there.
#[derive(Debug, Clone, Copy)]
enum Step {
    Implement,
    Test,
    Review(ReviewScope),
    Commit,
}

impl Step {
    fn stage(self) -> Stage {
        match self {
            Step::Implement => Stage::Implementing,
            Step::Test => Stage::Testing,
            Step::Review(_) => Stage::Reviewing,
            Step::Commit => Stage::Committing,
        }
    }
}

/// Drives one job through its stage loop to a terminal status. Wraps the
/// same [`StageWorkers`] bundle the workers share; `D`/`C` mirror its
/// daemon and clock type parameters.
pub struct Pipeline<D, C> {
    workers: Arc<StageWorkers<D, C>>,
}

impl<D, C> Pipeline<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub fn new(workers: Arc<StageWorkers<D, C>>) -> Self {
        Self { workers }
    }

    /// Run `job` to a terminal status (`completed`, `failed`, or
    /// `abandoned`), or until `cancel` fires. `cancel` is the caller's own
    /// interrupt channel (§5); pass a token that is never cancelled to run
    /// to completion unconditionally.
    pub async fn run(
        &self,
        mut job: Job,
        workspace: &Path,
        config: &Config,
        event_log: &dyn EventSink,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut step = Step::Implement;

        loop {
            if !job.is_active() {
                return Ok(PipelineOutcome { job, no_op: false });
            }
            if cancel.is_cancelled() {
                return Err(self.fail_and_join(&job, PipelineError::Interrupted(job.id)));
            }

            job = self.enter_stage(&job, step.stage(), event_log)?;

            let outcome = tokio::select! {
                result = self.dispatch(step, &job, workspace, config, event_log) => result,
                _ = cancel.cancelled() => {
                    return Err(self.fail_and_join(&job, PipelineError::Interrupted(job.id)));
                }
            };

            let (next_job, next_step, no_op) = match outcome {
                Ok(dispatched) => dispatched,
                Err(err) => return Err(self.fail_and_join(&job, err)),
            };
            job = next_job;

            match next_step {
                Some(step_for_next) => step = step_for_next,
                None => return Ok(PipelineOutcome { job, no_op }),
            }
        }
    }

    /// Write the stage transition and its event before the worker for the
    /// new stage begins (§4.2 Dispatch, §5 ordering guarantee).
    fn enter_stage(&self, job: &Job, stage: Stage, event_log: &dyn EventSink) -> Result<Job, PipelineError> {
        let now = self.workers.clock().epoch_ms();
        let job = self.workers.store().update(
            &job.repo,
            job.id.as_str(),
            UpdateOptions { stage: Some(stage), ..Default::default() },
            now,
        )?;
        event_log.append(Event::Stage { stage }, None)?;
        tracing::info!(job_id = %job.id, %stage, "stage transition");
        Ok(job)
    }

    #[allow(clippy::too_many_lines)]
    async fn dispatch(
        &self,
        step: Step,
        job: &Job,
        workspace: &Path,
        config: &Config,
        event_log: &dyn EventSink,
    ) -> Result<(Job, Option<Step>, bool), PipelineError> {
        match step {
            Step::Implement => {
                let outcome = self.workers.implement(job, workspace, event_log).await?;
                if !outcome.changed && outcome.job.is_habit() {
                    let job = self.complete(&outcome.job)?;
                    return Ok((job, None, true));
                }
                let next = match outcome.next_stage() {
                    Stage::Testing => Step::Test,
                    Stage::Reviewing => Step::Review(ReviewScope::Step),
                    other => unreachable!("implement never dispatches to {other}"),
                };
                Ok((outcome.job, Some(next), false))
            }
            Step::Test => {
                let outcome = self.workers.test(job, workspace, config, event_log)?;
                let next = match outcome.next_stage() {
                    Stage::Reviewing => Step::Review(ReviewScope::Step),
                    Stage::Implementing => Step::Implement,
                    other => unreachable!("test never dispatches to {other}"),
                };
                Ok((outcome.job, Some(next), false))
            }
            Step::Review(scope) => {
                let outcome = self.workers.review(job, workspace, scope, event_log).await?;
                if outcome.abandoned {
                    self.reopen(&outcome.job, "abandoned by review")?;
                    return Ok((outcome.job, None, false));
                }
                match outcome.next_stage() {
                    Some(Stage::Committing) => Ok((outcome.job, Some(Step::Commit), false)),
                    Some(Stage::Implementing) => Ok((outcome.job, Some(Step::Implement), false)),
                    None => {
                        self.finish(&outcome.job)?;
                        Ok((outcome.job, None, false))
                    }
                    Some(other) => unreachable!("review never dispatches to {other}"),
                }
            }
            Step::Commit => {
                let review_comments = job
                    .current_commit()
                    .and_then(|commit| commit.review.as_ref())
                    .map(|review| review.comments.clone())
                    .unwrap_or_default();
                let outcome = self.workers.commit(job, workspace, &review_comments, event_log).await?;
                if !outcome.job.is_active() {
                    self.finish(&outcome.job)?;
                    return Ok((outcome.job, None, false));
                }
                let next = match outcome.next_stage() {
                    Some(Stage::Implementing) => Step::Implement,
                    Some(Stage::Reviewing) => Step::Review(ReviewScope::Project),
                    other => unreachable!("commit never dispatches to {other:?}"),
                };
                Ok((outcome.job, Some(next), false))
            }
        }
    }

    /// Mark `job` failed and reopen its source. The source is always
    /// reopened, even when the terminal status write itself errors; the
    /// two failures are joined rather than one silently discarding the
    /// other (§7).
    fn fail(&self, job: &Job) -> Result<Job, PipelineError> {
        let now = self.workers.clock().epoch_ms();
        let update_result = self
            .workers
            .store()
            .update(&job.repo, job.id.as_str(), UpdateOptions { status: Some(Status::Failed), ..Default::default() }, now)
            .map_err(PipelineError::from);

        let reopen_target = match &update_result {
            Ok(updated) => updated,
            Err(_) => job,
        };
        let reopen_result = self.reopen(reopen_target, "job failed");

        match (update_result, reopen_result) {
            (Ok(updated), Ok(())) => Ok(updated),
            (Ok(_), Err(reopen_err)) => Err(reopen_err),
            (Err(update_err), Ok(())) => Err(update_err),
            (Err(update_err), Err(reopen_err)) => {
                Err(PipelineError::Aggregate { primary: Box::new(update_err), secondary: Box::new(reopen_err) })
            }
        }
    }

    /// Fail `job`, joining `primary` (the worker error or interruption that
    /// triggered the failure) with any error `fail` itself raises, instead
    /// of letting one silently discard the other.
    fn fail_and_join(&self, job: &Job, primary: PipelineError) -> PipelineError {
        match self.fail(job) {
            Ok(_) => primary,
            Err(fail_err) => PipelineError::Aggregate { primary: Box::new(primary), secondary: Box::new(fail_err) },
        }
    }

    fn complete(&self, job: &Job) -> Result<Job, PipelineError> {
        let now = self.workers.clock().epoch_ms();
        let job = self.workers.store().update(
            &job.repo,
            job.id.as_str(),
            UpdateOptions { status: Some(Status::Completed), ..Default::default() },
            now,
        )?;
        self.finish(&job)?;
        Ok(job)
    }

    fn reopen(&self, job: &Job, reason: &str) -> Result<(), PipelineError> {
        self.workers.source_store().reopen(&job.source_id, reason)?;
        Ok(())
    }

    fn finish(&self, job: &Job) -> Result<(), PipelineError> {
        self.workers.source_store().finish(&job.source_id)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
