// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Test stage worker (§4.3.2).

use crate::context::StageWorkers;
use crate::error::WorkerError;
use incrementum_collab::{Config, DaemonClient};
use incrementum_core::{Clock, Event, Job, Stage};
use std::path::Path;

/// Outcome of one test iteration (§4.3.2 step 4).
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub job: Job,
    pub passed: bool,
}

impl TestOutcome {
    pub fn next_stage(&self) -> Stage {
        if self.passed {
            Stage::Reviewing
        } else {
            Stage::Implementing
        }
    }
}

impl<D, C> StageWorkers<D, C>
where
    D: DaemonClient,
    C: Clock,
{
    pub fn test(
        &self,
        job: &Job,
        workspace: &Path,
        config: &Config,
        event_log: &dyn incrementum_collab::EventSink,
    ) -> Result<TestOutcome, WorkerError> {
        let commands = config.require_test_commands()?;
        let results = self.test_runner.run_all(workspace, commands)?;

        event_log.append(Event::Tests { results: results.results.clone() }, None)?;

        let passed = results.all_passed();
        let now = self.clock.epoch_ms();

        let feedback = if passed { String::new() } else { summarize(&results) };
        self.store.update_current_commit(&job.repo, job.id.as_str(), Some(passed), None, now)?;
        let job = self.store.update(
            &job.repo,
            job.id.as_str(),
            incrementum_state::UpdateOptions { feedback: Some(feedback), ..Default::default() },
            now,
        )?;

        Ok(TestOutcome { job, passed })
    }
}

/// A bulleted human summary of passing/failing commands (§4.3.2 step 4).
fn summarize(outcome: &incrementum_collab::TestOutcome) -> String {
    outcome
        .results
        .iter()
        .map(|r| format!("- {} is {}", r.command, if r.exit_code == 0 { "passing" } else { "failing" }))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "testing_tests.rs"]
mod tests;
