// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::StageWorkers;
use incrementum_collab::fakes::{
    FakeDaemonClient, FakeEventSink, FakeSourceStore, FakeTestRunner, FakeTranscriptSource, FakeVcs,
};
use incrementum_collab::{AgentExit, DaemonHandle, SourceItem};
use incrementum_core::{FakeClock, Job};
use incrementum_prompts::FilesystemPromptSource;
use incrementum_state::Store;
use std::sync::Arc;

fn harness() -> (
    tempfile::TempDir,
    StageWorkers<FakeDaemonClient, FakeClock>,
    Arc<FakeVcs>,
    Arc<FakeDaemonClient>,
    FakeEventSink,
    Arc<FakeSourceStore>,
) {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new("commit-0"));
    let test_runner = Arc::new(FakeTestRunner::new());
    let source_store = Arc::new(FakeSourceStore::new());
    source_store.insert(SourceItem::Todo {
        id: "todo-1".into(),
        title: "Add widgets".into(),
        kind: "feature".into(),
        priority: "high".into(),
        description: "Ship the widget factory.".into(),
    });
    let transcripts = Arc::new(FakeTranscriptSource::new());
    let prompts = Arc::new(FilesystemPromptSource);
    let daemon = Arc::new(FakeDaemonClient::new());
    daemon.set_handle(DaemonHandle { serve_cmd: "oc serve".into(), run_cmd: "oc run".into() });
    let store = Arc::new(Store::open(dir.path().join("state.json")).unwrap());
    let clock = FakeClock::new();

    let workers =
        StageWorkers::new(vcs.clone(), test_runner, source_store.clone(), transcripts, prompts, daemon.clone(), store, clock);
    (dir, workers, vcs, daemon, FakeEventSink::new(), source_store)
}

fn job(repo_state: &Store) -> Job {
    let job = Job::builder().repo("acme/widgets").source_id("todo-1").build();
    repo_state
        .create(job.repo.clone(), job.source_id.clone(), job.created_at, job.models.clone())
        .unwrap()
}

#[tokio::test]
async fn unchanged_head_leaves_the_job_in_implementing_and_skips_testing() {
    let (dir, workers, _vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });

    let outcome = workers.implement(&created, dir.path(), &events).await.unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.next_stage(), incrementum_core::Stage::Reviewing);
    assert!(outcome.job.changes.is_empty());
    assert!(events.events().iter().any(|e| matches!(e, incrementum_core::Event::Prompt { .. })));
}

#[tokio::test]
async fn changed_head_with_commit_message_file_starts_a_new_change() {
    let (dir, workers, vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    std::fs::write(dir.path().join(COMMIT_MESSAGE_FILE), "Add widgets\n\nShip the widget factory.\n").unwrap();
    vcs.advance_head();
    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });
    vcs.set_change_empty(false);

    let outcome = workers.implement(&created, dir.path(), &events).await.unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.next_stage(), incrementum_core::Stage::Testing);
    assert_eq!(outcome.job.changes.len(), 1);
    let commit = outcome.job.current_commit().unwrap();
    assert_eq!(commit.draft_message, "Add widgets\n\nShip the widget factory.");
    assert!(!dir.path().join(COMMIT_MESSAGE_FILE).exists());
    assert!(events
        .events()
        .iter()
        .any(|e| matches!(e, incrementum_core::Event::CommitMessage { label, .. }
            if *label == incrementum_core::CommitMessageLabel::Draft)));
}

#[tokio::test]
async fn changed_head_appends_to_an_unsealed_change_instead_of_starting_a_new_one() {
    let (dir, workers, vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    workers.store.append_change(&created.repo, created.id.as_str(), incrementum_core::ChangeId::new("change-1"), 1_000).unwrap();

    std::fs::write(dir.path().join(COMMIT_MESSAGE_FILE), "Second commit\n\nMore work.\n").unwrap();
    vcs.advance_head();
    vcs.set_change_empty(false);
    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });

    let outcome = workers.implement(&created, dir.path(), &events).await.unwrap();

    assert_eq!(outcome.job.changes.len(), 1);
    assert_eq!(outcome.job.last_change().unwrap().commits.len(), 1);
}

#[tokio::test]
async fn an_empty_diff_is_treated_as_unchanged_even_if_the_head_commit_moved() {
    let (dir, workers, vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    vcs.advance_head();
    vcs.set_change_empty(true);
    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });

    let outcome = workers.implement(&created, dir.path(), &events).await.unwrap();

    assert!(!outcome.changed);
    assert!(outcome.job.changes.is_empty());
}

#[tokio::test]
async fn changed_diff_with_no_commit_message_file_is_an_error() {
    let (dir, workers, vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    vcs.advance_head();
    vcs.set_change_empty(false);
    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });

    let err = workers.implement(&created, dir.path(), &events).await.unwrap_err();
    assert!(matches!(err, crate::error::WorkerError::MissingCommitMessageFile { .. }));
}

#[tokio::test]
async fn a_killed_session_that_produced_no_change_is_not_retried() {
    let (dir, workers, _vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    daemon.script_run(Vec::new(), AgentExit { code: -9, stderr: "killed".into() });

    let outcome = workers.implement(&created, dir.path(), &events).await.unwrap();
    assert!(!outcome.changed);
}

#[tokio::test]
async fn a_nonzero_exit_after_the_retry_budget_fails_the_iteration() {
    let (dir, workers, vcs, daemon, events, _sources) = harness();
    let created = job(&workers.store);

    vcs.advance_head();
    daemon.script_run(Vec::new(), AgentExit { code: 1, stderr: "boom".into() });

    let err = workers.implement(&created, dir.path(), &events).await.unwrap_err();
    assert!(matches!(err, crate::error::WorkerError::AiSessionFailed { exit_code: 1, .. }));
}

#[tokio::test]
async fn prior_feedback_selects_the_feedback_template_over_implement() {
    let (dir, workers, _vcs, daemon, events, _sources) = harness();
    let mut created = job(&workers.store);
    created = workers
        .store
        .update(
            &created.repo,
            created.id.as_str(),
            incrementum_state::UpdateOptions { feedback: Some("fix the tests".into()), ..Default::default() },
            1_000,
        )
        .unwrap();

    daemon.script_run(Vec::new(), AgentExit { code: 0, stderr: String::new() });

    workers.implement(&created, dir.path(), &events).await.unwrap();

    let prompt_event = events
        .events()
        .into_iter()
        .find_map(|e| match e {
            incrementum_core::Event::Prompt { template, prompt, .. } => Some((template, prompt)),
            _ => None,
        })
        .unwrap();
    assert_eq!(prompt_event.0, "feedback.tmpl");
    assert!(prompt_event.1.contains("fix the tests"));
}
