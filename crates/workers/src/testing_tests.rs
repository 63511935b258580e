// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::StageWorkers;
use incrementum_collab::fakes::{
    FakeDaemonClient, FakeEventSink, FakeSourceStore, FakeTestRunner, FakeTranscriptSource, FakeVcs,
};
use incrementum_collab::{Config, SourceItem};
use incrementum_core::{ChangeId, CommitId, FakeClock, Job, ModelSelections, SessionId};
use incrementum_prompts::FilesystemPromptSource;
use incrementum_state::Store;
use std::sync::Arc;

fn config(commands: Vec<&str>) -> Config {
    Config {
        repo: "acme/widgets".into(),
        workspace: std::path::PathBuf::from("/fake"),
        test_commands: commands.into_iter().map(String::from).collect(),
        models: ModelSelections {
            implementation: "claude".into(),
            code_review: "claude".into(),
            project_review: "claude".into(),
        },
        templates_dir: std::path::PathBuf::from(".incrementum/templates"),
    }
}

fn harness() -> (tempfile::TempDir, StageWorkers<FakeDaemonClient, FakeClock>, Arc<FakeTestRunner>, Job) {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new("commit-0"));
    let test_runner = Arc::new(FakeTestRunner::new());
    let source_store = Arc::new(FakeSourceStore::new());
    source_store.insert(SourceItem::Habit { name: "lint".into(), instructions: "run lint".into() });
    let transcripts = Arc::new(FakeTranscriptSource::new());
    let prompts = Arc::new(FilesystemPromptSource);
    let daemon = Arc::new(FakeDaemonClient::new());
    let store = Arc::new(Store::open(dir.path().join("state.json")).unwrap());
    let clock = FakeClock::new();

    let models = ModelSelections {
        implementation: "claude".into(),
        code_review: "claude".into(),
        project_review: "claude".into(),
    };
    let job = store.create("acme/widgets", "habit:lint", 1_000, models).unwrap();
    store.append_change("acme/widgets", job.id.as_str(), ChangeId::new("change-1"), 1_050).unwrap();
    let job = store
        .append_commit_to_current_change(
            "acme/widgets",
            job.id.as_str(),
            CommitId::new("commit-1"),
            "draft message",
            SessionId::generate(&["s1"]),
            1_100,
        )
        .unwrap();

    let workers =
        StageWorkers::new(vcs, test_runner.clone(), source_store, transcripts, prompts, daemon, store, clock);
    (dir, workers, test_runner, job)
}

#[test]
fn empty_test_commands_is_a_fatal_config_error() {
    let (dir, workers, _runner, job) = harness();
    let events = FakeEventSink::new();

    let err = workers.test(&job, dir.path(), &config(vec![]), &events).unwrap_err();
    assert!(matches!(err, crate::error::WorkerError::Config(_)));
}

#[test]
fn every_command_passing_clears_feedback_and_advances_to_review() {
    let (dir, workers, runner, job) = harness();
    runner.script("cargo test", 0);
    runner.script("cargo clippy", 0);
    let events = FakeEventSink::new();

    let outcome = workers.test(&job, dir.path(), &config(vec!["cargo test", "cargo clippy"]), &events).unwrap();

    assert!(outcome.passed);
    assert_eq!(outcome.next_stage(), incrementum_core::Stage::Reviewing);
    assert!(outcome.job.feedback.is_empty());
    assert_eq!(outcome.job.current_commit().unwrap().tests_passed, Some(true));
    assert!(events.events().iter().any(|e| matches!(e, incrementum_core::Event::Tests { .. })));
}

#[test]
fn a_failing_command_sets_feedback_and_returns_to_implementing() {
    let (dir, workers, runner, job) = harness();
    runner.script("cargo test", 1);
    let events = FakeEventSink::new();

    let outcome = workers.test(&job, dir.path(), &config(vec!["cargo test"]), &events).unwrap();

    assert!(!outcome.passed);
    assert_eq!(outcome.next_stage(), incrementum_core::Stage::Implementing);
    assert!(outcome.job.feedback.contains("is failing"));
    assert_eq!(outcome.job.current_commit().unwrap().tests_passed, Some(false));
}

#[test]
fn feedback_summary_matches_the_exact_expected_wording() {
    let (dir, workers, runner, job) = harness();
    runner.script("go test ./...", 1);
    runner.script("golangci-lint run", 0);
    let events = FakeEventSink::new();

    let outcome =
        workers.test(&job, dir.path(), &config(vec!["go test ./...", "golangci-lint run"]), &events).unwrap();

    assert_eq!(outcome.job.feedback, "- go test ./... is failing\n- golangci-lint run is passing");
}

#[test]
fn every_command_runs_even_after_an_earlier_failure() {
    let (dir, workers, runner, job) = harness();
    runner.script("a", 1);
    runner.script("b", 0);
    let events = FakeEventSink::new();

    let outcome = workers.test(&job, dir.path(), &config(vec!["a", "b"]), &events).unwrap();

    let tests_event = events
        .events()
        .into_iter()
        .find_map(|e| match e {
            incrementum_core::Event::Tests { results } => Some(results),
            _ => None,
        })
        .unwrap();
    assert_eq!(tests_event.len(), 2);
    assert!(!outcome.passed);
}
