// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::StageWorkers;
use incrementum_collab::fakes::{
    FakeDaemonClient, FakeEventSink, FakeSourceStore, FakeTestRunner, FakeTranscriptSource, FakeVcs,
};
use incrementum_collab::SourceItem;
use incrementum_core::{ChangeId, CommitId, FakeClock, Job, ModelSelections, SessionId};
use incrementum_prompts::FilesystemPromptSource;
use incrementum_state::Store;
use std::sync::Arc;

fn harness(
    source: SourceItem,
) -> (tempfile::TempDir, StageWorkers<FakeDaemonClient, FakeClock>, Arc<FakeVcs>, Arc<FakeSourceStore>, Job) {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(FakeVcs::new("commit-0"));
    let test_runner = Arc::new(FakeTestRunner::new());
    let source_store = Arc::new(FakeSourceStore::new());
    source_store.insert(source.clone());
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
    let job = store.create("acme/widgets", source.source_id(), 1_000, models).unwrap();
    store.append_change("acme/widgets", job.id.as_str(), ChangeId::new("change-1"), 1_050).unwrap();
    let job = store
        .append_commit_to_current_change(
            "acme/widgets",
            job.id.as_str(),
            CommitId::new("draft-commit"),
            "Add widgets\n\nShip the widget factory.",
            SessionId::generate(&["s1"]),
            1_100,
        )
        .unwrap();

    let workers = StageWorkers::new(
        vcs.clone(),
        test_runner,
        source_store.clone(),
        transcripts,
        prompts,
        daemon,
        store,
        clock,
    );
    (dir, workers, vcs, source_store, job)
}

fn todo() -> SourceItem {
    SourceItem::Todo {
        id: "todo-1".into(),
        title: "Add widgets".into(),
        kind: "feature".into(),
        priority: "high".into(),
        description: "Ship the widget factory.".into(),
    }
}

#[tokio::test]
async fn an_empty_diff_skips_committing_and_returns_to_implementing() {
    let (dir, workers, vcs, _sources, job) = harness(todo());
    vcs.set_diff_stat("No changes.");
    let events = FakeEventSink::new();

    let outcome = workers.commit(&job, dir.path(), "", &events).await.unwrap();

    assert!(outcome.commit_id.is_none());
    assert_eq!(outcome.next_stage(), Some(incrementum_core::Stage::Implementing));
}

#[tokio::test]
async fn a_real_diff_formats_and_records_the_final_message_then_seals_the_change() {
    let (dir, workers, vcs, _sources, job) = harness(todo());
    vcs.set_diff_stat("1 file changed, 3 insertions(+)");
    let events = FakeEventSink::new();

    let outcome = workers.commit(&job, dir.path(), "", &events).await.unwrap();

    assert!(outcome.commit_id.is_some());
    assert!(outcome.job.last_change().unwrap().is_complete());
    assert_eq!(outcome.job.current_commit().unwrap().id, outcome.commit_id.unwrap());
    assert!(events.events().iter().any(|e| matches!(e, incrementum_core::Event::CommitMessage { label, .. }
        if *label == incrementum_core::CommitMessageLabel::Final)));
}

#[tokio::test]
async fn a_habit_job_creates_an_artifact_and_completes() {
    let habit = SourceItem::Habit { name: "tidy-deps".into(), instructions: "Run cargo update.".into() };
    let (dir, workers, vcs, sources, job) = harness(habit);
    vcs.set_diff_stat("1 file changed, 1 insertion(+)");
    let events = FakeEventSink::new();

    let outcome = workers.commit(&job, dir.path(), "Looks good.", &events).await.unwrap();

    assert_eq!(outcome.job.status, incrementum_core::Status::Completed);
    assert_eq!(sources.artifacts.lock().len(), 1);
    assert_eq!(outcome.next_stage(), None);
}

#[tokio::test]
async fn a_todo_job_stays_active_and_is_sent_to_project_review() {
    let (dir, workers, vcs, _sources, job) = harness(todo());
    vcs.set_diff_stat("1 file changed, 1 insertion(+)");
    let events = FakeEventSink::new();

    let outcome = workers.commit(&job, dir.path(), "", &events).await.unwrap();

    assert_eq!(outcome.job.status, incrementum_core::Status::Active);
    assert_eq!(outcome.next_stage(), Some(incrementum_core::Stage::Reviewing));
}
