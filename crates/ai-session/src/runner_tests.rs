// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use incrementum_collab::fakes::FakeDaemonClient;
use incrementum_collab::{AgentExit, DaemonHandle};
use incrementum_core::{FakeClock, Purpose};
use incrementum_eventlog::EventLog;
use incrementum_state::Store;

fn harness() -> (tempfile::TempDir, Store, EventLog, FakeClock, Arc<FakeDaemonClient>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("state.json")).unwrap();
    let job_id = incrementum_core::JobId::generate(&["seed"]);
    let event_log = EventLog::open(dir.path(), &job_id).unwrap();
    let clock = FakeClock::new();
    let daemon = Arc::new(FakeDaemonClient::new());
    daemon.set_handle(DaemonHandle { serve_cmd: "oc serve".into(), run_cmd: "oc run".into() });
    (dir, store, event_log, clock, daemon)
}

#[tokio::test]
async fn successful_run_records_session_and_events() {
    let (_dir, store, event_log, clock, daemon) = harness();
    daemon.script_run(
        vec![
            r#"{"type":"message.part.updated","message_id":"m1","part":{"type":"text","text":"hi"}}"#.into(),
            r#"{"type":"message.updated","message":{"id":"m1","role":"assistant","completed":true}}"#.into(),
        ],
        AgentExit { code: 0, stderr: String::new() },
    );

    let runner = AiSessionRunner::new(daemon, clock);
    let outcome = runner
        .run(std::path::Path::new("/repo"), &store, &event_log, Purpose::Implement, "do the thing")
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert!(!outcome.signal_killed());
    assert_eq!(outcome.serve_cmd, "oc serve");

    let session = store.find_session(outcome.session_id).unwrap();
    assert_eq!(session.status, incrementum_state::SessionStatus::Completed);

    event_log.close().unwrap();
    let events = incrementum_eventlog::snapshot(_dir.path(), &incrementum_core::JobId::generate(&["seed"])).unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::OpencodeStart { purpose } if *purpose == Purpose::Implement)));
    assert!(events.iter().any(|e| matches!(e, Event::OpencodeEnd { exit_code: 0, .. })));
    assert!(events.iter().any(|e| matches!(e, Event::Transcript { .. })));
}

#[tokio::test]
async fn signal_death_is_reported_as_negative_exit_code() {
    let (_dir, store, event_log, clock, daemon) = harness();
    daemon.script_run(Vec::new(), AgentExit { code: -1, stderr: "killed".into() });

    let runner = AiSessionRunner::new(daemon, clock);
    let outcome = runner
        .run(std::path::Path::new("/repo"), &store, &event_log, Purpose::Review, "review it")
        .await
        .unwrap();

    assert!(outcome.signal_killed());
    assert_eq!(outcome.stderr, "killed");
}

#[tokio::test]
async fn run_fails_fast_when_daemon_is_not_located() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("state.json")).unwrap();
    let job_id = incrementum_core::JobId::generate(&["seed"]);
    let event_log = EventLog::open(dir.path(), &job_id).unwrap();
    let clock = FakeClock::new();
    let daemon = Arc::new(FakeDaemonClient::new());

    let runner = AiSessionRunner::new(daemon, clock);
    let err = runner
        .run(std::path::Path::new("/repo"), &store, &event_log, Purpose::Implement, "do the thing")
        .await
        .unwrap_err();
    assert!(matches!(err, AiSessionError::Daemon(_)));
}
