// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use incrementum_core::Stage;
use std::sync::{Arc, Mutex as StdMutex};

fn job_id() -> JobId {
    JobId::generate(&["todo-1", "seed"])
}

#[test]
fn open_creates_parent_dirs_and_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let id = job_id();

    let log = EventLog::open(dir.path(), &id).unwrap();
    log.append(Event::Stage { stage: Stage::Implementing }, None).unwrap();
    log.close().unwrap();
    drop(log);

    let log = EventLog::open(dir.path(), &id).unwrap();
    log.close().unwrap();
    let events = snapshot(dir.path(), &id).unwrap();
    assert!(events.is_empty(), "re-opening truncates the previous run's log");
}

#[test]
fn append_then_snapshot_round_trips_events_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let id = job_id();
    let log = EventLog::open(dir.path(), &id).unwrap();

    log.append(Event::Stage { stage: Stage::Implementing }, None).unwrap();
    log.append(Event::Stage { stage: Stage::Testing }, None).unwrap();
    log.close().unwrap();

    let events = snapshot(dir.path(), &id).unwrap();
    assert_eq!(
        events,
        vec![Event::Stage { stage: Stage::Implementing }, Event::Stage { stage: Stage::Testing }]
    );
}

#[test]
fn snapshot_of_missing_job_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let events = snapshot(dir.path(), &job_id()).unwrap();
    assert!(events.is_empty());
}

#[test]
fn path_matches_share_dir_layout() {
    let dir = tempfile::tempdir().unwrap();
    let id = job_id();
    let expected = dir.path().join("jobs").join("events").join(format!("{id}.jsonl"));
    assert_eq!(path_for(dir.path(), &id), expected);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<StdMutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn stream_sink_receives_every_appended_event() {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::open(dir.path(), &job_id()).unwrap();
    let sink = SharedBuf::default();
    log.set_stream(Box::new(sink.clone()));

    log.append(Event::Stage { stage: Stage::Reviewing }, None).unwrap();
    log.close().unwrap();

    let written = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
    assert!(written.contains("job.stage"));
    assert!(written.contains("reviewing"));
}
