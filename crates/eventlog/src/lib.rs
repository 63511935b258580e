// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job append-only event log: one JSON object per line, no schema of
//! its own beyond the envelope (`{id?, name, data}`) — payload shapes are
//! defined per event name in [`incrementum_core::event`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use incrementum_collab::{EventSink, EventSinkError};
use incrementum_core::{Event, JobId, LogLine};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("opening event log at {path}: {source}")]
    Open { path: String, #[source] source: std::io::Error },
    #[error("appending to event log at {path}: {source}")]
    Append { path: String, #[source] source: std::io::Error },
    #[error("serializing event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("reading event log at {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("malformed line {line_no} in event log at {path}: {source}")]
    MalformedLine { path: String, line_no: usize, #[source] source: serde_json::Error },
}

/// Returns `<share_dir>/jobs/events/<job_id>.jsonl`.
pub fn path_for(share_dir: &Path, job_id: &JobId) -> PathBuf {
    share_dir.join("jobs").join("events").join(format!("{job_id}.jsonl"))
}

/// Read every line of the log for `job_id` under `share_dir`, reconstructing
/// typed [`Event`]s. A missing file yields the empty list (§4.4).
pub fn snapshot(share_dir: &Path, job_id: &JobId) -> Result<Vec<Event>, EventLogError> {
    let path = path_for(share_dir, job_id);
    read_all(&path)
}

fn read_all(path: &Path) -> Result<Vec<Event>, EventLogError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(EventLogError::Read { path: path.display().to_string(), source: err }),
    };
    let reader = std::io::BufReader::new(file);
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| EventLogError::Read { path: path.display().to_string(), source })?;
        if line.trim().is_empty() {
            continue;
        }
        let log_line: LogLine = serde_json::from_str(&line).map_err(|source| {
            EventLogError::MalformedLine { path: path.display().to_string(), line_no: idx + 1, source }
        })?;
        let event = Event::from_log_line(&log_line).map_err(|source| {
            EventLogError::MalformedLine { path: path.display().to_string(), line_no: idx + 1, source }
        })?;
        events.push(event);
    }
    Ok(events)
}

struct Inner {
    file: File,
    stream: Option<Box<dyn Write + Send>>,
}

/// A handle to one job's event log. Append is serialized by an internal
/// mutex so events for a single job are strictly ordered by call order
/// (§5). Owned by the currently running job instance; after [`EventLog::close`]
/// the underlying file is immutable and may be read via [`snapshot`].
pub struct EventLog {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl EventLog {
    /// Ensure the parent directory exists, then create (truncating) the
    /// log file for `job_id` under `share_dir`.
    pub fn open(share_dir: &Path, job_id: &JobId) -> Result<Self, EventLogError> {
        let path = path_for(share_dir, job_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| EventLogError::Open { path: path.display().to_string(), source })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| EventLogError::Open { path: path.display().to_string(), source })?;
        Ok(Self { path, inner: Mutex::new(Inner { file, stream: None }) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Install a caller-supplied unbuffered sink that every subsequently
    /// appended event is also delivered to. The sink must keep up; this log
    /// never buffers or drops on its behalf (§4.4).
    pub fn set_stream(&self, sink: Box<dyn Write + Send>) {
        self.inner.lock().stream = Some(sink);
    }

    /// Atomically append one event, optionally tagged with a correlation
    /// `id` (e.g. the session id a `prompt`/`transcript` pair shares).
    pub fn append(&self, event: Event, id: Option<String>) -> Result<(), EventLogError> {
        let line = event.into_log_line(id)?;
        let mut json = serde_json::to_string(&line)?;
        json.push('\n');

        let mut inner = self.inner.lock();
        inner
            .file
            .write_all(json.as_bytes())
            .map_err(|source| EventLogError::Append { path: self.path.display().to_string(), source })?;
        if let Some(sink) = inner.stream.as_mut() {
            if let Err(err) = sink.write_all(json.as_bytes()) {
                tracing::warn!(path = %self.path.display(), error = %err, "event log stream sink fell behind");
            }
        }
        Ok(())
    }

    /// Flush and release the handle. The file remains on disk and readable
    /// via [`snapshot`]; no further appends are expected on this handle.
    pub fn close(&self) -> Result<(), EventLogError> {
        let mut inner = self.inner.lock();
        inner
            .file
            .flush()
            .map_err(|source| EventLogError::Append { path: self.path.display().to_string(), source })?;
        inner.stream = None;
        Ok(())
    }
}

impl EventSink for EventLog {
    fn append(&self, event: Event, id: Option<String>) -> Result<(), EventSinkError> {
        EventLog::append(self, event, id).map_err(|err| EventSinkError(Box::new(err)))
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
