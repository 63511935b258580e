// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event-log capability the Stage Workers and Stage Pipeline depend
//! on. Defined as a trait here, rather than a direct dependency on
//! `incrementum-eventlog`, so tests can supply an in-memory fake without
//! touching the filesystem. `incrementum-eventlog`'s `EventLog` implements
//! this trait.

use incrementum_core::Event;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("event sink append failed: {0}")]
pub struct EventSinkError(#[from] pub Box<dyn std::error::Error + Send + Sync>);

/// Appends one event, optionally tagged with a correlation id (e.g. a
/// session id shared by a `prompt`/`transcript` pair).
pub trait EventSink: Send + Sync {
    fn append(&self, event: Event, id: Option<String>) -> Result<(), EventSinkError>;
}
