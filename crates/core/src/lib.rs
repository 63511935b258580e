// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! incrementum-core: job/change/commit domain model, deterministic ids,
//! clock abstraction, and event log payload types shared by every other
//! `incrementum-*` crate.

pub mod macros;

pub mod clock;
pub mod event;
pub mod id;
pub mod job;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{CommitMessageLabel, Event, LogLine, TestCommandResult};
pub use id::generate;
#[cfg(any(test, feature = "test-support"))]
pub use job::JobBuilder;
pub use job::{
    AiSessionRef, Change, ChangeId, Commit, CommitId, Job, JobError, JobId, ModelSelections,
    Purpose, Review, ReviewOutcome, SessionId, Stage, Status,
};
