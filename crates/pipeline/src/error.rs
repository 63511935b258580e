// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage Pipeline errors (§4.2 Error policy).

use incrementum_collab::{EventSinkError, SourceError};
use incrementum_core::JobId;
use incrementum_state::StateError;
use incrementum_workers::WorkerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    EventSink(#[from] EventSinkError),
    #[error("job {0} interrupted")]
    Interrupted(JobId),
    #[error("{primary}; additionally failed while finalizing the job: {secondary}")]
    Aggregate {
        #[source]
        primary: Box<PipelineError>,
        secondary: Box<PipelineError>,
    },
}
