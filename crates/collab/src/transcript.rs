// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access to prior AI session transcripts, one of the prompt template
//! variables (§4.7): "prior transcripts".

use incrementum_core::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("reading transcript for session {0}")]
    NotFound(SessionId),
    #[error("transcript store operation failed: {0}")]
    Failed(String),
}

pub trait TranscriptSource: Send + Sync {
    /// The full rendered transcript text for a previously completed
    /// session, in the same shape the prompt template variable expects.
    fn transcript(&self, session_id: &SessionId) -> Result<String, TranscriptError>;
}
