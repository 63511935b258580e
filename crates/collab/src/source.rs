// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The todo/habit store collaborator: the orchestrator's only window onto
//! the "source item" a job is driven from, and the only way it signals
//! that a source is actionable again, finished, or has produced an
//! artifact (§1, §4.3.4 step 6).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source item not found: {0}")]
    NotFound(String),
    #[error("source store operation failed: {0}")]
    Failed(String),
}

/// The fields a prompt template needs to describe what a job is working
/// on — either a tracked todo or a named habit (§4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    Todo { id: String, title: String, kind: String, priority: String, description: String },
    Habit { name: String, instructions: String },
}

impl SourceItem {
    pub fn source_id(&self) -> String {
        match self {
            SourceItem::Todo { id, .. } => id.clone(),
            SourceItem::Habit { name, .. } => format!("habit:{name}"),
        }
    }

    pub fn is_habit(&self) -> bool {
        matches!(self, SourceItem::Habit { .. })
    }
}

/// Reads and signals back to the external todo/habit store.
pub trait SourceStore: Send + Sync {
    fn find(&self, source_id: &str) -> Result<SourceItem, SourceError>;

    /// Return a source to the "actionable" queue after a job failure or an
    /// abandon/request-changes verdict, with a human-readable reason.
    fn reopen(&self, source_id: &str, reason: &str) -> Result<(), SourceError>;

    /// Mark a source finished after its job completes successfully.
    fn finish(&self, source_id: &str) -> Result<(), SourceError>;

    /// Create a new "artifact" source item as a byproduct of a habit run
    /// (§4.3.4 step 6), returning its new source id.
    fn create_artifact(&self, parent_source_id: &str, content: &str) -> Result<String, SourceError>;
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
