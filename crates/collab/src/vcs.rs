// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The version-control collaborator: commit/change identity, diff
//! inspection, and workspace restoration. The orchestrator never shells
//! out to a VCS binary directly — it calls this small interface, whose
//! concrete implementation (git, jj, ...) is out of scope (§1).

use incrementum_core::{ChangeId, CommitId};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("vcs operation failed: {0}")]
    Failed(String),
}

/// Operations the Stage Workers need from the VCS (Design Notes §9).
pub trait Vcs: Send + Sync {
    /// The commit id currently checked out in the workspace.
    fn current_commit_id(&self, workspace: &std::path::Path) -> Result<CommitId, VcsError>;

    /// The change id of the workspace's current, still-mutable top commit
    /// (e.g. a jj change id) — assigned when the implement stage starts a
    /// new [`Change`](incrementum_core::Change).
    fn current_change_id(&self, workspace: &std::path::Path) -> Result<ChangeId, VcsError>;

    /// The commit id of `change_id` as of a prior point, for the
    /// "pre-change" bookkeeping the implement worker does.
    fn commit_id_at(&self, workspace: &std::path::Path, change_id: &ChangeId) -> Result<CommitId, VcsError>;

    /// True if the current top-of-change commit has no effective content
    /// (an empty diff), ruling out no-op implement iterations.
    fn current_change_empty(&self, workspace: &std::path::Path) -> Result<bool, VcsError>;

    /// Raw `diff --stat`-shaped text between `from` and `to`.
    fn diff_stat(&self, workspace: &std::path::Path, from: &CommitId, to: &CommitId) -> Result<String, VcsError>;

    /// Record a commit with `message`, returning its new id.
    fn commit(&self, workspace: &std::path::Path, message: &str) -> Result<CommitId, VcsError>;

    /// Hard-reset the workspace back to `commit_id`, discarding anything
    /// written since (used to retry after a signal-killed AI session).
    fn restore_workspace(&self, workspace: &std::path::Path, commit_id: &CommitId) -> Result<(), VcsError>;

    /// Pull/refresh the workspace before a stage begins.
    fn update_stale(&self, workspace: &std::path::Path) -> Result<(), VcsError>;

    /// A point-in-time snapshot id usable later with [`Vcs::restore_workspace`].
    fn snapshot(&self, workspace: &std::path::Path) -> Result<CommitId, VcsError>;
}

fn changed_summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s+files?\s+changed(?:,\s*(\d+)\s+insertions?\(\+\))?(?:,\s*(\d+)\s+deletions?\(-\))?")
            .expect("static regex is valid")
    })
}

fn per_file_stat_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\|\s*\d+\s*[+-]+").expect("static regex is valid"))
}

/// True iff `text` (the output of a `diff --stat`-shaped VCS command)
/// describes a non-empty diff: either a summary line with a non-zero
/// files/insertions/deletions count, or a per-file `| N +/-` stats line
/// (§6). Handles `"No changes."`, header-only output, and an all-zero
/// summary as "no changes".
pub fn diff_stat_has_changes(text: &str) -> bool {
    if let Some(caps) = changed_summary_re().captures(text) {
        let files: u64 = caps.get(1).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        let insertions: u64 = caps.get(2).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        let deletions: u64 = caps.get(3).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);
        if files > 0 || insertions > 0 || deletions > 0 {
            return true;
        }
    }
    per_file_stat_re().is_match(text)
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
