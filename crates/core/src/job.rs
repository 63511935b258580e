// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, state machine enums, and the change/commit/review
//! substructure a job accumulates as it runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a job instance.
    ///
    /// Deterministic: `id = lower(base32(sha256(source_id || created_at_rfc3339_nano)))[0..10]`.
    /// Replaying the same `(source_id, created_at)` pair always yields the
    /// same id, which makes job creation idempotent by construction.
    pub struct JobId;
}

crate::define_id! {
    /// Deterministic identifier for one AI subprocess run, derived from
    /// `(prompt, started_at)`.
    pub struct SessionId;
}

crate::define_opaque_id! {
    /// One VCS change (a mutable "top" in a pile of commits), as assigned
    /// by the VCS collaborator. Opaque to the orchestrator.
    pub struct ChangeId;
}

crate::define_opaque_id! {
    /// One VCS commit within a change, as assigned by the VCS collaborator.
    pub struct CommitId;
}

/// Errors raised validating string inputs against the closed enums below.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("invalid stage {given:?}, expected one of {accepted:?}")]
    InvalidStage { given: String, accepted: &'static [&'static str] },
    #[error("invalid status {given:?}, expected one of {accepted:?}")]
    InvalidStatus { given: String, accepted: &'static [&'static str] },
}

/// Lifecycle status of a job. `Active` iff `completed_at == 0`; every other
/// variant is terminal and permanent (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Active,
    Completed,
    Failed,
    Abandoned,
}

impl Status {
    pub const ALL: &'static [&'static str] = &["active", "completed", "failed", "abandoned"];

    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Active)
    }
}

crate::simple_display! {
    Status {
        Active => "active",
        Completed => "completed",
        Failed => "failed",
        Abandoned => "abandoned",
    }
}

impl std::str::FromStr for Status {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "completed" => Ok(Status::Completed),
            "failed" => Ok(Status::Failed),
            "abandoned" => Ok(Status::Abandoned),
            _ => Err(JobError::InvalidStatus { given: s.to_string(), accepted: Self::ALL }),
        }
    }
}

/// The current phase of the implement→test→review→commit loop. Only
/// meaningful while `status == Active` (§3 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Implementing,
    Testing,
    Reviewing,
    Committing,
}

impl Stage {
    pub const ALL: &'static [&'static str] =
        &["implementing", "testing", "reviewing", "committing"];
}

crate::simple_display! {
    Stage {
        Implementing => "implementing",
        Testing => "testing",
        Reviewing => "reviewing",
        Committing => "committing",
    }
}

impl std::str::FromStr for Stage {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "implementing" => Ok(Stage::Implementing),
            "testing" => Ok(Stage::Testing),
            "reviewing" => Ok(Stage::Reviewing),
            "committing" => Ok(Stage::Committing),
            _ => Err(JobError::InvalidStage { given: s.to_string(), accepted: Self::ALL }),
        }
    }
}

/// What an AI session was invoked to do. Drives which prompt template is
/// loaded and how the resulting session reference is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    Implement,
    Review,
    ProjectReview,
    CommitMessage,
}

crate::simple_display! {
    Purpose {
        Implement => "implement",
        Review => "review",
        ProjectReview => "project-review",
        CommitMessage => "commit-message",
    }
}

/// A reference to one completed AI subprocess run, appended to the job's
/// session list as each call completes (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSessionRef {
    pub purpose: Purpose,
    pub id: SessionId,
}

/// Verdict on a review (§3). Stored per-commit (step review) or per-job
/// (project review).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Accept,
    Abandon,
    RequestChanges,
}

crate::simple_display! {
    ReviewOutcome {
        Accept => "accept",
        Abandon => "abandon",
        RequestChanges => "request_changes",
    }
}

/// A review verdict, either on one commit (step scope) or on the whole job
/// (project scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub outcome: ReviewOutcome,
    pub comments: String,
    pub reviewer_session_id: SessionId,
    pub reviewed_at: u64,
}

/// One iteration within a [`Change`]: a single commit the implement stage
/// produced, along with whatever downstream stages learned about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: CommitId,
    pub draft_message: String,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
}

impl Commit {
    pub fn new(id: CommitId, draft_message: impl Into<String>, session_id: SessionId) -> Self {
        Self { id, draft_message: draft_message.into(), session_id, tests_passed: None, review: None }
    }

    /// A commit is "reviewed" once its review field is set (§3).
    pub fn is_reviewed(&self) -> bool {
        self.review.is_some()
    }
}

/// A logical unit of VCS work — one VCS change id — produced by a job.
/// Only the last change in a job's history may be incomplete (§3
/// invariant); new commits always append to that last incomplete change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub id: ChangeId,
    pub commits: Vec<Commit>,
    pub sealed: bool,
}

impl Change {
    pub fn new(id: ChangeId) -> Self {
        Self { id, commits: Vec::new(), sealed: false }
    }

    /// A change is "complete" once the committing stage sealed it (§3).
    pub fn is_complete(&self) -> bool {
        self.sealed
    }
}

/// Which model is used for each of the three kinds of AI call a job makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelections {
    pub implementation: String,
    pub code_review: String,
    pub project_review: String,
}

/// A tracked work item (todo) or recurring maintenance task (habit) driven
/// through the implement→test→review→commit loop (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub repo: String,
    /// Either a todo id or `habit:<name>`.
    pub source_id: String,
    pub status: Status,
    pub stage: Stage,
    pub models: ModelSelections,
    pub created_at: u64,
    pub started_at: u64,
    pub updated_at: u64,
    /// Zero while `status == Active`; set once on the terminal transition.
    pub completed_at: u64,
    /// Last review's request-changes body, or last failing test summary.
    /// Cleared whenever a stage succeeds without producing new feedback.
    pub feedback: String,
    pub sessions: Vec<AiSessionRef>,
    pub changes: Vec<Change>,
    pub project_review: Option<Review>,
}

impl Job {
    /// Construct a new `active/implementing` job. `id` must already be the
    /// deterministic id for `(source_id, created_at)` — see
    /// [`crate::id::generate`].
    pub fn new(
        id: JobId,
        repo: impl Into<String>,
        source_id: impl Into<String>,
        models: ModelSelections,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            repo: repo.into(),
            source_id: source_id.into(),
            status: Status::Active,
            stage: Stage::Implementing,
            models,
            created_at,
            started_at: created_at,
            updated_at: created_at,
            completed_at: 0,
            feedback: String::new(),
            sessions: Vec::new(),
            changes: Vec::new(),
            project_review: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active && self.completed_at == 0
    }

    pub fn is_habit(&self) -> bool {
        self.source_id.starts_with("habit:")
    }

    /// The last change in history, if any — the only one that may still be
    /// incomplete (§3 invariant).
    pub fn last_change(&self) -> Option<&Change> {
        self.changes.last()
    }

    pub fn last_change_mut(&mut self) -> Option<&mut Change> {
        self.changes.last_mut()
    }

    /// The current commit within the last change: the one downstream
    /// stages (test/review/commit) operate on.
    pub fn current_commit(&self) -> Option<&Commit> {
        self.changes.last()?.commits.last()
    }

    pub fn current_commit_mut(&mut self) -> Option<&mut Commit> {
        self.changes.last_mut()?.commits.last_mut()
    }

    pub fn push_session(&mut self, purpose: Purpose, id: SessionId) {
        self.sessions.push(AiSessionRef { purpose, id });
    }

    /// True when the implement stage must start a fresh `Change` (§3
    /// invariant: only the last change may be incomplete) rather than
    /// append to the current one.
    pub fn needs_new_change(&self) -> bool {
        match self.last_change() {
            Some(change) => change.is_complete(),
            None => true,
        }
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            repo: String = "acme/widgets",
            source_id: String = "todo-1",
        }
        set {
            id: JobId = JobId::generate(&["todo-1", "seed"]),
            status: Status = Status::Active,
            stage: Stage = Stage::Implementing,
            models: ModelSelections = ModelSelections {
                implementation: "claude".into(),
                code_review: "claude".into(),
                project_review: "claude".into(),
            },
            created_at: u64 = 1_000,
            started_at: u64 = 1_000,
            updated_at: u64 = 1_000,
            completed_at: u64 = 0,
            feedback: String = String::new(),
            sessions: Vec<AiSessionRef> = Vec::new(),
            changes: Vec<Change> = Vec::new(),
            project_review: Option<Review> = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
