// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The State Manager: a transactional key/value store over job records,
//! keyed by `(repo, job_id)`. Every mutation runs under a single exclusive
//! lock that serializes readers with writers for the duration of the
//! change and persists the whole store back to its state file before
//! releasing (§4.1).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use chrono::{SecondsFormat, TimeZone, Utc};
use incrementum_core::{
    Change, ChangeId, Commit, CommitId, Job, JobError, JobId, ModelSelections,
    Purpose, Review, SessionId, Stage, Status,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An `active` job is reaped as stale if its `updated_at` is older than this
/// many milliseconds (§4.1, §5).
pub const STALE_WINDOW_MS: u64 = 10 * 60 * 1000;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("ambiguous job id prefix {prefix:?} matches {count} jobs")]
    AmbiguousJobIdPrefix { prefix: String, count: usize },
    #[error("no current change to mutate")]
    NoCurrentChange,
    #[error("no current commit to mutate")]
    NoCurrentCommit,
    #[error(transparent)]
    InvalidStage(#[from] JobError),
    #[error("loading state file {path}: {source}")]
    Load { path: String, #[source] source: std::io::Error },
    #[error("persisting state file {path}: {source}")]
    Persist { path: String, #[source] source: std::io::Error },
    #[error("deserializing state file {path}: {source}")]
    Deserialize { path: String, #[source] source: serde_json::Error },
    #[error("serializing state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("ai session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("ai session {id} already recorded with status {existing:?}, refusing to recreate as {requested:?}")]
    SessionStatusMismatch { id: SessionId, existing: SessionStatus, requested: SessionStatus },
}

/// Lifecycle of one AI session record (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

/// A tracked AI subprocess run (§4.5 step 3, 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub purpose: Purpose,
    pub status: SessionStatus,
    pub started_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Format an epoch-millisecond timestamp as RFC3339 with nanosecond
/// precision, the seed format the deterministic job id recipe requires
/// (§4.7).
pub fn rfc3339_nanos(epoch_ms: u64) -> String {
    let secs = (epoch_ms / 1000) as i64;
    let nanos = ((epoch_ms % 1000) * 1_000_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().expect("epoch 0 is always valid"))
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn job_key(repo: &str, id: &JobId) -> String {
    format!("{repo}/{id}")
}

/// Optional mutations applied by [`Store::update`]. Each `Some` field is
/// applied; `None` leaves that part of the job unchanged.
#[derive(Debug, Default, Clone)]
pub struct UpdateOptions {
    pub stage: Option<Stage>,
    pub status: Option<Status>,
    pub feedback: Option<String>,
    pub push_session: Option<(Purpose, SessionId)>,
}

/// Which jobs [`Store::list`] should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    /// Only `active` jobs — the default (§4.1: "default excludes non-active").
    #[default]
    ActiveOnly,
    Status(Status),
    All,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OnDisk {
    #[serde(default)]
    jobs: HashMap<String, Job>,
    #[serde(default)]
    sessions: HashMap<SessionId, SessionRecord>,
}

#[derive(Debug, Default)]
struct StateInner {
    jobs: HashMap<String, Job>,
    sessions: HashMap<SessionId, SessionRecord>,
}

/// A transactional store of job records persisted to a single state file.
pub struct Store {
    path: PathBuf,
    inner: Mutex<StateInner>,
}

impl Store {
    /// Load the store from `path`, or start empty if the file doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let on_disk: OnDisk = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| StateError::Deserialize { path: path.display().to_string(), source })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => OnDisk::default(),
            Err(source) => return Err(StateError::Load { path: path.display().to_string(), source }),
        };
        let inner = StateInner { jobs: on_disk.jobs, sessions: on_disk.sessions };
        Ok(Self { path, inner: Mutex::new(inner) })
    }

    fn persist(&self, state: &StateInner) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| StateError::Persist { path: self.path.display().to_string(), source })?;
        }
        let on_disk = OnDisk { jobs: state.jobs.clone(), sessions: state.sessions.clone() };
        let bytes = serde_json::to_vec_pretty(&on_disk)?;
        std::fs::write(&self.path, bytes)
            .map_err(|source| StateError::Persist { path: self.path.display().to_string(), source })
    }

    /// Construct a new `active/implementing` job and persist it.
    pub fn create(
        &self,
        repo: impl Into<String>,
        source_id: impl Into<String>,
        created_at: u64,
        models: ModelSelections,
    ) -> Result<Job, StateError> {
        let repo = repo.into();
        let source_id = source_id.into();
        let id = JobId::generate(&[&source_id, &rfc3339_nanos(created_at)]);
        let job = Job::new(id, repo.clone(), source_id, models, created_at);

        let mut state = self.inner.lock();
        state.jobs.insert(job_key(&repo, &job.id), job.clone());
        self.persist(&state)?;
        Ok(job)
    }

    /// Exact id match, or the unique job within `repo` whose id starts with
    /// `prefix`.
    pub fn find(&self, repo: &str, prefix: &str) -> Result<Job, StateError> {
        let state = self.inner.lock();
        find_in(&state.jobs, repo, prefix)
    }

    pub fn update(
        &self,
        repo: &str,
        id: &str,
        options: UpdateOptions,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");

        if let Some(stage) = options.stage {
            job.stage = stage;
        }
        if let Some(status) = options.status {
            job.status = status;
            if status.is_terminal() {
                job.completed_at = updated_at;
            }
        }
        if let Some(feedback) = options.feedback {
            job.feedback = feedback;
        }
        if let Some((purpose, session_id)) = options.push_session {
            job.push_session(purpose, session_id);
        }
        job.updated_at = updated_at;

        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Append a new, unsealed change to the job's history.
    pub fn append_change(
        &self,
        repo: &str,
        id: &str,
        change_id: ChangeId,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        job.changes.push(Change::new(change_id));
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Append a commit to the job's current (last, unsealed) change.
    pub fn append_commit_to_current_change(
        &self,
        repo: &str,
        id: &str,
        commit_id: CommitId,
        draft_message: impl Into<String>,
        session_id: SessionId,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        let change = current_change_mut(job)?;
        change.commits.push(Commit::new(commit_id, draft_message, session_id));
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Apply optional mutations to the current commit of the job's current
    /// change.
    pub fn update_current_commit(
        &self,
        repo: &str,
        id: &str,
        tests_passed: Option<bool>,
        review: Option<Review>,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        {
            let change = current_change_mut(job)?;
            let commit = change.commits.last_mut().ok_or(StateError::NoCurrentCommit)?;
            if let Some(tests_passed) = tests_passed {
                commit.tests_passed = Some(tests_passed);
            }
            if let Some(review) = review {
                commit.review = Some(review);
            }
        }
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Replace the current commit's id with the one the VCS assigned after
    /// committing the final, formatted message (§4.3.4 step 7 — the commit
    /// the draft message described is amended in place, not duplicated).
    pub fn finalize_current_commit(
        &self,
        repo: &str,
        id: &str,
        commit_id: CommitId,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        let change = current_change_mut(job)?;
        let commit = change.commits.last_mut().ok_or(StateError::NoCurrentCommit)?;
        commit.id = commit_id;
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Seal the job's current change so the next implement iteration that
    /// produces a commit starts a new one (§3 invariant; §4.3.4 step 1's
    /// committing stage is what finalizes a change).
    pub fn seal_current_change(&self, repo: &str, id: &str, updated_at: u64) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        current_change_mut(job)?.sealed = true;
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    pub fn set_project_review(
        &self,
        repo: &str,
        id: &str,
        review: Review,
        updated_at: u64,
    ) -> Result<Job, StateError> {
        let mut state = self.inner.lock();
        let key = find_key(&state.jobs, repo, id)?;
        let job = state.jobs.get_mut(&key).expect("find_key returned a present key");
        job.project_review = Some(review);
        job.updated_at = updated_at;
        let result = job.clone();
        self.persist(&state)?;
        Ok(result)
    }

    /// Jobs for `repo`, filtered per `filter`, sorted by `started_at`
    /// ascending and tie-broken by id.
    pub fn list(&self, repo: &str, filter: ListFilter) -> Vec<Job> {
        let state = self.inner.lock();
        let mut matched: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| j.repo == repo)
            .filter(|j| match filter {
                ListFilter::ActiveOnly => j.is_active(),
                ListFilter::Status(status) => j.status == status,
                ListFilter::All => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.as_str().cmp(b.id.as_str())));
        matched
    }

    /// Mark any `active` job in `repo` whose `updated_at` predates
    /// `now - STALE_WINDOW_MS` as `failed`. Returns the count reaped.
    ///
    /// Scoped to a single repo, mirroring `find`/`update`'s per-repo keying:
    /// whether staleness is repo-scoped or global is implementation-defined
    /// upstream, and this store's lookups are all per-repo.
    pub fn mark_stale_jobs_failed(&self, repo: &str, now: u64) -> Result<usize, StateError> {
        let mut state = self.inner.lock();
        let cutoff = now.saturating_sub(STALE_WINDOW_MS);
        let repo_prefix = format!("{repo}/");
        let mut reaped = 0;
        for (key, job) in state.jobs.iter_mut() {
            if !key.starts_with(&repo_prefix) {
                continue;
            }
            if job.is_active() && job.updated_at < cutoff {
                job.status = Status::Failed;
                job.completed_at = now;
                job.updated_at = now;
                reaped += 1;
                tracing::warn!(job_id = %job.id, "marking stale job failed");
            }
        }
        if reaped > 0 {
            self.persist(&state)?;
        }
        Ok(reaped)
    }

    /// Count of jobs per habit name (the `habit:<name>` source id).
    pub fn count_by_habit(&self) -> HashMap<String, usize> {
        let state = self.inner.lock();
        let mut counts = HashMap::new();
        for job in state.jobs.values() {
            if let Some(name) = job.source_id.strip_prefix("habit:") {
                *counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Create a new `active` AI session record (§4.5 step 3). Idempotent by
    /// id: recreating with the same id and purpose is a no-op; recreating
    /// with a different purpose, or over a session already completed or
    /// failed, is fatal.
    pub fn create_session(
        &self,
        id: SessionId,
        purpose: Purpose,
        started_at: u64,
    ) -> Result<SessionRecord, StateError> {
        let mut state = self.inner.lock();
        if let Some(existing) = state.sessions.get(&id) {
            if existing.status == SessionStatus::Active && existing.purpose == purpose {
                return Ok(existing.clone());
            }
            return Err(StateError::SessionStatusMismatch {
                id,
                existing: existing.status,
                requested: SessionStatus::Active,
            });
        }
        let record = SessionRecord {
            id,
            purpose,
            status: SessionStatus::Active,
            started_at,
            exit_code: None,
            duration_ms: None,
        };
        state.sessions.insert(id, record.clone());
        self.persist(&state)?;
        Ok(record)
    }

    /// Mark a session `completed` or `failed` with its exit code and
    /// duration (§4.5 step 7). `exit_code == 0` is `completed`; anything
    /// else is `failed`.
    pub fn finish_session(
        &self,
        id: SessionId,
        exit_code: i32,
        finished_at: u64,
    ) -> Result<SessionRecord, StateError> {
        let mut state = self.inner.lock();
        let record = state.sessions.get_mut(&id).ok_or(StateError::SessionNotFound(id))?;
        record.status = if exit_code == 0 { SessionStatus::Completed } else { SessionStatus::Failed };
        record.exit_code = Some(exit_code);
        record.duration_ms = Some(finished_at.saturating_sub(record.started_at));
        let result = record.clone();
        self.persist(&state)?;
        Ok(result)
    }

    pub fn find_session(&self, id: SessionId) -> Result<SessionRecord, StateError> {
        let state = self.inner.lock();
        state.sessions.get(&id).cloned().ok_or(StateError::SessionNotFound(id))
    }
}

fn current_change_mut(job: &mut Job) -> Result<&mut Change, StateError> {
    let change = job.last_change_mut().ok_or(StateError::NoCurrentChange)?;
    if change.sealed {
        return Err(StateError::NoCurrentChange);
    }
    Ok(change)
}

fn find_key(jobs: &HashMap<String, Job>, repo: &str, prefix: &str) -> Result<String, StateError> {
    let repo_prefix = format!("{repo}/");
    let exact_key = format!("{repo}/{prefix}");
    if jobs.contains_key(&exact_key) {
        return Ok(exact_key);
    }

    let matches: Vec<&String> = jobs
        .keys()
        .filter(|k| k.starts_with(&repo_prefix) && k[repo_prefix.len()..].starts_with(prefix))
        .collect();

    match matches.len() {
        0 => Err(StateError::JobNotFound(prefix.to_string())),
        1 => Ok(matches[0].clone()),
        count => Err(StateError::AmbiguousJobIdPrefix { prefix: prefix.to_string(), count }),
    }
}

fn find_in(jobs: &HashMap<String, Job>, repo: &str, prefix: &str) -> Result<Job, StateError> {
    let key = find_key(jobs, repo, prefix)?;
    Ok(jobs.get(&key).expect("find_key returned a present key").clone())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
