// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::str::FromStr;

#[test]
fn new_job_is_active_implementing() {
    let job = Job::builder().build();
    assert!(job.is_active());
    assert_eq!(job.stage, Stage::Implementing);
    assert_eq!(job.completed_at, 0);
}

#[test]
fn active_iff_completed_at_zero() {
    let mut job = Job::builder().build();
    assert!(job.is_active());
    job.status = Status::Completed;
    job.completed_at = 42;
    assert!(!job.is_active());
}

#[test]
fn is_habit_detects_prefix() {
    let job = Job::builder().source_id("habit:lint").build();
    assert!(job.is_habit());
    let job = Job::builder().source_id("todo-1").build();
    assert!(!job.is_habit());
}

#[test]
fn status_from_str_is_case_insensitive() {
    assert_eq!(Status::from_str("ACTIVE").unwrap(), Status::Active);
    assert_eq!(Status::from_str("Failed").unwrap(), Status::Failed);
}

#[test]
fn status_from_str_rejects_unknown() {
    let err = Status::from_str("bogus").unwrap_err();
    assert!(matches!(err, JobError::InvalidStatus { .. }));
}

#[test]
fn stage_from_str_rejects_unknown() {
    let err = Stage::from_str("bogus").unwrap_err();
    assert!(matches!(err, JobError::InvalidStage { .. }));
}

#[test]
fn only_last_change_may_be_incomplete() {
    let mut job = Job::builder().build();
    let c1 = Change::new(ChangeId::new("ch1"));
    let mut c2 = Change::new(ChangeId::new("ch2"));
    c2.sealed = true;
    job.changes.push(c2);
    job.changes.push(c1);
    assert!(!job.last_change().unwrap().is_complete());
}

#[test]
fn current_commit_is_last_commit_of_last_change() {
    let mut job = Job::builder().build();
    let mut change = Change::new(ChangeId::new("ch1"));
    change.commits.push(Commit::new(CommitId::new("c1"), "first", SessionId::generate(&["s1"])));
    change.commits.push(Commit::new(CommitId::new("c2"), "second", SessionId::generate(&["s2"])));
    job.changes.push(change);

    assert_eq!(job.current_commit().unwrap().id.as_str(), "c2");
}

#[test]
fn commit_is_reviewed_once_review_set() {
    let mut commit = Commit::new(CommitId::new("c1"), "msg", SessionId::generate(&["s"]));
    assert!(!commit.is_reviewed());
    commit.review = Some(Review {
        outcome: ReviewOutcome::Accept,
        comments: String::new(),
        reviewer_session_id: SessionId::generate(&["r"]),
        reviewed_at: 1,
    });
    assert!(commit.is_reviewed());
}

#[test]
fn needs_new_change_when_there_is_no_history_or_the_last_change_is_sealed() {
    let mut job = Job::builder().build();
    assert!(job.needs_new_change());

    job.changes.push(Change::new(ChangeId::new("ch1")));
    assert!(!job.needs_new_change());

    job.last_change_mut().unwrap().sealed = true;
    assert!(job.needs_new_change());
}

#[test]
fn push_session_appends_in_order() {
    let mut job = Job::builder().build();
    job.push_session(Purpose::Implement, SessionId::generate(&["a"]));
    job.push_session(Purpose::Review, SessionId::generate(&["b"]));
    assert_eq!(job.sessions.len(), 2);
    assert_eq!(job.sessions[0].purpose, Purpose::Implement);
    assert_eq!(job.sessions[1].purpose, Purpose::Review);
}
