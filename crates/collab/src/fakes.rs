// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for every collaborator trait, shared by this crate's
//! own tests and by downstream crates' test-support builds.

use crate::{
    AgentExit, AgentProcess, Config, ConfigError, ConfigLoader, DaemonClient, DaemonError,
    DaemonHandle, EventSink, EventSinkError, SourceError, SourceItem, SourceStore, TestOutcome,
    TestRunError, TestRunner, TranscriptError, TranscriptSource, Vcs, VcsError,
};
use async_trait::async_trait;
use incrementum_core::{ChangeId, CommitId, Event, SessionId, TestCommandResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct FakeConfigLoader {
    configs: Arc<Mutex<HashMap<String, Config>>>,
}

impl FakeConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, repo: impl Into<String>, config: Config) {
        self.configs.lock().insert(repo.into(), config);
    }
}

impl ConfigLoader for FakeConfigLoader {
    fn load(&self, repo: &str) -> Result<Config, ConfigError> {
        self.configs
            .lock()
            .get(repo)
            .cloned()
            .ok_or_else(|| ConfigError::Read {
                path: repo.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no fake config set"),
            })
    }
}

/// A test runner whose per-command exit codes are scripted in advance.
#[derive(Clone, Default)]
pub struct FakeTestRunner {
    exit_codes: Arc<Mutex<HashMap<String, i32>>>,
}

impl FakeTestRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, command: impl Into<String>, exit_code: i32) {
        self.exit_codes.lock().insert(command.into(), exit_code);
    }
}

impl TestRunner for FakeTestRunner {
    fn run_all(&self, _workspace: &Path, commands: &[String]) -> Result<TestOutcome, TestRunError> {
        let scripted = self.exit_codes.lock();
        let results = commands
            .iter()
            .map(|command| TestCommandResult {
                command: command.clone(),
                exit_code: *scripted.get(command).unwrap_or(&0),
            })
            .collect();
        Ok(TestOutcome { results, combined_output: String::new() })
    }
}

/// An in-memory VCS double: a linear chain of commit ids per workspace,
/// with scriptable diff-stat text.
#[derive(Clone)]
pub struct FakeVcs {
    state: Arc<Mutex<FakeVcsState>>,
}

struct FakeVcsState {
    head: CommitId,
    change_id: ChangeId,
    diff_stat: String,
    change_empty: bool,
    next_commit_seq: u64,
}

impl FakeVcs {
    pub fn new(initial_head: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeVcsState {
                head: CommitId::new(initial_head.into()),
                change_id: ChangeId::new("change-1"),
                diff_stat: "No changes.".into(),
                change_empty: true,
                next_commit_seq: 1,
            })),
        }
    }

    /// Simulate the implement stage starting a new logical change (as it
    /// does whenever the job's last change is already sealed).
    pub fn advance_change(&self) -> ChangeId {
        let mut state = self.state.lock();
        let seq = state.next_commit_seq;
        let new_change = ChangeId::new(format!("change-{seq}"));
        state.change_id = new_change.clone();
        new_change
    }

    pub fn set_diff_stat(&self, text: impl Into<String>) {
        self.state.lock().diff_stat = text.into();
    }

    pub fn set_change_empty(&self, empty: bool) {
        self.state.lock().change_empty = empty;
    }

    /// Simulate the AI producing a new commit (as the implement worker
    /// would observe a changed `current_commit_id`).
    pub fn advance_head(&self) -> CommitId {
        let mut state = self.state.lock();
        let seq = state.next_commit_seq;
        state.next_commit_seq += 1;
        let new_head = CommitId::new(format!("commit-{seq}"));
        state.head = new_head.clone();
        new_head
    }
}

impl Vcs for FakeVcs {
    fn current_commit_id(&self, _workspace: &Path) -> Result<CommitId, VcsError> {
        Ok(self.state.lock().head.clone())
    }

    fn current_change_id(&self, _workspace: &Path) -> Result<ChangeId, VcsError> {
        Ok(self.state.lock().change_id.clone())
    }

    fn commit_id_at(&self, _workspace: &Path, _change_id: &ChangeId) -> Result<CommitId, VcsError> {
        Ok(self.state.lock().head.clone())
    }

    fn current_change_empty(&self, _workspace: &Path) -> Result<bool, VcsError> {
        Ok(self.state.lock().change_empty)
    }

    fn diff_stat(&self, _workspace: &Path, _from: &CommitId, _to: &CommitId) -> Result<String, VcsError> {
        Ok(self.state.lock().diff_stat.clone())
    }

    fn commit(&self, _workspace: &Path, _message: &str) -> Result<CommitId, VcsError> {
        Ok(self.state.lock().head.clone())
    }

    fn restore_workspace(&self, _workspace: &Path, commit_id: &CommitId) -> Result<(), VcsError> {
        self.state.lock().head = commit_id.clone();
        Ok(())
    }

    fn update_stale(&self, _workspace: &Path) -> Result<(), VcsError> {
        Ok(())
    }

    fn snapshot(&self, _workspace: &Path) -> Result<CommitId, VcsError> {
        Ok(self.state.lock().head.clone())
    }
}

#[derive(Clone, Default)]
pub struct FakeSourceStore {
    items: Arc<Mutex<HashMap<String, SourceItem>>>,
    pub reopened: Arc<Mutex<Vec<(String, String)>>>,
    pub finished: Arc<Mutex<Vec<String>>>,
    pub artifacts: Arc<Mutex<Vec<(String, String)>>>,
    fail_reopen: Arc<Mutex<bool>>,
}

impl FakeSourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: SourceItem) {
        self.items.lock().insert(item.source_id(), item);
    }

    /// Make the next and all subsequent `reopen` calls fail, for exercising
    /// callers that must join this with another error rather than drop it.
    pub fn fail_reopen(&self) {
        *self.fail_reopen.lock() = true;
    }
}

impl SourceStore for FakeSourceStore {
    fn find(&self, source_id: &str) -> Result<SourceItem, SourceError> {
        self.items.lock().get(source_id).cloned().ok_or_else(|| SourceError::NotFound(source_id.into()))
    }

    fn reopen(&self, source_id: &str, reason: &str) -> Result<(), SourceError> {
        if *self.fail_reopen.lock() {
            return Err(SourceError::Failed(format!("reopen forced to fail for {source_id}")));
        }
        self.reopened.lock().push((source_id.to_string(), reason.to_string()));
        Ok(())
    }

    fn finish(&self, source_id: &str) -> Result<(), SourceError> {
        self.finished.lock().push(source_id.to_string());
        Ok(())
    }

    fn create_artifact(&self, parent_source_id: &str, content: &str) -> Result<String, SourceError> {
        let new_id = format!("{parent_source_id}-artifact-{}", self.artifacts.lock().len());
        self.artifacts.lock().push((parent_source_id.to_string(), content.to_string()));
        Ok(new_id)
    }
}

#[derive(Clone, Default)]
pub struct FakeTranscriptSource {
    transcripts: Arc<Mutex<HashMap<SessionId, String>>>,
}

impl FakeTranscriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session_id: SessionId, transcript: impl Into<String>) {
        self.transcripts.lock().insert(session_id, transcript.into());
    }
}

impl TranscriptSource for FakeTranscriptSource {
    fn transcript(&self, session_id: &SessionId) -> Result<String, TranscriptError> {
        self.transcripts
            .lock()
            .get(session_id)
            .cloned()
            .ok_or_else(|| TranscriptError::NotFound(*session_id))
    }
}

/// Records every appended event in memory, for assertions in worker/
/// pipeline tests.
#[derive(Clone, Default)]
pub struct FakeEventSink {
    pub events: Arc<Mutex<Vec<(Option<String>, Event)>>>,
}

impl FakeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(_, event)| event.clone()).collect()
    }
}

impl EventSink for FakeEventSink {
    fn append(&self, event: Event, id: Option<String>) -> Result<(), EventSinkError> {
        self.events.lock().push((id, event));
        Ok(())
    }
}

/// A single scripted daemon run: the raw lines it streams, in order, and
/// the exit it reports once the stream is drained.
struct FakeAgentProcess {
    lines: std::vec::IntoIter<String>,
    exit: AgentExit,
}

#[async_trait]
impl AgentProcess for FakeAgentProcess {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.next()
    }

    async fn wait(&mut self) -> AgentExit {
        self.exit.clone()
    }
}

/// A daemon double whose `locate` result and next `spawn`'s line stream and
/// exit are scripted in advance.
#[derive(Clone, Default)]
pub struct FakeDaemonClient {
    handle: Arc<Mutex<Option<DaemonHandle>>>,
    script: Arc<Mutex<(Vec<String>, AgentExit)>>,
}

impl FakeDaemonClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handle(&self, handle: DaemonHandle) {
        *self.handle.lock() = Some(handle);
    }

    pub fn script_run(&self, lines: Vec<String>, exit: AgentExit) {
        *self.script.lock() = (lines, exit);
    }
}

#[async_trait]
impl DaemonClient for FakeDaemonClient {
    async fn locate(&self, repo_path: &Path) -> Result<DaemonHandle, DaemonError> {
        self.handle
            .lock()
            .clone()
            .ok_or_else(|| DaemonError::NotRunning(repo_path.display().to_string()))
    }

    async fn spawn(&self, _daemon: &DaemonHandle, _prompt: &str) -> Result<Box<dyn AgentProcess>, DaemonError> {
        let (lines, exit) = self.script.lock().clone();
        Ok(Box::new(FakeAgentProcess { lines: lines.into_iter(), exit }))
    }
}

/// A stand-in for a workspace root used only so fakes have some `Path` to
/// accept; none of the fakes above touch the filesystem.
pub fn fake_workspace() -> PathBuf {
    PathBuf::from("/fake/workspace")
}
