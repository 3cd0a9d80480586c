//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

use crate::api::{ApiError, Remote, Resource, SessionRemote};
use crate::core::action::{Action, update};
use crate::core::keymap::Keymaps;
use crate::core::model::{Block, BlockId, Entry, EntryId, Project, ProjectId};
use crate::core::state::{App, Remotes, Session};

pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap_or_else(|e| panic!("bad timestamp {s:?}: {e}"))
        .with_timezone(&Utc)
}

pub fn block(id: BlockId, start: &str) -> Block {
    Block {
        id,
        text: format!("block {id}"),
        ..Block::starting_at(ts(start))
    }
}

pub fn entry(id: EntryId, parent: BlockId, text: &str) -> Entry {
    Entry {
        id,
        text: text.to_string(),
        ..Entry::new_under(parent, 0)
    }
}

pub fn project(id: ProjectId, name: &str, archived: bool) -> Project {
    Project {
        id,
        archived,
        ..Project::named(name)
    }
}

/// Wait for the next action a background task sends, failing after a second.
pub async fn next_action(rx: &mut mpsc::UnboundedReceiver<Action>) -> Action {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for an action")
        .expect("action channel closed")
}

/// Feed background actions into `app` until none arrives for a short while.
pub async fn settle(app: &mut App, rx: &mut mpsc::UnboundedReceiver<Action>) {
    while let Ok(Some(action)) = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await {
        update(app, action);
    }
}

/// A started `App` backed by `remote`, with everything initially loaded.
pub async fn test_app(
    remote: Arc<MemoryRemote>,
    now: DateTime<Utc>,
) -> (App, mpsc::UnboundedReceiver<Action>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = Session::start(Remotes::shared(remote), Keymaps::default(), tx, now);
    let mut app = App::new(session);
    settle(&mut app, &mut rx).await;
    (app, rx)
}

/// Holds calls of one operation in flight until released.
#[derive(Clone)]
pub struct Gate(Arc<Semaphore>);

impl Gate {
    pub fn release_one(&self) {
        self.0.add_permits(1);
    }

    pub fn release_all(&self) {
        self.0.add_permits(1024);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: &'static str,
    pub path: &'static str,
}

#[derive(Default)]
pub struct MemoryState {
    blocks: Vec<Block>,
    entries: Vec<Entry>,
    projects: Vec<Project>,
    block_starts: VecDeque<DateTime<Utc>>,
    failures: HashMap<&'static str, VecDeque<ApiError>>,
    gates: HashMap<&'static str, Gate>,
    calls: Vec<Call>,
    in_flight: HashMap<&'static str, usize>,
    max_in_flight: HashMap<&'static str, usize>,
}

/// An in-memory stand-in for the REST server.
///
/// Blocks are listed newest first and filtered by range start, like the
/// real server. Entries and projects ignore the range.
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
    next_id: AtomicI64,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity types the fake can store.
pub trait Stored: Resource {
    fn table(state: &mut MemoryState) -> &mut Vec<Self>;
    fn assign_id(&mut self, id: i64);

    /// What a list call returns for range start `start`.
    fn listed(table: &[Self], _start: DateTime<Utc>) -> Vec<Self> {
        table.to_vec()
    }
}

impl Stored for Block {
    fn table(state: &mut MemoryState) -> &mut Vec<Self> {
        &mut state.blocks
    }
    fn assign_id(&mut self, id: i64) {
        self.id = id;
    }
    fn listed(table: &[Self], start: DateTime<Utc>) -> Vec<Self> {
        let mut blocks: Vec<Block> = table.iter().filter(|b| b.start >= start).cloned().collect();
        blocks.sort_by(|a, b| b.start.cmp(&a.start));
        blocks
    }
}

impl Stored for Entry {
    fn table(state: &mut MemoryState) -> &mut Vec<Self> {
        &mut state.entries
    }
    fn assign_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Stored for Project {
    fn table(state: &mut MemoryState) -> &mut Vec<Self> {
        &mut state.projects
    }
    fn assign_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Counts a call as in flight until dropped.
struct InFlight<'a> {
    remote: &'a MemoryRemote,
    op: &'static str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(n) = self.remote.lock().in_flight.get_mut(self.op) {
            *n -= 1;
        }
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            next_id: AtomicI64::new(1000),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn seed_blocks(&self, blocks: Vec<Block>) {
        self.lock().blocks = blocks;
    }

    pub fn seed_entries(&self, entries: Vec<Entry>) {
        self.lock().entries = entries;
    }

    pub fn seed_projects(&self, projects: Vec<Project>) {
        self.lock().projects = projects;
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.lock().entries.clone()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.lock().projects.clone()
    }

    /// Queue an answer for `next_before`. Without one, the answer is derived
    /// from the stored blocks.
    pub fn push_block_start(&self, start: DateTime<Utc>) {
        self.lock().block_starts.push_back(start);
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: &'static str, error: ApiError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    pub fn fail_next_before(&self, error: ApiError) {
        self.fail_next("next_before", error);
    }

    fn hold(&self, op: &'static str) -> Gate {
        let gate = Gate(Arc::new(Semaphore::new(0)));
        self.lock().gates.insert(op, gate.clone());
        gate
    }

    pub fn hold_creates(&self) -> Gate {
        self.hold("create")
    }

    pub fn hold_updates(&self) -> Gate {
        self.hold("update")
    }

    pub fn hold_deletes(&self) -> Gate {
        self.hold("delete")
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_named(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn calls_on(&self, op: &str, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.op == op && c.path == path)
            .count()
    }

    /// Highest number of `op` calls that were in flight at once.
    pub fn max_concurrent(&self, op: &str) -> usize {
        self.lock().max_in_flight.get(op).copied().unwrap_or(0)
    }

    pub async fn wait_for_calls(&self, op: &str, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(1), async {
            while self.calls_named(op) < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "expected {count} {op} calls, saw {}", self.calls_named(op));
    }

    /// Record the call, wait at its gate, then return any injected failure.
    async fn enter(&self, op: &'static str, path: &'static str) -> (InFlight<'_>, Option<ApiError>) {
        let gate = {
            let mut state = self.lock();
            state.calls.push(Call { op, path });
            let n = state.in_flight.entry(op).or_default();
            *n += 1;
            let n = *n;
            let max = state.max_in_flight.entry(op).or_default();
            *max = (*max).max(n);
            state.gates.get(op).cloned()
        };
        let guard = InFlight { remote: self, op };
        if let Some(Gate(semaphore)) = gate {
            if let Ok(permit) = semaphore.acquire().await {
                permit.forget();
            }
        }
        let failure = self.lock().failures.get_mut(op).and_then(VecDeque::pop_front);
        (guard, failure)
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::Api {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

#[async_trait]
impl<T: Stored> Remote<T> for MemoryRemote {
    async fn list(&self, start: DateTime<Utc>) -> Result<Vec<T>, ApiError> {
        let (_call, failure) = self.enter("list", T::PATH).await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut state = self.lock();
        Ok(T::listed(T::table(&mut state), start))
    }

    async fn create(&self, item: &T) -> Result<T, ApiError> {
        let (_call, failure) = self.enter("create", T::PATH).await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut created = item.clone();
        created.assign_id(self.next_id.fetch_add(1, Ordering::SeqCst));
        T::table(&mut self.lock()).push(created.clone());
        Ok(created)
    }

    async fn update(&self, item: &T) -> Result<(), ApiError> {
        let (_call, failure) = self.enter("update", T::PATH).await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut state = self.lock();
        let table = T::table(&mut state);
        match table.iter_mut().find(|stored| stored.id() == item.id()) {
            Some(stored) => {
                *stored = item.clone();
                Ok(())
            }
            None => Err(Self::not_found(T::PATH)),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let (_call, failure) = self.enter("delete", T::PATH).await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut state = self.lock();
        let table = T::table(&mut state);
        let before = table.len();
        table.retain(|stored| stored.id() != id);
        if table.len() == before {
            return Err(Self::not_found(T::PATH));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionRemote for MemoryRemote {
    async fn next_before(&self, before: DateTime<Utc>) -> Result<DateTime<Utc>, ApiError> {
        let (_call, failure) = self.enter("next_before", "blocks").await;
        if let Some(e) = failure {
            return Err(e);
        }
        let mut state = self.lock();
        if let Some(start) = state.block_starts.pop_front() {
            return Ok(start);
        }
        state
            .blocks
            .iter()
            .map(|b| b.start)
            .filter(|start| *start < before)
            .max()
            .ok_or_else(|| Self::not_found("older block"))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        let (_call, failure) = self.enter("logout", "logout").await;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
