//! # CRUD Synchronization Engine
//!
//! One engine per entity type. It turns mutation intents into remote calls and
//! republishes the collection after every successful mutation.
//!
//! ```text
//!  add(item) ──► add queue ───► [worker: one POST at a time] ──┐
//!  remove(id) ─► remove queue ► [worker: one DELETE at a time] ├─► refetch ─► Action::Sync
//!  edit(item) ─► spawn PUT (concurrent, any completion order) ──┤
//!  range changed ────────────────────────────────────────────────┘
//! ```
//!
//! There is no optimistic merge. The store only ever holds what the most
//! recently *completed* fetch returned. Fetches are never cancelled, so when
//! two overlap, whichever response lands last wins.
//!
//! Failures are reported as `SyncEvent::Failed` and never stop the engine.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch};

use crate::api::{ApiError, Remote, Resource};
use crate::core::action::Action;
use crate::core::model::{Block, Entry, Project, UNSAVED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Block,
    Entry,
    Project,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Block => "block",
            EntityKind::Entry => "entry",
            EntityKind::Project => "project",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Edit,
    Remove,
    Fetch,
}

/// What an engine reports back to the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent<T> {
    /// A fetch completed. `confirmed` carries the persisted item when this
    /// fetch was triggered by an add that asked for confirmation.
    Loaded { items: Vec<T>, confirmed: Option<T> },
    Failed { operation: Operation, error: ApiError },
}

/// A `SyncEvent` tagged with its entity type, so it fits in one `Action`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    Blocks(SyncEvent<Block>),
    Entries(SyncEvent<Entry>),
    Projects(SyncEvent<Project>),
}

/// An entity type the engine can synchronize.
pub trait Synced: Resource {
    const KIND: EntityKind;

    /// Put a fetched list into display order.
    fn arrange(items: Vec<Self>) -> Vec<Self> {
        items
    }

    fn wrap(event: SyncEvent<Self>) -> SyncUpdate;
}

impl Synced for Block {
    const KIND: EntityKind = EntityKind::Block;

    /// The server lists newest first; the outline reads oldest first.
    fn arrange(mut items: Vec<Self>) -> Vec<Self> {
        items.reverse();
        items
    }

    fn wrap(event: SyncEvent<Self>) -> SyncUpdate {
        SyncUpdate::Blocks(event)
    }
}

impl Synced for Entry {
    const KIND: EntityKind = EntityKind::Entry;

    fn wrap(event: SyncEvent<Self>) -> SyncUpdate {
        SyncUpdate::Entries(event)
    }
}

impl Synced for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn wrap(event: SyncEvent<Self>) -> SyncUpdate {
        SyncUpdate::Projects(event)
    }
}

struct AddIntent<T> {
    item: T,
    confirm: bool,
}

/// State shared by the engine handle and its background tasks.
struct Shared<T: Synced> {
    remote: Arc<dyn Remote<T>>,
    range: watch::Receiver<DateTime<Utc>>,
    actions: mpsc::UnboundedSender<Action>,
    pending: AtomicUsize,
}

impl<T: Synced> Shared<T> {
    fn publish(&self, event: SyncEvent<T>) {
        if self.actions.send(Action::Sync(T::wrap(event))).is_err() {
            debug!("Action receiver dropped, discarding {} event", T::KIND);
        }
    }

    fn fail(&self, operation: Operation, error: ApiError) {
        warn!("{} {:?} failed: {}", T::KIND, operation, error);
        self.publish(SyncEvent::Failed { operation, error });
    }

    fn finish_intent(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    /// Fetch the collection for the current range and publish it.
    fn refresh(self: &Arc<Self>, confirmed: Option<T>) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let start = *shared.range.borrow();
            debug!("Fetching {} since {}", T::PATH, start);
            match shared.remote.list(start).await {
                Ok(items) => shared.publish(SyncEvent::Loaded {
                    items: T::arrange(items),
                    confirmed,
                }),
                Err(e) => shared.fail(Operation::Fetch, e),
            }
        });
    }
}

pub struct SyncEngine<T: Synced> {
    shared: Arc<Shared<T>>,
    adds: mpsc::UnboundedSender<AddIntent<T>>,
    removes: mpsc::UnboundedSender<i64>,
}

impl<T: Synced> SyncEngine<T> {
    /// Spawn the workers and issue the initial fetch.
    /// Must be called inside a tokio runtime.
    pub fn start(
        remote: Arc<dyn Remote<T>>,
        range: watch::Receiver<DateTime<Utc>>,
        actions: mpsc::UnboundedSender<Action>,
    ) -> Self {
        let shared = Arc::new(Shared {
            remote,
            range,
            actions,
            pending: AtomicUsize::new(0),
        });

        let (adds, add_rx) = mpsc::unbounded_channel();
        let (removes, remove_rx) = mpsc::unbounded_channel();
        tokio::spawn(add_worker(Arc::clone(&shared), add_rx));
        tokio::spawn(remove_worker(Arc::clone(&shared), remove_rx));
        if T::RANGED {
            tokio::spawn(range_watcher(Arc::clone(&shared)));
        }

        shared.refresh(None);
        Self {
            shared,
            adds,
            removes,
        }
    }

    /// Number of mutation intents whose remote call has not completed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn add(&self, item: T) {
        self.enqueue_add(item, false);
    }

    /// Like `add`, but the fetch that follows carries the persisted item back
    /// in `SyncEvent::Loaded::confirmed`.
    pub fn add_confirmed(&self, item: T) {
        self.enqueue_add(item, true);
    }

    fn enqueue_add(&self, item: T, confirm: bool) {
        debug!("Queueing add of {}", T::KIND);
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.adds.send(AddIntent { item, confirm }).is_err() {
            self.shared.finish_intent();
            warn!("{} add worker is gone, dropping intent", T::KIND);
        }
    }

    /// Edits run concurrently and may complete in any order.
    pub fn edit(&self, item: T) {
        if item.id() == UNSAVED {
            warn!("Ignoring edit of unsaved {}", T::KIND);
            return;
        }
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            info!("Updating {} {}", T::KIND, item.id());
            match shared.remote.update(&item).await {
                Ok(()) => shared.refresh(None),
                Err(e) => shared.fail(Operation::Edit, e),
            }
            shared.finish_intent();
        });
    }

    pub fn remove(&self, id: i64) {
        if id == UNSAVED {
            warn!("Ignoring removal of unsaved {}", T::KIND);
            return;
        }
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if self.removes.send(id).is_err() {
            self.shared.finish_intent();
            warn!("{} remove worker is gone, dropping intent", T::KIND);
        }
    }

    /// Refetch without a mutation.
    pub fn reload(&self) {
        self.shared.refresh(None);
    }
}

async fn add_worker<T: Synced>(shared: Arc<Shared<T>>, mut intents: mpsc::UnboundedReceiver<AddIntent<T>>) {
    while let Some(AddIntent { item, confirm }) = intents.recv().await {
        info!("Creating {}", T::KIND);
        match shared.remote.create(&item).await {
            Ok(created) => {
                debug!("Created {} {}", T::KIND, created.id());
                shared.refresh(confirm.then_some(created));
            }
            Err(e) => shared.fail(Operation::Add, e),
        }
        shared.finish_intent();
    }
}

async fn remove_worker<T: Synced>(shared: Arc<Shared<T>>, mut intents: mpsc::UnboundedReceiver<i64>) {
    while let Some(id) = intents.recv().await {
        info!("Removing {} {}", T::KIND, id);
        match shared.remote.delete(id).await {
            Ok(()) => shared.refresh(None),
            Err(e) => shared.fail(Operation::Remove, e),
        }
        shared.finish_intent();
    }
}

async fn range_watcher<T: Synced>(shared: Arc<Shared<T>>) {
    let mut range = shared.range.clone();
    while range.changed().await.is_ok() {
        debug!("Range changed, refetching {}", T::PATH);
        shared.refresh(None);
        if shared.actions.is_closed() {
            return;
        }
    }
}
