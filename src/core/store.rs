//! # Entity Stores
//!
//! Each store exclusively owns one collection and is its only mutator. The
//! collection is replaced wholesale by every completed fetch; mutations go to
//! the store's [`SyncEngine`] and only show up once the refetch lands.
//!
//! ```text
//! Store<T>
//! ├── items: Vec<T>          // last completed fetch
//! ├── loaded: bool           // false until the first fetch completes
//! ├── error: Option<ApiError>// last failure, cleared by the next fetch
//! └── engine: SyncEngine<T>
//! ```

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::api::ApiError;
use crate::core::model::{Block, BlockId, Entry, EntryGroups, EntryId, Project, ProjectId};
use crate::core::sync::{SyncEngine, SyncEvent, Synced};

pub struct Store<T: Synced> {
    items: Vec<T>,
    loaded: bool,
    error: Option<ApiError>,
    engine: SyncEngine<T>,
}

impl<T: Synced> Store<T> {
    pub fn new(engine: SyncEngine<T>) -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
            error: None,
            engine,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    /// Mutations submitted but not yet answered by the server.
    pub fn pending(&self) -> usize {
        self.engine.pending()
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn position(&self, id: i64) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn add(&self, item: T) {
        self.engine.add(item);
    }

    pub fn add_confirmed(&self, item: T) {
        self.engine.add_confirmed(item);
    }

    pub fn edit(&self, item: T) {
        self.engine.edit(item);
    }

    pub fn remove(&self, id: i64) {
        self.engine.remove(id);
    }

    pub fn reload(&self) {
        self.engine.reload();
    }

    /// Apply an engine report. Returns the confirmed item of an add, if any.
    pub fn apply(&mut self, event: SyncEvent<T>) -> Option<T> {
        match event {
            SyncEvent::Loaded { items, confirmed } => {
                debug!("{} store now holds {} items", T::KIND, items.len());
                self.items = items;
                self.loaded = true;
                self.error = None;
                confirmed
            }
            SyncEvent::Failed { operation, error } => {
                warn!("{} store keeps last state after {:?} failure", T::KIND, operation);
                self.error = Some(error);
                None
            }
        }
    }
}

pub type BlockStore = Store<Block>;

impl Store<Block> {
    /// Submit a fresh block starting at `now`. The persisted block comes back
    /// as the confirmation of the following fetch.
    pub fn add_new(&self, now: DateTime<Utc>) {
        self.add_confirmed(Block::starting_at(now));
    }

    /// Close the block `id` at `now`. Returns `false` if it is unknown or
    /// already closed.
    pub fn end_now(&self, id: BlockId, now: DateTime<Utc>) -> bool {
        match self.get(id) {
            Some(block) if block.is_open() => {
                self.edit(Block {
                    end: Some(now),
                    ..block.clone()
                });
                true
            }
            _ => false,
        }
    }
}

/// Entries plus their grouping by parent block.
pub struct EntryStore {
    inner: Store<Entry>,
    groups: EntryGroups,
}

impl EntryStore {
    pub fn new(engine: SyncEngine<Entry>) -> Self {
        Self {
            inner: Store::new(engine),
            groups: EntryGroups::default(),
        }
    }

    pub fn groups(&self) -> &EntryGroups {
        &self.groups
    }

    pub fn items(&self) -> &[Entry] {
        self.inner.items()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.inner.error()
    }

    pub fn pending(&self) -> usize {
        self.inner.pending()
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.inner.get(id)
    }

    pub fn add_confirmed(&self, entry: Entry) {
        self.inner.add_confirmed(entry);
    }

    pub fn edit(&self, entry: Entry) {
        self.inner.edit(entry);
    }

    /// Replace the text of entry `id`, keeping every other field as stored.
    pub fn edit_text(&self, id: EntryId, text: String) -> bool {
        match self.inner.get(id) {
            Some(entry) if entry.text != text => {
                self.inner.edit(Entry {
                    text,
                    ..entry.clone()
                });
                true
            }
            Some(_) => false,
            None => {
                warn!("Entry {} vanished before its text was saved", id);
                false
            }
        }
    }

    pub fn remove(&self, id: EntryId) {
        self.inner.remove(id);
    }

    pub fn apply(&mut self, event: SyncEvent<Entry>) -> Option<Entry> {
        let loaded = matches!(event, SyncEvent::Loaded { .. });
        let confirmed = self.inner.apply(event);
        if loaded {
            self.groups = EntryGroups::group(self.inner.items().to_vec());
        }
        confirmed
    }
}

/// Projects can be archived but never deleted.
pub struct ProjectStore {
    inner: Store<Project>,
}

impl ProjectStore {
    pub fn new(engine: SyncEngine<Project>) -> Self {
        Self {
            inner: Store::new(engine),
        }
    }

    pub fn items(&self) -> &[Project] {
        self.inner.items()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.inner.error()
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.inner.get(id)
    }

    pub fn unarchived(&self) -> impl Iterator<Item = &Project> {
        self.inner.items().iter().filter(|p| !p.archived)
    }

    /// Exact, case-insensitive name match among all projects.
    pub fn resolve_by_name(&self, name: &str) -> Option<&Project> {
        let name = name.trim();
        self.inner
            .items()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn add_named(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.inner.add(Project::named(name));
        true
    }

    pub fn edit(&self, project: Project) {
        self.inner.edit(project);
    }

    pub fn archive(&self, id: ProjectId) -> bool {
        self.set_archived(id, true)
    }

    pub fn unarchive(&self, id: ProjectId) -> bool {
        self.set_archived(id, false)
    }

    fn set_archived(&self, id: ProjectId, archived: bool) -> bool {
        match self.inner.get(id) {
            Some(project) if project.archived != archived => {
                self.inner.edit(Project {
                    archived,
                    ..project.clone()
                });
                true
            }
            _ => false,
        }
    }

    pub fn apply(&mut self, event: SyncEvent<Project>) -> Option<Project> {
        self.inner.apply(event)
    }
}
