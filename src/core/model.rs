//! # Data Model
//!
//! The three entity types, in the flat snake_case shape the REST API speaks.
//! Identity `0` means "not persisted yet"; the server hands out real ids.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type BlockId = i64;
pub type EntryId = i64;
pub type ProjectId = i64;

/// Identity of an entity that has not been persisted yet.
pub const UNSAVED: i64 = 0;

/// Grouping key for entries whose parent block is unknown.
pub const ORPHANED: BlockId = -1;

/// A timed container: one tracked span of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "block_id")]
    pub id: BlockId,
    pub text: String,
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub project_name: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    /// Duration as last computed by the server.
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Block {
    /// A fresh, unsaved block starting at `now`.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            id: UNSAVED,
            text: String::new(),
            project: None,
            project_name: None,
            start: now,
            end: None,
            duration: 0,
            tags: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Time covered so far; open blocks run until `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        let until = self.end.unwrap_or(now);
        (until - self.start).max(Duration::zero())
    }
}

/// A single outline line inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "entry_id")]
    pub id: EntryId,
    pub parent: Option<BlockId>,
    pub nesting: u32,
    pub text: String,
    pub show_todo: bool,
    pub is_done: bool,
}

impl Entry {
    /// A fresh, unsaved, empty entry under `parent`.
    pub fn new_under(parent: BlockId, nesting: u32) -> Self {
        Self {
            id: UNSAVED,
            parent: Some(parent),
            nesting,
            text: String::new(),
            show_todo: false,
            is_done: false,
        }
    }

    pub fn indented(&self) -> Self {
        Self {
            nesting: self.nesting + 1,
            ..self.clone()
        }
    }

    /// `None` when already at the outermost level.
    pub fn outdented(&self) -> Option<Self> {
        let nesting = self.nesting.checked_sub(1)?;
        Some(Self {
            nesting,
            ..self.clone()
        })
    }

    pub fn todo_toggled(&self) -> Self {
        Self {
            show_todo: !self.show_todo,
            ..self.clone()
        }
    }

    pub fn done_toggled(&self) -> Self {
        Self {
            is_done: !self.is_done,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "project_id")]
    pub id: ProjectId,
    pub name: String,
    pub archived: bool,
    pub color: Option<i64>,
}

impl Project {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: UNSAVED,
            name: name.into(),
            archived: false,
            color: None,
        }
    }
}

/// Entries grouped by the identity of their parent block, in fetch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryGroups {
    by_parent: HashMap<BlockId, Vec<Entry>>,
}

impl EntryGroups {
    pub fn group(entries: Vec<Entry>) -> Self {
        let mut by_parent: HashMap<BlockId, Vec<Entry>> = HashMap::new();
        for entry in entries {
            by_parent
                .entry(entry.parent.unwrap_or(ORPHANED))
                .or_default()
                .push(entry);
        }
        Self { by_parent }
    }

    /// Entries of `block`, empty if it has none.
    pub fn for_block(&self, block: BlockId) -> &[Entry] {
        self.by_parent.get(&block).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, block: BlockId) -> usize {
        self.for_block(block).len()
    }

    pub fn orphans(&self) -> &[Entry] {
        self.for_block(ORPHANED)
    }

    pub fn total(&self) -> usize {
        self.by_parent.values().map(Vec::len).sum()
    }
}
