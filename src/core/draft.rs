//! In-progress text of the entry being edited in Insert mode.
//!
//! Typing only touches the draft. The text reaches the server as one Edit
//! when the draft is committed: on leaving Insert, on adding an entry, or
//! when the cursor moves to another element.
//!
//! Structural edits (indent, outdent, todo/done) of the target go through
//! the draft too. The last one submitted becomes the draft's base, so later
//! edits and the final commit build on it instead of on the stored copy,
//! which is stale until the refetch lands.

use crate::core::model::{Entry, EntryId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    target: Option<EntryId>,
    text: String,
    dirty: bool,
    /// Last version of the target submitted while this draft was open.
    base: Option<Entry>,
}

/// What committing a draft sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftCommit {
    /// Only the text changed; every other field is as stored.
    Text(EntryId, String),
    /// The whole entry, built on an edit already submitted.
    Entry(Entry),
}

impl EntryDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry being edited, if any.
    pub fn target(&self) -> Option<EntryId> {
        self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_editing(&self, id: EntryId) -> bool {
        self.target == Some(id)
    }

    /// Start editing `entry` from its stored text. A no-op if it is
    /// already the target, so unsaved keystrokes survive.
    pub fn begin(&mut self, entry: &Entry) {
        if self.is_editing(entry.id) {
            return;
        }
        self.target = Some(entry.id);
        self.text = entry.text.clone();
        self.dirty = false;
        self.base = None;
    }

    pub fn insert(&mut self, c: char) {
        if self.target.is_some() {
            self.text.push(c);
            self.dirty = true;
        }
    }

    pub fn backspace(&mut self) {
        if self.target.is_some() && self.text.pop().is_some() {
            self.dirty = true;
        }
    }

    /// Finish editing. Returns what to save, if anything.
    pub fn commit(&mut self) -> Option<DraftCommit> {
        let draft = std::mem::take(self);
        match (draft.target, draft.base) {
            (Some(_), Some(base)) if draft.dirty => Some(DraftCommit::Entry(Entry {
                text: draft.text,
                ..base
            })),
            (Some(id), None) if draft.dirty => Some(DraftCommit::Text(id, draft.text)),
            _ => None,
        }
    }

    /// The freshest known version of `stored`: the last submitted one while
    /// it is the target, otherwise `stored` itself.
    pub fn latest(&self, stored: &Entry) -> Entry {
        match &self.base {
            Some(base) if self.is_editing(stored.id) => base.clone(),
            _ => stored.clone(),
        }
    }

    /// Fold unsaved text into another edit of the target and remember that
    /// edit as the base. The draft stays open, but clean.
    pub fn apply_to(&mut self, entry: &mut Entry) {
        if !self.is_editing(entry.id) {
            return;
        }
        if self.dirty {
            entry.text = self.text.clone();
            self.dirty = false;
        }
        self.base = Some(entry.clone());
    }

    /// Drop the draft without saving.
    pub fn discard(&mut self) {
        *self = Self::default();
    }
}
