//! # Navigation Cursor
//!
//! The `(block, entry)` pointer to the active element. It owns both indices
//! and reads blocks and entry groups as plain data through an [`OutlineView`],
//! so entry-level moves can cascade into block-level moves without any store
//! reaching into another.
//!
//! ```text
//!  block 0  ─┬─ entry 0
//!            └─ entry 1   ◄── (0, 1)
//!  block 1  ─── entry 0       next element ⇒ (1, 0)
//!                             next element ⇒ NeedMoreData
//! ```
//!
//! Indices are never trusted: every read clamps them against the data it is
//! handed, because a refresh may have shrunk either collection since the
//! last move.

use log::debug;

use crate::core::command::Command;
use crate::core::mode::ControlMode;
use crate::core::model::{Block, BlockId, Entry, EntryGroups, EntryId};

/// A borrowed snapshot of what the stores currently expose.
#[derive(Debug, Clone, Copy)]
pub struct OutlineView<'a> {
    pub blocks: &'a [Block],
    pub entries: &'a EntryGroups,
}

impl<'a> OutlineView<'a> {
    pub fn new(blocks: &'a [Block], entries: &'a EntryGroups) -> Self {
        Self { blocks, entries }
    }

    pub fn entries_of(&self, block_index: usize) -> &'a [Entry] {
        match self.blocks.get(block_index) {
            Some(block) => self.entries.for_block(block.id),
            None => &[],
        }
    }

    fn entry_count(&self, block_index: usize) -> usize {
        self.entries_of(block_index).len()
    }
}

/// Result of an element move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Moved,
    /// Nothing earlier or later exists; the cursor stays put.
    Unchanged,
    /// No later block is loaded. More may exist upstream, so the range
    /// should be expanded.
    NeedMoreData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigationCursor {
    block: usize,
    entry: usize,
}

impl NavigationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current `(block, entry)`, clamped to `view`.
    pub fn position(&self, view: OutlineView<'_>) -> (usize, usize) {
        let block = match view.blocks.len() {
            0 => 0,
            n => self.block.min(n - 1),
        };
        let entry = match view.entry_count(block) {
            0 => 0,
            n => self.entry.min(n - 1),
        };
        (block, entry)
    }

    /// Store the clamped position, so later arithmetic starts from valid indices.
    pub fn revalidate(&mut self, view: OutlineView<'_>) {
        (self.block, self.entry) = self.position(view);
    }

    /// Re-anchor on block `anchor` after the block list was replaced. Older
    /// blocks arriving at the front would otherwise shift the cursor onto a
    /// different block.
    pub fn follow_block(&mut self, view: OutlineView<'_>, anchor: Option<BlockId>) {
        if let Some(index) = anchor.and_then(|id| view.blocks.iter().position(|b| b.id == id)) {
            if index != self.block {
                debug!("Active block {} moved from index {} to {}", view.blocks[index].id, self.block, index);
                self.block = index;
            }
        }
        self.revalidate(view);
    }

    pub fn active_block<'a>(&self, view: OutlineView<'a>) -> Option<&'a Block> {
        view.blocks.get(self.position(view).0)
    }

    pub fn active_entry<'a>(&self, view: OutlineView<'a>) -> Option<&'a Entry> {
        let (block, entry) = self.position(view);
        view.entries_of(block).get(entry)
    }

    pub fn move_to_previous_element(&mut self, view: OutlineView<'_>) -> Movement {
        self.revalidate(view);
        if self.entry > 0 {
            self.entry -= 1;
            return Movement::Moved;
        }
        if self.move_to_previous_container(view) {
            self.entry = view.entry_count(self.block).saturating_sub(1);
            return Movement::Moved;
        }
        Movement::Unchanged
    }

    pub fn move_to_next_element(&mut self, view: OutlineView<'_>) -> Movement {
        self.revalidate(view);
        if self.entry + 1 < view.entry_count(self.block) {
            self.entry += 1;
            return Movement::Moved;
        }
        if self.move_to_next_container(view) {
            self.entry = 0;
            return Movement::Moved;
        }
        Movement::NeedMoreData
    }

    /// Step to the previous block. Leaves the entry index alone; callers
    /// decide whether to reset it.
    pub fn move_to_previous_container(&mut self, view: OutlineView<'_>) -> bool {
        self.revalidate(view);
        if self.block == 0 {
            return false;
        }
        self.block -= 1;
        true
    }

    pub fn move_to_next_container(&mut self, view: OutlineView<'_>) -> bool {
        self.revalidate(view);
        if self.block + 1 >= view.blocks.len() {
            return false;
        }
        self.block += 1;
        true
    }

    pub fn reset_entry(&mut self) {
        self.entry = 0;
    }

    /// Absolute selection, e.g. by pointer. Asks for Insert mode unless it
    /// is already active.
    pub fn activate_entry(&mut self, block: usize, entry: usize, mode: ControlMode) -> Option<Command> {
        self.block = block;
        self.entry = entry;
        (mode != ControlMode::Insert).then_some(Command::SwitchToInsert)
    }

    /// Point at block `id`, first entry. Returns `false` if it is not loaded.
    pub fn focus_block(&mut self, view: OutlineView<'_>, id: BlockId) -> bool {
        match view.blocks.iter().position(|b| b.id == id) {
            Some(index) => {
                self.block = index;
                self.entry = 0;
                true
            }
            None => false,
        }
    }

    /// Point at a freshly persisted entry: its block, and its position in
    /// that block's list (the last one if it cannot be found by identity).
    pub fn focus_entry(&mut self, view: OutlineView<'_>, added: &Entry) -> bool {
        let Some(parent) = added.parent else {
            return false;
        };
        if !self.focus_block(view, parent) {
            return false;
        }
        let siblings = view.entries.for_block(parent);
        self.entry = siblings
            .iter()
            .position(|e| e.id == added.id)
            .unwrap_or_else(|| siblings.len().saturating_sub(1));
        true
    }

    /// A new top-level entry for the active block.
    pub fn new_entry_below_active(&self, view: OutlineView<'_>) -> Option<Entry> {
        let block = self.active_block(view)?;
        Some(Entry::new_under(block.id, 0))
    }

    /// A new entry one level deeper than the active entry.
    pub fn new_child_entry(&self, view: OutlineView<'_>) -> Option<Entry> {
        let block = self.active_block(view)?;
        let nesting = self.active_entry(view).map_or(0, |e| e.nesting + 1);
        Some(Entry::new_under(block.id, nesting))
    }

    /// Identity of the entry to remove. Steps back one place if it was the
    /// last in its block, so the cursor stays in range after the refetch.
    pub fn delete_active_entry(&mut self, view: OutlineView<'_>) -> Option<EntryId> {
        self.revalidate(view);
        let id = self.active_entry(view)?.id;
        if self.entry > 0 && self.entry + 1 == view.entry_count(self.block) {
            self.entry -= 1;
        }
        Some(id)
    }

    /// Identity of the block to remove, stepping back if it was the last one.
    pub fn delete_active_block(&mut self, view: OutlineView<'_>) -> Option<BlockId> {
        self.revalidate(view);
        let id = self.active_block(view)?.id;
        if self.block > 0 && self.block + 1 == view.blocks.len() {
            self.block -= 1;
        }
        self.entry = 0;
        Some(id)
    }
}
