//! Command palette for CommandEntry mode.
//!
//! Typed text filters the user-facing commands by label, case-insensitively.
//! Running the palette executes the selected suggestion.

use crate::core::command::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    query: String,
    selected: usize,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn reset(&mut self) {
        self.query.clear();
        self.selected = 0;
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
    }

    pub fn pop(&mut self) {
        if self.query.pop().is_some() {
            self.selected = 0;
        }
    }

    pub fn suggestions(&self) -> Vec<Command> {
        let needle = self.query.to_lowercase();
        Command::ALL
            .into_iter()
            .filter(|c| c.is_user_facing())
            .filter(|c| c.label().to_lowercase().contains(&needle))
            .collect()
    }

    /// Index into `suggestions()`, clamped.
    pub fn selected_index(&self) -> usize {
        self.selected.min(self.suggestions().len().saturating_sub(1))
    }

    pub fn selection(&self) -> Option<Command> {
        self.suggestions().get(self.selected_index()).copied()
    }

    pub fn select_next(&mut self) {
        let count = self.suggestions().len();
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected_index().saturating_sub(1);
    }
}
