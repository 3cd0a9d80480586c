//! # Key Binding Tables
//!
//! A key press is reduced to a canonical chord string: modifier prefixes in
//! the fixed order `Meta+`, `Shift+`, `Ctrl+`, `Alt+`, followed by the base
//! key name (`"Shift+Tab"`, `"ArrowUp"`, `"{"`). Each mode owns one table
//! that maps chords to commands by exact match. There are no wildcards and
//! no fallback from one mode's table to another's.
//!
//! The tables are plain data. The built-in defaults can be overridden per
//! mode from the config file without touching the dispatch code.

use std::collections::HashMap;

use crate::core::command::{Command, UnknownCommand};
use crate::core::mode::ControlMode;

/// A raw key press as reported by the input layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyInput {
    /// Base key name, e.g. `"a"`, `"Enter"`, `"ArrowDown"`.
    pub key: String,
    pub meta: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// The canonical chord string used as the lookup key.
    pub fn chord(&self) -> String {
        let mut chord = String::new();
        if self.meta {
            chord.push_str("Meta+");
        }
        if self.shift {
            chord.push_str("Shift+");
        }
        if self.ctrl {
            chord.push_str("Ctrl+");
        }
        if self.alt {
            chord.push_str("Alt+");
        }
        chord.push_str(&self.key);
        chord
    }

    /// The printable character this key would type, if any.
    /// Used for pass-through text when no binding matched.
    pub fn printable(&self) -> Option<char> {
        if self.ctrl || self.alt || self.meta {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// One mode's chord → command table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Keymap {
    bindings: HashMap<String, Command>,
}

impl Keymap {
    pub fn from_pairs(pairs: &[(&str, Command)]) -> Self {
        Self {
            bindings: pairs
                .iter()
                .map(|(chord, command)| (chord.to_string(), *command))
                .collect(),
        }
    }

    pub fn lookup(&self, chord: &str) -> Option<Command> {
        self.bindings.get(chord).copied()
    }

    pub fn bind(&mut self, chord: impl Into<String>, command: Command) {
        self.bindings.insert(chord.into(), command);
    }

    pub fn unbind(&mut self, chord: &str) -> Option<Command> {
        self.bindings.remove(chord)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Chords bound to `command`, sorted for stable display.
    pub fn chords_for(&self, command: Command) -> Vec<&str> {
        let mut chords: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, c)| **c == command)
            .map(|(chord, _)| chord.as_str())
            .collect();
        chords.sort_unstable();
        chords
    }

    /// Apply `chord = "command_name"` overrides. `"none"` removes a binding.
    pub fn apply_overrides(
        &mut self,
        overrides: &HashMap<String, String>,
    ) -> Result<(), UnknownCommand> {
        for (chord, name) in overrides {
            if name == "none" {
                self.unbind(chord);
            } else {
                self.bind(chord.clone(), name.parse()?);
            }
        }
        Ok(())
    }
}

/// The four mode tables. `Default` mode has none.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymaps {
    pub normal: Keymap,
    pub insert: Keymap,
    pub visual: Keymap,
    pub command: Keymap,
}

impl Default for Keymaps {
    fn default() -> Self {
        Self {
            normal: default_normal(),
            insert: default_insert(),
            visual: default_visual(),
            command: default_command_entry(),
        }
    }
}

impl Keymaps {
    pub fn for_mode(&self, mode: ControlMode) -> Option<&Keymap> {
        match mode {
            ControlMode::Normal => Some(&self.normal),
            ControlMode::Insert => Some(&self.insert),
            ControlMode::Visual => Some(&self.visual),
            ControlMode::CommandEntry => Some(&self.command),
            ControlMode::Default => None,
        }
    }

    /// Look `key` up in `mode`'s table only.
    pub fn resolve(&self, mode: ControlMode, key: &KeyInput) -> Option<Command> {
        self.for_mode(mode)?.lookup(&key.chord())
    }
}

pub fn default_normal() -> Keymap {
    Keymap::from_pairs(&[
        ("i", Command::SwitchToInsert),
        ("v", Command::SwitchToVisual),
        (":", Command::SwitchToCommandEntry),
        ("n", Command::AddNewBlock),
        ("{", Command::MoveToPreviousContainer),
        ("}", Command::MoveToNextContainer),
        ("Delete", Command::DeleteActiveBlock),
        ("o", Command::AddNewChildEntry),
        ("d", Command::DeleteActiveEntry),
        ("e", Command::EndActiveBlock),
        ("t", Command::ToggleTodo),
        ("x", Command::ToggleDone),
        ("Shift+G", Command::ExpandRange),
        ("ArrowUp", Command::MoveToPreviousElement),
        ("ArrowDown", Command::MoveToNextElement),
        ("q", Command::Quit),
    ])
}

pub fn default_insert() -> Keymap {
    Keymap::from_pairs(&[
        ("Escape", Command::SwitchToNormal),
        ("Enter", Command::AddNewEntry),
        ("Tab", Command::IndentEntry),
        ("Shift+Tab", Command::OutdentEntry),
    ])
}

pub fn default_visual() -> Keymap {
    Keymap::from_pairs(&[
        ("Escape", Command::SwitchToNormal),
        ("ArrowUp", Command::MoveToPreviousElement),
        ("ArrowDown", Command::MoveToNextElement),
    ])
}

pub fn default_command_entry() -> Keymap {
    Keymap::from_pairs(&[
        ("Escape", Command::SwitchToNormal),
        ("Enter", Command::RunPaletteSelection),
        ("ArrowUp", Command::SelectPreviousSuggestion),
        ("ArrowDown", Command::SelectNextSuggestion),
    ])
}
