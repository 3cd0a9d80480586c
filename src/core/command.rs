//! # Commands
//!
//! Every user intent that travels over the command bus is a `Command`.
//! The set is closed: handlers `match` on it exhaustively, and key tables,
//! config files and the command palette all refer to the same variants.
//!
//! Commands carry no payload. A handler reads whatever it needs (the active
//! block, the current mode, ...) from the session it is handed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandFamily {
    ModeSwitch,
    Navigation,
    Crud,
    Auth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    // Mode switches
    SwitchToNormal,
    SwitchToInsert,
    SwitchToVisual,
    SwitchToCommandEntry,
    SwitchToDefault,

    // Navigation
    MoveToPreviousElement,
    MoveToNextElement,
    MoveToPreviousContainer,
    MoveToNextContainer,
    ExpandRange,
    SelectPreviousSuggestion,
    SelectNextSuggestion,
    RunPaletteSelection,

    // CRUD
    AddNewBlock,
    DeleteActiveBlock,
    EndActiveBlock,
    AddNewEntry,
    AddNewChildEntry,
    DeleteActiveEntry,
    IndentEntry,
    OutdentEntry,
    ToggleTodo,
    ToggleDone,

    // Auth / session
    Logout,
    Quit,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Command; 25] = [
        Command::SwitchToNormal,
        Command::SwitchToInsert,
        Command::SwitchToVisual,
        Command::SwitchToCommandEntry,
        Command::SwitchToDefault,
        Command::MoveToPreviousElement,
        Command::MoveToNextElement,
        Command::MoveToPreviousContainer,
        Command::MoveToNextContainer,
        Command::ExpandRange,
        Command::SelectPreviousSuggestion,
        Command::SelectNextSuggestion,
        Command::RunPaletteSelection,
        Command::AddNewBlock,
        Command::DeleteActiveBlock,
        Command::EndActiveBlock,
        Command::AddNewEntry,
        Command::AddNewChildEntry,
        Command::DeleteActiveEntry,
        Command::IndentEntry,
        Command::OutdentEntry,
        Command::ToggleTodo,
        Command::ToggleDone,
        Command::Logout,
        Command::Quit,
    ];

    pub fn family(self) -> CommandFamily {
        use Command::*;
        match self {
            SwitchToNormal | SwitchToInsert | SwitchToVisual | SwitchToCommandEntry
            | SwitchToDefault => CommandFamily::ModeSwitch,
            MoveToPreviousElement
            | MoveToNextElement
            | MoveToPreviousContainer
            | MoveToNextContainer
            | ExpandRange
            | SelectPreviousSuggestion
            | SelectNextSuggestion
            | RunPaletteSelection => CommandFamily::Navigation,
            AddNewBlock | DeleteActiveBlock | EndActiveBlock | AddNewEntry | AddNewChildEntry
            | DeleteActiveEntry | IndentEntry | OutdentEntry | ToggleTodo | ToggleDone => {
                CommandFamily::Crud
            }
            Logout | Quit => CommandFamily::Auth,
        }
    }

    /// Human-readable label, shown in the command palette.
    pub fn label(self) -> &'static str {
        use Command::*;
        match self {
            SwitchToNormal => "keyboard: switch to normal mode",
            SwitchToInsert => "keyboard: switch to insert mode",
            SwitchToVisual => "keyboard: switch to visual mode",
            SwitchToCommandEntry => "keyboard: switch to command mode",
            SwitchToDefault => "keyboard: switch to default mode",
            MoveToPreviousElement => "outliner: move to previous entry",
            MoveToNextElement => "outliner: move to next entry",
            MoveToPreviousContainer => "outliner: move to previous block",
            MoveToNextContainer => "outliner: move to next block",
            ExpandRange => "outliner: load earlier blocks",
            SelectPreviousSuggestion => "palette: select previous suggestion",
            SelectNextSuggestion => "palette: select next suggestion",
            RunPaletteSelection => "palette: run selection",
            AddNewBlock => "outliner: add new block",
            DeleteActiveBlock => "outliner: delete active block",
            EndActiveBlock => "outliner: end active block now",
            AddNewEntry => "outliner: add new entry",
            AddNewChildEntry => "outliner: add new child entry",
            DeleteActiveEntry => "outliner: delete active entry",
            IndentEntry => "outliner: indent entry",
            OutdentEntry => "outliner: outdent entry",
            ToggleTodo => "outliner: toggle todo",
            ToggleDone => "outliner: toggle done",
            Logout => "auth: logout",
            Quit => "session: quit",
        }
    }

    /// The snake_case name used in config files.
    pub fn name(self) -> &'static str {
        use Command::*;
        match self {
            SwitchToNormal => "switch_to_normal",
            SwitchToInsert => "switch_to_insert",
            SwitchToVisual => "switch_to_visual",
            SwitchToCommandEntry => "switch_to_command_entry",
            SwitchToDefault => "switch_to_default",
            MoveToPreviousElement => "move_to_previous_element",
            MoveToNextElement => "move_to_next_element",
            MoveToPreviousContainer => "move_to_previous_container",
            MoveToNextContainer => "move_to_next_container",
            ExpandRange => "expand_range",
            SelectPreviousSuggestion => "select_previous_suggestion",
            SelectNextSuggestion => "select_next_suggestion",
            RunPaletteSelection => "run_palette_selection",
            AddNewBlock => "add_new_block",
            DeleteActiveBlock => "delete_active_block",
            EndActiveBlock => "end_active_block",
            AddNewEntry => "add_new_entry",
            AddNewChildEntry => "add_new_child_entry",
            DeleteActiveEntry => "delete_active_entry",
            IndentEntry => "indent_entry",
            OutdentEntry => "outdent_entry",
            ToggleTodo => "toggle_todo",
            ToggleDone => "toggle_done",
            Logout => "logout",
            Quit => "quit",
        }
    }

    /// Whether the palette offers this command. Palette plumbing itself is hidden.
    pub fn is_user_facing(self) -> bool {
        !matches!(
            self,
            Command::SelectPreviousSuggestion
                | Command::SelectNextSuggestion
                | Command::RunPaletteSelection
                | Command::SwitchToCommandEntry
                | Command::SwitchToDefault
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}
