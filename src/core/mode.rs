//! # Mode Controller
//!
//! Vi-style modal input. Exactly one [`ControlMode`] is active; it changes
//! only in response to the five mode-switch commands.
//!
//! ```text
//!            i                     Escape
//!   Normal ─────► Insert    Insert ──────► Normal
//!   Normal ─────► Visual (v)   Visual ───► Normal
//!   Normal ─────► CommandEntry (:)
//!   any    ─────► Default (logout)
//! ```

use log::debug;
use std::fmt;

use crate::core::command::Command;
use crate::core::keymap::{KeyInput, Keymaps};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControlMode {
    #[default]
    Normal,
    Insert,
    Visual,
    CommandEntry,
    /// No bindings at all, e.g. while logged out.
    Default,
}

impl ControlMode {
    pub fn label(self) -> &'static str {
        match self {
            ControlMode::Normal => "NORMAL",
            ControlMode::Insert => "INSERT",
            ControlMode::Visual => "VISUAL",
            ControlMode::CommandEntry => "COMMAND",
            ControlMode::Default => "DEFAULT",
        }
    }

    /// Leaving one of these modes drops input focus in the view.
    fn holds_focus(self) -> bool {
        matches!(
            self,
            ControlMode::Insert | ControlMode::Visual | ControlMode::CommandEntry
        )
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to a raw key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Bound in the current mode. The key is consumed and the command executed.
    Handled(Command),
    /// Not bound. The key passes through untouched (e.g. text typing).
    PassThrough,
}

/// The result of a mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ControlMode,
    pub to: ControlMode,
    /// The view must drop input focus.
    pub release_focus: bool,
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: ControlMode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// React to a command. Only the mode-switch family changes state.
    /// The target mode is set unconditionally, even if it is already active.
    pub fn on_command(&mut self, command: Command) -> Option<Transition> {
        let to = match command {
            Command::SwitchToNormal => ControlMode::Normal,
            Command::SwitchToInsert => ControlMode::Insert,
            Command::SwitchToVisual => ControlMode::Visual,
            Command::SwitchToCommandEntry => ControlMode::CommandEntry,
            Command::SwitchToDefault => ControlMode::Default,
            _ => return None,
        };
        let from = self.mode;
        self.mode = to;
        if from != to {
            debug!("Control mode {} -> {}", from, to);
        }
        Some(Transition {
            from,
            to,
            release_focus: from.holds_focus() && from != to,
        })
    }

    /// Resolve a key press against the current mode's table.
    pub fn handle_key(&self, keymaps: &Keymaps, key: &KeyInput) -> KeyOutcome {
        match keymaps.resolve(self.mode, key) {
            Some(command) => KeyOutcome::Handled(command),
            None => KeyOutcome::PassThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_normal() {
        assert_eq!(ModeController::new().mode(), ControlMode::Normal);
    }

    #[test]
    fn test_only_mode_switch_commands_transition() {
        let mut modes = ModeController::new();
        assert_eq!(modes.on_command(Command::AddNewEntry), None);
        assert_eq!(modes.on_command(Command::MoveToNextElement), None);
        assert_eq!(modes.mode(), ControlMode::Normal);

        modes.on_command(Command::SwitchToVisual);
        assert_eq!(modes.mode(), ControlMode::Visual);
        modes.on_command(Command::SwitchToDefault);
        assert_eq!(modes.mode(), ControlMode::Default);
    }

    #[test]
    fn test_leaving_focus_modes_releases_focus() {
        let mut modes = ModeController::new();
        let enter = modes.on_command(Command::SwitchToInsert).unwrap();
        assert!(!enter.release_focus);

        let leave = modes.on_command(Command::SwitchToNormal).unwrap();
        assert_eq!(leave.from, ControlMode::Insert);
        assert!(leave.release_focus);

        modes.on_command(Command::SwitchToCommandEntry);
        assert!(modes.on_command(Command::SwitchToNormal).unwrap().release_focus);
    }

    #[test]
    fn test_normal_only_chord_ignored_in_insert() {
        let keymaps = Keymaps::default();
        let mut modes = ModeController::new();
        modes.on_command(Command::SwitchToInsert);

        // "{" is bound in Normal only
        let outcome = modes.handle_key(&keymaps, &KeyInput::new("{"));
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(modes.mode(), ControlMode::Insert);
    }

    #[test]
    fn test_bound_key_is_handled() {
        let keymaps = Keymaps::default();
        let modes = ModeController::new();
        assert_eq!(
            modes.handle_key(&keymaps, &KeyInput::new("i")),
            KeyOutcome::Handled(Command::SwitchToInsert)
        );
    }
}
