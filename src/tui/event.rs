use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::core::keymap::KeyInput;

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// A key press, forwarded to core as `Action::Key`.
    Key(KeyInput),
    /// Ctrl+C quits regardless of mode or bindings.
    ForceQuit,
    /// Left click at (column, row).
    Click(u16, u16),
    Resize,
}

/// Translate a crossterm event. Returns `None` for events blocktime ignores
/// (key releases, mouse movement, focus changes, ...).
pub fn translate(event: Event) -> Option<TuiEvent> {
    match event {
        Event::Key(key_event) => {
            // Keyboard enhancement reports releases and repeats too
            if key_event.kind == KeyEventKind::Release {
                return None;
            }
            log::debug!(
                "Key event: {:?} with modifiers {:?}",
                key_event.code,
                key_event.modifiers
            );
            translate_key(key_event)
        }
        Event::Mouse(mouse_event) => match mouse_event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                Some(TuiEvent::Click(mouse_event.column, mouse_event.row))
            }
            _ => None,
        },
        Event::Resize(_, _) => Some(TuiEvent::Resize),
        _ => None,
    }
}

fn translate_key(key_event: KeyEvent) -> Option<TuiEvent> {
    let modifiers = key_event.modifiers;
    if modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c') {
        return Some(TuiEvent::ForceQuit);
    }

    let (key, mut shift) = match key_event.code {
        // Terminals report the shifted character itself; only letters keep the flag,
        // so "Shift+G" is a chord but "{" is not "Shift+{".
        KeyCode::Char(c) => (c.to_string(), c.is_alphabetic() && c.is_uppercase()),
        KeyCode::Up => ("ArrowUp".to_string(), false),
        KeyCode::Down => ("ArrowDown".to_string(), false),
        KeyCode::Left => ("ArrowLeft".to_string(), false),
        KeyCode::Right => ("ArrowRight".to_string(), false),
        KeyCode::Esc => ("Escape".to_string(), false),
        KeyCode::Enter => ("Enter".to_string(), false),
        KeyCode::Tab => ("Tab".to_string(), false),
        KeyCode::BackTab => ("Tab".to_string(), true),
        KeyCode::Backspace => ("Backspace".to_string(), false),
        KeyCode::Delete => ("Delete".to_string(), false),
        KeyCode::Home => ("Home".to_string(), false),
        KeyCode::End => ("End".to_string(), false),
        KeyCode::PageUp => ("PageUp".to_string(), false),
        KeyCode::PageDown => ("PageDown".to_string(), false),
        _ => return None,
    };
    if !matches!(key_event.code, KeyCode::Char(_)) {
        shift |= modifiers.contains(KeyModifiers::SHIFT);
    }

    Some(TuiEvent::Key(KeyInput {
        key,
        meta: modifiers.intersects(KeyModifiers::META | KeyModifiers::SUPER),
        shift,
        ctrl: modifiers.contains(KeyModifiers::CONTROL),
        alt: modifiers.contains(KeyModifiers::ALT),
    }))
}
