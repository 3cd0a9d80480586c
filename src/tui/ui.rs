use chrono::{DateTime, Utc};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::mode::ControlMode;
use crate::core::state::Session;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{Outline, PaletteOverlay, StatusBar};

pub fn draw_ui(frame: &mut Frame, session: &Session, tui: &mut TuiState, now: DateTime<Utc>) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0)]);
    let [status_area, main_area] = layout.areas(frame.area());

    StatusBar::new(session).render(frame, status_area);
    Outline::new(session, &mut tui.outline, now).render(frame, main_area);

    if session.mode.mode() == ControlMode::CommandEntry {
        PaletteOverlay::new(&session.palette, &session.keymaps.normal).render(frame, main_area);
    }
}
