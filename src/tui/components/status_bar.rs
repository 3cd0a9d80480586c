//! # StatusBar Component
//!
//! Top line showing the mode, the visible range and whatever the session
//! wants the user to know.
//!
//! Purely presentational: all data arrives as props, so it renders the
//! same thing for the same session every time.
//!
//! ```text
//!  NORMAL  since Wed 01 May  | Block started | syncing
//! ```
//!
//! Store and range errors take priority over the status message, since the
//! last failure is what the user most needs to see.

use chrono::Local;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::core::mode::ControlMode;
use crate::core::state::Session;
use crate::tui::component::Component;

pub struct StatusBar<'a> {
    pub session: &'a Session,
}

impl<'a> StatusBar<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Most recent failure across stores and the range, if any.
    fn error(&self) -> Option<String> {
        let session = self.session;
        session
            .blocks
            .error()
            .or_else(|| session.entries.error())
            .or_else(|| session.projects.error())
            .or_else(|| session.range.error())
            .map(|e| e.to_string())
    }

    fn line(&self) -> Line<'a> {
        let session = self.session;
        let mode = session.mode.mode();
        let mode_style = match mode {
            ControlMode::Insert => Style::default().bg(Color::Green),
            ControlMode::Visual => Style::default().bg(Color::Magenta),
            ControlMode::CommandEntry => Style::default().bg(Color::Yellow),
            ControlMode::Normal => Style::default().bg(Color::Blue),
            ControlMode::Default => Style::default().bg(Color::DarkGray),
        }
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

        let since = session.range.start().with_timezone(&Local).format("%a %d %b");
        let mut spans = vec![
            Span::styled(format!(" {} ", mode.label()), mode_style),
            Span::raw(format!("  since {since}")),
        ];
        if session.range.is_exhausted() {
            spans.push(Span::styled(" (all)", Style::default().fg(Color::DarkGray)));
        }

        if let Some(error) = self.error() {
            spans.push(Span::styled(
                format!(" | {error}"),
                Style::default().fg(Color::Red),
            ));
        } else if !session.status_message.is_empty() {
            spans.push(Span::raw(format!(" | {}", session.status_message)));
        }

        if session.is_busy() {
            spans.push(Span::styled(" | syncing", Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans)
    }
}

impl Component for StatusBar<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.line(), area);
    }
}
