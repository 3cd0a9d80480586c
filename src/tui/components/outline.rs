//! # Outline Component
//!
//! The main view: every block in the visible range, oldest first, each
//! followed by its entries indented by nesting level.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `OutlineState` lives in `TuiState` (scroll offset, row map for clicks)
//! - `Outline` is created each frame with borrowed session data

use chrono::{DateTime, Duration, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use crate::core::mode::ControlMode;
use crate::core::model::{Block, Entry};
use crate::core::state::Session;
use crate::tui::component::Component;

const INDENT: &str = "  ";

/// Persistent layout and scroll state for the outline.
#[derive(Debug, Default)]
pub struct OutlineState {
    /// First visible row.
    pub offset: usize,
    /// What each rendered row points at: `(block, entry)` for entry rows,
    /// `None` for block headers and spacing.
    pub rows: Vec<Option<(usize, usize)>>,
    /// Screen area of the last render, for hit testing.
    pub area: Rect,
}

impl OutlineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry under a screen position, if any.
    pub fn hit_test(&self, column: u16, row: u16) -> Option<(usize, usize)> {
        if !self.area.contains(Position { x: column, y: row }) {
            return None;
        }
        let index = self.offset + (row - self.area.y) as usize;
        self.rows.get(index).copied().flatten()
    }

    /// Move `offset` the minimum amount that keeps `row` on screen.
    fn scroll_to(&mut self, row: usize, height: usize) {
        if height == 0 {
            return;
        }
        if row < self.offset {
            self.offset = row;
        } else if row >= self.offset + height {
            self.offset = row + 1 - height;
        }
        let max_offset = self.rows.len().saturating_sub(height);
        self.offset = self.offset.min(max_offset);
    }
}

pub struct Outline<'a> {
    session: &'a Session,
    state: &'a mut OutlineState,
    now: DateTime<Utc>,
}

impl<'a> Outline<'a> {
    pub fn new(session: &'a Session, state: &'a mut OutlineState, now: DateTime<Utc>) -> Self {
        Self {
            session,
            state,
            now,
        }
    }

    fn block_header(&self, block: &Block, active: bool) -> Line<'a> {
        let start = block.start.with_timezone(&Local);
        let span = match block.end {
            Some(end) => format!(
                "{} - {}",
                start.format("%a %d %b %H:%M"),
                end.with_timezone(&Local).format("%H:%M")
            ),
            None => format!("{} - now", start.format("%a %d %b %H:%M")),
        };

        let mut spans = vec![
            Span::styled(
                if active { "▸ " } else { "  " },
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(span, Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                format!("  {}", format_elapsed(block.elapsed(self.now))),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(project) = &block.project_name {
            spans.push(Span::styled(
                format!("  {project}"),
                Style::default().fg(Color::Magenta),
            ));
        }
        if !block.text.is_empty() {
            spans.push(Span::raw(format!("  {}", block.text)));
        }
        for tag in &block.tags {
            spans.push(Span::styled(format!(" #{tag}"), Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    }

    fn entry_line(&self, entry: &'a Entry, active: bool) -> Line<'a> {
        let mut spans = vec![Span::raw(INDENT.repeat(entry.nesting as usize + 2))];
        if entry.show_todo {
            let marker = if entry.is_done { "[x] " } else { "[ ] " };
            spans.push(Span::styled(marker, Style::default().fg(Color::Green)));
        }

        let text = self.session.display_text(entry);
        let mut style = Style::default();
        if entry.is_done {
            style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
        }
        if active {
            style = match self.session.mode.mode() {
                ControlMode::Insert => style.add_modifier(Modifier::UNDERLINED),
                _ => style.add_modifier(Modifier::REVERSED),
            };
        }
        spans.push(Span::styled(text, style));
        Line::from(spans)
    }
}

impl Component for Outline<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let session = self.session;
        let view = session.view();
        let (active_block, active_entry) = session.position();

        if view.blocks.is_empty() {
            self.state.rows.clear();
            self.state.area = area;
            let hint = if session.is_loaded() {
                "No blocks in range. Press n to start one."
            } else {
                "Loading..."
            };
            frame.render_widget(
                Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
                area,
            );
            return;
        }

        let mut lines = Vec::new();
        let mut rows = Vec::new();
        let mut active_row = 0;
        for (block_index, block) in view.blocks.iter().enumerate() {
            let block_active = block_index == active_block;
            if block_active {
                active_row = lines.len();
            }
            lines.push(self.block_header(block, block_active));
            rows.push(None);

            for (entry_index, entry) in view.entries_of(block_index).iter().enumerate() {
                let active = block_active && entry_index == active_entry;
                if active {
                    active_row = lines.len();
                }
                lines.push(self.entry_line(entry, active));
                rows.push(Some((block_index, entry_index)));
            }
            lines.push(Line::default());
            rows.push(None);
        }

        self.state.rows = rows;
        self.state.area = area;
        self.state.scroll_to(active_row, area.height as usize);

        let offset = self.state.offset;
        let paragraph = Paragraph::new(lines).scroll((offset as u16, 0));
        frame.render_widget(paragraph, area);

        // Typing cursor at the end of the draft
        if session.mode.mode() == ControlMode::Insert
            && let Some(entry) = session.active_entry()
            && active_row >= offset
        {
            let column = INDENT.len() * (entry.nesting as usize + 2)
                + if entry.show_todo { 4 } else { 0 }
                + session.display_text(entry).width();
            let x = area.x.saturating_add(column as u16).min(area.right().saturating_sub(1));
            let y = area.y + (active_row - offset) as u16;
            if y < area.bottom() {
                frame.set_cursor_position(Position { x, y });
            }
        }
    }
}

/// "1h 05m", "12m"
fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes();
    if minutes < 60 {
        format!("{minutes}m")
    } else {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryRemote, block, entry, test_app, ts};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::minutes(12)), "12m");
        assert_eq!(format_elapsed(Duration::minutes(65)), "1h 05m");
        assert_eq!(format_elapsed(Duration::zero()), "0m");
    }

    #[test]
    fn test_scroll_keeps_row_visible() {
        let mut state = OutlineState::new();
        state.rows = vec![None; 20];
        state.scroll_to(12, 5);
        assert_eq!(state.offset, 8);
        state.scroll_to(3, 5);
        assert_eq!(state.offset, 3);
        state.scroll_to(5, 5);
        assert_eq!(state.offset, 3);
    }

    #[test]
    fn test_hit_test_maps_rows_through_offset() {
        let mut state = OutlineState::new();
        state.area = Rect::new(0, 1, 40, 3);
        state.rows = vec![None, Some((0, 0)), Some((0, 1)), None, Some((1, 0))];
        state.offset = 1;
        assert_eq!(state.hit_test(5, 1), Some((0, 0)));
        assert_eq!(state.hit_test(5, 3), None);
        assert_eq!(state.hit_test(5, 0), None);
        assert_eq!(state.hit_test(50, 2), None);
    }

    #[tokio::test]
    async fn test_renders_blocks_with_nested_entries() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed_blocks(vec![block(1, "2024-05-01T08:00:00Z")]);
        let mut todo = entry(11, 1, "ship it");
        todo.show_todo = true;
        let nested = entry(12, 1, "details").indented();
        remote.seed_entries(vec![todo, nested]);

        let now = ts("2024-05-01T15:00:00Z");
        let (app, _rx) = test_app(remote, now).await;

        let mut state = OutlineState::new();
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal
            .draw(|f| Outline::new(&app.session, &mut state, now).render(f, f.area()))
            .unwrap();

        let text = screen(&terminal);
        assert!(text.contains("[ ] ship it"));
        assert!(text.contains("      details"));
        assert_eq!(state.rows[1], Some((0, 0)));
        assert_eq!(state.rows[2], Some((0, 1)));
    }

    #[tokio::test]
    async fn test_older_block_renders_above_newer() {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed_blocks(vec![block(2, "2024-05-01T10:00:00Z"), block(1, "2024-05-01T08:00:00Z")]);

        let now = ts("2024-05-01T15:00:00Z");
        let (app, _rx) = test_app(remote, now).await;

        let mut state = OutlineState::new();
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal
            .draw(|f| Outline::new(&app.session, &mut state, now).render(f, f.area()))
            .unwrap();

        let text = screen(&terminal);
        let older = text.find("block 1").expect("block 1 rendered");
        let newer = text.find("block 2").expect("block 2 rendered");
        assert!(older < newer);
    }
}
