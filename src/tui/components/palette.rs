//! # Palette Overlay
//!
//! Centered popup shown in CommandEntry mode: the typed query on top, the
//! matching commands below with the selection highlighted.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::core::keymap::Keymap;
use crate::core::palette::Palette;
use crate::tui::component::Component;

pub struct PaletteOverlay<'a> {
    palette: &'a Palette,
    /// Shown next to each suggestion so the palette also teaches the keys.
    bindings: &'a Keymap,
}

impl<'a> PaletteOverlay<'a> {
    pub fn new(palette: &'a Palette, bindings: &'a Keymap) -> Self {
        Self { palette, bindings }
    }
}

impl Component for PaletteOverlay<'_> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(60, 50, area);
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Commands ")
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(" Enter Run  Esc Back ").centered())
            .padding(Padding::horizontal(1));
        let inner = block.inner(overlay);
        frame.render_widget(block, overlay);

        let [query_area, list_area] =
            Layout::vertical([Constraint::Length(2), Constraint::Min(0)]).areas(inner);
        frame.render_widget(Paragraph::new(format!("> {}", self.palette.query())), query_area);

        let suggestions = self.palette.suggestions();
        if suggestions.is_empty() {
            let empty = Paragraph::new("No matching command")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(empty, list_area);
            return;
        }

        let width = list_area.width as usize;
        let items: Vec<ListItem> = suggestions
            .iter()
            .map(|command| {
                let keys = self.bindings.chords_for(*command).join(", ");
                let label = command.label();
                let gap = width.saturating_sub(label.width() + keys.width()).max(1);
                ListItem::new(format!("{label}{}{keys}", " ".repeat(gap)))
            })
            .collect();

        let list = List::new(items)
            .style(Style::default().fg(Color::Gray))
            .highlight_style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            );
        let mut state = ListState::default().with_selected(Some(self.palette.selected_index()));
        frame.render_stateful_widget(list, list_area, &mut state);
    }
}

/// Compute a centered rect using percentage of the outer rect.
fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
