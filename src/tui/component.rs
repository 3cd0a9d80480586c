use ratatui::Frame;
use ratatui::layout::Rect;

/// A reusable UI component.
///
/// Components receive data via props (struct fields, usually borrowed from
/// the session) and render to a `Frame` within a given `Rect`.
///
/// `render` takes `&mut self` so stateful components can update layout
/// caches and scroll offsets during the render pass, the way ratatui's
/// `StatefulWidget` does.
pub trait Component {
    fn render(&mut self, frame: &mut Frame, area: Rect);
}
