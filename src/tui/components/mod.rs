//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `StatusBar`: Top line with mode, range and status
//! - `PaletteOverlay`: Command palette popup for CommandEntry mode
//!
//! ### Stateful Components
//!
//! - `Outline`: Blocks and their entries, with `OutlineState` holding the
//!   scroll offset and the row map used for mouse hit testing
//!
//! Components receive session data as props rather than reaching for the
//! `App` directly, so each one can be rendered in isolation in tests.
//!
//! ```text
//! components/
//! ├── mod.rs         (this file)
//! ├── status_bar.rs  (Top status line)
//! ├── outline.rs     (Blocks and entries)
//! └── palette.rs     (Command palette overlay)
//! ```

pub mod outline;
pub mod palette;
pub mod status_bar;

pub use outline::{Outline, OutlineState};
pub use palette::PaletteOverlay;
pub use status_bar::StatusBar;
