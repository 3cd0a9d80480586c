//! # Core Application Logic
//!
//! This module contains blocktime's business logic.
//! It knows nothing about any specific UI technology.
//!
//! ```text
//!   key press ──► ModeController ──► Keymaps[mode] ──► Command
//!                                                        │
//!                                                        ▼
//!                                                   CommandBus
//!                        ┌──────────────┬──────────────┼──────────────┬─────────────┐
//!                        ▼              ▼              ▼              ▼             ▼
//!                      draft          mode          palette       outliner      session
//!                                                                    │
//!                                              NavigationCursor ◄────┤
//!                                                                    ▼
//!                                         BlockStore / EntryStore / ProjectStore
//!                                                                    │
//!                                                          SyncEngine (per type)
//!                                                                    │ remote calls
//!                                                                    ▼
//!                                                        Action::Sync ──► update()
//! ```
//!
//! ## Modules
//!
//! - [`command`]: The closed `Command` enum
//! - [`bus`]: FIFO command bus
//! - [`keymap`]: Key chords and the per-mode binding tables
//! - [`mode`]: The modal state machine
//! - [`model`]: Blocks, entries, projects
//! - [`cursor`]: The two-level navigation cursor
//! - [`sync`]: The CRUD synchronization engine
//! - [`store`]: Entity stores built on the engine
//! - [`range`]: The visible date range
//! - [`draft`], [`palette`]: Insert-mode text and CommandEntry-mode palette
//! - [`state`]: The `App` struct, all application state in one place
//! - [`action`]: The `Action` enum and the `update()` reducer
//! - [`config`]: Settings file and overrides

pub mod action;
pub mod bus;
pub mod command;
pub mod config;
pub mod cursor;
pub mod draft;
pub mod keymap;
pub mod mode;
pub mod model;
pub mod palette;
pub mod range;
pub mod state;
pub mod store;
pub mod sync;
