//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the outline,
//! and translates keyboard and mouse events into core::Action values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Event Loop
//!
//! One task owns the `App`. It waits on whichever comes first:
//!
//! - a terminal event from crossterm's `EventStream`
//! - an `Action` sent back by a sync engine or the range worker
//! - the clock tick that keeps open blocks' elapsed time current
//!
//! Every wake-up drains the action channel before the next frame, so a burst
//! of server responses costs one redraw.

mod component;
mod components;
mod event;
mod ui;

use log::{debug, info, warn};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossterm::cursor::{SetCursorStyle, Show};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, EventStream, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::api::HttpBackend;
use crate::core::action::{Action, Effect, update};
use crate::core::command::Command;
use crate::core::config::ResolvedConfig;
use crate::core::state::{App, Remotes, Session};
use crate::tui::components::OutlineState;
use crate::tui::event::{TuiEvent, translate};

/// How often the view refreshes on its own, for open blocks' running time.
const CLOCK_TICK: Duration = Duration::from_secs(30);

/// Upper bound on waiting for in-flight saves after quitting.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// TUI-specific presentation state (not part of core business logic)
pub(crate) struct TuiState {
    pub outline: OutlineState,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            outline: OutlineState::new(),
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // Kitty keyboard protocol lets Shift+Enter and Ctrl+Enter through;
        // terminals without it ignore the request
        execute!(
            stdout(),
            EnableMouseCapture,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
        info!("Terminal modes enabled (mouse, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            Show
        );
    }
}

/// Feed one action through `update`. Returns true when the app should quit.
fn apply(app: &mut App, action: Action) -> bool {
    match update(app, action) {
        Effect::Quit => true,
        Effect::ReleaseFocus => {
            debug!("Focus released, now in {} mode", app.mode());
            false
        }
        Effect::None => false,
    }
}

fn handle_event(app: &mut App, tui: &TuiState, event: TuiEvent) -> bool {
    match event {
        TuiEvent::Key(input) => apply(app, Action::Key(input)),
        TuiEvent::ForceQuit => apply(app, Action::Command(Command::Quit)),
        TuiEvent::Click(column, row) => match tui.outline.hit_test(column, row) {
            Some((block, entry)) => apply(app, Action::ActivateEntry { block, entry }),
            None => false,
        },
        TuiEvent::Resize => false,
    }
}

pub async fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let backend = HttpBackend::new(config.base_url.clone(), config.auth_token.clone())
        .map_err(std::io::Error::other)?;
    info!("Using server at {}", backend.base_url());

    // Channel for actions from background tasks
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = Session::start(Remotes::shared(Arc::new(backend)), config.keymaps, tx, Utc::now());
    let mut app = App::new(session);
    let mut tui = TuiState::new();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let mut events = EventStream::new();
    let mut clock = tokio::time::interval(CLOCK_TICK);
    let mut should_quit = false;

    while !should_quit {
        terminal.draw(|f| ui::draw_ui(f, &app.session, &mut tui, Utc::now()))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => {
                    if let Some(event) = translate(event) {
                        should_quit = handle_event(&mut app, &tui, event);
                    }
                }
                Some(Err(e)) => {
                    warn!("Terminal event error: {}", e);
                }
                None => {
                    info!("Terminal event stream closed");
                    should_quit = true;
                }
            },
            Some(action) = rx.recv() => {
                debug!("Event loop received: {:?}", action);
                should_quit = apply(&mut app, action);
            }
            _ = clock.tick() => {}
        }

        // Drain whatever else arrived before the next frame
        while !should_quit && let Ok(action) = rx.try_recv() {
            debug!("Event loop received: {:?}", action);
            should_quit = apply(&mut app, action);
        }
    }

    ratatui::restore();

    // Quit commits the draft; let that save land before the runtime goes away
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while app.session.is_busy() {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(action)) => {
                update(&mut app, action);
            }
            _ => {
                warn!("Exiting with changes still in flight");
                break;
            }
        }
    }
    info!("blocktime shutting down");
    Ok(())
}
