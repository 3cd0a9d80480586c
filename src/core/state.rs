//! # Application State
//!
//! Core business state for blocktime. This module contains domain logic only,
//! no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── session: Session
//! │   ├── mode: ModeController      // Normal / Insert / Visual / CommandEntry / Default
//! │   ├── keymaps: Keymaps          // one binding table per mode
//! │   ├── cursor: NavigationCursor  // (block, entry) indices
//! │   ├── blocks: BlockStore        // ┐
//! │   ├── entries: EntryStore       // ├ each backed by a SyncEngine
//! │   ├── projects: ProjectStore    // ┘
//! │   ├── range: DateRange          // visible window, grows backwards
//! │   ├── draft: EntryDraft         // unsaved text of the active entry
//! │   ├── palette: Palette          // CommandEntry query + selection
//! │   └── status_message: String
//! └── bus: CommandBus<Session>
//!     subscribers, in delivery order: draft, mode, palette, outliner, session
//! ```
//!
//! The session is the one context object every subscriber operates on; it is
//! created once per UI session and passed by reference, never shared globally.
//! State changes only happen through `update(app, action)` in action.rs.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::{ApiError, Remote, SessionRemote};
use crate::core::action::{Action, Effect};
use crate::core::bus::{CommandBus, Outbox};
use crate::core::command::Command;
use crate::core::cursor::{Movement, NavigationCursor, OutlineView};
use crate::core::draft::{DraftCommit, EntryDraft};
use crate::core::keymap::{KeyInput, Keymaps};
use crate::core::mode::{ControlMode, KeyOutcome, ModeController};
use crate::core::model::{Block, BlockId, Entry, EntryId, Project, ProjectId};
use crate::core::palette::Palette;
use crate::core::range::{DateRange, RangeUpdate};
use crate::core::store::{BlockStore, EntryStore, ProjectStore};
use crate::core::sync::{SyncEngine, SyncEvent, SyncUpdate, Synced};

/// The remote seams a session talks to.
pub struct Remotes {
    pub blocks: Arc<dyn Remote<Block>>,
    pub entries: Arc<dyn Remote<Entry>>,
    pub projects: Arc<dyn Remote<Project>>,
    pub session: Arc<dyn SessionRemote>,
}

impl Remotes {
    /// Use one backend for every seam.
    pub fn shared<R>(backend: Arc<R>) -> Self
    where
        R: Remote<Block> + Remote<Entry> + Remote<Project> + SessionRemote + 'static,
    {
        Self {
            blocks: backend.clone(),
            entries: backend.clone(),
            projects: backend.clone(),
            session: backend,
        }
    }
}

fn outline<'a>(blocks: &'a BlockStore, entries: &'a EntryStore) -> OutlineView<'a> {
    OutlineView::new(blocks.items(), entries.groups())
}

pub struct Session {
    pub mode: ModeController,
    pub keymaps: Keymaps,
    pub cursor: NavigationCursor,
    pub blocks: BlockStore,
    pub entries: EntryStore,
    pub projects: ProjectStore,
    pub range: DateRange,
    pub draft: EntryDraft,
    pub palette: Palette,
    pub status_message: String,
    auth: Arc<dyn SessionRemote>,
    actions: mpsc::UnboundedSender<Action>,
    effect: Effect,
}

impl Session {
    /// Start the sync engines and the range worker, and ask for the first
    /// expansion. Must be called inside a tokio runtime.
    pub fn start(
        remotes: Remotes,
        keymaps: Keymaps,
        actions: mpsc::UnboundedSender<Action>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut range = DateRange::today(now);
        range.attach(remotes.session.clone(), actions.clone());

        let blocks = BlockStore::new(SyncEngine::start(remotes.blocks, range.subscribe(), actions.clone()));
        let entries = EntryStore::new(SyncEngine::start(remotes.entries, range.subscribe(), actions.clone()));
        let projects = ProjectStore::new(SyncEngine::start(remotes.projects, range.subscribe(), actions.clone()));

        range.request_expand();
        info!("Session started, visible range from {}", range.start());

        Self {
            mode: ModeController::new(),
            keymaps,
            cursor: NavigationCursor::new(),
            blocks,
            entries,
            projects,
            range,
            draft: EntryDraft::new(),
            palette: Palette::new(),
            status_message: String::from("Loading..."),
            auth: remotes.session,
            actions,
            effect: Effect::None,
        }
    }

    pub fn view(&self) -> OutlineView<'_> {
        outline(&self.blocks, &self.entries)
    }

    pub fn position(&self) -> (usize, usize) {
        self.cursor.position(self.view())
    }

    pub fn active_block(&self) -> Option<&Block> {
        self.cursor.active_block(self.view())
    }

    pub fn active_entry(&self) -> Option<&Entry> {
        self.cursor.active_entry(self.view())
    }

    /// True once blocks and entries have both been fetched.
    pub fn is_loaded(&self) -> bool {
        self.blocks.is_loaded() && self.entries.is_loaded()
    }

    /// Anything still waiting on the server.
    pub fn is_busy(&self) -> bool {
        self.blocks.pending() > 0 || self.entries.pending() > 0 || self.range.is_expanding()
    }

    /// Text to show for `entry`: the draft while it is being edited.
    pub fn display_text<'a>(&'a self, entry: &'a Entry) -> &'a str {
        if self.draft.is_editing(entry.id) {
            self.draft.text()
        } else {
            &entry.text
        }
    }

    pub(crate) fn raise(&mut self, effect: Effect) {
        self.effect = self.effect.max(effect);
    }

    pub(crate) fn take_effect(&mut self) -> Effect {
        std::mem::replace(&mut self.effect, Effect::None)
    }

    fn commit_draft(&mut self) {
        match self.draft.commit() {
            Some(DraftCommit::Text(id, text)) => {
                debug!("Saving draft of entry {}", id);
                self.entries.edit_text(id, text);
            }
            Some(DraftCommit::Entry(entry)) => {
                debug!("Saving draft of entry {} over its last edit", entry.id);
                self.entries.edit(entry);
            }
            None => {}
        }
    }

    /// Begin editing the active entry, saving any draft of another one.
    fn track_active_entry(&mut self) {
        let Some(active) = self.cursor.active_entry(outline(&self.blocks, &self.entries)) else {
            return;
        };
        if !self.draft.is_editing(active.id) {
            let active = active.clone();
            self.commit_draft();
            self.draft.begin(&active);
        }
    }

    pub(crate) fn handle_key(&mut self, key: &KeyInput, out: &mut Outbox) {
        match self.mode.handle_key(&self.keymaps, key) {
            KeyOutcome::Handled(command) => out.execute(command),
            KeyOutcome::PassThrough => self.pass_through(key),
        }
    }

    /// Unbound keys become text in Insert and CommandEntry mode.
    fn pass_through(&mut self, key: &KeyInput) {
        match self.mode.mode() {
            ControlMode::Insert => {
                self.track_active_entry();
                if key.key == "Backspace" {
                    self.draft.backspace();
                } else if let Some(c) = key.printable() {
                    self.draft.insert(c);
                }
            }
            ControlMode::CommandEntry => {
                if key.key == "Backspace" {
                    self.palette.pop();
                } else if let Some(c) = key.printable() {
                    self.palette.push(c);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn activate_entry(&mut self, block: usize, entry: usize, out: &mut Outbox) {
        let target = outline(&self.blocks, &self.entries)
            .entries_of(block)
            .get(entry)
            .map(|e| e.id);
        if target.is_none_or(|id| !self.draft.is_editing(id)) {
            self.commit_draft();
        }
        if let Some(command) = self.cursor.activate_entry(block, entry, self.mode.mode()) {
            out.execute(command);
        }
        self.cursor.revalidate(outline(&self.blocks, &self.entries));
    }

    pub(crate) fn apply_sync(&mut self, update: SyncUpdate, out: &mut Outbox) {
        match update {
            SyncUpdate::Blocks(event) => {
                self.report(&event);
                let anchor = self.active_block().map(|b| b.id);
                let confirmed = self.blocks.apply(event);
                let view = outline(&self.blocks, &self.entries);
                match confirmed {
                    Some(added) if self.cursor.focus_block(view, added.id) => {
                        self.status_message = String::from("Block started");
                    }
                    _ => self.cursor.follow_block(view, anchor),
                }
            }
            SyncUpdate::Entries(event) => {
                self.report(&event);
                let confirmed = self.entries.apply(event);
                let view = outline(&self.blocks, &self.entries);
                match confirmed {
                    Some(added) if self.cursor.focus_entry(view, &added) => {
                        out.execute(Command::SwitchToInsert);
                    }
                    _ => self.cursor.revalidate(view),
                }
            }
            SyncUpdate::Projects(event) => {
                self.report(&event);
                self.projects.apply(event);
            }
        }
        if self.is_loaded() && self.status_message == "Loading..." {
            self.status_message.clear();
        }
    }

    fn report<T: Synced>(&mut self, event: &SyncEvent<T>) {
        if let SyncEvent::Failed { operation, error } = event {
            self.status_message = format!("{} {:?} failed: {}", T::KIND, operation, error);
        }
    }

    pub(crate) fn apply_range(&mut self, update: RangeUpdate) {
        match &update {
            RangeUpdate::Exhausted => self.status_message = String::from("No earlier blocks"),
            RangeUpdate::Failed(e) => self.status_message = format!("Loading earlier blocks failed: {e}"),
            RangeUpdate::Expanded(_) => {}
        }
        self.range.apply(update);
    }

    pub(crate) fn logged_out(&mut self, result: Result<(), ApiError>, out: &mut Outbox) {
        match result {
            Ok(()) => {
                info!("Logged out");
                self.status_message = String::from("Logged out");
                out.execute(Command::SwitchToDefault);
            }
            // Swallowed: local state stays exactly as it was.
            Err(e) => warn!("Logout failed: {}", e),
        }
    }

    pub(crate) fn edit_block(&mut self, block: Block) {
        self.blocks.edit(block);
    }

    /// Point block `id` at the project called `name`.
    pub(crate) fn assign_project(&mut self, id: BlockId, name: &str) {
        let Some(block) = self.blocks.get(id) else {
            warn!("Cannot assign a project to unknown block {}", id);
            return;
        };
        let Some(project) = self.projects.resolve_by_name(name) else {
            self.status_message = format!("Unknown project: {name}");
            return;
        };
        let edited = Block {
            project: Some(project.id),
            project_name: Some(project.name.clone()),
            ..block.clone()
        };
        self.blocks.edit(edited);
    }

    pub(crate) fn add_project(&mut self, name: &str) {
        if !self.projects.add_named(name) {
            self.status_message = String::from("Project name must not be empty");
        }
    }

    pub(crate) fn set_project_archived(&mut self, id: ProjectId, archived: bool) {
        let changed = if archived {
            self.projects.archive(id)
        } else {
            self.projects.unarchive(id)
        };
        if !changed {
            debug!("Project {} archive state unchanged", id);
        }
    }

    fn spawn_logout(&self) {
        let auth = Arc::clone(&self.auth);
        let actions = self.actions.clone();
        tokio::spawn(async move {
            let result = auth.logout().await;
            if actions.send(Action::LoggedOut(result)).is_err() {
                debug!("Action receiver dropped before logout finished");
            }
        });
    }
}

// ============================================================================
// Bus subscribers
// ============================================================================

/// Saves or drops the draft before anything else sees the command.
fn draft_subscriber(command: Command, session: &mut Session, _: &mut Outbox) {
    use Command::*;
    match command {
        SwitchToNormal | SwitchToVisual | SwitchToCommandEntry | SwitchToDefault => {
            if session.mode.mode() == ControlMode::Insert {
                session.commit_draft();
            }
        }
        DeleteActiveEntry => {
            let active = session.active_entry().map(|e| e.id);
            discard_or_commit(session, |_, id| active == Some(id));
        }
        DeleteActiveBlock => {
            let block = session.active_block().map(|b| b.id);
            discard_or_commit(session, |s, id| {
                s.entries.get(id).and_then(|e| e.parent) == block && block.is_some()
            });
        }
        // Open the draft so the structural edit becomes its base.
        IndentEntry | OutdentEntry | ToggleTodo | ToggleDone => session.track_active_entry(),
        MoveToPreviousElement | MoveToNextElement | MoveToPreviousContainer | MoveToNextContainer
        | AddNewEntry | AddNewChildEntry | AddNewBlock | Logout | Quit => session.commit_draft(),
        _ => {}
    }
}

fn discard_or_commit(session: &mut Session, doomed: impl Fn(&Session, EntryId) -> bool) {
    match session.draft.target() {
        Some(id) if doomed(session, id) => session.draft.discard(),
        _ => session.commit_draft(),
    }
}

fn mode_subscriber(command: Command, session: &mut Session, _: &mut Outbox) {
    if let Some(transition) = session.mode.on_command(command)
        && transition.release_focus
    {
        session.raise(Effect::ReleaseFocus);
    }
}

fn palette_subscriber(command: Command, session: &mut Session, out: &mut Outbox) {
    match command {
        Command::SwitchToCommandEntry => session.palette.reset(),
        Command::SelectPreviousSuggestion => session.palette.select_previous(),
        Command::SelectNextSuggestion => session.palette.select_next(),
        Command::RunPaletteSelection => {
            let selection = session.palette.selection();
            session.palette.reset();
            out.execute(Command::SwitchToNormal);
            match selection {
                Some(command) => {
                    debug!("Palette runs {:?}", command);
                    out.execute(command);
                }
                None => session.status_message = String::from("No matching command"),
            }
        }
        _ => {}
    }
}

/// Cursor movement and CRUD on blocks and entries.
fn outliner_subscriber(command: Command, session: &mut Session, out: &mut Outbox) {
    use Command::*;
    let Session {
        cursor,
        blocks,
        entries,
        draft,
        range,
        status_message,
        ..
    } = session;
    let view = outline(blocks, entries);

    match command {
        MoveToPreviousElement => {
            cursor.move_to_previous_element(view);
        }
        MoveToNextElement => {
            if cursor.move_to_next_element(view) == Movement::NeedMoreData && !range.is_exhausted() {
                out.execute(ExpandRange);
            }
        }
        MoveToPreviousContainer => {
            if cursor.move_to_previous_container(view) {
                cursor.reset_entry();
            }
        }
        MoveToNextContainer => {
            if cursor.move_to_next_container(view) {
                cursor.reset_entry();
            }
        }
        AddNewBlock => blocks.add_new(Utc::now()),
        DeleteActiveBlock => {
            if let Some(id) = cursor.delete_active_block(view) {
                blocks.remove(id);
            }
        }
        EndActiveBlock => match cursor.active_block(view).map(|b| b.id) {
            Some(id) if blocks.end_now(id, Utc::now()) => {}
            Some(_) => *status_message = String::from("Block already ended"),
            None => {}
        },
        AddNewEntry | AddNewChildEntry => {
            let new = if command == AddNewEntry {
                cursor.new_entry_below_active(view)
            } else {
                cursor.new_child_entry(view)
            };
            match new {
                Some(entry) => entries.add_confirmed(entry),
                None => *status_message = String::from("Add a block first"),
            }
        }
        DeleteActiveEntry => {
            if let Some(id) = cursor.delete_active_entry(view) {
                entries.remove(id);
            }
        }
        IndentEntry | OutdentEntry | ToggleTodo | ToggleDone => {
            let current = cursor.active_entry(view).map(|e| draft.latest(e));
            let changed = current.and_then(|e| match command {
                IndentEntry => Some(e.indented()),
                // Nothing to submit at nesting 0.
                OutdentEntry => e.outdented(),
                ToggleTodo => Some(e.todo_toggled()),
                _ => Some(e.done_toggled()),
            });
            if let Some(mut entry) = changed {
                draft.apply_to(&mut entry);
                entries.edit(entry);
            }
        }
        _ => {}
    }
}

fn session_subscriber(command: Command, session: &mut Session, _: &mut Outbox) {
    match command {
        Command::ExpandRange => {
            if !session.range.request_expand() && session.range.is_exhausted() {
                session.status_message = String::from("No earlier blocks");
            }
        }
        Command::Logout => session.spawn_logout(),
        Command::Quit => session.raise(Effect::Quit),
        _ => {}
    }
}

pub struct App {
    pub session: Session,
    bus: CommandBus<Session>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let mut bus = CommandBus::new();
        bus.subscribe("draft", draft_subscriber);
        bus.subscribe("mode", mode_subscriber);
        bus.subscribe("palette", palette_subscriber);
        bus.subscribe("outliner", outliner_subscriber);
        bus.subscribe("session", session_subscriber);
        Self { session, bus }
    }

    pub fn mode(&self) -> ControlMode {
        self.session.mode.mode()
    }

    /// Run `command` and everything it triggers.
    pub fn execute(&mut self, command: Command) {
        self.bus.execute(command, &mut self.session);
    }

    pub(crate) fn flush(&mut self, out: &mut Outbox) {
        if !out.is_empty() {
            self.bus.execute_all(out, &mut self.session);
        }
    }
}
