//! # Actions
//!
//! Everything that can happen in blocktime becomes an `Action`.
//! User presses a key? That's `Action::Key(input)`.
//! The server answers a fetch? That's `Action::Sync(update)`.
//!
//! The `update()` function applies an action to the state and returns the
//! one side effect the adapter has to carry out. Remote calls are started by
//! the stores and the range worker; their results come back as more actions.
//!
//! ```text
//! State + Action  →  update()  →  New State + Effect
//! ```

use log::debug;

use crate::api::ApiError;
use crate::core::bus::Outbox;
use crate::core::command::Command;
use crate::core::keymap::KeyInput;
use crate::core::model::{Block, BlockId, Project, ProjectId};
use crate::core::range::RangeUpdate;
use crate::core::state::App;
use crate::core::sync::SyncUpdate;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A raw key press, resolved against the current mode's table.
    Key(KeyInput),
    /// Run a command directly, bypassing the key tables.
    Command(Command),
    /// Direct selection of an element, e.g. by mouse.
    ActivateEntry { block: usize, entry: usize },
    EditBlock(Block),
    AssignProject { block: BlockId, project: String },
    AddProject(String),
    EditProject(Project),
    ArchiveProject(ProjectId),
    UnarchiveProject(ProjectId),
    /// A sync engine finished a fetch or failed a call.
    Sync(SyncUpdate),
    /// The range worker finished an expansion.
    Range(RangeUpdate),
    LoggedOut(Result<(), ApiError>),
}

/// What the adapter must do after an update. Ordered by precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effect {
    #[default]
    None,
    /// A mode that held input focus was left.
    ReleaseFocus,
    Quit,
}

pub fn update(app: &mut App, action: Action) -> Effect {
    let mut out = Outbox::new();
    let session = &mut app.session;

    match action {
        Action::Key(key) => {
            debug!("Key {}", key.chord());
            session.handle_key(&key, &mut out);
        }
        Action::Command(command) => out.execute(command),
        Action::ActivateEntry { block, entry } => session.activate_entry(block, entry, &mut out),
        Action::EditBlock(block) => session.edit_block(block),
        Action::AssignProject { block, project } => session.assign_project(block, &project),
        Action::AddProject(name) => session.add_project(&name),
        Action::EditProject(project) => session.projects.edit(project),
        Action::ArchiveProject(id) => session.set_project_archived(id, true),
        Action::UnarchiveProject(id) => session.set_project_archived(id, false),
        Action::Sync(sync) => session.apply_sync(sync, &mut out),
        Action::Range(range) => session.apply_range(range),
        Action::LoggedOut(result) => session.logged_out(result, &mut out),
    }

    app.flush(&mut out);
    app.session.take_effect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mode::ControlMode;
    use crate::test_support::{MemoryRemote, block, entry, project, settle, test_app, ts};
    use std::sync::Arc;

    const NOW: &str = "2024-05-01T15:00:00Z";

    fn key(name: &str) -> Action {
        Action::Key(KeyInput::new(name))
    }

    fn typed(text: &str) -> Vec<Action> {
        text.chars().map(|c| key(&c.to_string())).collect()
    }

    /// Two blocks today: block 1 with entries 11 and 12, block 2 with entry 21.
    fn seeded() -> Arc<MemoryRemote> {
        let remote = Arc::new(MemoryRemote::new());
        remote.seed_blocks(vec![block(2, "2024-05-01T10:00:00Z"), block(1, "2024-05-01T08:00:00Z")]);
        remote.seed_entries(vec![entry(11, 1, "one"), entry(12, 1, "two"), entry(21, 2, "three")]);
        remote.seed_projects(vec![project(7, "Writing", false)]);
        remote
    }

    #[tokio::test]
    async fn test_session_loads_oldest_block_first() {
        let (app, _rx) = test_app(seeded(), ts(NOW)).await;
        let session = &app.session;
        assert!(session.is_loaded());
        let ids: Vec<BlockId> = session.blocks.items().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(session.entries.groups().count(1), 2);
        assert_eq!(session.position(), (0, 0));
        assert!(session.range.is_exhausted(), "initial expansion found nothing older");
        assert_eq!(app.mode(), ControlMode::Normal);
    }

    #[tokio::test]
    async fn test_arrow_navigation_crosses_blocks_and_asks_for_more() {
        let remote = seeded();
        remote.push_block_start(ts("2024-04-29T09:00:00Z"));
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        assert!(!app.session.range.is_exhausted());

        update(&mut app, key("ArrowDown"));
        update(&mut app, key("ArrowDown"));
        assert_eq!(app.session.position(), (1, 0));
        assert_eq!(app.session.active_entry().map(|e| e.id), Some(21));

        let before = remote.calls_named("next_before");
        update(&mut app, key("ArrowDown"));
        assert_eq!(app.session.position(), (1, 0));
        assert!(app.session.range.is_expanding());
        settle(&mut app, &mut rx).await;
        assert_eq!(remote.calls_named("next_before"), before + 1);
        assert!(app.session.range.is_exhausted());
    }

    #[tokio::test]
    async fn test_normal_only_chord_is_text_in_insert_mode() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key("i"));
        assert_eq!(app.mode(), ControlMode::Insert);
        for action in typed("!n") {
            update(&mut app, action);
        }
        settle(&mut app, &mut rx).await;

        assert_eq!(remote.calls_on("create", "blocks"), 0);
        assert_eq!(app.session.draft.text(), "one!n");
        assert_eq!(app.session.display_text(&entry(11, 1, "one")), "one!n");
    }

    #[tokio::test]
    async fn test_leaving_insert_saves_draft_once() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key("i"));
        update(&mut app, key("s"));
        update(&mut app, key("Backspace"));
        update(&mut app, key("?"));
        let effect = update(&mut app, key("Escape"));
        assert_eq!(effect, Effect::ReleaseFocus);
        assert_eq!(app.mode(), ControlMode::Normal);
        settle(&mut app, &mut rx).await;

        assert_eq!(remote.calls_on("update", "entries"), 1);
        let saved = remote.entries().into_iter().find(|e| e.id == 11).unwrap();
        assert_eq!(saved.text, "one?");
        assert_eq!(app.session.active_entry().map(|e| e.text.as_str()), Some("one?"));
    }

    #[tokio::test]
    async fn test_enter_adds_entry_and_focuses_it_in_insert() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key("i"));
        update(&mut app, key("Enter"));
        assert_eq!(app.session.position(), (0, 0), "nothing moves before the server confirms");
        settle(&mut app, &mut rx).await;

        assert_eq!(app.session.entries.groups().count(1), 3);
        assert_eq!(app.session.position(), (0, 2));
        let active = app.session.active_entry().unwrap();
        assert_eq!((active.parent, active.nesting), (Some(1), 0));
        assert_eq!(app.mode(), ControlMode::Insert);
    }

    #[tokio::test]
    async fn test_tab_and_shift_tab_change_nesting() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        update(&mut app, key("i"));

        update(&mut app, Action::Key(KeyInput::new("Tab").with_shift()));
        settle(&mut app, &mut rx).await;
        assert_eq!(remote.calls_on("update", "entries"), 0, "outdent at 0 submits nothing");

        update(&mut app, key("Tab"));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.active_entry().map(|e| e.nesting), Some(1));

        update(&mut app, Action::Key(KeyInput::new("Tab").with_shift()));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.active_entry().map(|e| e.nesting), Some(0));
    }

    #[tokio::test]
    async fn test_indent_keeps_unsaved_text() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        update(&mut app, key("i"));
        update(&mut app, key("!"));
        update(&mut app, key("Tab"));
        update(&mut app, key("Escape"));
        settle(&mut app, &mut rx).await;

        let saved = remote.entries().into_iter().find(|e| e.id == 11).unwrap();
        assert_eq!((saved.text.as_str(), saved.nesting), ("one!", 1));
        assert_eq!(remote.calls_on("update", "entries"), 1);
    }

    #[tokio::test]
    async fn test_text_typed_while_indent_is_in_flight_keeps_nesting() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        update(&mut app, key("i"));

        let gate = remote.hold_updates();
        update(&mut app, key("Tab"));
        update(&mut app, key("x"));
        update(&mut app, key("Escape"));
        remote.wait_for_calls("update", 2).await;

        gate.release_one();
        settle(&mut app, &mut rx).await;
        gate.release_one();
        settle(&mut app, &mut rx).await;

        let saved = remote.entries().into_iter().find(|e| e.id == 11).unwrap();
        assert_eq!((saved.text.as_str(), saved.nesting), ("onex", 1));
        assert_eq!(app.session.active_entry().map(|e| e.nesting), Some(1));
    }

    #[tokio::test]
    async fn test_repeated_indent_before_refetch_nests_twice() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        let gate = remote.hold_updates();
        update(&mut app, key("i"));
        update(&mut app, key("Tab"));
        update(&mut app, key("Tab"));
        remote.wait_for_calls("update", 2).await;
        gate.release_one();
        settle(&mut app, &mut rx).await;
        gate.release_one();
        settle(&mut app, &mut rx).await;

        let saved = remote.entries().into_iter().find(|e| e.id == 11).unwrap();
        assert_eq!(saved.nesting, 2);
    }

    #[tokio::test]
    async fn test_delete_last_entry_keeps_cursor_in_range() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        update(&mut app, key("ArrowDown"));
        assert_eq!(app.session.position(), (0, 1));

        update(&mut app, key("d"));
        assert_eq!(app.session.position(), (0, 0));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.entries.groups().count(1), 1);
        assert_eq!(app.session.active_entry().map(|e| e.id), Some(11));
    }

    #[tokio::test]
    async fn test_block_lifecycle() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key("n"));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.blocks.items().len(), 3);
        let added = app.session.active_block().unwrap().clone();
        assert!(added.is_open());
        assert_eq!(app.session.position(), (2, 0));

        update(&mut app, key("e"));
        settle(&mut app, &mut rx).await;
        assert!(!app.session.active_block().unwrap().is_open());

        update(&mut app, key("e"));
        assert_eq!(app.session.status_message, "Block already ended");

        update(&mut app, key("Delete"));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.blocks.items().len(), 2);
        assert_eq!(app.session.position(), (1, 0));
    }

    #[tokio::test]
    async fn test_child_entry_nests_below_active() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key("o"));
        settle(&mut app, &mut rx).await;
        let child = app.session.active_entry().unwrap();
        assert_eq!((child.parent, child.nesting), (Some(1), 1));
        assert_eq!(app.mode(), ControlMode::Insert);
    }

    #[tokio::test]
    async fn test_palette_runs_selection_and_returns_to_normal() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, key(":"));
        assert_eq!(app.mode(), ControlMode::CommandEntry);
        for action in typed("TOGGLE") {
            update(&mut app, action);
        }
        assert_eq!(app.session.palette.suggestions(), vec![Command::ToggleTodo, Command::ToggleDone]);
        update(&mut app, key("ArrowDown"));
        update(&mut app, key("Enter"));
        assert_eq!(app.mode(), ControlMode::Normal);
        assert_eq!(app.session.palette.query(), "");
        settle(&mut app, &mut rx).await;

        let toggled = remote.entries().into_iter().find(|e| e.id == 11).unwrap();
        assert!(toggled.is_done);
        assert!(!toggled.show_todo);
    }

    #[tokio::test]
    async fn test_activate_entry_switches_to_insert_once() {
        let (mut app, _rx) = test_app(seeded(), ts(NOW)).await;

        let effect = update(&mut app, Action::ActivateEntry { block: 1, entry: 0 });
        assert_eq!(effect, Effect::None);
        assert_eq!(app.mode(), ControlMode::Insert);
        assert_eq!(app.session.active_entry().map(|e| e.id), Some(21));

        update(&mut app, Action::ActivateEntry { block: 0, entry: 1 });
        assert_eq!(app.mode(), ControlMode::Insert);
        assert_eq!(app.session.position(), (0, 1));
    }

    #[tokio::test]
    async fn test_failed_add_surfaces_error_and_keeps_state() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        remote.fail_next(
            "create",
            ApiError::Api {
                status: 500,
                message: "boom".into(),
            },
        );

        update(&mut app, key("n"));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.blocks.items().len(), 2);
        assert!(app.session.blocks.error().is_some());
        assert!(app.session.status_message.contains("boom"));

        update(&mut app, key("n"));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.session.blocks.items().len(), 3);
        assert!(app.session.blocks.error().is_none());
    }

    #[tokio::test]
    async fn test_logout_failure_is_swallowed() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;
        remote.fail_next("logout", ApiError::Network("offline".into()));

        update(&mut app, Action::Command(Command::Logout));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.mode(), ControlMode::Normal);
        assert_eq!(app.session.blocks.items().len(), 2);
        assert!(!app.session.status_message.contains("offline"));

        update(&mut app, Action::Command(Command::Logout));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.mode(), ControlMode::Default);
        assert_eq!(app.session.status_message, "Logged out");
        assert_eq!(update(&mut app, key("q")), Effect::None, "no key table in Default mode");
    }

    #[tokio::test]
    async fn test_project_actions() {
        let remote = seeded();
        let (mut app, mut rx) = test_app(remote.clone(), ts(NOW)).await;

        update(&mut app, Action::AssignProject { block: 1, project: "writing".into() });
        update(&mut app, Action::AddProject("Reading".into()));
        update(&mut app, Action::ArchiveProject(7));
        settle(&mut app, &mut rx).await;

        let assigned = app.session.blocks.get(1).unwrap();
        assert_eq!(assigned.project, Some(7));
        assert_eq!(assigned.project_name.as_deref(), Some("Writing"));
        let open: Vec<&str> = app.session.projects.unarchived().map(|p| p.name.as_str()).collect();
        assert_eq!(open, vec!["Reading"]);

        update(&mut app, Action::AssignProject { block: 1, project: "nope".into() });
        assert_eq!(app.session.status_message, "Unknown project: nope");
    }

    #[tokio::test]
    async fn test_quit_effect() {
        let (mut app, _rx) = test_app(seeded(), ts(NOW)).await;
        assert_eq!(update(&mut app, key("q")), Effect::Quit);
    }
}
