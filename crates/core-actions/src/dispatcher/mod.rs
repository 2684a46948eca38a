//! Dispatcher applying an [`Action`] to an [`EditorSession`].
//!
//! Sub-modules by concern:
//! * `motion`    - cursor navigation
//! * `edit`      - pitch entry, chord modifiers and object insertion
//! * `structure` - measures, staffs and movements
//! * `clipboard` - selection and clipboard
//! * `undo`      - undo / redo and the queue dump
//!
//! Commands never prompt. A failed precondition comes back as
//! [`Status::Failed`] with nothing mutated; the caller decides how to show
//! it. Failed mutating commands leave a script-error marker in the undo
//! history so a dump shows where a script went wrong.

use core_score::{ScoreExporter, TextExporter};
use core_state::{EditError, EditorSession};
use tracing::{debug, trace};

use crate::{Action, ActionObserver};

mod clipboard;
mod edit;
mod motion;
mod structure;
mod undo;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ok,
    /// Precondition not met; nothing changed.
    Failed(String),
    /// Text produced by a query action.
    Output(String),
}

/// Result of dispatching a single `Action`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchResult {
    /// The score or cursor changed and a redraw is needed.
    pub dirty: bool,
    pub quit: bool,
    pub status: Status,
}

impl DispatchResult {
    pub fn dirty() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn clean() -> Self {
        Self::default()
    }

    pub fn quit() -> Self {
        Self {
            quit: true,
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Failed(reason.into()),
            ..Self::default()
        }
    }

    pub fn output(text: String) -> Self {
        Self {
            status: Status::Output(text),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self.status, Status::Failed(_))
    }
}

/// Turn a command outcome into a result; failures are logged and marked in
/// the undo history.
pub(crate) fn settle<T>(session: &mut EditorSession, result: Result<T, EditError>) -> DispatchResult {
    match result {
        Ok(_) => DispatchResult::dirty(),
        Err(err) => {
            debug!(target: "actions.dispatch", %err, "precondition_failed");
            let position = session.position();
            session.undo.record_script_error(position);
            DispatchResult::failed(err.to_string())
        }
    }
}

/// Apply an action to the session.
pub fn dispatch(
    action: Action,
    session: &mut EditorSession,
    observers: &[Box<dyn ActionObserver>],
) -> DispatchResult {
    for obs in observers {
        obs.on_action(&action);
    }
    trace!(target: "actions.dispatch", ?action, "dispatch");

    match action {
        Action::Motion(kind) => motion::handle_motion(kind, session),
        Action::Edit(kind) => edit::handle_edit(kind, session),
        Action::Structure(kind) => structure::handle_structure(kind, session),
        Action::Clipboard(kind) => clipboard::handle_clipboard(kind, session),
        Action::InputMode(mode) => {
            session.set_input_mode(mode);
            DispatchResult::clean()
        }
        Action::Undo => undo::handle_undo(session),
        Action::Redo => undo::handle_redo(session),
        Action::UndoLog => undo::handle_undo_log(session),
        Action::Print => DispatchResult::output(TextExporter.export_to_string(&session.score)),
        Action::Quit => DispatchResult::quit(),
    }
}
