//! Undo / redo dispatch and the undo queue dump.

use super::DispatchResult;
use core_state::EditorSession;
use std::fmt::Write;

pub(crate) fn handle_undo(session: &mut EditorSession) -> DispatchResult {
    if session.undo() {
        tracing::trace!(target: "actions.dispatch", op = "undo", undo_depth = session.undo.undo_depth(), "undo");
        DispatchResult::dirty()
    } else {
        DispatchResult::failed("nothing to undo")
    }
}

pub(crate) fn handle_redo(session: &mut EditorSession) -> DispatchResult {
    if session.redo() {
        tracing::trace!(target: "actions.dispatch", op = "redo", redo_depth = session.undo.redo_depth(), "redo");
        DispatchResult::dirty()
    } else {
        DispatchResult::failed("nothing to redo")
    }
}

/// One line per queued record, oldest first:
/// `tag movement staff measure object [appending]`.
pub(crate) fn handle_undo_log(session: &EditorSession) -> DispatchResult {
    let mut out = String::new();
    for (tag, pos) in session.undo.undo_log() {
        let _ = writeln!(
            out,
            "{tag} {} {} {} {}{}",
            pos.movement,
            pos.staff,
            pos.measure,
            pos.object,
            if pos.appending { " appending" } else { "" }
        );
    }
    DispatchResult::output(out)
}
