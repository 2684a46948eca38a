//! Selection and clipboard commands.

use super::{DispatchResult, settle};
use crate::ClipKind;
use core_state::{EditError, EditorSession};

pub(crate) fn handle_clipboard(kind: ClipKind, s: &mut EditorSession) -> DispatchResult {
    match kind {
        ClipKind::SetMark => s.set_mark(),
        ClipKind::UnsetMark => s.unset_mark(),
        ClipKind::SelectMeasure => s.select_measure(),
        ClipKind::SelectAll => s.select_all(),
        ClipKind::SelectionMode(mode) => s.set_selection_mode(mode),
        ClipKind::Copy => return not_mutating(s.copy()),
        ClipKind::Push => s.push_clipboard(),
        ClipKind::Pop => return not_mutating(s.pop_clipboard()),
        ClipKind::Cut => {
            let r = s.cut();
            return settle(s, r);
        }
        ClipKind::Paste => {
            let r = s.paste();
            return settle(s, r);
        }
        ClipKind::InsertObject { staff, index } => {
            let r = s.insert_clip_object(staff, index);
            return settle(s, r);
        }
    }
    // Selection highlight changed.
    DispatchResult::dirty()
}

fn not_mutating<T>(result: Result<T, EditError>) -> DispatchResult {
    match result {
        Ok(_) => DispatchResult::clean(),
        Err(err) => {
            tracing::debug!(target: "actions.dispatch", %err, "precondition_failed");
            DispatchResult::failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_clipboard_paths_fail_cleanly() {
        let mut s = EditorSession::default();
        assert!(!handle_clipboard(ClipKind::Paste, &mut s).is_ok());
        assert!(!handle_clipboard(ClipKind::Pop, &mut s).is_ok());
        assert!(!handle_clipboard(ClipKind::Copy, &mut s).is_ok());
        assert_eq!(s.movement().measure(0, 0).unwrap().len(), 0);
    }

    #[test]
    fn push_then_pop_restores_the_clipboard() {
        let mut s = EditorSession::default();
        s.insert_note(0).unwrap();
        s.insert_note(1).unwrap();
        assert!(s.goto_measure(0));
        handle_clipboard(ClipKind::SetMark, &mut s);
        assert!(s.move_right());
        assert!(handle_clipboard(ClipKind::Copy, &mut s).is_ok());
        assert_eq!(s.clip_object_count(0), Some(2));

        handle_clipboard(ClipKind::Push, &mut s);
        handle_clipboard(ClipKind::SelectMeasure, &mut s);
        assert!(handle_clipboard(ClipKind::Cut, &mut s).dirty);
        assert!(handle_clipboard(ClipKind::Pop, &mut s).is_ok());
        assert_eq!(s.clip_object_count(0), Some(2));
    }
}
