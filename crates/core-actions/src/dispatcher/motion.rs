//! Cursor navigation. Navigation never mutates the score; hitting a boundary
//! reports a failed status instead of an error.

use super::DispatchResult;
use crate::Motion;
use core_state::EditorSession;

pub(crate) fn handle_motion(kind: Motion, session: &mut EditorSession) -> DispatchResult {
    let moved = match kind {
        Motion::Left => session.move_left(),
        Motion::Right => session.move_right(),
        Motion::StaffUp => session.staff_up(),
        Motion::StaffDown => session.staff_down(),
        Motion::PitchUp => {
            session.cursor_up();
            true
        }
        Motion::PitchDown => {
            session.cursor_down();
            true
        }
        Motion::NextMeasure => session.next_measure(),
        Motion::PrevMeasure => session.prev_measure(),
        Motion::Home => session.home(),
        Motion::End => session.end(),
        Motion::Goto(measure) => session.goto_measure(measure),
        Motion::ShiftToNote(letter) => {
            session.shift_to_note(letter);
            true
        }
    };
    if moved {
        DispatchResult::dirty()
    } else {
        tracing::trace!(target: "actions.dispatch", ?kind, "motion_saturated");
        DispatchResult::failed("no movement possible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Movement, Score};
    use core_state::SessionOptions;

    #[test]
    fn boundaries_report_failure_without_mutation() {
        let mut s = EditorSession::new(Score::new(Movement::new(2, 3)), SessionOptions::default());
        assert!(!handle_motion(Motion::Left, &mut s).is_ok());
        assert!(!handle_motion(Motion::StaffUp, &mut s).is_ok());
        assert!(handle_motion(Motion::StaffDown, &mut s).dirty);
        assert!(handle_motion(Motion::Goto(2), &mut s).is_ok());
        assert_eq!((s.cursor.staff, s.cursor.measure), (1, 2));
        assert!(!handle_motion(Motion::Goto(7), &mut s).is_ok());
        assert_eq!(s.undo.undo_depth(), 0);
    }
}
