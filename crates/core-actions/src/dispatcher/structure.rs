//! Measure, staff and movement commands.

use super::{DispatchResult, settle};
use crate::StructureKind;
use core_state::EditorSession;
use tracing::debug;

pub(crate) fn handle_structure(kind: StructureKind, s: &mut EditorSession) -> DispatchResult {
    let result = match kind {
        StructureKind::MeasureBefore { all } => s.insert_measure_before(all),
        StructureKind::MeasureAfter { all } => s.insert_measure_after(all),
        StructureKind::AppendMeasures { count, all } => s.append_measures(count, all),
        StructureKind::DeleteMeasure { all } => s.delete_measure(all),
        StructureKind::StaffBefore(voice) => s.insert_staff(true, voice).map(drop),
        StructureKind::StaffAfter(voice) => s.insert_staff(false, voice).map(drop),
        StructureKind::DeleteStaff => s.delete_staff(),
        StructureKind::DeleteStaffAbove => s.delete_staff_above(),
        StructureKind::DeleteStaffBelow => s.delete_staff_below(),
        StructureKind::AddParasite => s.add_parasite_staff().map(drop),
        StructureKind::NewMovement => s.new_movement().map(drop),
        StructureKind::SwitchMovement(idx) => {
            return match s.switch_movement(idx) {
                Ok(()) => DispatchResult::dirty(),
                Err(err) => {
                    debug!(target: "actions.dispatch", %err, "precondition_failed");
                    DispatchResult::failed(err.to_string())
                }
            };
        }
    };
    settle(s, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Movement, Score, Voice};
    use core_state::SessionOptions;

    #[test]
    fn measures_follow_the_all_flag() {
        let mut s = EditorSession::new(Score::new(Movement::new(2, 1)), SessionOptions::default());
        handle_structure(StructureKind::AppendMeasures { count: 2, all: true }, &mut s);
        assert_eq!(s.movement().staff(1).unwrap().measure_count(), 3);
        handle_structure(StructureKind::MeasureAfter { all: false }, &mut s);
        assert_eq!(s.movement().staff(0).unwrap().measure_count(), 4);
        assert_eq!(s.movement().staff(1).unwrap().measure_count(), 3);
    }

    #[test]
    fn staff_commands_report_missing_neighbours() {
        let mut s = EditorSession::default();
        assert!(!handle_structure(StructureKind::DeleteStaffAbove, &mut s).is_ok());
        assert!(handle_structure(StructureKind::StaffAfter(Voice::Primary), &mut s).dirty);
        assert_eq!(s.movement().staff_count(), 2);
        // The new staff becomes current, so nothing lies below it.
        assert_eq!(s.cursor.staff, 1);
        assert!(!handle_structure(StructureKind::DeleteStaffBelow, &mut s).is_ok());
        assert_eq!(s.movement().staff_count(), 2);
        assert!(handle_structure(StructureKind::DeleteStaffAbove, &mut s).is_ok());
        assert_eq!(s.movement().staff_count(), 1);
        assert_eq!(s.cursor.staff, 0);
        assert!(!handle_structure(StructureKind::DeleteStaff, &mut s).is_ok());
    }

    #[test]
    fn movements_can_be_added_and_switched() {
        let mut s = EditorSession::default();
        assert!(handle_structure(StructureKind::NewMovement, &mut s).is_ok());
        assert_eq!(s.movement_index(), 1);
        assert!(handle_structure(StructureKind::SwitchMovement(0), &mut s).is_ok());
        assert!(!handle_structure(StructureKind::SwitchMovement(5), &mut s).is_ok());
    }
}
