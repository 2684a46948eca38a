use core_score::{
    Chord, ClefType, LayoutFlags, Movement, MusicalObject, ObjectKind, Score, Ticks, Voice,
};
use core_state::{Cursor, EditorSession, SessionOptions};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Note(usize),
    Rest,
    Sharpen,
    Dot,
    DeletePrevious,
    MeasureAfter,
    Left,
    Right,
    Up,
    StaffUp,
    StaffDown,
    Mark,
    Copy,
    Cut,
    Paste,
    MeasureBefore { all: bool },
    DeleteMeasure { all: bool },
    StaffAfter,
    DeleteStaff,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0usize..7).prop_map(Step::Note),
        1 => Just(Step::Rest),
        1 => Just(Step::Sharpen),
        1 => Just(Step::Dot),
        1 => Just(Step::DeletePrevious),
        1 => Just(Step::MeasureAfter),
        2 => Just(Step::Left),
        1 => Just(Step::Right),
        1 => Just(Step::Up),
    ]
}

/// Single-staff edits plus clipboard, measure and staff structure commands.
fn multi_staff_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => step(),
        2 => Just(Step::StaffUp),
        2 => Just(Step::StaffDown),
        2 => Just(Step::Mark),
        1 => Just(Step::Copy),
        1 => Just(Step::Cut),
        2 => Just(Step::Paste),
        1 => any::<bool>().prop_map(|all| Step::MeasureBefore { all }),
        1 => any::<bool>().prop_map(|all| Step::DeleteMeasure { all }),
        1 => Just(Step::StaffAfter),
        1 => Just(Step::DeleteStaff),
    ]
}

/// Apply one step; returns true when it added an undoable unit.
fn apply(s: &mut EditorSession, step: &Step) -> bool {
    let depth = s.undo.undo_depth();
    match step {
        Step::Note(letter) => {
            let _ = s.insert_note(*letter);
        }
        Step::Rest => {
            let _ = s.insert_rest();
        }
        Step::Sharpen => {
            let _ = s.sharpen();
        }
        Step::Dot => {
            let _ = s.add_dot();
        }
        Step::DeletePrevious => {
            let _ = s.delete_previous();
        }
        Step::MeasureAfter => {
            let _ = s.insert_measure_after(true);
        }
        Step::Left => {
            let _ = s.move_left();
        }
        Step::Right => {
            let _ = s.move_right();
        }
        Step::Up => s.cursor_up(),
        Step::StaffUp => {
            let _ = s.staff_up();
        }
        Step::StaffDown => {
            let _ = s.staff_down();
        }
        Step::Mark => s.set_mark(),
        Step::Copy => {
            let _ = s.copy();
        }
        Step::Cut => {
            let _ = s.cut();
        }
        Step::Paste => {
            let _ = s.paste();
        }
        Step::MeasureBefore { all } => {
            let _ = s.insert_measure_before(*all);
        }
        Step::DeleteMeasure { all } => {
            let _ = s.delete_measure(*all);
        }
        Step::StaffAfter => {
            let _ = s.insert_staff(false, Voice::Primary);
        }
        Step::DeleteStaff => {
            let _ = s.delete_staff();
        }
    }
    s.undo.undo_depth() > depth
}

fn undo_redo_round_trip(mut s: EditorSession, steps: &[Step]) -> Result<(), TestCaseError> {
    let initial = shape(&s);
    let mut edits = 0usize;
    for st in steps {
        if apply(&mut s, st) {
            edits += 1;
        }
    }
    let edited = shape(&s);
    for _ in 0..edits {
        prop_assert!(s.undo());
    }
    prop_assert!(!s.undo());
    prop_assert_eq!(shape(&s), initial);
    for _ in 0..edits {
        prop_assert!(s.redo());
    }
    prop_assert!(!s.redo());
    prop_assert_eq!(shape(&s), edited);
    Ok(())
}

type Shape = Vec<Vec<Vec<(ObjectKind, Ticks, LayoutFlags)>>>;

fn shape(s: &EditorSession) -> Shape {
    s.movement()
        .staffs()
        .iter()
        .map(|staff| {
            staff
                .measures()
                .iter()
                .map(|m| {
                    m.objects()
                        .iter()
                        .map(|o| (o.kind.clone(), o.layout.start_tick, o.layout.flags))
                        .collect()
                })
                .collect()
        })
        .collect()
}

fn movement_from(lens: &[Vec<usize>]) -> Movement {
    let measures = lens.iter().map(Vec::len).max().unwrap_or(1);
    let mut mv = Movement::new(lens.len(), measures);
    for (s, staff) in lens.iter().enumerate() {
        for (m, &len) in staff.iter().enumerate() {
            for o in 0..len {
                let obj = if o % 3 == 2 {
                    MusicalObject::new(ObjectKind::Clef(core_score::Clef::new(ClefType::Bass)))
                } else {
                    MusicalObject::chord(Chord::with_note(3, 0, o as i32, 0))
                };
                mv.insert_object(s, m, o, obj).unwrap();
            }
        }
    }
    mv
}

fn layout_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..4, 1usize..5).prop_flat_map(|(staffs, measures)| {
        prop::collection::vec(prop::collection::vec(0usize..4, measures), staffs)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_then_redo_restores_every_edit(steps in prop::collection::vec(step(), 1..30)) {
        let s = EditorSession::new(Score::default(), SessionOptions::default());
        undo_redo_round_trip(s, &steps)?;
    }

    #[test]
    fn undo_then_redo_restores_edits_across_staffs(
        steps in prop::collection::vec(multi_staff_step(), 1..40),
    ) {
        let s = EditorSession::new(Score::new(Movement::new(2, 2)), SessionOptions::default());
        undo_redo_round_trip(s, &steps)?;
    }

    #[test]
    fn failed_commands_leave_no_trace(
        steps in prop::collection::vec(multi_staff_step(), 1..40),
    ) {
        let mut s = EditorSession::new(Score::new(Movement::new(2, 2)), SessionOptions::default());
        for st in &steps {
            let before = shape(&s);
            let log = s.undo.undo_log();
            if !apply(&mut s, st) {
                prop_assert_eq!(shape(&s), before);
                prop_assert_eq!(s.undo.undo_log(), log);
            }
        }
    }

    #[test]
    fn horizontal_navigation_saturates(
        lens in layout_strategy(),
        staff_pick in 0usize..4,
        measure_pick in 0usize..5,
        object_pick in 0usize..4,
    ) {
        let mv = movement_from(&lens);
        let staff = staff_pick % lens.len();
        let max_steps: usize = lens[staff].iter().map(|l| l + 1).sum::<usize>() + 2;

        let mut c = Cursor::new(staff, measure_pick, object_pick);
        c.normalize(&mv);
        let mut steps = 0;
        while c.move_left(&mv) {
            steps += 1;
            prop_assert!(steps <= max_steps);
        }
        prop_assert_eq!((c.staff, c.measure, c.object), (staff, 0, 0));
        prop_assert_eq!(c.appending, mv.measure(staff, 0).unwrap().is_empty());
        prop_assert!(!c.move_left(&mv));

        let mut steps = 0;
        while c.move_right(&mv) {
            steps += 1;
            prop_assert!(steps <= max_steps);
        }
        let last = mv.staff(staff).unwrap().measure_count() - 1;
        let len = mv.measure(staff, last).unwrap().len();
        prop_assert_eq!((c.measure, c.object, c.appending), (last, len, true));
        prop_assert!(!c.move_right(&mv));
    }

    #[test]
    fn copy_then_paste_reproduces_the_selection(lens in prop::collection::vec(1usize..7, 1)) {
        let mv = movement_from(&[lens.clone()]);
        let mut s = EditorSession::new(Score::new(mv), SessionOptions::default());
        let original: Vec<ObjectKind> = s
            .movement()
            .measure(0, 0)
            .unwrap()
            .objects()
            .iter()
            .map(|o| o.kind.clone())
            .collect();
        prop_assert!(s.goto_measure(0));
        s.set_mark();
        for _ in 1..original.len() {
            prop_assert!(s.move_right());
        }
        s.copy().unwrap();
        s.unset_mark();
        s.append_measures(1, true).unwrap();
        prop_assert!(s.end());
        s.paste().unwrap();
        let pasted: Vec<ObjectKind> = s
            .movement()
            .measure(0, 1)
            .unwrap()
            .objects()
            .iter()
            .map(|o| o.kind.clone())
            .collect();
        prop_assert_eq!(pasted, original);
    }
}
