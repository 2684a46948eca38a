use core_score::{Movement, ObjectType, Score, TimeSig, WHOLE_NOTE_TICKS};
use core_state::{EditorSession, SessionOptions};
use pretty_assertions::assert_eq;

fn session(staffs: usize, measures: usize) -> EditorSession {
    EditorSession::new(
        Score::new(Movement::new(staffs, measures)),
        SessionOptions::default(),
    )
}

fn pitches(s: &EditorSession, staff: usize, measure: usize) -> Vec<i32> {
    s.movement()
        .measure(staff, measure)
        .unwrap()
        .objects()
        .iter()
        .filter_map(|o| o.as_chord())
        .flat_map(|c| c.notes.iter().map(|n| n.mid_c_offset))
        .collect()
}

#[test]
fn copy_four_quarters_and_paste_into_appended_measure() {
    let mut s = session(1, 1);
    for letter in [0, 1, 2, 3] {
        s.insert_note(letter).unwrap();
    }
    assert_eq!(pitches(&s, 0, 0), vec![0, 1, 2, 3]);

    assert!(s.goto_measure(0));
    s.set_mark();
    for _ in 0..3 {
        assert!(s.move_right());
    }
    assert_eq!(s.copy().unwrap(), 1);
    assert_eq!(s.clip_object_count(0), Some(4));
    assert_eq!(s.clip_object_type(0, 0), Some(ObjectType::Chord));

    s.unset_mark();
    s.append_measures(1, true).unwrap();
    assert!(s.end());
    assert_eq!((s.cursor.measure, s.cursor.appending), (1, true));
    s.paste().unwrap();

    assert_eq!(pitches(&s, 0, 1), vec![0, 1, 2, 3]);
    assert_eq!(pitches(&s, 0, 0), vec![0, 1, 2, 3]);
    assert_eq!(s.clip_object_count(0), Some(4));
}

#[test]
fn time_signature_deletion_is_score_wide() {
    let mut s = session(3, 4);
    assert!(s.goto_measure(2));
    s.insert_timesig(TimeSig::new(3, 4)).unwrap();
    for staff in 0..3 {
        let m = s.movement().measure(staff, 2).unwrap();
        assert_eq!(m.get(0).map(|o| o.object_type()), Some(ObjectType::TimeSig));
        assert_eq!(m.layout.capacity, WHOLE_NOTE_TICKS * 3 / 4);
        let later = s.movement().measure(staff, 3).unwrap();
        assert_eq!(later.layout.capacity, WHOLE_NOTE_TICKS * 3 / 4);
    }

    assert!(s.move_left());
    assert!(!s.cursor.appending);
    let removed = s.delete_object().unwrap();
    assert_eq!(removed.object_type(), ObjectType::TimeSig);
    for staff in 0..3 {
        let m = s.movement().measure(staff, 2).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.layout.capacity, WHOLE_NOTE_TICKS);
        let later = s.movement().measure(staff, 3).unwrap();
        assert_eq!(later.layout.capacity, WHOLE_NOTE_TICKS);
    }

    assert!(s.undo());
    for staff in 0..3 {
        let m = s.movement().measure(staff, 2).unwrap();
        assert_eq!(m.get(0).map(|o| o.object_type()), Some(ObjectType::TimeSig));
    }
}

#[test]
fn triplet_of_eighths_fills_one_quarter() {
    let mut s = session(1, 1);
    s.open_tuplet(2, 3).unwrap();
    s.set_duration(3).unwrap();
    for letter in [0, 1, 2] {
        s.insert_note(letter).unwrap();
    }
    s.close_tuplet().unwrap();
    let m = s.movement().measure(0, 0).unwrap();
    assert_eq!(m.layout.total_ticks, WHOLE_NOTE_TICKS / 4);
    let last_note = m.get(3).unwrap();
    assert_eq!(last_note.layout.start_tick_of_next, WHOLE_NOTE_TICKS / 4);
}

#[test]
fn cut_paste_moves_music_and_undoes_in_two_steps() {
    let mut s = session(1, 2);
    for letter in [0, 2, 4] {
        s.insert_note(letter).unwrap();
    }
    assert!(s.goto_measure(0));
    s.set_mark();
    assert!(s.move_right());
    s.cut().unwrap();
    assert_eq!(pitches(&s, 0, 0), vec![4]);

    assert!(s.goto_measure(1));
    s.paste().unwrap();
    assert_eq!(pitches(&s, 0, 1), vec![0, 2]);

    assert!(s.undo());
    assert!(pitches(&s, 0, 1).is_empty());
    assert!(s.undo());
    assert_eq!(pitches(&s, 0, 0), vec![0, 2, 4]);
    assert!(s.redo());
    assert_eq!(pitches(&s, 0, 0), vec![4]);
}

#[test]
fn multi_staff_paste_inserts_measures_and_fills_each_staff() {
    let mut s = session(2, 2);
    s.insert_note(0).unwrap();
    assert!(s.staff_down());
    s.insert_note(4).unwrap();
    assert!(s.staff_up());
    assert!(s.goto_measure(0));
    s.select_all();
    s.copy().unwrap();
    assert_eq!(s.clipboard.measure_breaks(), 1);
    s.unset_mark();

    assert!(s.goto_measure(1));
    s.paste().unwrap();
    assert_eq!(s.movement().staff(0).unwrap().measure_count(), 3);
    assert_eq!(s.movement().staff(1).unwrap().measure_count(), 3);
    assert_eq!(pitches(&s, 0, 1), vec![0]);
    assert_eq!(pitches(&s, 1, 1), pitches(&s, 1, 0));
    assert_eq!(pitches(&s, 1, 1).len(), 1);
}
