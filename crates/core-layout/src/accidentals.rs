//! Accidental carry-forward.
//!
//! Per diatonic letter we remember which alteration is currently sounding.
//! The state starts from the key signature at each measure and at each key
//! change. A note shows its accidental when it contradicts a same-letter note
//! of its own chord, when it differs from the state before its chord, or when
//! one of its directives forces display.

use core_score::pitch::LETTERS;
use core_score::{KeySig, Measure, ObjectKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Carried {
    Shift(i8),
    /// Two different alterations of the letter met in one chord.
    Contradicted,
}

fn from_key(key: &KeySig) -> [Carried; LETTERS] {
    let mut state = [Carried::Shift(0); LETTERS];
    for (slot, &shift) in state.iter_mut().zip(key.accidentals.iter()) {
        *slot = Carried::Shift(shift);
    }
    state
}

/// Columns needed to stack shown accidentals without collision.
const ACCIDENTAL_CLEARANCE: i32 = 6;

/// Decide `show_accidental` and `accidental_position` for every note.
/// `key` is the key in force at the measure start; on return it holds the
/// key in force at the measure end.
pub fn compute_accidental_visibility(measure: &mut Measure, key: &mut KeySig) {
    let mut state = from_key(key);
    for obj in measure.objects_mut() {
        if let ObjectKind::KeySig(k) = &obj.kind {
            *key = *k;
            state = from_key(key);
            continue;
        }
        let Some(chord) = obj.as_chord_mut() else {
            continue;
        };
        let before = state;
        let shifts: Vec<(usize, i8)> = chord.notes.iter().map(|n| (n.letter(), n.enshift)).collect();
        for (idx, note) in chord.notes.iter_mut().enumerate() {
            let letter = note.letter();
            let contradicted = shifts
                .iter()
                .enumerate()
                .any(|(j, &(l, s))| j != idx && l == letter && s != note.enshift);
            note.show_accidental = if contradicted {
                state[letter] = Carried::Contradicted;
                true
            } else if before[letter] != Carried::Shift(note.enshift) {
                state[letter] = Carried::Shift(note.enshift);
                true
            } else {
                note.forces_accidental()
            };
        }
        assign_columns(chord.notes.as_mut_slice());
    }
}

/// Stack shown accidentals top-down into the first column whose last
/// occupant is far enough above.
fn assign_columns(notes: &mut [core_score::Note]) {
    let mut columns: Vec<i32> = Vec::new();
    for note in notes.iter_mut().rev() {
        note.accidental_position = 0;
        if !note.show_accidental {
            continue;
        }
        let pos = note.mid_c_offset;
        let col = columns
            .iter()
            .position(|&last| last - pos >= ACCIDENTAL_CLEARANCE)
            .unwrap_or(columns.len());
        if col == columns.len() {
            columns.push(pos);
        } else {
            columns[col] = pos;
        }
        note.accidental_position = u8::try_from(col).unwrap_or(u8::MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Chord, Directive, MusicalObject};

    fn n(offset: i32, shift: i8) -> MusicalObject {
        MusicalObject::chord(Chord::with_note(2, 0, offset, shift))
    }

    fn shown(m: &Measure) -> Vec<Vec<bool>> {
        m.objects()
            .iter()
            .filter_map(|o| o.as_chord())
            .map(|c| c.notes.iter().map(|n| n.show_accidental).collect())
            .collect()
    }

    #[test]
    fn accidental_carries_through_measure() {
        let mut m = Measure::from_objects(vec![n(3, 1), n(3, 1), n(3, 0), n(10, 1)]);
        compute_accidental_visibility(&mut m, &mut KeySig::default());
        assert_eq!(shown(&m), vec![vec![true], vec![false], vec![true], vec![true]]);
    }

    #[test]
    fn key_signature_accidentals_are_silent() {
        let mut key = KeySig::new(1, false);
        let mut m = Measure::from_objects(vec![n(3, 1), n(3, 0)]);
        compute_accidental_visibility(&mut m, &mut key);
        assert_eq!(shown(&m), vec![vec![false], vec![true]]);
    }

    #[test]
    fn key_change_resets_state() {
        let mut key = KeySig::default();
        let mut m = Measure::from_objects(vec![
            n(4, 1),
            MusicalObject::new(ObjectKind::KeySig(KeySig::new(2, false))),
            n(3, 1),
        ]);
        compute_accidental_visibility(&mut m, &mut key);
        assert_eq!(shown(&m), vec![vec![true], vec![false]]);
        assert_eq!(key.number, 2);
    }

    #[test]
    fn same_letter_clash_in_chord_is_contradicted() {
        let mut chord = Chord::with_note(2, 0, 3, 1);
        chord.add_note(10, 0);
        let mut m = Measure::from_objects(vec![MusicalObject::chord(chord), n(10, 0)]);
        compute_accidental_visibility(&mut m, &mut KeySig::default());
        assert_eq!(shown(&m), vec![vec![true, true], vec![true]]);
    }

    #[test]
    fn forced_directive_shows_redundant_accidental() {
        let mut chord = Chord::with_note(2, 0, 0, 0);
        chord.notes[0].directives.push(Directive::tagged("!"));
        let mut m = Measure::from_objects(vec![MusicalObject::chord(chord)]);
        compute_accidental_visibility(&mut m, &mut KeySig::default());
        assert_eq!(shown(&m), vec![vec![true]]);
    }

    #[test]
    fn close_accidentals_stack_into_columns() {
        let mut chord = Chord::with_note(2, 0, 0, 1);
        chord.add_note(2, 1);
        chord.add_note(11, 1);
        let mut m = Measure::from_objects(vec![MusicalObject::chord(chord)]);
        compute_accidental_visibility(&mut m, &mut KeySig::default());
        let cols: Vec<u8> = m.objects()[0]
            .as_chord()
            .unwrap()
            .notes
            .iter()
            .map(|n| n.accidental_position)
            .collect();
        assert_eq!(cols, vec![1, 0, 0]);
    }
}
