//! Pitch entry, chord modifiers and object insertion.

use super::{DispatchResult, settle};
use crate::EditKind;
use core_score::{KeySig, TimeSig};
use core_state::EditorSession;

pub(crate) fn handle_edit(kind: EditKind, s: &mut EditorSession) -> DispatchResult {
    let result = match kind {
        EditKind::Note(letter) => s.insert_note(letter),
        EditKind::Rest => s.insert_rest(),
        EditKind::Midi(key) => s.insert_midi(key),
        EditKind::AddNote => s.add_note_to_chord(),
        EditKind::RemoveNote => s.remove_note_from_chord(),
        EditKind::Sharpen => s.sharpen(),
        EditKind::Flatten => s.flatten(),
        EditKind::SetDuration(code) => {
            // Only the entry duration changes; nothing to redraw.
            return match s.set_duration(code) {
                Ok(()) => DispatchResult::clean(),
                Err(err) => DispatchResult::failed(err.to_string()),
            };
        }
        EditKind::ChangeDuration(code) => s.change_duration(code),
        EditKind::AddDot => s.add_dot(),
        EditKind::RemoveDot => s.remove_dot(),
        EditKind::ToggleTie => s.toggle_tie(),
        EditKind::ToggleSlurBegin => s.toggle_slur_begin(),
        EditKind::ToggleSlurEnd => s.toggle_slur_end(),
        EditKind::ToggleGrace => s.toggle_grace(),
        EditKind::Clef(kind) => s.insert_clef(kind),
        EditKind::KeySig { sharps, minor } => s.insert_keysig(KeySig::new(sharps, minor)),
        EditKind::TimeSig {
            numerator,
            denominator,
        } => s.insert_timesig(TimeSig::new(numerator, denominator)),
        EditKind::Stem(dir) => s.insert_stem_directive(dir),
        EditKind::TupletOpen {
            numerator,
            denominator,
        } => s.open_tuplet(numerator, denominator),
        EditKind::TupletClose => s.close_tuplet(),
        EditKind::GraceStart => s.start_grace(),
        EditKind::GraceEnd => s.end_grace(),
        EditKind::Barline(kind) => s.insert_barline(kind),
        EditKind::Dynamic(text) => s.insert_dynamic(&text),
        EditKind::Lyric(text) => s.insert_lyric(&text),
        EditKind::Figure(text) => s.insert_figure(&text),
        EditKind::Directive(tag) => s.insert_directive(&tag),
        EditKind::DeleteObject => s.delete_object().map(drop),
        EditKind::DeletePrevious => s.delete_previous().map(drop),
    };
    settle(s, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::ObjectType;

    #[test]
    fn set_duration_applies_to_next_chord_only() {
        let mut s = EditorSession::default();
        let r = handle_edit(EditKind::SetDuration(3), &mut s);
        assert!(r.is_ok());
        assert!(!r.dirty);
        assert_eq!(s.undo.undo_depth(), 0);
        assert!(handle_edit(EditKind::Note(4), &mut s).dirty);
        let chord = s.movement().object(0, 0, 0).unwrap().as_chord().unwrap().clone();
        assert_eq!(chord.duration, 3);
        assert!(!handle_edit(EditKind::SetDuration(12), &mut s).is_ok());
    }

    #[test]
    fn object_insertion_and_deletion() {
        let mut s = EditorSession::default();
        handle_edit(EditKind::Clef(core_score::ClefType::Bass), &mut s);
        handle_edit(EditKind::Dynamic("pp".into()), &mut s);
        let types: Vec<ObjectType> = s
            .movement()
            .measure(0, 0)
            .unwrap()
            .objects()
            .iter()
            .map(|o| o.object_type())
            .collect();
        assert_eq!(types, vec![ObjectType::Clef, ObjectType::Dynamic]);
        assert!(handle_edit(EditKind::DeletePrevious, &mut s).dirty);
        assert_eq!(s.movement().measure(0, 0).unwrap().len(), 1);
    }
}
