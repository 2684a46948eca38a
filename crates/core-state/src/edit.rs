//! Editing commands.
//!
//! The first half of this file holds the primitives: every score mutation
//! goes through one of them so it is logged on the undo queue and marked
//! dirty for layout. The second half builds the user commands (pitch entry,
//! chord modifiers, context objects, measure and staff structure) on top.
//! Multi-step commands run inside a staged bracket and undo as one step.

use core_score::duration::MAX_DURATION_CODE;
use core_score::pitch::letter_class;
use core_score::{
    BarlineKind, Chord, Clef, ClefType, Directive, KeySig, MeasureFill, MeasureRemoval,
    MeasureScope, MusicalObject, ObjectKind, ObjectType, ScoreError, Staff, StemDirection,
    TextMark, TimeSig, Tuplet, Voice,
};
use tracing::{debug, trace};

use crate::EditError;
use crate::cursor::Cursor;
use crate::session::{EditorSession, InputMode};
use crate::undo::{UndoAction, UndoRecord};

/// Most augmentation dots a chord may carry.
pub const MAX_DOTS: u8 = 4;

// Primitives.
impl EditorSession {
    /// Run `f` inside a staged bracket. When the outermost stage fails,
    /// everything it logged is reverted and the cursor put back.
    pub fn staged<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let start = self.position();
        let cursor = self.cursor;
        self.undo.stage_start(start);
        let result = f(self);
        if result.is_err() && !self.undo.is_guarded() && self.undo.level() == 1 {
            self.revert_stage(cursor);
        } else {
            let end = self.position();
            self.undo.stage_end(end);
        }
        result
    }

    fn revert_stage(&mut self, cursor: Cursor) {
        let mut pos = self.position();
        match self.undo.abort_stage(&mut self.score, &mut pos) {
            Some(0) => {}
            reverted => {
                debug!(target: "state.edit", ?reverted, "failed_command_reverted");
                self.dirty.mark_all();
            }
        }
        self.cursor = cursor;
        self.relayout();
    }

    /// Record the whole current movement for undo.
    pub fn take_snapshot(&mut self) -> Result<(), EditError> {
        let snapshot = Box::new(self.movement().clone());
        let pos = self.position();
        self.undo
            .record(UndoRecord::new(UndoAction::Snapshot(snapshot), pos));
        trace!(target: "state.undo", movement = self.movement_index(), "snapshot_taken");
        Ok(())
    }

    pub fn insert_object_at(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
        object: MusicalObject,
    ) -> Result<usize, EditError> {
        let idx = self
            .movement_mut()?
            .insert_object(staff, measure, at, object.clone())?;
        let pos = self.position_at(staff, measure, idx);
        self.undo.record(UndoRecord::new(UndoAction::Insert(object), pos));
        self.mark_dirty(staff, measure);
        Ok(idx)
    }

    pub fn delete_object_at(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
    ) -> Result<MusicalObject, EditError> {
        let removed = self.movement_mut()?.remove_object(staff, measure, at)?;
        let pos = self.position_at(staff, measure, at);
        self.undo
            .record(UndoRecord::new(UndoAction::Delete(removed.clone()), pos));
        self.mark_dirty(staff, measure);
        Ok(removed)
    }

    /// Replace an object in place; the undo record keeps the old one.
    pub fn change_object_at(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
        object: MusicalObject,
    ) -> Result<MusicalObject, EditError> {
        let old = self
            .movement_mut()?
            .replace_object(staff, measure, at, object)?;
        let pos = self.position_at(staff, measure, at);
        self.undo
            .record(UndoRecord::new(UndoAction::Change(old.clone()), pos));
        self.mark_dirty(staff, measure);
        Ok(old)
    }

    pub fn insert_measures_logged(
        &mut self,
        scope: MeasureScope,
        at: usize,
        count: usize,
    ) -> Result<Vec<usize>, EditError> {
        let staffs = self.movement_mut()?.insert_measures(scope, at, count)?;
        for &staff in &staffs {
            let len = self.movement().staff(staff)?.measure_count();
            let first = at.min(len.saturating_sub(count));
            for m in first..first + count {
                let pos = self.position_at(staff, m, 0);
                self.undo.record(UndoRecord::new(UndoAction::MeasureCreate, pos));
            }
            self.mark_dirty(staff, first);
        }
        Ok(staffs)
    }

    pub fn remove_measures_logged(
        &mut self,
        scope: MeasureScope,
        at: usize,
        count: usize,
    ) -> Result<MeasureRemoval, EditError> {
        let removal = self.movement_mut()?.remove_measures(scope, at, count)?;
        for (staff, pos, measure) in &removal.removed {
            let record_pos = self.position_at(*staff, *pos, 0);
            self.undo
                .record(UndoRecord::new(UndoAction::MeasureRemove(measure.clone()), record_pos));
            self.mark_dirty(*staff, *pos);
        }
        for &staff in &removal.substituted {
            let pos = self.position_at(staff, 0, 0);
            self.undo.record(UndoRecord::new(UndoAction::MeasureCreate, pos));
            self.mark_dirty(staff, 0);
        }
        Ok(removal)
    }

    /// All staffs when `all` is set and the current staff is as long as the
    /// longest one; otherwise only the current staff.
    pub(crate) fn measure_scope(&self, all: bool) -> MeasureScope {
        let movement = self.movement();
        let storage = movement.storage_staff(self.cursor.staff);
        let longest = movement
            .staff(storage)
            .is_ok_and(|s| s.measure_count() == movement.max_measure_count());
        if all && longest {
            MeasureScope::AllStaffs
        } else {
            MeasureScope::Staff(self.cursor.staff)
        }
    }

    /// Before an insert: an appending cursor in a full measure moves to the
    /// start of the next measure, which is created when missing.
    fn prepare_insertion_point(&mut self) -> Result<(), EditError> {
        if !self.cursor.appending {
            return Ok(());
        }
        let (staff, measure) = (self.cursor.staff, self.cursor.measure);
        let fill = self.movement().measure(staff, measure)?.layout.fill;
        if !matches!(fill, MeasureFill::Complete | MeasureFill::Overfull(_)) {
            return Ok(());
        }
        let next = measure + 1;
        if next >= self.movement().staff(staff)?.measure_count() {
            let scope = self.measure_scope(true);
            self.insert_measures_logged(scope, next, 1)?;
            debug!(target: "state.edit", staff, measure = next, "measure_appended_for_insert");
        }
        self.cursor.measure = next;
        self.cursor.object = 0;
        self.cursor.appending = self.movement().measure(staff, next)?.is_empty();
        Ok(())
    }

    /// Insert `object` at the cursor and step past it.
    pub fn insert_at_cursor(&mut self, object: MusicalObject) -> Result<(), EditError> {
        self.staged(|s| {
            s.prepare_insertion_point()?;
            let (staff, measure, at) = (s.cursor.staff, s.cursor.measure, s.cursor.object);
            let idx = s.insert_object_at(staff, measure, at, object)?;
            s.cursor.object = idx + 1;
            let len = s.movement().measure(staff, measure)?.len();
            s.cursor.appending = s.cursor.object >= len;
            Ok(())
        })?;
        self.relayout();
        Ok(())
    }

    /// Index of the object commands act on: the one under the cursor, or the
    /// last one when appending.
    fn target_object(&self) -> Result<usize, EditError> {
        if !self.cursor.appending {
            return Ok(self.cursor.object);
        }
        self.cursor
            .object
            .checked_sub(1)
            .ok_or(EditError::NoCurrentObject)
    }
}

// Pitch entry and chord modifiers.
impl EditorSession {
    /// Accidental in force for `mid_c_offset` at the cursor: the last note of
    /// the same letter earlier in the measure, else the key signature.
    pub fn enshift_in_force(&self, mid_c_offset: i32) -> i8 {
        let letter = letter_class(mid_c_offset);
        let before = self
            .movement()
            .measure(self.cursor.staff, self.cursor.measure)
            .map(|m| &m.objects()[..self.cursor.object.min(m.len())])
            .unwrap_or(&[]);
        let earlier = before
            .iter()
            .rev()
            .filter_map(MusicalObject::as_chord)
            .flat_map(|c| c.notes.iter().rev())
            .find(|n| n.letter() == letter)
            .map(|n| n.enshift);
        earlier.unwrap_or_else(|| self.context_at_cursor().keysig.accidental_for(letter))
    }

    /// Enter a note by letter class (0 = C .. 6 = B).
    pub fn insert_note(&mut self, letter: usize) -> Result<(), EditError> {
        self.cursor.shift_to_note(letter);
        let offset = self.cursor.cursor_y;
        let enshift = self.enshift_in_force(offset);
        if self.input_mode == InputMode::Edit {
            return self.repitch_current(offset, enshift);
        }
        let chord = Chord::with_note(self.duration, 0, offset, enshift);
        self.insert_at_cursor(MusicalObject::chord(chord))
    }

    pub fn insert_rest(&mut self) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::chord(Chord::rest(self.duration, 0)))
    }

    /// Enter a note from a MIDI key, spelled in the key signature in force.
    pub fn insert_midi(&mut self, key: u8) -> Result<(), EditError> {
        let (offset, enshift) = self.context_at_cursor().keysig.spell_midi(key);
        self.cursor.cursor_y = offset;
        if self.input_mode == InputMode::Edit {
            return self.repitch_current(offset, enshift);
        }
        let chord = Chord::with_note(self.duration, 0, offset, enshift);
        self.insert_at_cursor(MusicalObject::chord(chord))
    }

    fn repitch_current(&mut self, offset: i32, enshift: i8) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.notes.clear();
            chord.add_note(offset, enshift);
            Ok(())
        })
    }

    /// Apply `f` to a copy of the current chord and log the change.
    pub fn modify_current_chord(
        &mut self,
        f: impl FnOnce(&mut Chord) -> Result<(), EditError>,
    ) -> Result<(), EditError> {
        let idx = self.target_object()?;
        let (staff, measure) = (self.cursor.staff, self.cursor.measure);
        let mut object = self
            .movement()
            .object(staff, measure, idx)
            .map_err(|_| EditError::NoCurrentObject)?
            .clone();
        let chord = object.as_chord_mut().ok_or(EditError::NotAChord)?;
        f(chord)?;
        self.change_object_at(staff, measure, idx, object)?;
        self.relayout();
        Ok(())
    }

    /// Add a note at the pitch cursor to the current chord.
    pub fn add_note_to_chord(&mut self) -> Result<(), EditError> {
        let offset = self.cursor.cursor_y;
        let enshift = self.enshift_in_force(offset);
        self.modify_current_chord(|chord| {
            chord.add_note(offset, enshift);
            Ok(())
        })
    }

    /// Remove the note nearest the pitch cursor; the last note leaves a rest.
    pub fn remove_note_from_chord(&mut self) -> Result<(), EditError> {
        let offset = self.cursor.cursor_y;
        self.modify_current_chord(|chord| {
            chord.remove_nearest(offset).map(|_| ()).ok_or(EditError::NoNote)
        })
    }

    fn alter_nearest(&mut self, delta: i8) -> Result<(), EditError> {
        let offset = self.cursor.cursor_y;
        self.modify_current_chord(|chord| {
            let idx = chord.nearest_note_index(offset).ok_or(EditError::NoNote)?;
            let note = &mut chord.notes[idx];
            note.enshift = (note.enshift + delta).clamp(-2, 2);
            Ok(())
        })
    }

    pub fn sharpen(&mut self) -> Result<(), EditError> {
        self.alter_nearest(1)
    }

    pub fn flatten(&mut self) -> Result<(), EditError> {
        self.alter_nearest(-1)
    }

    /// Duration code for chords entered from now on.
    pub fn set_duration(&mut self, code: i32) -> Result<(), EditError> {
        if !(0..=MAX_DURATION_CODE).contains(&code) {
            return Err(EditError::InvalidDuration(code));
        }
        self.duration = code;
        Ok(())
    }

    pub fn change_duration(&mut self, code: i32) -> Result<(), EditError> {
        if !(0..=MAX_DURATION_CODE).contains(&code) {
            return Err(EditError::InvalidDuration(code));
        }
        self.modify_current_chord(|chord| {
            chord.duration = code;
            Ok(())
        })
    }

    pub fn add_dot(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.dots = (chord.dots + 1).min(MAX_DOTS);
            Ok(())
        })
    }

    pub fn remove_dot(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.dots = chord.dots.saturating_sub(1);
            Ok(())
        })
    }

    pub fn toggle_tie(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.tied = !chord.tied;
            Ok(())
        })
    }

    pub fn toggle_slur_begin(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.slur_begin = !chord.slur_begin;
            Ok(())
        })
    }

    pub fn toggle_slur_end(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.slur_end = !chord.slur_end;
            Ok(())
        })
    }

    pub fn toggle_grace(&mut self) -> Result<(), EditError> {
        self.modify_current_chord(|chord| {
            chord.is_grace = !chord.is_grace;
            Ok(())
        })
    }
}

// Context and marker objects.
impl EditorSession {
    pub fn insert_clef(&mut self, kind: ClefType) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::Clef(Clef::new(kind))))
    }

    pub fn insert_keysig(&mut self, key: KeySig) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::KeySig(key)))
    }

    pub fn insert_stem_directive(&mut self, dir: StemDirection) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::StemDirective(dir)))
    }

    pub fn open_tuplet(&mut self, numerator: u32, denominator: u32) -> Result<(), EditError> {
        let tuplet = Tuplet::new(numerator, denominator);
        self.insert_at_cursor(MusicalObject::new(ObjectKind::TupletOpen(tuplet)))
    }

    pub fn close_tuplet(&mut self) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::TupletClose))
    }

    pub fn start_grace(&mut self) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::GraceStart))
    }

    pub fn end_grace(&mut self) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::GraceEnd))
    }

    pub fn insert_barline(&mut self, kind: BarlineKind) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::Barline(kind)))
    }

    pub fn insert_dynamic(&mut self, text: &str) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::Dynamic(TextMark::new(text))))
    }

    pub fn insert_lyric(&mut self, text: &str) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::Lyric(TextMark::new(text))))
    }

    pub fn insert_figure(&mut self, text: &str) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::Figure(TextMark::new(text))))
    }

    pub fn insert_directive(&mut self, tag: &str) -> Result<(), EditError> {
        self.insert_at_cursor(MusicalObject::new(ObjectKind::LilyDirective(Directive::tagged(tag))))
    }

    /// Put a time signature at the start of the cursor measure on every
    /// staff, replacing one already there.
    pub fn insert_timesig(&mut self, timesig: TimeSig) -> Result<(), EditError> {
        let measure = self.cursor.measure;
        let object = MusicalObject::new(ObjectKind::TimeSig(timesig));
        let cursor_storage = self.movement().storage_staff(self.cursor.staff);
        self.staged(|s| {
            for staff in s.timesig_staffs(measure) {
                let existing = s
                    .movement()
                    .measure(staff, measure)?
                    .get(0)
                    .is_some_and(|o| o.object_type() == ObjectType::TimeSig);
                if existing {
                    s.change_object_at(staff, measure, 0, object.clone())?;
                } else {
                    s.insert_object_at(staff, measure, 0, object.clone())?;
                    if staff == cursor_storage {
                        s.cursor.object += 1;
                    }
                }
            }
            Ok(())
        })?;
        self.relayout();
        debug!(target: "state.edit", measure, numerator = timesig.numerator, denominator = timesig.denominator, "timesig_set");
        Ok(())
    }

    /// Non-parasite staffs long enough to hold `measure`.
    fn timesig_staffs(&self, measure: usize) -> Vec<usize> {
        self.movement()
            .staffs()
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_parasite() && s.measure_count() > measure)
            .map(|(i, _)| i)
            .collect()
    }

    /// Delete the object under the cursor. A time signature is removed from
    /// the same measure of every staff.
    pub fn delete_object(&mut self) -> Result<MusicalObject, EditError> {
        if self.cursor.appending {
            return Err(EditError::NoCurrentObject);
        }
        let (staff, measure, object) = (self.cursor.staff, self.cursor.measure, self.cursor.object);
        let target = self
            .movement()
            .object(staff, measure, object)
            .map_err(|_| EditError::NoCurrentObject)?
            .clone();
        if target.object_type() == ObjectType::TimeSig {
            self.staged(|s| {
                for other in s.timesig_staffs(measure) {
                    let pos = s
                        .movement()
                        .measure(other, measure)?
                        .objects()
                        .iter()
                        .position(|o| o.object_type() == ObjectType::TimeSig);
                    if let Some(pos) = pos {
                        s.delete_object_at(other, measure, pos)?;
                    }
                }
                Ok(())
            })?;
            debug!(target: "state.edit", measure, "timesig_removed_from_all_staffs");
        } else {
            self.delete_object_at(staff, measure, object)?;
        }
        self.relayout();
        Ok(target)
    }

    /// Delete the object left of the cursor and step onto its slot.
    pub fn delete_previous(&mut self) -> Result<MusicalObject, EditError> {
        let prev = self
            .cursor
            .object
            .checked_sub(1)
            .ok_or(EditError::NoCurrentObject)?;
        self.cursor.object = prev;
        self.cursor.appending = false;
        self.delete_object()
    }
}

// Measure and staff structure.
impl EditorSession {
    pub fn insert_measure_before(&mut self, all: bool) -> Result<(), EditError> {
        self.insert_measure_at(self.cursor.measure, all)
    }

    pub fn insert_measure_after(&mut self, all: bool) -> Result<(), EditError> {
        self.insert_measure_at(self.cursor.measure + 1, all)
    }

    fn insert_measure_at(&mut self, at: usize, all: bool) -> Result<(), EditError> {
        let scope = self.measure_scope(all);
        self.staged(|s| s.insert_measures_logged(scope, at, 1).map(|_| ()))?;
        self.cursor.measure = at;
        self.cursor.object = 0;
        self.relayout();
        Ok(())
    }

    /// Append `count` empty measures at the end of the staff (or all staffs).
    pub fn append_measures(&mut self, count: usize, all: bool) -> Result<(), EditError> {
        let scope = self.measure_scope(all);
        let at = match scope {
            MeasureScope::AllStaffs => self.movement().max_measure_count(),
            MeasureScope::Staff(s) => self.movement().staff(s)?.measure_count(),
        };
        self.staged(|s| s.insert_measures_logged(scope, at, count).map(|_| ()))?;
        self.relayout();
        Ok(())
    }

    pub fn delete_measure(&mut self, all: bool) -> Result<(), EditError> {
        let scope = self.measure_scope(all);
        let at = self.cursor.measure;
        let removal = self.staged(|s| s.remove_measures_logged(scope, at, 1))?;
        self.cursor.measure = removal.cursor_measure;
        self.cursor.object = 0;
        self.relayout();
        Ok(())
    }

    /// Insert a staff above (`before`) or below the current one.
    pub fn insert_staff(&mut self, before: bool, voice: Voice) -> Result<usize, EditError> {
        let current = self.movement().staff(self.cursor.staff)?;
        let count = self.movement().max_measure_count();
        let name = format!("Staff {}", self.movement().staff_count() + 1);
        let staff = Staff::new(name, voice, count).with_context(current.initial);
        let at = if before {
            self.cursor.staff
        } else {
            self.cursor.staff + 1
        };
        let at = self.staged(|s| {
            s.take_snapshot()?;
            Ok(s.movement_mut()?.insert_staff(at, staff))
        })?;
        self.cursor.staff = at;
        self.dirty.mark_all();
        self.relayout();
        Ok(at)
    }

    pub fn delete_staff(&mut self) -> Result<(), EditError> {
        self.remove_staff_at(self.cursor.staff)
    }

    pub fn delete_staff_above(&mut self) -> Result<(), EditError> {
        let above = self
            .cursor
            .staff
            .checked_sub(1)
            .ok_or(EditError::NoStaffAbove)?;
        self.remove_staff_at(above)?;
        self.cursor.staff = above;
        self.relayout();
        Ok(())
    }

    pub fn delete_staff_below(&mut self) -> Result<(), EditError> {
        let below = self.cursor.staff + 1;
        if below >= self.movement().staff_count() {
            return Err(EditError::NoStaffBelow);
        }
        self.remove_staff_at(below)
    }

    fn remove_staff_at(&mut self, at: usize) -> Result<(), EditError> {
        if self.movement().staff_count() == 1 {
            return Err(ScoreError::LastStaff.into());
        }
        self.staged(|s| {
            s.take_snapshot()?;
            s.movement_mut()?.remove_staff(at)?;
            Ok(())
        })?;
        self.selection.unset_mark();
        self.dirty.mark_all();
        self.relayout();
        Ok(())
    }

    /// Add a staff below the current one mirroring its measures.
    pub fn add_parasite_staff(&mut self) -> Result<usize, EditError> {
        let host = self.cursor.staff;
        self.movement().staff(host)?;
        let at = self.staged(|s| {
            s.take_snapshot()?;
            Ok(s.movement_mut()?.add_parasite(host, Voice::Primary)?)
        })?;
        self.dirty.mark_all();
        self.relayout();
        Ok(at)
    }
}
