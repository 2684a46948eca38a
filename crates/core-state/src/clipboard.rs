//! Clipboard buffer, clipboard stack and the copy/cut/paste commands.
//!
//! The buffer is one object list per copied staff. Within a list a
//! `MeasureBreak` sentinel separates consecutive measures; every list but the
//! last ends with a `StaffBreak` sentinel. This layout is also what scripts
//! see through [`EditorSession::clip_object_type`] and friends.

use core_score::{MeasureScope, Movement, MusicalObject, ObjectKind, ObjectType, Voice};
use tracing::{debug, info};

use crate::EditError;
use crate::selection::Selection;
use crate::session::EditorSession;

/// Default bound on saved clipboards.
pub const CLIPBOARD_STACK_MAX: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    staffs: Vec<Vec<MusicalObject>>,
}

impl Clipboard {
    pub fn from_staffs(staffs: Vec<Vec<MusicalObject>>) -> Self {
        Self { staffs }
    }

    /// Clone the selected objects of `movement`. Parasite staffs are skipped.
    pub fn copy_selection(movement: &Movement, sel: &Selection) -> Self {
        let mut staffs = Vec::new();
        for (idx, staff) in movement.staffs().iter().enumerate() {
            if idx < sel.first_staff || idx > sel.last_staff || staff.is_parasite() {
                continue;
            }
            let last_measure = sel.last_measure.min(staff.measure_count().saturating_sub(1));
            let mut list = Vec::new();
            for m in sel.first_measure..=last_measure {
                let Some(measure) = staff.measure(m) else {
                    break;
                };
                let (lo, hi) = sel.object_bounds(m);
                if !measure.is_empty() && lo < measure.len() {
                    let hi = hi.min(measure.len() - 1);
                    list.extend(measure.objects()[lo..=hi].iter().cloned());
                }
                if m < last_measure {
                    list.push(MusicalObject::new(ObjectKind::MeasureBreak));
                }
            }
            staffs.push(list);
        }
        let count = staffs.len();
        for list in staffs.iter_mut().take(count.saturating_sub(1)) {
            list.push(MusicalObject::new(ObjectKind::StaffBreak));
        }
        Self { staffs }
    }

    pub fn is_empty(&self) -> bool {
        self.staffs.iter().all(Vec::is_empty)
    }

    pub fn staff_count(&self) -> usize {
        self.staffs.len()
    }

    pub fn staff(&self, staff: usize) -> Option<&[MusicalObject]> {
        self.staffs.get(staff).map(Vec::as_slice)
    }

    /// Number of entries (sentinels included) in a staff list.
    pub fn object_count(&self, staff: usize) -> Option<usize> {
        self.staffs.get(staff).map(Vec::len)
    }

    pub fn object(&self, staff: usize, index: usize) -> Option<&MusicalObject> {
        self.staffs.get(staff)?.get(index)
    }

    pub fn object_type(&self, staff: usize, index: usize) -> Option<ObjectType> {
        self.object(staff, index).map(MusicalObject::object_type)
    }

    /// Most measure breaks found in any staff list.
    pub fn measure_breaks(&self) -> usize {
        self.staffs
            .iter()
            .map(|list| {
                list.iter()
                    .filter(|o| matches!(o.kind, ObjectKind::MeasureBreak))
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

/// Saved clipboards, newest last. Pushing past the bound drops the oldest.
#[derive(Debug, Clone)]
pub struct ClipboardStack {
    entries: Vec<Clipboard>,
    max: usize,
}

impl Default for ClipboardStack {
    fn default() -> Self {
        Self::new(CLIPBOARD_STACK_MAX)
    }
}

impl ClipboardStack {
    pub fn new(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max: max.max(1),
        }
    }

    /// Returns true when an old entry had to be dropped.
    pub fn push(&mut self, clipboard: Clipboard) -> bool {
        self.entries.push(clipboard);
        if self.entries.len() > self.max {
            self.entries.remove(0);
            return true;
        }
        false
    }

    pub fn pop(&mut self) -> Option<Clipboard> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EditorSession {
    fn selection_bounds(&self) -> Result<Selection, EditError> {
        self.selection.bounds().ok_or(EditError::NothingSelected)
    }

    /// Copy the selection into the clipboard. Returns the number of staff lists.
    pub fn copy(&mut self) -> Result<usize, EditError> {
        let sel = self.selection_bounds()?;
        self.clipboard = Clipboard::copy_selection(self.movement(), &sel);
        info!(target: "state.clipboard", staffs = self.clipboard.staff_count(), breaks = self.clipboard.measure_breaks(), "copied");
        Ok(self.clipboard.staff_count())
    }

    /// Copy, then remove the selection. Undone as one movement snapshot.
    /// A failed removal keeps the score and the previous clipboard.
    pub fn cut(&mut self) -> Result<usize, EditError> {
        let sel = self.selection_bounds()?;
        let previous = self.clipboard.clone();
        let staffs = self.copy()?;
        let removed = self.staged(|s| {
            s.take_snapshot()?;
            s.undo.raise_guard();
            let result = s.remove_selection(&sel);
            s.undo.lower_guard();
            result
        });
        if let Err(err) = removed {
            self.clipboard = previous;
            return Err(err);
        }
        self.selection.unset_mark();
        self.cursor.staff = sel.first_staff;
        self.cursor.measure = sel.first_measure;
        self.cursor.object = if sel.whole_measures() { 0 } else { sel.first_object };
        self.dirty.mark_all();
        self.relayout();
        info!(target: "state.clipboard", staffs, "cut");
        Ok(staffs)
    }

    fn remove_selection(&mut self, sel: &Selection) -> Result<(), EditError> {
        let movement = self.movement_mut()?;
        let staff_count = movement.staff_count();
        let targets: Vec<usize> = (sel.first_staff..=sel.last_staff.min(staff_count - 1))
            .filter(|&s| movement.staffs().get(s).is_some_and(|st| !st.is_parasite()))
            .collect();
        let every_staff = sel.first_staff == 0 && sel.last_staff + 1 >= staff_count;
        if every_staff && sel.whole_measures() {
            let wanted = sel.last_measure - sel.first_measure + 1;
            for &s in &targets {
                let available = movement
                    .staff(s)?
                    .measure_count()
                    .saturating_sub(sel.first_measure);
                let count = wanted.min(available);
                if count > 0 {
                    movement.remove_measures(MeasureScope::Staff(s), sel.first_measure, count)?;
                }
            }
            debug!(target: "state.clipboard", first = sel.first_measure, count = wanted, "whole_measures_cut");
            return Ok(());
        }
        for &s in &targets {
            let last = sel
                .last_measure
                .min(movement.staff(s)?.measure_count().saturating_sub(1));
            for m in (sel.first_measure..=last).rev() {
                let len = movement.measure(s, m)?.len();
                let (lo, hi) = sel.object_bounds(m);
                if len == 0 || lo >= len {
                    continue;
                }
                for idx in (lo..=hi.min(len - 1)).rev() {
                    movement.remove_object(s, m, idx)?;
                }
            }
        }
        if staff_count == 1 && sel.last_measure > sel.first_measure + 1 {
            for m in (sel.first_measure + 1..sel.last_measure).rev() {
                if movement.measure(0, m).is_ok_and(|ms| ms.is_empty()) {
                    movement.remove_measures(MeasureScope::Staff(0), m, 1)?;
                }
            }
        }
        Ok(())
    }

    /// Paste the clipboard at the cursor.
    pub fn paste(&mut self) -> Result<(), EditError> {
        if self.clipboard.is_empty() {
            return Err(EditError::EmptyClipboard);
        }
        let clipboard = self.clipboard.clone();
        self.staged(|s| s.paste_buffer(&clipboard))?;
        self.dirty.mark_all();
        self.relayout();
        Ok(())
    }

    fn paste_buffer(&mut self, clipboard: &Clipboard) -> Result<(), EditError> {
        let breaks = clipboard.measure_breaks();
        let start_measure = self.cursor.measure;
        let mut start_object = self.cursor.object;
        let targets = self.paste_targets(clipboard.staff_count());
        for &staff in &targets {
            self.movement().measure(staff, start_measure)?;
        }
        if breaks > 0 {
            let scope = self.measure_scope(true);
            let at_measure_start = !self.cursor.appending
                && self.cursor.object == 0
                && !self.movement().measure(self.cursor.staff, start_measure)?.is_empty();
            if at_measure_start {
                self.insert_measures_logged(scope, start_measure, breaks)?;
                start_object = 0;
            } else {
                self.insert_measures_logged(scope, start_measure + 1, breaks)?;
            }
        }
        let mut end = (start_measure, start_object);
        for (i, (list, &staff)) in clipboard.staffs.iter().zip(&targets).enumerate() {
            let mut measure = start_measure;
            let mut at = start_object.min(self.movement().measure(staff, measure)?.len());
            for obj in list {
                match obj.kind {
                    ObjectKind::StaffBreak => break,
                    ObjectKind::MeasureBreak => {
                        measure += 1;
                        at = 0;
                        self.ensure_measure(staff, measure)?;
                    }
                    _ => {
                        let idx = self.insert_object_at(staff, measure, at, obj.clone())?;
                        at = idx + 1;
                    }
                }
            }
            if i == 0 {
                end = (measure, at);
            }
        }
        self.cursor.measure = end.0;
        self.cursor.object = end.1;
        debug!(target: "state.clipboard", staffs = clipboard.staff_count(), breaks, "pasted");
        Ok(())
    }

    /// Staffs receiving the clipboard lists: the cursor staff, then the
    /// staffs below it that are neither secondary voices nor parasites.
    fn paste_targets(&self, lists: usize) -> Vec<usize> {
        let below = self
            .movement()
            .staffs()
            .iter()
            .enumerate()
            .skip(self.cursor.staff + 1)
            .filter(|(_, s)| s.voice != Voice::Secondary && !s.is_parasite())
            .map(|(i, _)| i);
        std::iter::once(self.cursor.staff)
            .chain(below)
            .take(lists)
            .collect()
    }

    fn ensure_measure(&mut self, staff: usize, measure: usize) -> Result<(), EditError> {
        let len = self.movement().staff(staff)?.measure_count();
        if measure >= len {
            self.insert_measures_logged(MeasureScope::Staff(staff), len, measure + 1 - len)?;
        }
        Ok(())
    }

    pub fn push_clipboard(&mut self) {
        if self.clip_stack.push(self.clipboard.clone()) {
            debug!(target: "state.clipboard", "clipboard_stack_trimmed");
        }
    }

    pub fn pop_clipboard(&mut self) -> Result<(), EditError> {
        self.clipboard = self.clip_stack.pop().ok_or(EditError::EmptyClipboardStack)?;
        Ok(())
    }

    pub fn clip_object_type(&self, staff: usize, index: usize) -> Option<ObjectType> {
        self.clipboard.object_type(staff, index)
    }

    pub fn clip_object_count(&self, staff: usize) -> Option<usize> {
        self.clipboard.object_count(staff)
    }

    /// Insert a copy of one clipboard object at the cursor.
    pub fn insert_clip_object(&mut self, staff: usize, index: usize) -> Result<(), EditError> {
        let object = self
            .clipboard
            .object(staff, index)
            .filter(|o| !o.is_sentinel())
            .cloned()
            .ok_or(EditError::NoClipObject { staff, index })?;
        self.insert_at_cursor(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Mark, SelectionMode};
    use core_score::{Chord, Score, ScoreError};
    use pretty_assertions::assert_eq;

    fn note(offset: i32) -> MusicalObject {
        MusicalObject::chord(Chord::with_note(3, 0, offset, 0))
    }

    fn filled(staffs: usize, measures: usize, per_measure: usize) -> Movement {
        let mut mv = Movement::new(staffs, measures);
        for s in 0..staffs {
            for m in 0..measures {
                for o in 0..per_measure {
                    mv.insert_object(s, m, o, note(o as i32)).unwrap();
                }
            }
        }
        mv
    }

    fn mark(staff: usize, measure: usize, object: usize) -> Mark {
        Mark {
            staff,
            measure,
            object,
        }
    }

    #[test]
    fn multi_measure_copy_has_breaks_between_measures_only() {
        let mv = filled(1, 3, 2);
        let sel = Selection::between(mark(0, 0, 1), mark(0, 2, 0), SelectionMode::Normal, &mv);
        let clip = Clipboard::copy_selection(&mv, &sel);
        let types: Vec<ObjectType> = clip.staff(0).unwrap().iter().map(|o| o.object_type()).collect();
        assert_eq!(
            types,
            vec![
                ObjectType::Chord,
                ObjectType::MeasureBreak,
                ObjectType::Chord,
                ObjectType::Chord,
                ObjectType::MeasureBreak,
                ObjectType::Chord,
            ]
        );
        assert_eq!(clip.measure_breaks(), 2);
    }

    #[test]
    fn staff_break_separates_staffs_but_not_after_last() {
        let mv = filled(2, 1, 1);
        let sel = Selection::between(mark(0, 0, 0), mark(1, 0, 0), SelectionMode::Normal, &mv);
        let clip = Clipboard::copy_selection(&mv, &sel);
        assert_eq!(clip.staff_count(), 2);
        assert_eq!(clip.object_type(0, 1), Some(ObjectType::StaffBreak));
        assert_eq!(clip.object_count(1), Some(1));
    }

    #[test]
    fn parasites_are_not_copied() {
        let mut mv = filled(1, 1, 2);
        mv.add_parasite(0, Voice::Primary).unwrap();
        let sel = Selection::between(mark(0, 0, 0), mark(1, 0, 0), SelectionMode::Normal, &mv);
        let clip = Clipboard::copy_selection(&mv, &sel);
        assert_eq!(clip.staff_count(), 1);
    }

    #[test]
    fn stack_is_bounded_and_lifo() {
        let mut stack = ClipboardStack::new(2);
        for n in 0..3 {
            stack.push(Clipboard::from_staffs(vec![vec![note(n)]]));
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().object(0, 0), Some(&note(2)));
        assert_eq!(stack.pop().unwrap().object(0, 0), Some(&note(1)));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn cut_of_every_staff_removes_whole_measures_and_undoes() {
        let mv = filled(2, 3, 1);
        let mut session = EditorSession::new(Score::new(mv), Default::default());
        session.goto_measure(1);
        session.set_selection_mode(SelectionMode::WholeMeasures);
        session.set_mark();
        session.staff_down();
        session.cut().unwrap();
        assert_eq!(session.movement().max_measure_count(), 2);
        assert_eq!(session.clip_object_count(0), Some(2));
        assert!(session.undo());
        assert_eq!(session.movement().max_measure_count(), 3);
    }

    #[test]
    fn cut_inside_a_measure_deletes_objects() {
        let mv = filled(1, 1, 4);
        let mut session = EditorSession::new(Score::new(mv), Default::default());
        session.move_right();
        session.set_mark();
        session.move_right();
        session.cut().unwrap();
        assert_eq!(session.movement().measure(0, 0).unwrap().len(), 2);
        assert_eq!(session.cursor.object, 1);
        assert!(!session.selection.is_active());
    }

    #[test]
    fn paste_with_empty_clipboard_fails() {
        let mut session = EditorSession::default();
        assert_eq!(session.paste(), Err(EditError::EmptyClipboard));
        assert_eq!(session.pop_clipboard(), Err(EditError::EmptyClipboardStack));
    }

    #[test]
    fn paste_onto_a_short_staff_changes_nothing() {
        let mut mv = filled(2, 2, 0);
        mv.remove_measures(MeasureScope::Staff(1), 1, 1).unwrap();
        let mut session = EditorSession::new(Score::new(mv), Default::default());
        session.clipboard = Clipboard::from_staffs(vec![
            vec![note(0), MusicalObject::new(ObjectKind::StaffBreak)],
            vec![note(1)],
        ]);
        assert!(session.goto_measure(1));
        let score = session.score.clone();
        let log = session.undo.undo_log();

        assert_eq!(
            session.paste(),
            Err(EditError::Score(ScoreError::NoSuchMeasure {
                staff: 1,
                measure: 1
            }))
        );
        assert_eq!(session.score, score);
        assert_eq!(session.undo.undo_log(), log);
        assert_eq!((session.cursor.staff, session.cursor.measure), (0, 1));
    }

    #[test]
    fn paste_fills_each_target_staff() {
        let mut session = EditorSession::new(Score::new(filled(2, 1, 0)), Default::default());
        session.clipboard = Clipboard::from_staffs(vec![
            vec![note(0), MusicalObject::new(ObjectKind::StaffBreak)],
            vec![note(1)],
        ]);
        session.paste().unwrap();
        for (staff, offset) in [(0, 0), (1, 1)] {
            let measure = session.movement().measure(staff, 0).unwrap();
            assert_eq!(measure.len(), 1);
            let chord = measure.get(0).and_then(MusicalObject::as_chord).unwrap();
            assert_eq!(chord.notes[0].mid_c_offset, offset);
        }
        assert!(session.undo());
        assert!(session.movement().measure(1, 0).unwrap().is_empty());
    }

    #[test]
    fn sentinels_cannot_be_inserted_from_the_clipboard() {
        let mut session = EditorSession::default();
        session.clipboard = Clipboard::from_staffs(vec![vec![
            note(0),
            MusicalObject::new(ObjectKind::MeasureBreak),
        ]]);
        assert_eq!(
            session.insert_clip_object(0, 1),
            Err(EditError::NoClipObject { staff: 0, index: 1 })
        );
        session.insert_clip_object(0, 0).unwrap();
        assert_eq!(session.movement().measure(0, 0).unwrap().len(), 1);
    }
}
