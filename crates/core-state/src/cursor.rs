//! Cursor model: `(staff, measure, object)` plus the appending flag and a
//! diatonic height used for pitch entry.
//!
//! Invariant: `appending` holds exactly when `object` equals the length of
//! the current measure, i.e. there is no current object and an insert would
//! append at the measure end. An empty measure is therefore always appending.
//!
//! Navigation never fails: at a score boundary the call returns `false` and
//! leaves the cursor untouched.

use core_score::Movement;
use core_score::pitch::{LETTERS, letter_class};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub staff: usize,
    pub measure: usize,
    pub object: usize,
    pub appending: bool,
    /// Diatonic height of the pitch cursor (0 = middle C). Unbounded.
    pub cursor_y: i32,
}

fn measure_len(movement: &Movement, staff: usize, measure: usize) -> Option<usize> {
    movement.measure(staff, measure).ok().map(|m| m.len())
}

impl Cursor {
    pub fn new(staff: usize, measure: usize, object: usize) -> Self {
        Self {
            staff,
            measure,
            object,
            appending: false,
            cursor_y: 0,
        }
    }

    /// Letter class (0 = C .. 6 = B) of the pitch cursor.
    pub fn letter(&self) -> usize {
        letter_class(self.cursor_y)
    }

    /// Clamp every coordinate into the movement and restore the appending
    /// invariant. Used after structural edits and undo.
    pub fn normalize(&mut self, movement: &Movement) {
        self.staff = self.staff.min(movement.staff_count().saturating_sub(1));
        let measures = movement
            .staff(self.staff)
            .map(|s| s.measure_count())
            .unwrap_or(1);
        self.measure = self.measure.min(measures.saturating_sub(1));
        let len = measure_len(movement, self.staff, self.measure).unwrap_or(0);
        self.object = self.object.min(len);
        self.appending = self.object == len;
    }

    fn settle(&mut self, movement: &Movement) {
        let len = measure_len(movement, self.staff, self.measure).unwrap_or(0);
        self.appending = self.object >= len;
        self.object = self.object.min(len);
    }

    /// Step right. From an appending position this crosses into the next
    /// measure; from the last object it becomes appending.
    pub fn move_right(&mut self, movement: &Movement) -> bool {
        if self.appending {
            if measure_len(movement, self.staff, self.measure + 1).is_none() {
                return false;
            }
            self.measure += 1;
            self.object = 0;
            self.settle(movement);
        } else {
            self.object += 1;
            self.settle(movement);
        }
        trace!(target: "state.cursor", staff = self.staff, measure = self.measure, object = self.object, appending = self.appending, "move_right");
        true
    }

    /// Step left. From index 0 this lands in the appending position of the
    /// previous measure.
    pub fn move_left(&mut self, movement: &Movement) -> bool {
        if self.object == 0 {
            if self.measure == 0 {
                return false;
            }
            self.measure -= 1;
            self.object = measure_len(movement, self.staff, self.measure).unwrap_or(0);
            self.appending = true;
        } else {
            self.object -= 1;
            self.appending = false;
        }
        trace!(target: "state.cursor", staff = self.staff, measure = self.measure, object = self.object, appending = self.appending, "move_left");
        true
    }

    pub fn staff_up(&mut self, movement: &Movement) -> bool {
        if self.staff == 0 {
            return false;
        }
        self.staff -= 1;
        self.normalize(movement);
        true
    }

    pub fn staff_down(&mut self, movement: &Movement) -> bool {
        if self.staff + 1 >= movement.staff_count() {
            return false;
        }
        self.staff += 1;
        self.normalize(movement);
        true
    }

    pub fn cursor_up(&mut self) {
        self.cursor_y += 1;
    }

    pub fn cursor_down(&mut self) {
        self.cursor_y -= 1;
    }

    /// Jump to the nearest pitch of letter class `target`: up when the
    /// forward distance is at most a fourth, otherwise down.
    pub fn shift_to_note(&mut self, target: usize) {
        let distance = (target as i32 - self.letter() as i32).rem_euclid(LETTERS as i32);
        if distance <= 3 {
            self.cursor_y += distance;
        } else {
            self.cursor_y -= LETTERS as i32 - distance;
        }
    }

    /// Move to the start of measure `measure` on the current staff.
    pub fn goto_measure(&mut self, movement: &Movement, measure: usize) -> bool {
        if measure_len(movement, self.staff, measure).is_none() {
            return false;
        }
        self.measure = measure;
        self.object = 0;
        self.settle(movement);
        true
    }

    pub fn next_measure(&mut self, movement: &Movement) -> bool {
        self.goto_measure(movement, self.measure + 1)
    }

    pub fn prev_measure(&mut self, movement: &Movement) -> bool {
        match self.measure.checked_sub(1) {
            Some(m) => self.goto_measure(movement, m),
            None => false,
        }
    }

    pub fn home(&mut self, movement: &Movement) -> bool {
        self.goto_measure(movement, 0)
    }

    /// Appending position of the staff's last measure.
    pub fn end(&mut self, movement: &Movement) -> bool {
        let Ok(staff) = movement.staff(self.staff) else {
            return false;
        };
        self.measure = staff.measure_count().saturating_sub(1);
        self.object = measure_len(movement, self.staff, self.measure).unwrap_or(0);
        self.appending = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Chord, MusicalObject};

    fn movement() -> Movement {
        let mut m = Movement::new(2, 3);
        for i in 0..2 {
            m.insert_object(0, 0, i, MusicalObject::chord(Chord::with_note(2, 0, 0, 0)))
                .unwrap();
        }
        m.insert_object(0, 2, 0, MusicalObject::chord(Chord::rest(2, 0))).unwrap();
        m
    }

    #[test]
    fn right_walks_objects_then_appends_then_crosses() {
        let m = movement();
        let mut c = Cursor::default();
        assert!(c.move_right(&m));
        assert_eq!((c.measure, c.object, c.appending), (0, 1, false));
        assert!(c.move_right(&m));
        assert_eq!((c.measure, c.object, c.appending), (0, 2, true));
        assert!(c.move_right(&m));
        assert_eq!((c.measure, c.object, c.appending), (1, 0, true));
        assert!(c.move_right(&m));
        assert_eq!((c.measure, c.object, c.appending), (2, 0, false));
    }

    #[test]
    fn left_from_index_zero_lands_appending_in_previous_measure() {
        let m = movement();
        let mut c = Cursor::new(0, 1, 0);
        c.normalize(&m);
        assert!(c.move_left(&m));
        assert_eq!((c.measure, c.object, c.appending), (0, 2, true));
        assert!(c.move_left(&m));
        assert_eq!((c.measure, c.object, c.appending), (0, 1, false));
    }

    #[test]
    fn boundaries_saturate() {
        let m = movement();
        let mut c = Cursor::default();
        assert!(!c.move_left(&m));
        c.end(&m);
        assert!(!c.move_right(&m));
        assert!(!c.staff_up(&m));
        assert!(c.staff_down(&m));
        assert!(!c.staff_down(&m));
    }

    #[test]
    fn shift_to_note_takes_nearest_direction() {
        let mut c = Cursor::default();
        c.shift_to_note(4);
        assert_eq!(c.cursor_y, -3);
        c.shift_to_note(5);
        assert_eq!(c.cursor_y, -2);
        c.shift_to_note(1);
        assert_eq!(c.cursor_y, 1);
        c.cursor_down();
        c.cursor_down();
        assert_eq!(c.letter(), 6);
    }

    #[test]
    fn staff_change_clamps_into_shorter_measure() {
        let m = movement();
        let mut c = Cursor::new(0, 0, 2);
        c.normalize(&m);
        assert!(c.staff_down(&m));
        assert_eq!((c.staff, c.object, c.appending), (1, 0, true));
    }
}
