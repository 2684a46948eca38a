//! Selection model: a mark plus the live cursor ("point") normalized into
//! first/last staff, measure and object bounds.

use core_score::Movement;

use crate::cursor::Cursor;

/// Object bound meaning "through the end of the measure".
pub const TO_END: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Normal,
    /// Object bounds always span whole measures.
    WholeMeasures,
    /// Every measure of the staff range regardless of mark and point.
    WholeStaffs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub staff: usize,
    pub measure: usize,
    pub object: usize,
}

impl From<&Cursor> for Mark {
    fn from(c: &Cursor) -> Self {
        Self {
            staff: c.staff,
            measure: c.measure,
            object: c.object,
        }
    }
}

/// Normalized selection bounds (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub first_staff: usize,
    pub last_staff: usize,
    pub first_measure: usize,
    pub last_measure: usize,
    pub first_object: usize,
    pub last_object: usize,
}

impl Selection {
    /// Compute bounds from `mark` and `point` under `mode`.
    pub fn between(mark: Mark, point: Mark, mode: SelectionMode, movement: &Movement) -> Self {
        let (first_staff, last_staff) = order(mark.staff, point.staff);
        let (first_measure, last_measure) = order(mark.measure, point.measure);
        match mode {
            SelectionMode::WholeStaffs => Self {
                first_staff,
                last_staff,
                first_measure: 0,
                last_measure: movement.max_measure_count().saturating_sub(1),
                first_object: 0,
                last_object: TO_END,
            },
            SelectionMode::WholeMeasures => Self {
                first_staff,
                last_staff,
                first_measure,
                last_measure,
                first_object: 0,
                last_object: TO_END,
            },
            SelectionMode::Normal if mark.staff != point.staff => Self {
                first_staff,
                last_staff,
                first_measure,
                last_measure,
                first_object: 0,
                last_object: TO_END,
            },
            SelectionMode::Normal => {
                let (a, b) = if (mark.measure, mark.object) <= (point.measure, point.object) {
                    (mark, point)
                } else {
                    (point, mark)
                };
                Self {
                    first_staff,
                    last_staff,
                    first_measure,
                    last_measure,
                    first_object: a.object,
                    last_object: b.object,
                }
            }
        }
    }

    /// True when every object of each covered measure is selected.
    pub fn whole_measures(&self) -> bool {
        self.first_object == 0 && self.last_object == TO_END
    }

    /// Object range selected within `measure`, as inclusive bounds.
    pub fn object_bounds(&self, measure: usize) -> (usize, usize) {
        let lo = if measure == self.first_measure {
            self.first_object
        } else {
            0
        };
        let hi = if measure == self.last_measure {
            self.last_object
        } else {
            TO_END
        };
        (lo, hi)
    }

    pub fn contains(&self, staff: usize, measure: usize, object: usize) -> bool {
        if staff < self.first_staff || staff > self.last_staff {
            return false;
        }
        if measure < self.first_measure || measure > self.last_measure {
            return false;
        }
        let (lo, hi) = self.object_bounds(measure);
        object >= lo && object <= hi
    }
}

fn order(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionModel {
    pub mark: Option<Mark>,
    pub mode: SelectionMode,
    bounds: Option<Selection>,
}

impl SelectionModel {
    pub fn set_mark(&mut self, cursor: &Cursor, movement: &Movement) {
        self.mark = Some(Mark::from(cursor));
        self.update(cursor, movement);
    }

    pub fn unset_mark(&mut self) {
        self.mark = None;
        self.bounds = None;
    }

    pub fn is_active(&self) -> bool {
        self.mark.is_some()
    }

    /// Recompute bounds against the live cursor.
    pub fn update(&mut self, point: &Cursor, movement: &Movement) {
        self.bounds = self
            .mark
            .map(|mark| Selection::between(mark, Mark::from(point), self.mode, movement));
    }

    pub fn bounds(&self) -> Option<Selection> {
        self.bounds
    }

    pub fn is_in_selection(&self, staff: usize, measure: usize, object: usize) -> bool {
        self.bounds
            .is_some_and(|b| b.contains(staff, measure, object))
    }
}
