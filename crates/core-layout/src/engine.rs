//! Layout driver: runs the per-measure passes in order and fits the shared
//! measure-width columns.
//!
//! Per measure: ticks, accidentals (needs the key at the measure start),
//! beams and stems (advances the running context), fill state, then object
//! widths and x offsets. A staff is laid out from a measure onwards with the
//! context resolved at that point, so changes that carry forward (key, clef,
//! time) are picked up by every later measure.

use core_score::duration::GRACE_MULTIPLIER;
use core_score::{Measure, MeasureLayout, Movement, StaffContext, Ticks};
use tracing::trace;

use crate::accidentals::compute_accidental_visibility;
use crate::beams::calculate_beams_and_stems;
use crate::context::context_at;
use crate::dirty::DirtyMeasures;
use crate::ticks::{measure_fill, set_ticks_in_measure};
use crate::widths::{StandardWidths, WidthProvider};

/// Half staff-spaces a stem extends beyond the outermost notehead.
pub const DEFAULT_STEM_MARGIN: i32 = 7;

pub struct LayoutEngine {
    widths: Box<dyn WidthProvider + Send>,
    pub stem_margin: i32,
    pub grace_multiplier: Ticks,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("stem_margin", &self.stem_margin)
            .field("grace_multiplier", &self.grace_multiplier)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(StandardWidths::default())
    }
}

impl LayoutEngine {
    pub fn new(widths: impl WidthProvider + Send + 'static) -> Self {
        Self {
            widths: Box::new(widths),
            stem_margin: DEFAULT_STEM_MARGIN,
            grace_multiplier: GRACE_MULTIPLIER,
        }
    }

    pub fn with_stem_margin(mut self, margin: i32) -> Self {
        self.stem_margin = margin;
        self
    }

    /// Lay out one measure. `ctx` enters as the context at the measure start
    /// and leaves as the context at its end.
    pub fn layout_measure(&self, measure: &mut Measure, ctx: &mut StaffContext) {
        let total = set_ticks_in_measure(measure, self.grace_multiplier);
        let mut key = ctx.keysig;
        compute_accidental_visibility(measure, &mut key);
        calculate_beams_and_stems(measure, ctx, self.stem_margin);
        let waived = measure
            .objects()
            .iter()
            .any(|o| o.kind.allows_duration_error());
        let padding = self.widths.measure_padding();
        let mut x = padding;
        for obj in measure.objects_mut() {
            let before = self.widths.space_before(obj);
            let width = self.widths.min_width(obj);
            x += before;
            obj.layout.space_before = before;
            obj.layout.min_width = width;
            obj.layout.x = x;
            x += width;
        }
        measure.layout = MeasureLayout {
            total_ticks: total,
            capacity: core_score::duration::ticks_per_measure(
                ctx.timesig.numerator,
                ctx.timesig.denominator,
            ),
            fill: measure_fill(total, ctx.timesig, waived),
            required_width: x + padding,
        };
    }

    /// Lay out `staff` from `from_measure` to its end.
    pub fn layout_staff_from(&self, movement: &mut Movement, staff: usize, from_measure: usize) {
        let mut ctx = context_at(movement, staff, from_measure, 0);
        let Ok(s) = movement.staff_mut(staff) else {
            return;
        };
        let mut count = 0usize;
        for measure in s.measures_mut().iter_mut().skip(from_measure) {
            self.layout_measure(measure, &mut ctx);
            count += 1;
        }
        trace!(target: "layout.engine", staff, from_measure, measures = count, "staff_laid_out");
    }

    pub fn layout_movement(&self, movement: &mut Movement) {
        for staff in 0..movement.staff_count() {
            self.layout_staff_from(movement, staff, 0);
        }
        self.fit_measure_widths(movement);
    }

    /// Lay out whatever `dirty` recorded, then refit the column widths.
    pub fn relayout(&self, movement: &mut Movement, dirty: &mut DirtyMeasures) {
        match dirty.take() {
            None => self.layout_movement(movement),
            Some(marks) => {
                for (staff, from) in marks {
                    if staff < movement.staff_count() {
                        self.layout_staff_from(movement, staff, from);
                    }
                }
                self.fit_measure_widths(movement);
            }
        }
    }

    /// Each column is as wide as its widest staff, never narrower than the
    /// movement's default width.
    pub fn fit_measure_widths(&self, movement: &mut Movement) {
        movement.reconcile_widths();
        let default = movement.default_measure_width;
        let mut fitted = vec![default; movement.measure_widths.len()];
        for staff in movement.staffs() {
            for (slot, measure) in fitted.iter_mut().zip(staff.measures()) {
                *slot = (*slot).max(measure.layout.required_width);
            }
        }
        movement.measure_widths = fitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Chord, KeySig, MeasureFill, MusicalObject, ObjectKind, TimeSig};

    fn q(offset: i32, shift: i8) -> MusicalObject {
        MusicalObject::chord(Chord::with_note(2, 0, offset, shift))
    }

    #[test]
    fn key_change_carries_into_later_measures() {
        let mut m = Movement::new(1, 2);
        m.insert_object(0, 0, 0, MusicalObject::new(ObjectKind::KeySig(KeySig::new(1, false))))
            .unwrap();
        m.insert_object(0, 1, 0, q(3, 1)).unwrap();
        let engine = LayoutEngine::default();
        engine.layout_movement(&mut m);
        let note = &m.object(0, 1, 0).unwrap().as_chord().unwrap().notes[0];
        assert!(!note.show_accidental);
    }

    #[test]
    fn fill_and_widths_are_reported() {
        let mut m = Movement::new(2, 1);
        for i in 0..3 {
            m.insert_object(0, 0, i, q(i as i32, 0)).unwrap();
        }
        let engine = LayoutEngine::default();
        engine.layout_movement(&mut m);
        let layout = m.measure(0, 0).unwrap().layout;
        assert_eq!(layout.fill, MeasureFill::Underfull(384));
        assert_eq!(m.measure(1, 0).unwrap().layout.fill, MeasureFill::Empty);
        assert_eq!(layout.required_width, 8 + 3 * 10 + 8);
        assert_eq!(m.measure_widths, vec![160]);
        let xs: Vec<u32> = m.measure(0, 0).unwrap().objects().iter().map(|o| o.layout.x).collect();
        assert_eq!(xs, vec![8, 18, 28]);
    }

    #[test]
    fn wide_measure_widens_column() {
        let mut m = Movement::new(1, 1);
        m.insert_object(0, 0, 0, MusicalObject::new(ObjectKind::TimeSig(TimeSig::new(12, 8))))
            .unwrap();
        for i in 1..=16 {
            m.insert_object(0, 0, i, q(0, 0)).unwrap();
        }
        let engine = LayoutEngine::default();
        engine.layout_movement(&mut m);
        let layout = m.measure(0, 0).unwrap().layout;
        assert_eq!(layout.capacity, 2304);
        assert_eq!(layout.fill, MeasureFill::Overfull(16 * 384 - 2304));
        assert_eq!(m.measure_widths[0], layout.required_width);
    }

    #[test]
    fn dirty_marks_limit_relayout() {
        let mut m = Movement::new(2, 1);
        m.insert_object(1, 0, 0, q(0, 0)).unwrap();
        let engine = LayoutEngine::default();
        let mut dirty = DirtyMeasures::new();
        dirty.mark(0, 0);
        engine.relayout(&mut m, &mut dirty);
        assert_eq!(m.measure(1, 0).unwrap().layout.total_ticks, 0);
        dirty.mark(1, 0);
        engine.relayout(&mut m, &mut dirty);
        assert_eq!(m.measure(1, 0).unwrap().layout.total_ticks, 384);
    }
}
