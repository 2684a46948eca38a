//! Tick pass: start ticks, effective durations and the measure fill state.
//!
//! Tuplets nest as a stack of frames. Inside a frame, chords accumulate their
//! basic ticks; the frame's scaled total (`accum * num / den`, floored) is
//! folded into the enclosing frame only when it closes, so a span's
//! contribution is independent of how its chords are individually durationed.
//! Grace spans scale their chords down and never advance the position.
//! Unmatched closes are ignored; frames still open at the measure end are
//! closed implicitly.

use core_score::duration::{self, Ticks, grace_ticks, ticks_per_measure, tuplet_ticks};
use core_score::{LayoutFlags, Measure, MeasureFill, ObjectKind, TimeSig};

#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Absolute start tick of the frame.
    start: Ticks,
    /// Sum of contained ticks in this frame's own (unscaled) units.
    accum: Ticks,
    numerator: u32,
    denominator: u32,
    /// Cumulative ratio from this frame up to the measure.
    scale_num: i64,
    scale_den: i64,
}

impl Frame {
    fn root() -> Self {
        Self {
            start: 0,
            accum: 0,
            numerator: 1,
            denominator: 1,
            scale_num: 1,
            scale_den: 1,
        }
    }

    fn absolute(&self, local: Ticks) -> Ticks {
        let scaled = i64::from(local) * self.scale_num / self.scale_den;
        self.start + scaled.clamp(0, i64::from(i32::MAX)) as Ticks
    }

    /// Contribution of this frame to its parent, in the parent's units.
    fn contribution(&self) -> Ticks {
        tuplet_ticks(self.accum, self.numerator, self.denominator)
    }
}

/// Assign tick values to every object of `measure`; returns the total.
pub fn set_ticks_in_measure(measure: &mut Measure, grace_multiplier: Ticks) -> Ticks {
    let mut frames = vec![Frame::root()];
    let mut in_grace = false;
    for obj in measure.objects_mut() {
        let Some(top) = frames.last().copied() else {
            break;
        };
        let here = top.absolute(top.accum);
        let mut flags = LayoutFlags::empty();
        if frames.len() > 1 {
            flags |= LayoutFlags::IN_TUPLET;
        }
        let layout = &mut obj.layout;
        layout.basic_ticks = 0;
        layout.duration_ticks = 0;
        layout.start_tick = here;
        layout.start_tick_of_next = here;
        match &obj.kind {
            ObjectKind::Chord(chord) => {
                let basic = duration::basic_ticks(chord.duration, chord.dots);
                layout.basic_ticks = basic;
                if in_grace || chord.is_grace {
                    flags |= LayoutFlags::GRACE;
                    layout.duration_ticks = grace_ticks(basic, grace_multiplier);
                } else {
                    let end = top.absolute(top.accum + basic);
                    layout.duration_ticks = end - here;
                    layout.start_tick_of_next = end;
                    if let Some(frame) = frames.last_mut() {
                        frame.accum += basic;
                    }
                }
            }
            ObjectKind::TupletOpen(t) => {
                let (num, den) = if t.denominator == 0 || t.numerator == 0 {
                    (1, 1)
                } else {
                    (t.numerator, t.denominator)
                };
                frames.push(Frame {
                    start: here,
                    accum: 0,
                    numerator: num,
                    denominator: den,
                    scale_num: top.scale_num * i64::from(num),
                    scale_den: top.scale_den * i64::from(den),
                });
            }
            ObjectKind::TupletClose => {
                if frames.len() > 1 {
                    close_frame(&mut frames);
                    if let Some(parent) = frames.last() {
                        layout.start_tick_of_next = parent.absolute(parent.accum);
                        layout.start_tick = layout.start_tick_of_next;
                    }
                }
            }
            ObjectKind::GraceStart => in_grace = true,
            ObjectKind::GraceEnd => in_grace = false,
            _ => {}
        }
        layout.flags = flags;
    }
    while frames.len() > 1 {
        close_frame(&mut frames);
    }
    frames.first().map_or(0, |root| root.accum)
}

fn close_frame(frames: &mut Vec<Frame>) {
    if let Some(done) = frames.pop()
        && let Some(parent) = frames.last_mut()
    {
        parent.accum += done.contribution();
    }
}

/// Fill state of a measure holding `total` ticks under `timesig`.
pub fn measure_fill(total: Ticks, timesig: TimeSig, waived: bool) -> MeasureFill {
    let capacity = ticks_per_measure(timesig.numerator, timesig.denominator);
    let diff = total - capacity;
    if diff == -capacity {
        MeasureFill::Empty
    } else if waived {
        MeasureFill::Waived
    } else if diff == 0 {
        MeasureFill::Complete
    } else if diff < 0 {
        MeasureFill::Underfull(-diff)
    } else {
        MeasureFill::Overfull(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::duration::{GRACE_MULTIPLIER, basic_ticks};
    use core_score::{Chord, MusicalObject, Tuplet};

    fn n(code: i32) -> MusicalObject {
        MusicalObject::chord(Chord::with_note(code, 0, 0, 0))
    }

    fn obj(kind: ObjectKind) -> MusicalObject {
        MusicalObject::new(kind)
    }

    #[test]
    fn sequential_quarters_fill_four_four() {
        let mut m = Measure::from_objects((0..4).map(|_| n(2)).collect());
        let total = set_ticks_in_measure(&mut m, GRACE_MULTIPLIER);
        assert_eq!(total, 1536);
        let starts: Vec<Ticks> = m.objects().iter().map(|o| o.layout.start_tick).collect();
        assert_eq!(starts, vec![0, 384, 768, 1152]);
        assert_eq!(measure_fill(total, TimeSig::default(), false), MeasureFill::Complete);
    }

    #[test]
    fn triplet_eighths_take_one_quarter() {
        let mut m = Measure::from_objects(vec![
            obj(ObjectKind::TupletOpen(Tuplet::new(2, 3))),
            n(3),
            n(3),
            n(3),
            obj(ObjectKind::TupletClose),
            n(2),
        ]);
        let total = set_ticks_in_measure(&mut m, GRACE_MULTIPLIER);
        assert_eq!(total, basic_ticks(2, 0) * 2);
        assert_eq!(m.objects()[5].layout.start_tick, basic_ticks(2, 0));
        assert_eq!(m.objects()[1].layout.duration_ticks, 128);
        assert!(m.objects()[2].layout.flags.contains(LayoutFlags::IN_TUPLET));
    }

    #[test]
    fn graces_do_not_advance() {
        let mut m = Measure::from_objects(vec![
            obj(ObjectKind::GraceStart),
            n(3),
            obj(ObjectKind::GraceEnd),
            n(2),
        ]);
        let total = set_ticks_in_measure(&mut m, GRACE_MULTIPLIER);
        assert_eq!(total, 384);
        let grace = &m.objects()[1].layout;
        assert_eq!(grace.duration_ticks, 192 / GRACE_MULTIPLIER);
        assert_eq!(grace.start_tick, grace.start_tick_of_next);
        assert!(grace.flags.contains(LayoutFlags::GRACE));
        assert_eq!(m.objects()[3].layout.start_tick, 0);
    }

    #[test]
    fn unmatched_brackets_are_tolerated() {
        let mut m = Measure::from_objects(vec![
            obj(ObjectKind::TupletClose),
            n(2),
            obj(ObjectKind::TupletOpen(Tuplet::new(2, 3))),
            n(3),
            n(3),
            n(3),
        ]);
        let total = set_ticks_in_measure(&mut m, GRACE_MULTIPLIER);
        assert_eq!(total, 768);
    }

    #[test]
    fn fill_states() {
        let ts = TimeSig::default();
        assert_eq!(measure_fill(0, ts, false), MeasureFill::Empty);
        assert_eq!(measure_fill(0, ts, true), MeasureFill::Empty);
        assert_eq!(measure_fill(384, ts, false), MeasureFill::Underfull(1152));
        assert_eq!(measure_fill(1920, ts, false), MeasureFill::Overfull(384));
        assert_eq!(measure_fill(1920, ts, true), MeasureFill::Waived);
    }
}
