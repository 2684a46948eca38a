//! Beam grouping and stem direction.
//!
//! Streaming over a measure whose ticks are already set. A group's end is
//! sometimes only known one object late (the next object breaks the group),
//! so the open group is closed retroactively and its stems resolved then.

use core_score::duration::{UNBEAMED_MAX_CODE, ticks_per_beat};
use core_score::{Chord, LayoutFlags, Measure, ObjectKind, StaffContext, StemDirection, Ticks};

const GROUP_FLAGS: LayoutFlags = LayoutFlags::BEAM_START
    .union(LayoutFlags::BEAM_END)
    .union(LayoutFlags::STEM_UP)
    .union(LayoutFlags::REVERSE_ALIGN);

struct OpenGroup {
    members: Vec<usize>,
    grace: bool,
    stem: StemDirection,
}

/// Set beam flags, stem direction and stem length for every object.
///
/// `ctx` is the context at the start of the measure; it is advanced past
/// any clef, time signature or stem directive met along the way and left
/// describing the context at the measure end.
pub fn calculate_beams_and_stems(measure: &mut Measure, ctx: &mut StaffContext, stem_margin: i32) {
    let len = measure.len();
    let mut open: Option<OpenGroup> = None;
    for idx in 0..len {
        let info = {
            let Some(obj) = measure.get_mut(idx) else {
                break;
            };
            obj.layout.flags.remove(GROUP_FLAGS);
            obj.layout.stem_length = 0;
            match &obj.kind {
                ObjectKind::Clef(c) => ctx.clef = *c,
                ObjectKind::TimeSig(t) => ctx.timesig = *t,
                ObjectKind::KeySig(k) => ctx.keysig = *k,
                ObjectKind::StemDirective(d) => ctx.stem = *d,
                _ => {}
            }
            let layout = obj.layout;
            obj.as_chord().filter(|c| !c.is_rest()).map(|c| {
                (
                    c.duration,
                    layout.flags.contains(LayoutFlags::GRACE),
                    layout.start_tick,
                    layout.start_tick_of_next,
                )
            })
        };
        let Some((duration, grace, start, next)) = info else {
            close_group(measure, open.take(), ctx, stem_margin);
            if let Some(obj) = measure.get_mut(idx) {
                obj.layout.flags |= LayoutFlags::BEAM_START | LayoutFlags::BEAM_END;
            }
            continue;
        };
        if duration <= UNBEAMED_MAX_CODE {
            close_group(measure, open.take(), ctx, stem_margin);
            close_group(measure, Some(singleton(idx, grace, ctx.stem)), ctx, stem_margin);
            continue;
        }
        if open.as_ref().is_some_and(|g| g.grace != grace) {
            close_group(measure, open.take(), ctx, stem_margin);
        }
        let tpb = ticks_per_beat(ctx.timesig.numerator, ctx.timesig.denominator);
        let beat_end: Ticks = (start / tpb + 1) * tpb;
        if next > beat_end {
            close_group(measure, open.take(), ctx, stem_margin);
            close_group(measure, Some(singleton(idx, grace, ctx.stem)), ctx, stem_margin);
            continue;
        }
        let group = open.get_or_insert_with(|| OpenGroup {
            members: Vec::new(),
            grace,
            stem: ctx.stem,
        });
        group.members.push(idx);
        if next == beat_end || idx + 1 == len {
            close_group(measure, open.take(), ctx, stem_margin);
        }
    }
    close_group(measure, open, ctx, stem_margin);
}

fn singleton(idx: usize, grace: bool, stem: StemDirection) -> OpenGroup {
    OpenGroup {
        members: vec![idx],
        grace,
        stem,
    }
}

fn close_group(measure: &mut Measure, group: Option<OpenGroup>, ctx: &StaffContext, margin: i32) {
    let Some(group) = group else {
        return;
    };
    let (Some(&first), Some(&last)) = (group.members.first(), group.members.last()) else {
        return;
    };
    let chords: Vec<&Chord> = group
        .members
        .iter()
        .filter_map(|&i| measure.get(i).and_then(|o| o.as_chord()))
        .collect();
    let up = stem_up(&chords, ctx, group.stem);
    let top = chords.iter().filter_map(|c| c.highest()).max().unwrap_or(0);
    let bottom = chords.iter().filter_map(|c| c.lowest()).min().unwrap_or(0);
    for &i in &group.members {
        let Some(obj) = measure.get_mut(i) else {
            continue;
        };
        let Some(chord) = obj.kind.as_chord() else {
            continue;
        };
        let whole = chord.duration == 0;
        let mut flags = LayoutFlags::empty();
        if i == first {
            flags |= LayoutFlags::BEAM_START;
        }
        if i == last {
            flags |= LayoutFlags::BEAM_END;
        }
        if up || whole {
            flags |= LayoutFlags::STEM_UP;
        }
        if chord.has_seconds() {
            flags |= LayoutFlags::REVERSE_ALIGN;
        }
        let length = if whole {
            0
        } else if up {
            top - chord.lowest().unwrap_or(top) + margin
        } else {
            chord.highest().unwrap_or(bottom) - bottom + margin
        };
        obj.layout.flags |= flags;
        obj.layout.stem_length = length;
    }
}

/// Direction for a group: explicit directives win, otherwise the stem points
/// away from the side of the middle line the group's average pitch sits on.
fn stem_up(chords: &[&Chord], ctx: &StaffContext, directive: StemDirection) -> bool {
    match directive {
        StemDirection::Up => true,
        StemDirection::Down => false,
        StemDirection::Both => {
            let (sum, count) = chords
                .iter()
                .flat_map(|c| c.notes.iter())
                .fold((0i64, 0i64), |(s, n), note| (s + i64::from(note.mid_c_offset), n + 1));
            if count == 0 {
                return true;
            }
            let avg = sum.div_euclid(count) as i32;
            ctx.clef.height_of(avg) < 0
        }
    }
}
