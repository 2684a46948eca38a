//! Context resolution: the clef, key, time signature and stem directive in
//! force at a point of a staff.
//!
//! Resolution scans backwards from the query point, across measure
//! boundaries, and falls back to the staff's initial context at the staff
//! start. Cost is proportional to the distance scanned; the layout passes
//! carry context forward themselves and only call in here to seed a run.

use core_score::{Movement, ObjectKind, ObjectType, StaffContext};
use tracing::trace;

/// Context types the resolver can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Clef,
    KeySig,
    TimeSig,
    Stem,
}

impl ContextKind {
    fn matches(self, ty: ObjectType) -> bool {
        matches!(
            (self, ty),
            (ContextKind::Clef, ObjectType::Clef)
                | (ContextKind::KeySig, ObjectType::KeySig)
                | (ContextKind::TimeSig, ObjectType::TimeSig)
                | (ContextKind::Stem, ObjectType::StemDirective)
        )
    }
}

/// Nearest object of `kind` strictly before `(measure, object)` on `staff`.
///
/// `object` may equal the measure length (appending position). Returns
/// `None` when the staff start is reached first or the address is invalid.
pub fn find_preceding<'a>(
    movement: &'a Movement,
    staff: usize,
    measure: usize,
    object: usize,
    kind: ContextKind,
) -> Option<&'a ObjectKind> {
    let staff = movement.staff(staff).ok()?;
    let measures = staff.measures();
    let first = measures.get(measure)?;
    let head = &first.objects()[..object.min(first.len())];
    if let Some(found) = head.iter().rev().find(|o| kind.matches(o.object_type())) {
        return Some(&found.kind);
    }
    measures[..measure]
        .iter()
        .rev()
        .flat_map(|m| m.objects().iter().rev())
        .find(|o| kind.matches(o.object_type()))
        .map(|o| &o.kind)
}

/// Full context in force just before `(measure, object)`.
pub fn context_at(movement: &Movement, staff: usize, measure: usize, object: usize) -> StaffContext {
    let Ok(s) = movement.staff(staff) else {
        return StaffContext::default();
    };
    let mut ctx = s.initial;
    if let Some(ObjectKind::Clef(c)) = find_preceding(movement, staff, measure, object, ContextKind::Clef) {
        ctx.clef = *c;
    }
    if let Some(ObjectKind::KeySig(k)) = find_preceding(movement, staff, measure, object, ContextKind::KeySig) {
        ctx.keysig = *k;
    }
    if let Some(ObjectKind::TimeSig(t)) = find_preceding(movement, staff, measure, object, ContextKind::TimeSig) {
        ctx.timesig = *t;
    }
    if let Some(ObjectKind::StemDirective(d)) = find_preceding(movement, staff, measure, object, ContextKind::Stem) {
        ctx.stem = *d;
    }
    ctx
}

/// Recompute every staff's leftmost-context cache as of `first_measure`.
pub fn refresh_leftmost(movement: &mut Movement, first_measure: usize) {
    for idx in 0..movement.staff_count() {
        let ctx = context_at(movement, idx, first_measure, 0);
        if let Ok(staff) = movement.staff_mut(idx) {
            staff.leftmost = ctx;
        }
    }
    trace!(target: "layout.engine", first_measure, staffs = movement.staff_count(), "leftmost_refreshed");
}
