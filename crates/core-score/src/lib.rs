//! core-score: the editable score tree.
//!
//! A [`Score`] holds movements; a [`Movement`] holds staffs; a [`Staff`]
//! holds measures; a [`Measure`] holds [`MusicalObject`]s in temporal order.
//! Everything is addressed by index `(staff, measure, object)`, so moving
//! backwards is index arithmetic and removal cannot leave dangling links.
//!
//! Structural edits live on [`Movement`] and keep two invariants before
//! returning: no staff is ever left without a measure, and the shared
//! `measure_widths` array is at least as long as the longest staff.

pub mod duration;
pub mod export;
pub mod measure;
pub mod movement;
pub mod object;
pub mod pitch;
pub mod staff;

pub use duration::{Ticks, WHOLE_NOTE_TICKS};
pub use export::{ScoreExporter, TextExporter};
pub use measure::{Measure, MeasureFill, MeasureLayout};
pub use movement::{DEFAULT_MEASURE_WIDTH, MeasureRemoval, MeasureScope, Movement, Score};
pub use object::{
    BarlineKind, Chord, Directive, LayoutFlags, MusicalObject, ObjectBehavior, ObjectKind,
    ObjectLayout, ObjectType, TextMark, Tuplet,
};
pub use pitch::{Clef, ClefType, KeySig, Note, StemDirection, TimeSig};
pub use staff::{Staff, StaffContext, Voice};

/// Addressing and structural precondition failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("no movement {0}")]
    NoSuchMovement(usize),
    #[error("no staff {0}")]
    NoSuchStaff(usize),
    #[error("staff {staff} has no measure {measure}")]
    NoSuchMeasure { staff: usize, measure: usize },
    #[error("staff {staff} measure {measure} has no object {object}")]
    NoSuchObject {
        staff: usize,
        measure: usize,
        object: usize,
    },
    #[error("cannot remove {count} measures at {at}: only {available} available")]
    NotEnoughMeasures {
        at: usize,
        count: usize,
        available: usize,
    },
    #[error("a movement needs at least one staff")]
    LastStaff,
    #[error("a score needs at least one movement")]
    LastMovement,
}
