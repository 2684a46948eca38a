//! Musical objects: the tagged union stored in every measure.
//!
//! Each variant's payload implements [`ObjectBehavior`], the one place where
//! per-type capabilities (type tag, basic ticks, attached directives) live.
//! Callers go through [`ObjectKind::with_behavior`] instead of repeating a match
//! over every variant. Deep copies are plain `Clone`.
//!
//! [`ObjectLayout`] holds values derived by the layout engine (ticks, beam
//! flags, stems, widths). It is overwritten on every layout pass and never
//! consulted as a source of truth by editing code.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::duration::{self, Ticks};
use crate::pitch::{Clef, KeySig, Note, StemDirection, TimeSig};

/// Tag of a directive that waives the measure duration indicator once.
pub const ALLOW_DURATION_ERROR_TAG: &str = "AllowDurationError";

/// Discriminant of an [`ObjectKind`] exposed to scripting and export layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Chord,
    Clef,
    KeySig,
    TimeSig,
    TupletOpen,
    TupletClose,
    StemDirective,
    Dynamic,
    LilyDirective,
    Lyric,
    Figure,
    Barline,
    GraceStart,
    GraceEnd,
    MeasureBreak,
    StaffBreak,
}

impl ObjectType {
    pub fn name(self) -> &'static str {
        match self {
            ObjectType::Chord => "chord",
            ObjectType::Clef => "clef",
            ObjectType::KeySig => "keysig",
            ObjectType::TimeSig => "timesig",
            ObjectType::TupletOpen => "tuplet_open",
            ObjectType::TupletClose => "tuplet_close",
            ObjectType::StemDirective => "stem_directive",
            ObjectType::Dynamic => "dynamic",
            ObjectType::LilyDirective => "lily_directive",
            ObjectType::Lyric => "lyric",
            ObjectType::Figure => "figure",
            ObjectType::Barline => "barline",
            ObjectType::GraceStart => "grace_start",
            ObjectType::GraceEnd => "grace_end",
            ObjectType::MeasureBreak => "measure_break",
            ObjectType::StaffBreak => "staff_break",
        }
    }
}

/// Per-variant capability set.
pub trait ObjectBehavior {
    fn object_type(&self) -> ObjectType;

    /// Untupleted duration; zero for everything that is not a chord.
    fn basic_ticks(&self) -> Ticks {
        0
    }

    fn directives(&self) -> &[Directive] {
        &[]
    }

    /// Objects that only ever live in a clipboard buffer.
    fn is_sentinel(&self) -> bool {
        false
    }
}

/// Free-form engraving instruction attached to an object or note, or
/// standing alone in a measure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directive {
    pub tag: String,
    pub prefix: String,
    pub postfix: String,
    pub display: String,
    /// Extra horizontal space requested by whoever registered the directive.
    pub extra_width: u32,
    pub locked: bool,
}

impl Directive {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// `!` (reminder) and `?` (cautionary) force accidental display.
    pub fn forces_accidental(&self) -> bool {
        self.tag.starts_with(['!', '?']) || self.postfix.starts_with(['!', '?'])
    }

    pub fn allows_duration_error(&self) -> bool {
        self.tag == ALLOW_DURATION_ERROR_TAG
    }
}

impl ObjectBehavior for Directive {
    fn object_type(&self) -> ObjectType {
        ObjectType::LilyDirective
    }
    fn directives(&self) -> &[Directive] {
        std::slice::from_ref(self)
    }
}

/// A chord; with no notes it is a rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub duration: i32,
    pub dots: u8,
    pub notes: SmallVec<[Note; 4]>,
    pub tied: bool,
    pub slur_begin: bool,
    pub slur_end: bool,
    pub crescendo_begin: bool,
    pub crescendo_end: bool,
    pub diminuendo_begin: bool,
    pub diminuendo_end: bool,
    pub is_grace: bool,
    pub directives: Vec<Directive>,
}

impl Chord {
    pub fn rest(duration: i32, dots: u8) -> Self {
        Self {
            duration,
            dots,
            notes: SmallVec::new(),
            tied: false,
            slur_begin: false,
            slur_end: false,
            crescendo_begin: false,
            crescendo_end: false,
            diminuendo_begin: false,
            diminuendo_end: false,
            is_grace: false,
            directives: Vec::new(),
        }
    }

    pub fn with_note(duration: i32, dots: u8, mid_c_offset: i32, enshift: i8) -> Self {
        let mut chord = Self::rest(duration, dots);
        chord.add_note(mid_c_offset, enshift);
        chord
    }

    pub fn is_rest(&self) -> bool {
        self.notes.is_empty()
    }

    /// Insert a note keeping notes ordered bottom to top. A note already at
    /// that staff position is replaced. Returns its index.
    pub fn add_note(&mut self, mid_c_offset: i32, enshift: i8) -> usize {
        match self
            .notes
            .binary_search_by_key(&mid_c_offset, |n| n.mid_c_offset)
        {
            Ok(idx) => {
                self.notes[idx].enshift = enshift.clamp(-2, 2);
                idx
            }
            Err(idx) => {
                self.notes.insert(idx, Note::new(mid_c_offset, enshift));
                idx
            }
        }
    }

    /// Remove the note nearest to `mid_c_offset`. Returns the removed note.
    pub fn remove_nearest(&mut self, mid_c_offset: i32) -> Option<Note> {
        let idx = self.nearest_note_index(mid_c_offset)?;
        Some(self.notes.remove(idx))
    }

    pub fn nearest_note_index(&self, mid_c_offset: i32) -> Option<usize> {
        self.notes
            .iter()
            .enumerate()
            .min_by_key(|(_, n)| (n.mid_c_offset - mid_c_offset).abs())
            .map(|(i, _)| i)
    }

    pub fn highest(&self) -> Option<i32> {
        self.notes.last().map(|n| n.mid_c_offset)
    }

    pub fn lowest(&self) -> Option<i32> {
        self.notes.first().map(|n| n.mid_c_offset)
    }

    /// Two noteheads a step apart force some heads onto the other side of the stem.
    pub fn has_seconds(&self) -> bool {
        self.notes
            .windows(2)
            .any(|w| w[1].mid_c_offset - w[0].mid_c_offset == 1)
    }
}

impl ObjectBehavior for Chord {
    fn object_type(&self) -> ObjectType {
        ObjectType::Chord
    }
    fn basic_ticks(&self) -> Ticks {
        duration::basic_ticks(self.duration, self.dots)
    }
    fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuplet {
    pub numerator: u32,
    pub denominator: u32,
}

impl Tuplet {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarlineKind {
    #[default]
    Single,
    Double,
    End,
    RepeatStart,
    RepeatEnd,
}

/// Text-carrying objects (dynamics, lyrics, figured bass).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextMark {
    pub text: String,
    pub directives: Vec<Directive>,
}

impl TextMark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            directives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Chord(Chord),
    Clef(Clef),
    KeySig(KeySig),
    TimeSig(TimeSig),
    TupletOpen(Tuplet),
    TupletClose,
    StemDirective(StemDirection),
    Dynamic(TextMark),
    LilyDirective(Directive),
    Lyric(TextMark),
    Figure(TextMark),
    Barline(BarlineKind),
    GraceStart,
    GraceEnd,
    /// Clipboard only: the following objects belong to the next measure.
    MeasureBreak,
    /// Clipboard only: end of one staff's objects.
    StaffBreak,
}

/// Behavior for payload-free variants.
struct Marker(ObjectType);

impl ObjectBehavior for Marker {
    fn object_type(&self) -> ObjectType {
        self.0
    }
    fn is_sentinel(&self) -> bool {
        matches!(self.0, ObjectType::MeasureBreak | ObjectType::StaffBreak)
    }
}

static TUPLET_CLOSE: Marker = Marker(ObjectType::TupletClose);
static GRACE_START: Marker = Marker(ObjectType::GraceStart);
static GRACE_END: Marker = Marker(ObjectType::GraceEnd);
static MEASURE_BREAK: Marker = Marker(ObjectType::MeasureBreak);
static STAFF_BREAK: Marker = Marker(ObjectType::StaffBreak);

struct TextBehavior<'a>(ObjectType, &'a TextMark);

impl ObjectBehavior for TextBehavior<'_> {
    fn object_type(&self) -> ObjectType {
        self.0
    }
    fn directives(&self) -> &[Directive] {
        &self.1.directives
    }
}

macro_rules! plain_behavior {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(impl ObjectBehavior for $ty {
            fn object_type(&self) -> ObjectType {
                ObjectType::$tag
            }
        })*
    };
}

plain_behavior! {
    Clef => Clef,
    KeySig => KeySig,
    TimeSig => TimeSig,
    Tuplet => TupletOpen,
    StemDirection => StemDirective,
    BarlineKind => Barline,
}

impl ObjectKind {
    /// Run `f` with the capability object of this variant.
    pub fn with_behavior<R>(&self, f: impl FnOnce(&dyn ObjectBehavior) -> R) -> R {
        match self {
            ObjectKind::Chord(c) => f(c),
            ObjectKind::Clef(c) => f(c),
            ObjectKind::KeySig(k) => f(k),
            ObjectKind::TimeSig(t) => f(t),
            ObjectKind::TupletOpen(t) => f(t),
            ObjectKind::TupletClose => f(&TUPLET_CLOSE),
            ObjectKind::StemDirective(s) => f(s),
            ObjectKind::Dynamic(t) => f(&TextBehavior(ObjectType::Dynamic, t)),
            ObjectKind::LilyDirective(d) => f(d),
            ObjectKind::Lyric(t) => f(&TextBehavior(ObjectType::Lyric, t)),
            ObjectKind::Figure(t) => f(&TextBehavior(ObjectType::Figure, t)),
            ObjectKind::Barline(b) => f(b),
            ObjectKind::GraceStart => f(&GRACE_START),
            ObjectKind::GraceEnd => f(&GRACE_END),
            ObjectKind::MeasureBreak => f(&MEASURE_BREAK),
            ObjectKind::StaffBreak => f(&STAFF_BREAK),
        }
    }

    pub fn object_type(&self) -> ObjectType {
        self.with_behavior(|b| b.object_type())
    }

    pub fn basic_ticks(&self) -> Ticks {
        self.with_behavior(|b| b.basic_ticks())
    }

    pub fn is_sentinel(&self) -> bool {
        self.with_behavior(|b| b.is_sentinel())
    }

    pub fn allows_duration_error(&self) -> bool {
        self.with_behavior(|b| b.directives().iter().any(Directive::allows_duration_error))
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        match self {
            ObjectKind::Chord(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_chord_mut(&mut self) -> Option<&mut Chord> {
        match self {
            ObjectKind::Chord(c) => Some(c),
            _ => None,
        }
    }
}

bitflags! {
    /// Layout decorations derived per object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayoutFlags: u16 {
        const BEAM_START    = 1 << 0;
        const BEAM_END      = 1 << 1;
        const STEM_UP       = 1 << 2;
        const REVERSE_ALIGN = 1 << 3;
        const IN_TUPLET     = 1 << 4;
        const GRACE         = 1 << 5;
    }
}

/// Values computed by the layout engine for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectLayout {
    pub basic_ticks: Ticks,
    /// Effective ticks after tuplet/grace scaling.
    pub duration_ticks: Ticks,
    pub start_tick: Ticks,
    pub start_tick_of_next: Ticks,
    pub flags: LayoutFlags,
    /// Stem length in half staff-spaces; zero when no stem is drawn.
    pub stem_length: i32,
    pub min_width: u32,
    pub space_before: u32,
    /// Offset of the object from the left edge of its measure, in pixels.
    pub x: u32,
}

impl ObjectLayout {
    pub fn is_beam_start(&self) -> bool {
        self.flags.contains(LayoutFlags::BEAM_START)
    }
    pub fn is_beam_end(&self) -> bool {
        self.flags.contains(LayoutFlags::BEAM_END)
    }
    pub fn is_stem_up(&self) -> bool {
        self.flags.contains(LayoutFlags::STEM_UP)
    }
}

/// An object in a measure: its content plus derived layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicalObject {
    pub kind: ObjectKind,
    pub layout: ObjectLayout,
}

impl MusicalObject {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            layout: ObjectLayout::default(),
        }
    }

    pub fn chord(chord: Chord) -> Self {
        Self::new(ObjectKind::Chord(chord))
    }

    pub fn object_type(&self) -> ObjectType {
        self.kind.object_type()
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        self.kind.as_chord()
    }

    pub fn as_chord_mut(&mut self) -> Option<&mut Chord> {
        self.kind.as_chord_mut()
    }

    pub fn is_sentinel(&self) -> bool {
        self.kind.is_sentinel()
    }
}

impl From<ObjectKind> for MusicalObject {
    fn from(kind: ObjectKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_note_keeps_order_and_replaces_duplicates() {
        let mut c = Chord::with_note(2, 0, 4, 0);
        c.add_note(0, 0);
        c.add_note(2, 0);
        c.add_note(4, 1);
        let offsets: Vec<i32> = c.notes.iter().map(|n| n.mid_c_offset).collect();
        assert_eq!(offsets, vec![0, 2, 4]);
        assert_eq!(c.notes[2].enshift, 1);
    }

    #[test]
    fn behavior_dispatch_reports_types() {
        assert_eq!(ObjectKind::TupletClose.object_type(), ObjectType::TupletClose);
        assert_eq!(
            ObjectKind::Lyric(TextMark::new("la")).object_type(),
            ObjectType::Lyric
        );
        assert!(ObjectKind::StaffBreak.is_sentinel());
        assert!(!ObjectKind::GraceStart.is_sentinel());
        let chord = ObjectKind::Chord(Chord::rest(3, 1));
        assert_eq!(chord.basic_ticks(), 288);
    }

    #[test]
    fn clone_is_deep() {
        let mut original = Chord::with_note(2, 0, 0, 0);
        original.notes[0].directives.push(Directive::tagged("!"));
        let obj = MusicalObject::chord(original);
        let mut copy = obj.clone();
        copy.as_chord_mut().unwrap().notes[0].directives.clear();
        assert_eq!(obj.as_chord().unwrap().notes[0].directives.len(), 1);
    }

    #[test]
    fn duration_waiver_is_detected_on_directives() {
        let kind = ObjectKind::LilyDirective(Directive::tagged(ALLOW_DURATION_ERROR_TAG));
        assert!(kind.allows_duration_error());
        assert!(!ObjectKind::Clef(Clef::default()).allows_duration_error());
    }

    #[test]
    fn seconds_detected() {
        let mut c = Chord::with_note(2, 0, 0, 0);
        assert!(!c.has_seconds());
        c.add_note(1, 0);
        assert!(c.has_seconds());
    }
}
