//! Pixel-width queries. The renderer owns glyph metrics; layout only asks
//! how wide each object is and how much room it wants in front of it.

use core_score::{LayoutFlags, MusicalObject, ObjectKind};

pub trait WidthProvider {
    /// Minimum width of the object itself.
    fn min_width(&self, object: &MusicalObject) -> u32;

    /// Extra room in front of the object (accidentals and the like).
    fn space_before(&self, _object: &MusicalObject) -> u32 {
        0
    }

    /// Space at both ends of a measure.
    fn measure_padding(&self) -> u32 {
        0
    }
}

/// Fixed per-glyph widths, overridable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardWidths {
    pub note_head: u32,
    pub dot: u32,
    pub accidental: u32,
    pub flag: u32,
    pub clef: u32,
    pub key_accidental: u32,
    pub time_signature: u32,
    pub marker: u32,
    pub directive: u32,
    pub measure_padding: u32,
}

impl Default for StandardWidths {
    fn default() -> Self {
        Self {
            note_head: 10,
            dot: 4,
            accidental: 8,
            flag: 6,
            clef: 24,
            key_accidental: 7,
            time_signature: 16,
            marker: 4,
            directive: 8,
            measure_padding: 8,
        }
    }
}

impl WidthProvider for StandardWidths {
    fn min_width(&self, object: &MusicalObject) -> u32 {
        match &object.kind {
            ObjectKind::Chord(chord) => {
                let mut width = self.note_head + self.dot * u32::from(chord.dots);
                let flags = object.layout.flags;
                if flags.contains(LayoutFlags::REVERSE_ALIGN) {
                    width += self.note_head;
                }
                let single = flags.contains(LayoutFlags::BEAM_START | LayoutFlags::BEAM_END);
                if !chord.is_rest() && chord.duration > 2 && single && flags.contains(LayoutFlags::STEM_UP) {
                    width += self.flag;
                }
                let extra: u32 = chord
                    .directives
                    .iter()
                    .chain(chord.notes.iter().flat_map(|n| n.directives.iter()))
                    .map(|d| d.extra_width)
                    .sum();
                if flags.contains(LayoutFlags::GRACE) {
                    width = width * 2 / 3;
                }
                width + extra
            }
            ObjectKind::Clef(_) => self.clef,
            ObjectKind::KeySig(k) => self.key_accidental * u32::from(k.number.unsigned_abs()).max(1),
            ObjectKind::TimeSig(_) => self.time_signature,
            ObjectKind::Dynamic(t) | ObjectKind::Lyric(t) | ObjectKind::Figure(t) => {
                self.directive
                    + t.directives.iter().map(|d| d.extra_width).sum::<u32>()
            }
            ObjectKind::LilyDirective(d) => self.directive + d.extra_width,
            ObjectKind::TupletOpen(_)
            | ObjectKind::TupletClose
            | ObjectKind::StemDirective(_)
            | ObjectKind::Barline(_)
            | ObjectKind::GraceStart
            | ObjectKind::GraceEnd => self.marker,
            ObjectKind::MeasureBreak | ObjectKind::StaffBreak => 0,
        }
    }

    fn space_before(&self, object: &MusicalObject) -> u32 {
        let Some(chord) = object.as_chord() else {
            return 0;
        };
        chord
            .notes
            .iter()
            .filter(|n| n.show_accidental)
            .map(|n| (u32::from(n.accidental_position) + 1) * self.accidental)
            .max()
            .unwrap_or(0)
    }

    fn measure_padding(&self) -> u32 {
        self.measure_padding
    }
}
