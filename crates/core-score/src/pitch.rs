//! Pitch-level value types: notes, clefs, key signatures.
//!
//! Pitches are diatonic: `mid_c_offset` counts staff steps from middle C
//! (0 = C4, 1 = D4, -1 = B3) and `enshift` is the chromatic alteration
//! (-2 = double flat .. +2 = double sharp). Letter classes are
//! `mid_c_offset.rem_euclid(7)` with 0 = C .. 6 = B.

use crate::object::Directive;

/// Number of diatonic letter classes.
pub const LETTERS: usize = 7;

/// Sharp order expressed as letter classes (F C G D A E B).
const SHARP_ORDER: [usize; 7] = [3, 0, 4, 1, 5, 2, 6];
/// Flat order expressed as letter classes (B E A D G C F).
const FLAT_ORDER: [usize; 7] = [6, 2, 5, 1, 4, 0, 3];

/// Letter class (0 = C .. 6 = B) of a diatonic offset.
pub fn letter_class(mid_c_offset: i32) -> usize {
    mid_c_offset.rem_euclid(LETTERS as i32) as usize
}

/// Lower-case note name of a letter class.
pub fn letter_name(letter: usize) -> char {
    ['c', 'd', 'e', 'f', 'g', 'a', 'b'][letter % LETTERS]
}

/// Letter class for a note name character, case-insensitive.
pub fn letter_from_name(name: char) -> Option<usize> {
    match name.to_ascii_lowercase() {
        'c' => Some(0),
        'd' => Some(1),
        'e' => Some(2),
        'f' => Some(3),
        'g' => Some(4),
        'a' => Some(5),
        'b' => Some(6),
        _ => None,
    }
}

/// A single notehead inside a chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub mid_c_offset: i32,
    pub enshift: i8,
    /// Derived by the accidental pass.
    pub show_accidental: bool,
    /// Accidental column (0 = nearest the notehead), derived by layout.
    pub accidental_position: u8,
    pub directives: Vec<Directive>,
}

impl Note {
    pub fn new(mid_c_offset: i32, enshift: i8) -> Self {
        Self {
            mid_c_offset,
            enshift: enshift.clamp(-2, 2),
            show_accidental: false,
            accidental_position: 0,
            directives: Vec::new(),
        }
    }

    pub fn letter(&self) -> usize {
        letter_class(self.mid_c_offset)
    }

    /// True when a note directive asks for a reminder (`!`) or cautionary
    /// (`?`) accidental regardless of context.
    pub fn forces_accidental(&self) -> bool {
        self.directives.iter().any(Directive::forces_accidental)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClefType {
    Treble,
    Bass,
    Alto,
    Tenor,
    Soprano,
    TrebleOctaveDown,
    BassOctaveDown,
}

impl ClefType {
    /// Diatonic offset (from middle C) of the staff's middle line.
    pub fn middle_line_offset(self) -> i32 {
        match self {
            ClefType::Treble => 6,
            ClefType::Bass => -6,
            ClefType::Alto => 0,
            ClefType::Tenor => -2,
            ClefType::Soprano => 4,
            ClefType::TrebleOctaveDown => -1,
            ClefType::BassOctaveDown => -13,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClefType::Treble => "treble",
            ClefType::Bass => "bass",
            ClefType::Alto => "alto",
            ClefType::Tenor => "tenor",
            ClefType::Soprano => "soprano",
            ClefType::TrebleOctaveDown => "treble_8",
            ClefType::BassOctaveDown => "bass_8",
        }
    }

    /// Inverse of [`ClefType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "treble" => ClefType::Treble,
            "bass" => ClefType::Bass,
            "alto" => ClefType::Alto,
            "tenor" => ClefType::Tenor,
            "soprano" => ClefType::Soprano,
            "treble_8" => ClefType::TrebleOctaveDown,
            "bass_8" => ClefType::BassOctaveDown,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clef {
    pub kind: ClefType,
}

impl Clef {
    pub fn new(kind: ClefType) -> Self {
        Self { kind }
    }

    /// Height of a pitch above (+) or below (-) the middle staff line, in steps.
    pub fn height_of(&self, mid_c_offset: i32) -> i32 {
        mid_c_offset - self.kind.middle_line_offset()
    }
}

impl Default for Clef {
    fn default() -> Self {
        Self::new(ClefType::Treble)
    }
}

/// Key signature: `number` sharps (positive) or flats (negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySig {
    pub number: i8,
    pub is_minor: bool,
    /// Alteration the key applies to each letter class.
    pub accidentals: [i8; LETTERS],
}

impl KeySig {
    pub fn new(number: i8, is_minor: bool) -> Self {
        let number = number.clamp(-7, 7);
        let mut accidentals = [0i8; LETTERS];
        if number > 0 {
            for &letter in SHARP_ORDER.iter().take(number as usize) {
                accidentals[letter] = 1;
            }
        } else {
            for &letter in FLAT_ORDER.iter().take(number.unsigned_abs() as usize) {
                accidentals[letter] = -1;
            }
        }
        Self {
            number,
            is_minor,
            accidentals,
        }
    }

    pub fn accidental_for(&self, letter: usize) -> i8 {
        self.accidentals[letter % LETTERS]
    }

    /// Spell a MIDI key number in this key. Sharp keys (and C) prefer sharps,
    /// flat keys prefer flats; diatonic pitches always use the key's letter.
    pub fn spell_midi(&self, key: u8) -> (i32, i8) {
        const NATURAL_PC: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];
        let key = i32::from(key);
        let octave = key.div_euclid(12) - 5;
        let pc = key.rem_euclid(12);
        for (letter, natural) in NATURAL_PC.iter().enumerate() {
            let shift = i32::from(self.accidentals[letter]);
            if (natural + shift).rem_euclid(12) == pc {
                let carry = (natural + shift).div_euclid(12);
                return ((octave - carry) * 7 + letter as i32, shift as i8);
            }
        }
        let prefer_flats = self.number < 0;
        for (letter, natural) in NATURAL_PC.iter().enumerate() {
            let shift = if prefer_flats { -1 } else { 1 };
            if (natural + shift).rem_euclid(12) == pc {
                let carry = (natural + shift).div_euclid(12);
                return ((octave - carry) * 7 + letter as i32, shift as i8);
            }
        }
        (octave * 7, 0)
    }
}

impl Default for KeySig {
    fn default() -> Self {
        Self::new(0, false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSig {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSig {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: numerator.max(1),
            denominator: if denominator == 0 { 4 } else { denominator },
        }
    }
}

impl Default for TimeSig {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// Stem directive: `Both` leaves the direction to the layout algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StemDirection {
    Up,
    Down,
    #[default]
    Both,
}
