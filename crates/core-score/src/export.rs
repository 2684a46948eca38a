//! Export hook: serializers read the final object tree through the same
//! accessors rendering uses.

use std::fmt::{self, Write};

use crate::movement::{Movement, Score};
use crate::object::{BarlineKind, Chord, ObjectKind};
use crate::pitch::{KeySig, Note, StemDirection, letter_name};
use crate::staff::Staff;

pub trait ScoreExporter {
    fn export(&self, score: &Score, out: &mut dyn Write) -> fmt::Result;

    fn export_to_string(&self, score: &Score) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.export(score, &mut out);
        out
    }
}

/// Plain-text, LilyPond-flavoured dump: one line per staff, `|` between
/// measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExporter;

const MAJOR_TONICS: [&str; 15] = [
    "ces", "ges", "des", "aes", "ees", "bes", "f", "c", "g", "d", "a", "e", "b", "fis", "cis",
];
const MINOR_TONICS: [&str; 15] = [
    "aes", "ees", "bes", "f", "c", "g", "d", "a", "e", "b", "fis", "cis", "gis", "dis", "ais",
];

impl ScoreExporter for TextExporter {
    fn export(&self, score: &Score, out: &mut dyn Write) -> fmt::Result {
        if !score.title.is_empty() {
            writeln!(out, "% {}", score.title)?;
        }
        for (idx, movement) in score.movements().iter().enumerate() {
            writeln!(out, "% movement {}", idx + 1)?;
            write_movement(movement, out)?;
        }
        Ok(())
    }
}

fn write_movement(movement: &Movement, out: &mut dyn Write) -> fmt::Result {
    for staff in movement.staffs() {
        write_staff(staff, out)?;
    }
    Ok(())
}

fn write_staff(staff: &Staff, out: &mut dyn Write) -> fmt::Result {
    write!(
        out,
        "{} [v{}]: \\clef {} ",
        staff.name,
        staff.voice.number(),
        staff.initial.clef.kind.name()
    )?;
    write_key(&staff.initial.keysig, out)?;
    write!(
        out,
        " \\time {}/{}",
        staff.initial.timesig.numerator, staff.initial.timesig.denominator
    )?;
    for (idx, measure) in staff.measures().iter().enumerate() {
        if idx > 0 {
            out.write_str(" |")?;
        }
        for object in measure.objects() {
            out.write_char(' ')?;
            write_object(&object.kind, out)?;
        }
    }
    out.write_char('\n')
}

fn write_key(key: &KeySig, out: &mut dyn Write) -> fmt::Result {
    let idx = (i32::from(key.number) + 7) as usize;
    if key.is_minor {
        write!(out, "\\key {} \\minor", MINOR_TONICS[idx])
    } else {
        write!(out, "\\key {} \\major", MAJOR_TONICS[idx])
    }
}

fn write_object(kind: &ObjectKind, out: &mut dyn Write) -> fmt::Result {
    match kind {
        ObjectKind::Chord(chord) => write_chord(chord, out),
        ObjectKind::Clef(clef) => write!(out, "\\clef {}", clef.kind.name()),
        ObjectKind::KeySig(key) => write_key(key, out),
        ObjectKind::TimeSig(t) => write!(out, "\\time {}/{}", t.numerator, t.denominator),
        ObjectKind::TupletOpen(t) => write!(out, "\\times {}/{} {{", t.numerator, t.denominator),
        ObjectKind::TupletClose | ObjectKind::GraceEnd => out.write_char('}'),
        ObjectKind::StemDirective(dir) => out.write_str(match dir {
            StemDirection::Up => "\\stemUp",
            StemDirection::Down => "\\stemDown",
            StemDirection::Both => "\\stemNeutral",
        }),
        ObjectKind::Dynamic(mark) => write!(out, "\\{}", mark.text),
        ObjectKind::LilyDirective(d) => write!(out, "{}{}", d.prefix, d.postfix),
        ObjectKind::Lyric(mark) => write!(out, "%{{lyric {}%}}", mark.text),
        ObjectKind::Figure(mark) => write!(out, "%{{figure {}%}}", mark.text),
        ObjectKind::Barline(kind) => write!(
            out,
            "\\bar \"{}\"",
            match kind {
                BarlineKind::Single => "|",
                BarlineKind::Double => "||",
                BarlineKind::End => "|.",
                BarlineKind::RepeatStart => ".|:",
                BarlineKind::RepeatEnd => ":|.",
            }
        ),
        ObjectKind::GraceStart => out.write_str("\\grace {"),
        ObjectKind::MeasureBreak => out.write_str("%{measure-break%}"),
        ObjectKind::StaffBreak => out.write_str("%{staff-break%}"),
    }
}

fn write_note(note: &Note, out: &mut dyn Write) -> fmt::Result {
    out.write_char(letter_name(note.letter()))?;
    let suffix = if note.enshift > 0 { "is" } else { "es" };
    for _ in 0..note.enshift.unsigned_abs() {
        out.write_str(suffix)?;
    }
    let octave = note.mid_c_offset.div_euclid(7) + 1;
    let mark = if octave > 0 { '\'' } else { ',' };
    for _ in 0..octave.unsigned_abs() {
        out.write_char(mark)?;
    }
    if note.forces_accidental() {
        out.write_char('!')?;
    }
    Ok(())
}

fn write_chord(chord: &Chord, out: &mut dyn Write) -> fmt::Result {
    match chord.notes.as_slice() {
        [] => out.write_char('r')?,
        [single] => write_note(single, out)?,
        notes => {
            out.write_char('<')?;
            for (i, note) in notes.iter().enumerate() {
                if i > 0 {
                    out.write_char(' ')?;
                }
                write_note(note, out)?;
            }
            out.write_char('>')?;
        }
    }
    if chord.duration < 0 {
        write!(out, "1*{}/1536", chord.duration.unsigned_abs())?;
    } else {
        write!(out, "{}", 1u32 << chord.duration.min(8))?;
        for _ in 0..chord.dots {
            out.write_char('.')?;
        }
    }
    if chord.tied {
        out.write_char('~')?;
    }
    if chord.slur_begin {
        out.write_char('(')?;
    }
    if chord.slur_end {
        out.write_char(')')?;
    }
    for (begin, end, open) in [
        (chord.crescendo_begin, chord.crescendo_end, "\\<"),
        (chord.diminuendo_begin, chord.diminuendo_end, "\\>"),
    ] {
        if begin {
            out.write_str(open)?;
        }
        if end {
            out.write_str("\\!")?;
        }
    }
    Ok(())
}
