//! Script line translation.
//!
//! One command per line: a command word followed by arguments separated by
//! whitespace. `#` starts a comment line. Measure and movement numbers are
//! 1-based as printed in the text dump; clipboard addresses are 0-based.
//!
//! ```text
//! note c          rest            midi 60         duration 3
//! time 3/4        key -2 minor    clef bass       tuplet 2/3
//! left            goto 4          mark            copy
//! measure-after all               staff-after secondary
//! ```
//!
//! Translation is pure. Errors name the offending line content; the caller
//! decides how to surface them.

use core_score::{BarlineKind, ClefType, StemDirection, Voice};
use core_state::{InputMode, SelectionMode};

use crate::{Action, ClipKind, EditKind, Motion, StructureKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` needs an argument")]
    MissingArgument { command: String },
    #[error("`{command}`: bad argument `{value}`")]
    BadArgument { command: String, value: String },
}

pub struct ScriptTranslator;

impl ScriptTranslator {
    /// Translate one line. Blank and comment lines yield `Ok(None)`.
    pub fn translate(line: &str) -> Result<Option<Action>, TranslateError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        let args = Args { command, rest };
        let action = match command {
            // navigation
            "left" => Action::Motion(Motion::Left),
            "right" => Action::Motion(Motion::Right),
            "up" => Action::Motion(Motion::PitchUp),
            "down" => Action::Motion(Motion::PitchDown),
            "staff-up" => Action::Motion(Motion::StaffUp),
            "staff-down" => Action::Motion(Motion::StaffDown),
            "next-measure" => Action::Motion(Motion::NextMeasure),
            "prev-measure" => Action::Motion(Motion::PrevMeasure),
            "home" => Action::Motion(Motion::Home),
            "end" => Action::Motion(Motion::End),
            "goto" => Action::Motion(Motion::Goto(args.ordinal()?)),
            "shift" => Action::Motion(Motion::ShiftToNote(args.letter()?)),

            // entry
            "note" => Action::Edit(EditKind::Note(args.letter()?)),
            "rest" => Action::Edit(EditKind::Rest),
            "midi" => Action::Edit(EditKind::Midi(args.number::<u8>()?)),
            "add-note" => Action::Edit(EditKind::AddNote),
            "remove-note" => Action::Edit(EditKind::RemoveNote),
            "sharpen" => Action::Edit(EditKind::Sharpen),
            "flatten" => Action::Edit(EditKind::Flatten),
            "duration" => Action::Edit(EditKind::SetDuration(args.number()?)),
            "change-duration" => Action::Edit(EditKind::ChangeDuration(args.number()?)),
            "dot" => Action::Edit(EditKind::AddDot),
            "undot" => Action::Edit(EditKind::RemoveDot),
            "tie" => Action::Edit(EditKind::ToggleTie),
            "slur-begin" => Action::Edit(EditKind::ToggleSlurBegin),
            "slur-end" => Action::Edit(EditKind::ToggleSlurEnd),
            "grace" => Action::Edit(EditKind::ToggleGrace),
            "delete" => Action::Edit(EditKind::DeleteObject),
            "backspace" => Action::Edit(EditKind::DeletePrevious),

            // context and marker objects
            "clef" => Action::Edit(EditKind::Clef(args.clef()?)),
            "key" => {
                let (sharps, minor) = args.key()?;
                Action::Edit(EditKind::KeySig { sharps, minor })
            }
            "time" => {
                let (numerator, denominator) = args.fraction()?;
                Action::Edit(EditKind::TimeSig {
                    numerator,
                    denominator,
                })
            }
            "tuplet" => {
                let (numerator, denominator) = args.fraction()?;
                Action::Edit(EditKind::TupletOpen {
                    numerator,
                    denominator,
                })
            }
            "tuplet-end" => Action::Edit(EditKind::TupletClose),
            "stem" => Action::Edit(EditKind::Stem(args.stem()?)),
            "grace-start" => Action::Edit(EditKind::GraceStart),
            "grace-end" => Action::Edit(EditKind::GraceEnd),
            "barline" => Action::Edit(EditKind::Barline(args.barline()?)),
            "dynamic" => Action::Edit(EditKind::Dynamic(args.text()?)),
            "lyric" => Action::Edit(EditKind::Lyric(args.text()?)),
            "figure" => Action::Edit(EditKind::Figure(args.text()?)),
            "directive" => Action::Edit(EditKind::Directive(args.text()?)),

            // structure
            "measure-before" => Action::Structure(StructureKind::MeasureBefore { all: args.all()? }),
            "measure-after" => Action::Structure(StructureKind::MeasureAfter { all: args.all()? }),
            "append-measures" => {
                let (count, all) = args.count_and_all()?;
                Action::Structure(StructureKind::AppendMeasures { count, all })
            }
            "delete-measure" => Action::Structure(StructureKind::DeleteMeasure { all: args.all()? }),
            "staff-before" => Action::Structure(StructureKind::StaffBefore(args.voice()?)),
            "staff-after" => Action::Structure(StructureKind::StaffAfter(args.voice()?)),
            "delete-staff" => Action::Structure(StructureKind::DeleteStaff),
            "delete-staff-above" => Action::Structure(StructureKind::DeleteStaffAbove),
            "delete-staff-below" => Action::Structure(StructureKind::DeleteStaffBelow),
            "parasite" => Action::Structure(StructureKind::AddParasite),
            "movement-new" => Action::Structure(StructureKind::NewMovement),
            "movement" => Action::Structure(StructureKind::SwitchMovement(args.ordinal()?)),

            // selection and clipboard
            "mark" => Action::Clipboard(ClipKind::SetMark),
            "unmark" => Action::Clipboard(ClipKind::UnsetMark),
            "select-measure" => Action::Clipboard(ClipKind::SelectMeasure),
            "select-all" => Action::Clipboard(ClipKind::SelectAll),
            "select-mode" => Action::Clipboard(ClipKind::SelectionMode(args.selection_mode()?)),
            "copy" => Action::Clipboard(ClipKind::Copy),
            "cut" => Action::Clipboard(ClipKind::Cut),
            "paste" => Action::Clipboard(ClipKind::Paste),
            "push-clip" => Action::Clipboard(ClipKind::Push),
            "pop-clip" => Action::Clipboard(ClipKind::Pop),
            "clip-insert" => {
                let (staff, index) = args.pair()?;
                Action::Clipboard(ClipKind::InsertObject { staff, index })
            }

            "mode" => Action::InputMode(args.input_mode()?),
            "undo" => Action::Undo,
            "redo" => Action::Redo,
            "print" => Action::Print,
            "undo-log" => Action::UndoLog,
            "quit" | "q" => Action::Quit,
            other => return Err(TranslateError::Unknown(other.to_string())),
        };
        Ok(Some(action))
    }
}

struct Args<'a> {
    command: &'a str,
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn missing(&self) -> TranslateError {
        TranslateError::MissingArgument {
            command: self.command.to_string(),
        }
    }

    fn bad(&self, value: &str) -> TranslateError {
        TranslateError::BadArgument {
            command: self.command.to_string(),
            value: value.to_string(),
        }
    }

    fn words(&self) -> std::str::SplitWhitespace<'a> {
        self.rest.split_whitespace()
    }

    fn first(&self) -> Result<&'a str, TranslateError> {
        self.words().next().ok_or_else(|| self.missing())
    }

    fn text(&self) -> Result<String, TranslateError> {
        if self.rest.is_empty() {
            return Err(self.missing());
        }
        Ok(self.rest.to_string())
    }

    fn number<T: std::str::FromStr>(&self) -> Result<T, TranslateError> {
        let word = self.first()?;
        word.parse().map_err(|_| self.bad(word))
    }

    /// 1-based number turned into a 0-based index.
    fn ordinal(&self) -> Result<usize, TranslateError> {
        let word = self.first()?;
        match word.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n - 1),
            _ => Err(self.bad(word)),
        }
    }

    fn letter(&self) -> Result<usize, TranslateError> {
        let word = self.first()?;
        let letter = match word.to_ascii_lowercase().as_str() {
            "c" => 0,
            "d" => 1,
            "e" => 2,
            "f" => 3,
            "g" => 4,
            "a" => 5,
            "b" => 6,
            _ => return Err(self.bad(word)),
        };
        Ok(letter)
    }

    fn fraction(&self) -> Result<(u32, u32), TranslateError> {
        let word = self.first()?;
        let parsed = word
            .split_once('/')
            .and_then(|(n, d)| Some((n.parse::<u32>().ok()?, d.parse::<u32>().ok()?)));
        match parsed {
            Some((n, d)) if n > 0 && d > 0 => Ok((n, d)),
            _ => Err(self.bad(word)),
        }
    }

    fn key(&self) -> Result<(i8, bool), TranslateError> {
        let mut words = self.words();
        let word = words.next().ok_or_else(|| self.missing())?;
        let sharps = match word.parse::<i8>() {
            Ok(n) if (-7..=7).contains(&n) => n,
            _ => return Err(self.bad(word)),
        };
        let minor = match words.next() {
            None | Some("major") => false,
            Some("minor") => true,
            Some(other) => return Err(self.bad(other)),
        };
        Ok((sharps, minor))
    }

    fn clef(&self) -> Result<ClefType, TranslateError> {
        let word = self.first()?;
        ClefType::from_name(word).ok_or_else(|| self.bad(word))
    }

    fn stem(&self) -> Result<StemDirection, TranslateError> {
        let word = self.first()?;
        match word {
            "up" => Ok(StemDirection::Up),
            "down" => Ok(StemDirection::Down),
            "auto" | "both" => Ok(StemDirection::Both),
            _ => Err(self.bad(word)),
        }
    }

    fn barline(&self) -> Result<BarlineKind, TranslateError> {
        let Some(word) = self.words().next() else {
            return Ok(BarlineKind::Single);
        };
        match word {
            "single" => Ok(BarlineKind::Single),
            "double" => Ok(BarlineKind::Double),
            "end" => Ok(BarlineKind::End),
            "repeat-start" => Ok(BarlineKind::RepeatStart),
            "repeat-end" => Ok(BarlineKind::RepeatEnd),
            _ => Err(self.bad(word)),
        }
    }

    fn voice(&self) -> Result<Voice, TranslateError> {
        let Some(word) = self.words().next() else {
            return Ok(Voice::Primary);
        };
        match word {
            "primary" => Ok(Voice::Primary),
            "secondary" => Ok(Voice::Secondary),
            "aux" | "auxiliary" => Ok(Voice::Auxiliary),
            _ => Err(self.bad(word)),
        }
    }

    /// Optional trailing `all`.
    fn all(&self) -> Result<bool, TranslateError> {
        match self.words().next() {
            None => Ok(false),
            Some("all") => Ok(true),
            Some(other) => Err(self.bad(other)),
        }
    }

    fn count_and_all(&self) -> Result<(usize, bool), TranslateError> {
        let mut words = self.words();
        let count = match words.next() {
            None => 1,
            Some(word) => match word.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(self.bad(word)),
            },
        };
        let all = match words.next() {
            None => false,
            Some("all") => true,
            Some(other) => return Err(self.bad(other)),
        };
        Ok((count, all))
    }

    fn pair(&self) -> Result<(usize, usize), TranslateError> {
        let mut words = self.words();
        let mut next = || -> Result<usize, TranslateError> {
            let word = words.next().ok_or_else(|| self.missing())?;
            word.parse().map_err(|_| self.bad(word))
        };
        Ok((next()?, next()?))
    }

    fn selection_mode(&self) -> Result<SelectionMode, TranslateError> {
        let word = self.first()?;
        match word {
            "normal" => Ok(SelectionMode::Normal),
            "measures" => Ok(SelectionMode::WholeMeasures),
            "staffs" => Ok(SelectionMode::WholeStaffs),
            _ => Err(self.bad(word)),
        }
    }

    fn input_mode(&self) -> Result<InputMode, TranslateError> {
        let word = self.first()?;
        match word {
            "insert" => Ok(InputMode::Insert),
            "edit" => Ok(InputMode::Edit),
            _ => Err(self.bad(word)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr(line: &str) -> Action {
        match ScriptTranslator::translate(line) {
            Ok(Some(action)) => action,
            other => panic!("expected an action for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(ScriptTranslator::translate("   "), Ok(None));
        assert_eq!(ScriptTranslator::translate("# heading"), Ok(None));
    }

    #[test]
    fn note_letters_map_to_classes() {
        assert_eq!(tr("note c"), Action::Edit(EditKind::Note(0)));
        assert_eq!(tr("note B"), Action::Edit(EditKind::Note(6)));
        assert_eq!(tr("shift a"), Action::Motion(Motion::ShiftToNote(5)));
    }

    #[test]
    fn ordinals_are_one_based() {
        assert_eq!(tr("goto 3"), Action::Motion(Motion::Goto(2)));
        assert_eq!(tr("movement 1"), Action::Structure(StructureKind::SwitchMovement(0)));
        assert_eq!(
            ScriptTranslator::translate("goto 0"),
            Err(TranslateError::BadArgument {
                command: "goto".into(),
                value: "0".into()
            })
        );
    }

    #[test]
    fn fractions_and_keys() {
        assert_eq!(
            tr("time 6/8"),
            Action::Edit(EditKind::TimeSig {
                numerator: 6,
                denominator: 8
            })
        );
        assert_eq!(
            tr("tuplet 2/3"),
            Action::Edit(EditKind::TupletOpen {
                numerator: 2,
                denominator: 3
            })
        );
        assert_eq!(
            tr("key -3 minor"),
            Action::Edit(EditKind::KeySig {
                sharps: -3,
                minor: true
            })
        );
        assert!(ScriptTranslator::translate("time 3").is_err());
        assert!(ScriptTranslator::translate("key 9").is_err());
    }

    #[test]
    fn optional_all_and_counts() {
        assert_eq!(
            tr("measure-after"),
            Action::Structure(StructureKind::MeasureAfter { all: false })
        );
        assert_eq!(
            tr("measure-after all"),
            Action::Structure(StructureKind::MeasureAfter { all: true })
        );
        assert_eq!(
            tr("append-measures 3 all"),
            Action::Structure(StructureKind::AppendMeasures { count: 3, all: true })
        );
        assert_eq!(
            tr("append-measures"),
            Action::Structure(StructureKind::AppendMeasures {
                count: 1,
                all: false
            })
        );
    }

    #[test]
    fn text_arguments_keep_the_rest_of_the_line() {
        assert_eq!(tr("lyric  la la "), Action::Edit(EditKind::Lyric("la la".into())));
        assert_eq!(
            ScriptTranslator::translate("dynamic"),
            Err(TranslateError::MissingArgument {
                command: "dynamic".into()
            })
        );
    }

    #[test]
    fn clipboard_addresses_are_zero_based() {
        assert_eq!(
            tr("clip-insert 0 2"),
            Action::Clipboard(ClipKind::InsertObject { staff: 0, index: 2 })
        );
        assert!(ScriptTranslator::translate("clip-insert 0").is_err());
    }

    #[test]
    fn clef_names_match_the_text_dump() {
        assert_eq!(tr("clef bass"), Action::Edit(EditKind::Clef(ClefType::Bass)));
        assert_eq!(
            tr("clef treble_8"),
            Action::Edit(EditKind::Clef(ClefType::TrebleOctaveDown))
        );
        assert_eq!(
            ScriptTranslator::translate("clef treble8"),
            Err(TranslateError::BadArgument {
                command: "clef".into(),
                value: "treble8".into()
            })
        );
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            ScriptTranslator::translate("frobnicate 3"),
            Err(TranslateError::Unknown("frobnicate".into()))
        );
    }
}
