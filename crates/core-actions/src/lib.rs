//! core-actions: user commands as data, and the dispatcher that applies them.
//!
//! An [`Action`] is one user-level command. Front ends produce actions (the
//! [`translator`] turns script lines into them) and hand them to
//! [`dispatcher::dispatch`], which runs them against an
//! [`core_state::EditorSession`] and reports a [`dispatcher::DispatchResult`]
//! instead of talking to the user directly.

use core_score::{BarlineKind, ClefType, StemDirection, Voice};
use core_state::{InputMode, SelectionMode};

pub mod dispatcher;
pub mod options;
pub mod translator;

pub use dispatcher::{DispatchResult, dispatch};
pub use options::{layout_engine, session_from_config, session_options, standard_widths};
pub use translator::{ScriptTranslator, TranslateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    StaffUp,
    StaffDown,
    /// Diatonic step of the pitch cursor.
    PitchUp,
    PitchDown,
    NextMeasure,
    PrevMeasure,
    Home,
    End,
    /// 0-based measure index.
    Goto(usize),
    /// Nearest pitch of letter class 0 (C) ..= 6 (B).
    ShiftToNote(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditKind {
    /// Letter class 0 (C) ..= 6 (B).
    Note(usize),
    Rest,
    Midi(u8),
    AddNote,
    RemoveNote,
    Sharpen,
    Flatten,
    /// Duration code for the next chord entered.
    SetDuration(i32),
    /// Duration code applied to the current chord.
    ChangeDuration(i32),
    AddDot,
    RemoveDot,
    ToggleTie,
    ToggleSlurBegin,
    ToggleSlurEnd,
    ToggleGrace,
    Clef(ClefType),
    KeySig { sharps: i8, minor: bool },
    TimeSig { numerator: u32, denominator: u32 },
    Stem(StemDirection),
    TupletOpen { numerator: u32, denominator: u32 },
    TupletClose,
    GraceStart,
    GraceEnd,
    Barline(BarlineKind),
    Dynamic(String),
    Lyric(String),
    Figure(String),
    Directive(String),
    DeleteObject,
    DeletePrevious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    MeasureBefore { all: bool },
    MeasureAfter { all: bool },
    AppendMeasures { count: usize, all: bool },
    DeleteMeasure { all: bool },
    StaffBefore(Voice),
    StaffAfter(Voice),
    DeleteStaff,
    DeleteStaffAbove,
    DeleteStaffBelow,
    AddParasite,
    NewMovement,
    /// 0-based movement index.
    SwitchMovement(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipKind {
    SetMark,
    UnsetMark,
    SelectMeasure,
    SelectAll,
    SelectionMode(SelectionMode),
    Copy,
    Cut,
    Paste,
    Push,
    Pop,
    InsertObject { staff: usize, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Motion(Motion),
    Edit(EditKind),
    Structure(StructureKind),
    Clipboard(ClipKind),
    InputMode(InputMode),
    Undo,
    Redo,
    /// Text dump of the score.
    Print,
    /// Tags and positions of the undo queue.
    UndoLog,
    Quit,
}

impl Action {
    /// Whether the action may change the score.
    pub fn is_mutating(&self) -> bool {
        match self {
            Action::Edit(kind) => !matches!(kind, EditKind::SetDuration(_)),
            Action::Structure(StructureKind::SwitchMovement(_)) => false,
            Action::Structure(_) => true,
            Action::Clipboard(kind) => matches!(
                kind,
                ClipKind::Cut | ClipKind::Paste | ClipKind::InsertObject { .. }
            ),
            Action::Undo | Action::Redo => true,
            _ => false,
        }
    }
}

/// Notified before each action is dispatched. Must not block.
pub trait ActionObserver: Send + Sync {
    fn on_action(&self, action: &Action);
}
