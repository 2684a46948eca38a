//! core-state: the editing session over a score.
//!
//! [`EditorSession`] bundles the score with the state that edits it:
//! - `cursor`: `(staff, measure, object)` with the appending flag and the
//!   diatonic pitch cursor.
//! - `selection`: mark plus point, normalized into staff/measure/object bounds.
//! - `undo`: the action log with staged brackets and movement snapshots.
//! - `clipboard` and `clip_stack`: per-staff object buffers with sentinels.
//!
//! Every mutation goes through the logged primitives in [`edit`], so the undo
//! queue always holds the chronological list of primitive changes. Commands
//! validate their preconditions first and report failures as [`EditError`];
//! navigation reports `false` at score boundaries instead.

pub mod clipboard;
pub mod cursor;
pub mod edit;
pub mod selection;
pub mod session;
pub mod undo;

pub use clipboard::{CLIPBOARD_STACK_MAX, Clipboard, ClipboardStack};
pub use cursor::Cursor;
pub use selection::{Mark, Selection, SelectionMode, SelectionModel, TO_END};
pub use session::{EditorSession, InputMode, SessionOptions};
pub use undo::{UNDO_HISTORY_MAX, UndoAction, UndoEngine, UndoPosition, UndoRecord};

use core_score::ScoreError;

/// User-level precondition failures. Nothing is mutated when one is returned
/// before the first primitive of a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error("clipboard is empty")]
    EmptyClipboard,
    #[error("clipboard stack is empty")]
    EmptyClipboardStack,
    #[error("no clipboard object {index} on staff {staff}")]
    NoClipObject { staff: usize, index: usize },
    #[error("no staff above")]
    NoStaffAbove,
    #[error("no staff below")]
    NoStaffBelow,
    #[error("no object at the cursor")]
    NoCurrentObject,
    #[error("object at the cursor is not a chord")]
    NotAChord,
    #[error("chord has no notes")]
    NoNote,
    #[error("nothing selected")]
    NothingSelected,
    #[error("invalid duration code {0}")]
    InvalidDuration(i32),
}
