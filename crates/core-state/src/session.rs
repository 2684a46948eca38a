//! The editing session: one score plus everything that edits it.
//!
//! A session owns the score, the index of the current movement, the cursor,
//! the selection, the undo engine, the clipboard and its stack, and the
//! layout engine with its dirty tracker and viewport. Several sessions can
//! coexist; nothing here is global.
//!
//! Every mutating command ends by calling [`EditorSession::relayout`], which
//! lays out what the command marked dirty, keeps the cursor in view and
//! re-normalizes cursor and selection against the new structure.

use core_layout::{DirtyMeasures, LayoutEngine, Viewport, context_at};
use core_score::{Movement, Score, StaffContext};
use tracing::{debug, info};

use crate::EditError;
use crate::clipboard::{CLIPBOARD_STACK_MAX, Clipboard, ClipboardStack};
use crate::cursor::Cursor;
use crate::selection::{SelectionMode, SelectionModel};
use crate::undo::{UNDO_HISTORY_MAX, UndoEngine, UndoPosition};

/// How note names are applied: insert a new chord, or repitch the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Insert,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub undo_history_max: usize,
    pub clipboard_stack_max: usize,
    /// Duration code given to newly entered chords.
    pub default_duration: i32,
    pub input_mode: InputMode,
    pub default_measure_width: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            undo_history_max: UNDO_HISTORY_MAX,
            clipboard_stack_max: CLIPBOARD_STACK_MAX,
            default_duration: 2,
            input_mode: InputMode::Insert,
            default_measure_width: core_score::DEFAULT_MEASURE_WIDTH,
        }
    }
}

#[derive(Debug)]
pub struct EditorSession {
    pub score: Score,
    movement: usize,
    pub cursor: Cursor,
    pub selection: SelectionModel,
    pub undo: UndoEngine,
    pub clipboard: Clipboard,
    pub clip_stack: ClipboardStack,
    pub input_mode: InputMode,
    /// Duration code used by the next chord entered.
    pub duration: i32,
    pub layout: LayoutEngine,
    pub dirty: DirtyMeasures,
    pub viewport: Viewport,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Score::default(), SessionOptions::default())
    }
}

impl EditorSession {
    pub fn new(score: Score, options: SessionOptions) -> Self {
        Self::with_layout(score, options, LayoutEngine::default())
    }

    /// Build a session around `score`, laying out every movement once.
    pub fn with_layout(mut score: Score, options: SessionOptions, layout: LayoutEngine) -> Self {
        for idx in 0..score.movement_count() {
            if let Ok(movement) = score.movement_mut(idx) {
                movement.default_measure_width = options.default_measure_width;
                movement.reconcile_widths();
                layout.layout_movement(movement);
            }
        }
        let mut session = Self {
            score,
            movement: 0,
            cursor: Cursor::default(),
            selection: SelectionModel::default(),
            undo: UndoEngine::new(options.undo_history_max),
            clipboard: Clipboard::default(),
            clip_stack: ClipboardStack::new(options.clipboard_stack_max),
            input_mode: options.input_mode,
            duration: options.default_duration,
            layout,
            dirty: DirtyMeasures::new(),
            viewport: Viewport::default(),
        };
        if let Some(movement) = session.score.movements().first() {
            session.cursor.normalize(movement);
        }
        info!(target: "state.session", movements = session.score.movement_count(), "session_opened");
        session
    }

    pub fn movement_index(&self) -> usize {
        self.movement
    }

    /// The current movement. The index is kept valid by every operation
    /// that adds, removes or switches movements.
    pub fn movement(&self) -> &Movement {
        &self.score.movements()[self.movement]
    }

    pub fn movement_mut(&mut self) -> Result<&mut Movement, EditError> {
        Ok(self.score.movement_mut(self.movement)?)
    }

    /// Context in force at the cursor.
    pub fn context_at_cursor(&self) -> StaffContext {
        context_at(
            self.movement(),
            self.cursor.staff,
            self.cursor.measure,
            self.cursor.object,
        )
    }

    /// Undo position describing the cursor.
    pub fn position(&self) -> UndoPosition {
        self.position_at(self.cursor.staff, self.cursor.measure, self.cursor.object)
    }

    pub(crate) fn position_at(&self, staff: usize, measure: usize, object: usize) -> UndoPosition {
        let appending = self
            .movement()
            .measure(staff, measure)
            .map(|m| object >= m.len())
            .unwrap_or(true);
        UndoPosition {
            movement: self.movement,
            staff,
            measure,
            object,
            appending,
        }
    }

    /// Move to a position reported by the undo engine.
    fn restore_position(&mut self, pos: UndoPosition) {
        if pos.movement < self.score.movement_count() {
            self.movement = pos.movement;
        }
        self.cursor.staff = pos.staff;
        self.cursor.measure = pos.measure;
        self.cursor.object = pos.object;
        let movement = &self.score.movements()[self.movement];
        self.cursor.normalize(movement);
    }

    /// Mark `staff` (and every staff sharing its measures) dirty from `measure`.
    pub(crate) fn mark_dirty(&mut self, staff: usize, measure: usize) {
        let movement = &self.score.movements()[self.movement];
        let storage = movement.storage_staff(staff);
        for (idx, s) in movement.staffs().iter().enumerate() {
            if idx == storage || s.host == Some(storage) {
                self.dirty.mark(idx, measure);
            }
        }
    }

    /// Lay out what is dirty, then bring cursor, selection and viewport in line.
    pub fn relayout(&mut self) {
        let Ok(movement) = self.score.movement_mut(self.movement) else {
            return;
        };
        if !self.dirty.is_empty() {
            self.layout.relayout(movement, &mut self.dirty);
        }
        self.cursor.normalize(movement);
        self.viewport
            .clamp_cursor_into_view(movement, self.cursor.measure);
        self.selection.update(&self.cursor, movement);
    }

    pub fn undo(&mut self) -> bool {
        let mut pos = self.position();
        let applied = self.undo.undo(&mut self.score, &mut pos);
        self.after_replay(applied, pos, "undo")
    }

    pub fn redo(&mut self) -> bool {
        let mut pos = self.position();
        let applied = self.undo.redo(&mut self.score, &mut pos);
        self.after_replay(applied, pos, "redo")
    }

    fn after_replay(&mut self, applied: bool, pos: UndoPosition, what: &'static str) -> bool {
        if applied {
            self.restore_position(pos);
            self.dirty.mark_all();
        } else {
            debug!(target: "state.undo", what, "nothing_to_replay");
        }
        self.relayout();
        applied
    }

    pub fn switch_movement(&mut self, idx: usize) -> Result<(), EditError> {
        self.score.movement(idx)?;
        self.movement = idx;
        self.cursor = Cursor::default();
        self.selection.unset_mark();
        self.viewport.first_measure = 0;
        self.dirty.mark_all();
        self.relayout();
        debug!(target: "state.session", movement = idx, "movement_switched");
        Ok(())
    }

    /// Append a movement with the current staff layout and switch to it.
    pub fn new_movement(&mut self) -> Result<usize, EditError> {
        let at = self
            .score
            .add_movement(self.score.movement_count(), self.movement)?;
        self.switch_movement(at)?;
        Ok(at)
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = mode;
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.selection.mode = mode;
        let movement = &self.score.movements()[self.movement];
        self.selection.update(&self.cursor, movement);
    }

    pub fn set_mark(&mut self) {
        let movement = &self.score.movements()[self.movement];
        self.selection.set_mark(&self.cursor, movement);
    }

    pub fn unset_mark(&mut self) {
        self.selection.unset_mark();
    }

    /// Select the measure under the cursor on the current staff.
    pub fn select_measure(&mut self) {
        self.selection.mode = SelectionMode::WholeMeasures;
        self.set_mark();
    }

    /// Select every measure of every staff.
    pub fn select_all(&mut self) {
        let last = self.movement().staff_count().saturating_sub(1);
        let movement = &self.score.movements()[self.movement];
        let mut anchor = self.cursor;
        anchor.staff = 0;
        let mut point = self.cursor;
        point.staff = last;
        self.selection.mode = SelectionMode::WholeStaffs;
        self.selection.set_mark(&anchor, movement);
        self.selection.update(&point, movement);
    }

    fn navigate(&mut self, step: impl FnOnce(&mut Cursor, &Movement) -> bool) -> bool {
        let Some(movement) = self.score.movements().get(self.movement) else {
            return false;
        };
        let moved = step(&mut self.cursor, movement);
        if moved {
            self.selection.update(&self.cursor, movement);
            if let Ok(movement) = self.score.movement_mut(self.movement) {
                self.viewport
                    .clamp_cursor_into_view(movement, self.cursor.measure);
            }
        }
        moved
    }

    pub fn move_left(&mut self) -> bool {
        self.navigate(Cursor::move_left)
    }

    pub fn move_right(&mut self) -> bool {
        self.navigate(Cursor::move_right)
    }

    pub fn staff_up(&mut self) -> bool {
        self.navigate(Cursor::staff_up)
    }

    pub fn staff_down(&mut self) -> bool {
        self.navigate(Cursor::staff_down)
    }

    pub fn next_measure(&mut self) -> bool {
        self.navigate(Cursor::next_measure)
    }

    pub fn prev_measure(&mut self) -> bool {
        self.navigate(Cursor::prev_measure)
    }

    pub fn home(&mut self) -> bool {
        self.navigate(Cursor::home)
    }

    pub fn end(&mut self) -> bool {
        self.navigate(Cursor::end)
    }

    /// Go to measure `measure` (0-based) on the current staff.
    pub fn goto_measure(&mut self, measure: usize) -> bool {
        self.navigate(|c, m| c.goto_measure(m, measure))
    }

    pub fn cursor_up(&mut self) {
        self.cursor.cursor_up();
    }

    pub fn cursor_down(&mut self) {
        self.cursor.cursor_down();
    }

    pub fn shift_to_note(&mut self, letter: usize) {
        self.cursor.shift_to_note(letter);
    }
}
