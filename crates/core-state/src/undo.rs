//! Undo and redo of score mutations.
//!
//! Every primitive mutation is logged as the record needed to reverse it.
//! Replaying a record applies that inverse and moves the flipped record to
//! the other queue. `StageStart`/`StageEnd` brackets make a user command
//! undo as one step; a stage whose command failed is reverted on the spot
//! and leaves no trace. A record that no longer fits the live score drops
//! both queues.

use std::collections::VecDeque;

use core_score::{Measure, Movement, MusicalObject, Score, ScoreError};
use tracing::{error, trace};

/// Maximum number of undoable steps (records or staged groups) retained.
pub const UNDO_HISTORY_MAX: usize = 200;

/// Where a recorded mutation happened; also the cursor to restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UndoPosition {
    pub movement: usize,
    pub staff: usize,
    pub measure: usize,
    pub object: usize,
    pub appending: bool,
}

/// A mutation that has been performed. Replaying a record applies its
/// inverse and yields the record describing that inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// The object was inserted at the position.
    Insert(MusicalObject),
    /// The object was deleted from the position.
    Delete(MusicalObject),
    /// The object at the position replaced this one.
    Change(MusicalObject),
    /// An empty measure was created at the position.
    MeasureCreate,
    /// This measure was removed from the position.
    MeasureRemove(Measure),
    /// The whole movement as it was before a drastic edit.
    Snapshot(Box<Movement>),
    StageStart,
    StageEnd,
    ScriptError,
    NoOp,
}

impl UndoAction {
    pub fn tag(&self) -> &'static str {
        match self {
            UndoAction::Insert(_) => "insert",
            UndoAction::Delete(_) => "delete",
            UndoAction::Change(_) => "change",
            UndoAction::MeasureCreate => "measure_create",
            UndoAction::MeasureRemove(_) => "measure_remove",
            UndoAction::Snapshot(_) => "snapshot",
            UndoAction::StageStart => "stage_start",
            UndoAction::StageEnd => "stage_end",
            UndoAction::ScriptError => "script_error",
            UndoAction::NoOp => "no_op",
        }
    }

    fn is_marker(&self) -> bool {
        matches!(self, UndoAction::ScriptError | UndoAction::NoOp)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoRecord {
    pub action: UndoAction,
    pub position: UndoPosition,
}

impl UndoRecord {
    pub fn new(action: UndoAction, position: UndoPosition) -> Self {
        Self { action, position }
    }
}

#[derive(Debug)]
pub struct UndoEngine {
    undo_queue: VecDeque<UndoRecord>,
    redo_queue: VecDeque<UndoRecord>,
    /// Non-zero while mutations must not be logged.
    undo_guard: u32,
    /// Nesting depth of open stages.
    undo_level: u32,
    /// A new edit happened since the redo queue was last written.
    redo_invalid: bool,
    /// `redo_invalid` as it was when the outermost stage opened.
    redo_invalid_at_stage: bool,
    history_max: usize,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new(UNDO_HISTORY_MAX)
    }
}

impl UndoEngine {
    pub fn new(history_max: usize) -> Self {
        Self {
            undo_queue: VecDeque::new(),
            redo_queue: VecDeque::new(),
            undo_guard: 0,
            undo_level: 0,
            redo_invalid: false,
            redo_invalid_at_stage: false,
            history_max: history_max.max(1),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_queue.len()
    }

    /// Records available to redo; zero once a new edit invalidated them.
    pub fn redo_depth(&self) -> usize {
        if self.redo_invalid {
            0
        } else {
            self.redo_queue.len()
        }
    }

    pub fn level(&self) -> u32 {
        self.undo_level
    }

    pub fn is_guarded(&self) -> bool {
        self.undo_guard > 0
    }

    pub fn raise_guard(&mut self) {
        self.undo_guard += 1;
    }

    pub fn lower_guard(&mut self) {
        self.undo_guard = self.undo_guard.saturating_sub(1);
    }

    /// Log a performed mutation.
    pub fn record(&mut self, record: UndoRecord) {
        if self.is_guarded() {
            return;
        }
        trace!(target: "state.undo", tag = record.action.tag(), staff = record.position.staff, measure = record.position.measure, object = record.position.object, "record");
        self.undo_queue.push_back(record);
        self.redo_invalid = true;
        if self.undo_level == 0 {
            self.trim();
        }
    }

    /// Mark a script failure in the history (diagnostic only).
    pub fn record_script_error(&mut self, position: UndoPosition) {
        if self.is_guarded() {
            return;
        }
        self.undo_queue
            .push_back(UndoRecord::new(UndoAction::ScriptError, position));
    }

    /// Open a staged group. Only the outermost stage writes a bracket.
    pub fn stage_start(&mut self, position: UndoPosition) {
        if self.is_guarded() {
            return;
        }
        self.undo_level += 1;
        if self.undo_level == 1 {
            self.redo_invalid_at_stage = self.redo_invalid;
            self.undo_queue
                .push_back(UndoRecord::new(UndoAction::StageStart, position));
        }
    }

    /// Close a staged group; an empty group collapses to nothing.
    pub fn stage_end(&mut self, position: UndoPosition) {
        if self.is_guarded() || self.undo_level == 0 {
            return;
        }
        self.undo_level -= 1;
        if self.undo_level > 0 {
            return;
        }
        if matches!(
            self.undo_queue.back().map(|r| &r.action),
            Some(UndoAction::StageStart)
        ) {
            self.undo_queue.pop_back();
            trace!(target: "state.undo", "empty_stage_collapsed");
            return;
        }
        self.undo_queue
            .push_back(UndoRecord::new(UndoAction::StageEnd, position));
        self.trim();
    }

    /// Close the outermost stage by reverting everything recorded since it
    /// opened. Nothing reaches the redo queue. Returns the number of records
    /// reverted, or `None` when no outermost stage is open or a record could
    /// not be reverted.
    pub fn abort_stage(&mut self, score: &mut Score, cursor: &mut UndoPosition) -> Option<usize> {
        if self.is_guarded() || self.undo_level != 1 {
            return None;
        }
        self.undo_level = 0;
        let mut reverted = 0usize;
        while let Some(UndoRecord { action, position }) = self.undo_queue.pop_back() {
            match action {
                UndoAction::StageStart => {
                    self.redo_invalid = self.redo_invalid_at_stage;
                    trace!(target: "state.undo", reverted, "stage_aborted");
                    return Some(reverted);
                }
                UndoAction::StageEnd | UndoAction::ScriptError | UndoAction::NoOp => {}
                action => {
                    if let Err(err) = replay(action, position, score, cursor) {
                        self.discard_after_desync(&err);
                        return None;
                    }
                    reverted += 1;
                }
            }
        }
        None
    }

    /// Undo one step (a record or a whole staged group). `cursor` enters as
    /// the live cursor and leaves as the cursor to restore.
    pub fn undo(&mut self, score: &mut Score, cursor: &mut UndoPosition) -> bool {
        if self.redo_invalid {
            self.redo_queue.clear();
            self.redo_invalid = false;
        }
        self.step(true, score, cursor)
    }

    pub fn redo(&mut self, score: &mut Score, cursor: &mut UndoPosition) -> bool {
        if self.redo_invalid {
            self.redo_queue.clear();
            self.redo_invalid = false;
            return false;
        }
        self.step(false, score, cursor)
    }

    fn step(&mut self, undo: bool, score: &mut Score, cursor: &mut UndoPosition) -> bool {
        let (src, dst) = if undo {
            (&mut self.undo_queue, &mut self.redo_queue)
        } else {
            (&mut self.redo_queue, &mut self.undo_queue)
        };
        let mut depth = 0u32;
        let mut applied = false;
        loop {
            let Some(UndoRecord { action, position }) = src.pop_back() else {
                return applied;
            };
            let mut unit_done = false;
            let flipped = match action {
                UndoAction::StageEnd => {
                    depth += 1;
                    UndoRecord::new(UndoAction::StageStart, position)
                }
                UndoAction::StageStart => {
                    depth = depth.saturating_sub(1);
                    unit_done = depth == 0;
                    UndoRecord::new(UndoAction::StageEnd, position)
                }
                marker if marker.is_marker() => UndoRecord::new(marker, position),
                action => match replay(action, position, score, cursor) {
                    Ok(flipped) => {
                        applied = true;
                        unit_done = depth == 0;
                        flipped
                    }
                    Err(err) => {
                        self.discard_after_desync(&err);
                        return false;
                    }
                },
            };
            dst.push_back(flipped);
            if unit_done {
                trace!(target: "state.undo", undo = undo, undo_depth = self.undo_queue.len(), redo_depth = self.redo_queue.len(), "step_done");
                return true;
            }
        }
    }

    fn discard_after_desync(&mut self, err: &ScoreError) {
        error!(target: "state.undo", %err, undo_depth = self.undo_queue.len(), redo_depth = self.redo_queue.len(), "undo_queue_desync");
        self.undo_queue.clear();
        self.redo_queue.clear();
        self.undo_guard = 0;
        self.undo_level = 0;
        self.redo_invalid = false;
    }

    /// Top-level units (records outside stages, or whole stages) in the undo queue.
    fn units(&self) -> usize {
        let mut depth = 0u32;
        let mut units = 0;
        for record in &self.undo_queue {
            match record.action {
                UndoAction::StageStart => {
                    if depth == 0 {
                        units += 1;
                    }
                    depth += 1;
                }
                UndoAction::StageEnd => depth = depth.saturating_sub(1),
                _ if depth == 0 => units += 1,
                _ => {}
            }
        }
        units
    }

    fn trim(&mut self) {
        let mut dropped = 0usize;
        while self.units() > self.history_max {
            let mut depth = 0u32;
            while let Some(front) = self.undo_queue.pop_front() {
                match front.action {
                    UndoAction::StageStart => depth += 1,
                    UndoAction::StageEnd => depth = depth.saturating_sub(1),
                    _ => {}
                }
                if depth == 0 {
                    break;
                }
            }
            dropped += 1;
        }
        if dropped > 0 {
            trace!(target: "state.undo", dropped, "undo_queue_trimmed");
        }
    }

    pub fn clear(&mut self) {
        self.undo_queue.clear();
        self.redo_queue.clear();
        self.undo_level = 0;
        self.redo_invalid = false;
    }

    /// Read-only dump of the undo queue, oldest first.
    pub fn undo_log(&self) -> Vec<(&'static str, UndoPosition)> {
        self.undo_queue
            .iter()
            .map(|r| (r.action.tag(), r.position))
            .collect()
    }
}

/// Apply the inverse of `action` and return the record describing it.
fn replay(
    action: UndoAction,
    pos: UndoPosition,
    score: &mut Score,
    cursor: &mut UndoPosition,
) -> Result<UndoRecord, ScoreError> {
    if let UndoAction::Snapshot(stored) = action {
        let live = score.replace_movement(pos.movement, *stored)?;
        let flipped = UndoRecord::new(UndoAction::Snapshot(Box::new(live)), *cursor);
        *cursor = pos;
        return Ok(flipped);
    }
    let movement = score.movement_mut(pos.movement)?;
    let inverse = match action {
        UndoAction::Insert(expected) => {
            let live = movement.object(pos.staff, pos.measure, pos.object)?;
            if live.object_type() != expected.object_type() {
                return Err(ScoreError::NoSuchObject {
                    staff: pos.staff,
                    measure: pos.measure,
                    object: pos.object,
                });
            }
            UndoAction::Delete(movement.remove_object(pos.staff, pos.measure, pos.object)?)
        }
        UndoAction::Delete(object) => {
            movement.insert_object(pos.staff, pos.measure, pos.object, object.clone())?;
            UndoAction::Insert(object)
        }
        UndoAction::Change(object) => {
            UndoAction::Change(movement.replace_object(pos.staff, pos.measure, pos.object, object)?)
        }
        UndoAction::MeasureCreate => {
            UndoAction::MeasureRemove(movement.take_measure(pos.staff, pos.measure)?)
        }
        UndoAction::MeasureRemove(measure) => {
            movement.put_measure(pos.staff, pos.measure, measure)?;
            UndoAction::MeasureCreate
        }
        other => other,
    };
    *cursor = pos;
    Ok(UndoRecord::new(inverse, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_score::{Chord, MusicalObject};
    use pretty_assertions::assert_eq;

    fn at(measure: usize, object: usize) -> UndoPosition {
        UndoPosition {
            measure,
            object,
            ..UndoPosition::default()
        }
    }

    fn note(offset: i32) -> MusicalObject {
        MusicalObject::chord(Chord::with_note(2, 0, offset, 0))
    }

    fn insert(score: &mut Score, engine: &mut UndoEngine, object: usize, offset: i32) {
        let mv = score.movement_mut(0).unwrap();
        mv.insert_object(0, 0, object, note(offset)).unwrap();
        engine.record(UndoRecord::new(UndoAction::Insert(note(offset)), at(0, object)));
    }

    #[test]
    fn insert_undo_redo_round_trip() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        insert(&mut score, &mut engine, 0, 0);
        insert(&mut score, &mut engine, 1, 2);
        let after = score.clone();
        let mut cursor = UndoPosition::default();
        assert!(engine.undo(&mut score, &mut cursor));
        assert!(engine.undo(&mut score, &mut cursor));
        assert!(!engine.undo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap().measure(0, 0).unwrap().len(), 0);
        assert!(engine.redo(&mut score, &mut cursor));
        assert!(engine.redo(&mut score, &mut cursor));
        assert_eq!(score, after);
        assert_eq!(cursor, at(0, 1));
    }

    #[test]
    fn stage_undoes_atomically_and_empty_stage_collapses() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        engine.stage_start(at(0, 0));
        engine.stage_end(at(0, 0));
        assert_eq!(engine.undo_depth(), 0);
        engine.stage_start(at(0, 0));
        insert(&mut score, &mut engine, 0, 0);
        engine.stage_start(at(0, 0));
        insert(&mut score, &mut engine, 1, 1);
        engine.stage_end(at(0, 0));
        insert(&mut score, &mut engine, 2, 2);
        engine.stage_end(at(0, 0));
        let tags: Vec<&str> = engine.undo_log().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec!["stage_start", "insert", "insert", "insert", "stage_end"]);
        let mut cursor = UndoPosition::default();
        assert!(engine.undo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap().measure(0, 0).unwrap().len(), 0);
        assert_eq!(engine.redo_depth(), 5);
        assert!(engine.redo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap().measure(0, 0).unwrap().len(), 3);
    }

    #[test]
    fn new_edit_invalidates_redo() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        insert(&mut score, &mut engine, 0, 0);
        let mut cursor = UndoPosition::default();
        assert!(engine.undo(&mut score, &mut cursor));
        assert_eq!(engine.redo_depth(), 1);
        insert(&mut score, &mut engine, 0, 4);
        assert_eq!(engine.redo_depth(), 0);
        assert!(!engine.redo(&mut score, &mut cursor));
    }

    #[test]
    fn guard_suppresses_logging() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        engine.raise_guard();
        insert(&mut score, &mut engine, 0, 0);
        engine.lower_guard();
        assert_eq!(engine.undo_depth(), 0);
    }

    #[test]
    fn desync_discards_both_queues() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        insert(&mut score, &mut engine, 0, 0);
        insert(&mut score, &mut engine, 1, 1);
        score.movement_mut(0).unwrap().remove_object(0, 0, 1).unwrap();
        let mut cursor = UndoPosition::default();
        assert!(!engine.undo(&mut score, &mut cursor));
        assert_eq!(engine.undo_depth(), 0);
        assert_eq!(engine.redo_depth(), 0);
    }

    #[test]
    fn history_trims_whole_groups() {
        let mut score = Score::default();
        let mut engine = UndoEngine::new(2);
        engine.stage_start(at(0, 0));
        insert(&mut score, &mut engine, 0, 0);
        insert(&mut score, &mut engine, 1, 1);
        engine.stage_end(at(0, 0));
        insert(&mut score, &mut engine, 2, 2);
        insert(&mut score, &mut engine, 3, 3);
        let tags: Vec<&str> = engine.undo_log().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec!["insert", "insert"]);
    }

    #[test]
    fn aborted_stage_reverts_without_touching_redo() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        insert(&mut score, &mut engine, 0, 0);
        let mut cursor = UndoPosition::default();
        assert!(engine.undo(&mut score, &mut cursor));
        let before = score.clone();

        engine.stage_start(at(0, 0));
        insert(&mut score, &mut engine, 0, 3);
        insert(&mut score, &mut engine, 1, 4);
        assert_eq!(engine.redo_depth(), 0);
        assert_eq!(engine.abort_stage(&mut score, &mut cursor), Some(2));

        assert_eq!(score, before);
        assert_eq!(engine.undo_depth(), 0);
        assert_eq!(engine.level(), 0);
        assert_eq!(engine.redo_depth(), 1);
        assert!(engine.redo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap().measure(0, 0).unwrap().len(), 1);
    }

    #[test]
    fn abort_needs_an_open_outermost_stage() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        let mut cursor = UndoPosition::default();
        assert_eq!(engine.abort_stage(&mut score, &mut cursor), None);
        engine.stage_start(at(0, 0));
        engine.stage_start(at(0, 0));
        assert_eq!(engine.abort_stage(&mut score, &mut cursor), None);
        engine.stage_end(at(0, 0));
        assert_eq!(engine.abort_stage(&mut score, &mut cursor), Some(0));
        assert!(engine.undo_log().is_empty());
    }

    #[test]
    fn snapshot_swaps_movement_both_ways() {
        let mut score = Score::default();
        let mut engine = UndoEngine::default();
        let before = score.movement(0).unwrap().clone();
        engine.record(UndoRecord::new(UndoAction::Snapshot(Box::new(before.clone())), at(0, 0)));
        score.movement_mut(0).unwrap().insert_object(0, 0, 0, note(0)).unwrap();
        let after = score.movement(0).unwrap().clone();
        let mut cursor = at(0, 1);
        assert!(engine.undo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap(), &before);
        assert_eq!(cursor, at(0, 0));
        assert!(engine.redo(&mut score, &mut cursor));
        assert_eq!(score.movement(0).unwrap(), &after);
        assert_eq!(cursor, at(0, 1));
    }
}
