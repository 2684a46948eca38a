//! Movements and the score: the staff list and every structural edit that
//! must keep staff lengths and the shared measure-width array consistent.
//!
//! Edits addressed to a parasite staff act on its host (the storage staff);
//! mirrors are re-synced before any structural call returns, and
//! `measure_widths` is reconciled so its length never drops below the longest
//! staff.

use tracing::{debug, trace};

use crate::ScoreError;
use crate::measure::Measure;
use crate::object::MusicalObject;
use crate::staff::{Staff, Voice};

/// Default width of a freshly created measure column, in pixels.
pub const DEFAULT_MEASURE_WIDTH: u32 = 160;

/// Which staffs a measure-level structural edit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureScope {
    Staff(usize),
    /// Every non-parasite staff currently as long as the longest staff.
    AllStaffs,
}

/// Outcome of [`Movement::remove_measures`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureRemoval {
    /// `(storage staff, position, measure)` in removal order.
    pub removed: Vec<(usize, usize, Measure)>,
    /// Storage staffs that received a substitute empty measure at index 0.
    pub substituted: Vec<usize>,
    /// Measure the cursor should land on afterwards.
    pub cursor_measure: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    staffs: Vec<Staff>,
    /// One width per measure column, shared by every staff.
    pub measure_widths: Vec<u32>,
    pub default_measure_width: u32,
}

impl Default for Movement {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Movement {
    /// `staff_count` primary staffs (at least one) of `measure_count` measures.
    pub fn new(staff_count: usize, measure_count: usize) -> Self {
        let staffs = (0..staff_count.max(1))
            .map(|i| Staff::new(format!("Staff {}", i + 1), Voice::Primary, measure_count))
            .collect();
        Self::from_staffs(staffs)
    }

    pub fn from_staffs(staffs: Vec<Staff>) -> Self {
        let mut movement = Self {
            staffs,
            measure_widths: Vec::new(),
            default_measure_width: DEFAULT_MEASURE_WIDTH,
        };
        if movement.staffs.is_empty() {
            movement
                .staffs
                .push(Staff::new("Staff 1", Voice::Primary, 1));
        }
        movement.reconcile_widths();
        movement
    }

    pub fn staffs(&self) -> &[Staff] {
        &self.staffs
    }

    pub fn staff_count(&self) -> usize {
        self.staffs.len()
    }

    pub fn staff(&self, idx: usize) -> Result<&Staff, ScoreError> {
        self.staffs.get(idx).ok_or(ScoreError::NoSuchStaff(idx))
    }

    /// Metadata access (name, contexts). Measure content of a parasite is
    /// overwritten on the next resync; mutate through the storage staff.
    pub fn staff_mut(&mut self, idx: usize) -> Result<&mut Staff, ScoreError> {
        self.staffs.get_mut(idx).ok_or(ScoreError::NoSuchStaff(idx))
    }

    /// Index of the staff that owns the measures shown on `staff`.
    pub fn storage_staff(&self, staff: usize) -> usize {
        match self.staffs.get(staff).and_then(|s| s.host) {
            Some(host) if host < self.staffs.len() => host,
            _ => staff,
        }
    }

    pub fn max_measure_count(&self) -> usize {
        self.staffs
            .iter()
            .map(Staff::measure_count)
            .max()
            .unwrap_or(0)
    }

    pub fn measure(&self, staff: usize, measure: usize) -> Result<&Measure, ScoreError> {
        self.staff(staff)?
            .measure(measure)
            .ok_or(ScoreError::NoSuchMeasure { staff, measure })
    }

    /// Mutable measure of the storage staff behind `staff`. Callers resync
    /// parasites after they are done.
    pub fn measure_mut(&mut self, staff: usize, measure: usize) -> Result<&mut Measure, ScoreError> {
        let storage = self.storage_staff(staff);
        self.staffs
            .get_mut(storage)
            .ok_or(ScoreError::NoSuchStaff(staff))?
            .measure_mut(measure)
            .ok_or(ScoreError::NoSuchMeasure { staff, measure })
    }

    pub fn object(
        &self,
        staff: usize,
        measure: usize,
        object: usize,
    ) -> Result<&MusicalObject, ScoreError> {
        self.measure(staff, measure)?
            .get(object)
            .ok_or(ScoreError::NoSuchObject {
                staff,
                measure,
                object,
            })
    }

    /// Insert an object; returns the index it landed on (clamped to the end).
    pub fn insert_object(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
        object: MusicalObject,
    ) -> Result<usize, ScoreError> {
        let idx = self.measure_mut(staff, measure)?.insert(at, object);
        self.resync_parasites();
        Ok(idx)
    }

    pub fn remove_object(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
    ) -> Result<MusicalObject, ScoreError> {
        let removed = self
            .measure_mut(staff, measure)?
            .remove(at)
            .ok_or(ScoreError::NoSuchObject {
                staff,
                measure,
                object: at,
            })?;
        self.resync_parasites();
        Ok(removed)
    }

    /// Swap in `object`, returning the previous occupant.
    pub fn replace_object(
        &mut self,
        staff: usize,
        measure: usize,
        at: usize,
        object: MusicalObject,
    ) -> Result<MusicalObject, ScoreError> {
        let old = self
            .measure_mut(staff, measure)?
            .replace(at, object)
            .ok_or(ScoreError::NoSuchObject {
                staff,
                measure,
                object: at,
            })?;
        self.resync_parasites();
        Ok(old)
    }

    fn scoped_staffs(&self, scope: MeasureScope) -> Result<Vec<usize>, ScoreError> {
        match scope {
            MeasureScope::Staff(idx) => {
                self.staff(idx)?;
                Ok(vec![self.storage_staff(idx)])
            }
            MeasureScope::AllStaffs => {
                let max = self.max_measure_count();
                Ok(self
                    .staffs
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.is_parasite() && s.measure_count() == max)
                    .map(|(i, _)| i)
                    .collect())
            }
        }
    }

    /// Insert `count` empty measures at position `at` (0-based; `len` appends).
    /// Returns the storage staffs that received them.
    pub fn insert_measures(
        &mut self,
        scope: MeasureScope,
        at: usize,
        count: usize,
    ) -> Result<Vec<usize>, ScoreError> {
        let targets = self.scoped_staffs(scope)?;
        if count == 0 {
            return Ok(targets);
        }
        for &idx in &targets {
            self.staffs[idx].insert_empty(at, count);
        }
        self.resync_parasites();
        self.reconcile_widths();
        debug!(target: "score.structure", at, count, staffs = targets.len(), "measures_inserted");
        Ok(targets)
    }

    /// Remove `count` measures starting at `at`.
    ///
    /// Fails without touching anything when a targeted staff lacks the range.
    /// A staff emptied by the removal receives one empty substitute measure.
    pub fn remove_measures(
        &mut self,
        scope: MeasureScope,
        at: usize,
        count: usize,
    ) -> Result<MeasureRemoval, ScoreError> {
        let targets = self.scoped_staffs(scope)?;
        if count == 0 {
            return Err(ScoreError::NotEnoughMeasures {
                at,
                count,
                available: 0,
            });
        }
        for &idx in &targets {
            let available = self.staffs[idx].measure_count().saturating_sub(at);
            if count > available {
                debug!(target: "score.structure", at, count, available, "remove_measures_rejected");
                return Err(ScoreError::NotEnoughMeasures {
                    at,
                    count,
                    available,
                });
            }
        }
        let included_last = targets
            .iter()
            .any(|&idx| at + count == self.staffs[idx].measure_count());
        let mut removal = MeasureRemoval {
            removed: Vec::with_capacity(targets.len() * count),
            substituted: Vec::new(),
            cursor_measure: at,
        };
        for &idx in &targets {
            let staff = &mut self.staffs[idx];
            for _ in 0..count {
                if let Some(m) = staff.take(at) {
                    removal.removed.push((idx, at, m));
                }
            }
            if staff.measure_count() == 0 {
                staff.put(0, Measure::new());
                removal.substituted.push(idx);
            }
        }
        self.resync_parasites();
        self.reconcile_widths();
        if included_last {
            let new_len = targets
                .iter()
                .map(|&idx| self.staffs[idx].measure_count())
                .max()
                .unwrap_or(1);
            removal.cursor_measure = new_len.saturating_sub(1);
        }
        debug!(target: "score.structure", at, count, staffs = targets.len(), cursor = removal.cursor_measure, "measures_removed");
        Ok(removal)
    }

    /// Raw measure removal used by undo replay. No minimum-length repair.
    pub fn take_measure(&mut self, staff: usize, at: usize) -> Result<Measure, ScoreError> {
        let storage = self.storage_staff(staff);
        let measure = self
            .staffs
            .get_mut(storage)
            .ok_or(ScoreError::NoSuchStaff(staff))?
            .take(at)
            .ok_or(ScoreError::NoSuchMeasure {
                staff,
                measure: at,
            })?;
        self.resync_parasites();
        self.reconcile_widths();
        Ok(measure)
    }

    /// Raw measure insertion used by undo replay.
    pub fn put_measure(&mut self, staff: usize, at: usize, measure: Measure) -> Result<(), ScoreError> {
        let storage = self.storage_staff(staff);
        let target = self
            .staffs
            .get_mut(storage)
            .ok_or(ScoreError::NoSuchStaff(staff))?;
        if at > target.measure_count() {
            return Err(ScoreError::NoSuchMeasure { staff, measure: at });
        }
        target.put(at, measure);
        self.resync_parasites();
        self.reconcile_widths();
        Ok(())
    }

    /// Insert a staff at `at`, padded to the longest staff's length.
    pub fn insert_staff(&mut self, at: usize, mut staff: Staff) -> usize {
        let at = at.min(self.staffs.len());
        let needed = self.max_measure_count();
        if staff.measure_count() < needed && !staff.is_parasite() {
            let len = staff.measure_count();
            staff.insert_empty(len, needed - len);
        }
        for s in &mut self.staffs {
            if let Some(host) = s.host.as_mut()
                && *host >= at
            {
                *host += 1;
            }
        }
        if let Some(host) = staff.host.as_mut()
            && *host >= at
        {
            *host += 1;
        }
        self.staffs.insert(at, staff);
        self.resync_parasites();
        self.reconcile_widths();
        debug!(target: "score.structure", at, staffs = self.staffs.len(), "staff_inserted");
        at
    }

    /// Remove a staff. The last remaining staff cannot be removed; parasites
    /// of the removed staff keep their current content as independent staffs.
    pub fn remove_staff(&mut self, at: usize) -> Result<Staff, ScoreError> {
        self.staff(at)?;
        if self.staffs.len() == 1 {
            return Err(ScoreError::LastStaff);
        }
        let removed = self.staffs.remove(at);
        for s in &mut self.staffs {
            match s.host {
                Some(h) if h == at => s.host = None,
                Some(h) if h > at => s.host = Some(h - 1),
                _ => {}
            }
        }
        self.resync_parasites();
        self.reconcile_widths();
        debug!(target: "score.structure", at, staffs = self.staffs.len(), "staff_removed");
        Ok(removed)
    }

    /// Add a staff mirroring `host` directly below it.
    pub fn add_parasite(&mut self, host: usize, voice: Voice) -> Result<usize, ScoreError> {
        let storage = self.storage_staff(host);
        let source = self.staff(storage)?;
        let mut staff = Staff::new(format!("{} (mirror)", source.name), voice, 0)
            .with_context(source.initial);
        staff.host = Some(storage);
        Ok(self.insert_staff(host + 1, staff))
    }

    /// Copy every host's measures onto its parasites.
    pub fn resync_parasites(&mut self) {
        for idx in 0..self.staffs.len() {
            let Some(host) = self.staffs[idx].host else {
                continue;
            };
            if host >= self.staffs.len() || host == idx {
                self.staffs[idx].host = None;
                continue;
            }
            let measures = self.staffs[host].measures().to_vec();
            self.staffs[idx].mirror(&measures);
            trace!(target: "score.structure", staff = idx, host, "parasite_resynced");
        }
    }

    /// Grow `measure_widths` to the longest staff with the default width and
    /// shrink it only down to that length.
    pub fn reconcile_widths(&mut self) {
        let needed = self.max_measure_count();
        if self.measure_widths.len() < needed {
            self.measure_widths.resize(needed, self.default_measure_width);
        } else {
            self.measure_widths.truncate(needed);
        }
    }
}

/// A score: one or more movements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    pub title: String,
    movements: Vec<Movement>,
}

impl Default for Score {
    fn default() -> Self {
        Self::new(Movement::default())
    }
}

impl Score {
    pub fn new(first: Movement) -> Self {
        Self {
            title: String::new(),
            movements: vec![first],
        }
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn movement_count(&self) -> usize {
        self.movements.len()
    }

    pub fn movement(&self, idx: usize) -> Result<&Movement, ScoreError> {
        self.movements.get(idx).ok_or(ScoreError::NoSuchMovement(idx))
    }

    pub fn movement_mut(&mut self, idx: usize) -> Result<&mut Movement, ScoreError> {
        self.movements
            .get_mut(idx)
            .ok_or(ScoreError::NoSuchMovement(idx))
    }

    /// Swap a whole movement, returning the previous one.
    pub fn replace_movement(&mut self, idx: usize, movement: Movement) -> Result<Movement, ScoreError> {
        let slot = self.movement_mut(idx)?;
        Ok(std::mem::replace(slot, movement))
    }

    /// Insert a movement with the same staff layout as movement `template`
    /// (names, voices, initial contexts) and a single empty measure.
    pub fn add_movement(&mut self, at: usize, template: usize) -> Result<usize, ScoreError> {
        let source = self.movement(template)?;
        let staffs = source
            .staffs()
            .iter()
            .map(|s| {
                let mut staff = Staff::new(s.name.clone(), s.voice, 1).with_context(s.initial);
                staff.host = s.host;
                staff
            })
            .collect();
        let mut movement = Movement::from_staffs(staffs);
        movement.default_measure_width = source.default_measure_width;
        movement.resync_parasites();
        movement.reconcile_widths();
        let at = at.min(self.movements.len());
        self.movements.insert(at, movement);
        debug!(target: "score.structure", at, movements = self.movements.len(), "movement_added");
        Ok(at)
    }

    pub fn remove_movement(&mut self, idx: usize) -> Result<Movement, ScoreError> {
        self.movement(idx)?;
        if self.movements.len() == 1 {
            return Err(ScoreError::LastMovement);
        }
        Ok(self.movements.remove(idx))
    }
}
