//! Measures: ordered object sequences (insertion order is temporal order).

use crate::duration::Ticks;
use crate::object::MusicalObject;

/// How a measure's content compares to its time-signature capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureFill {
    /// No durational content at all; never flagged.
    #[default]
    Empty,
    Complete,
    /// Short by the given number of ticks.
    Underfull(Ticks),
    /// Long by the given number of ticks.
    Overfull(Ticks),
    /// A directive waived the indicator for this measure.
    Waived,
}

/// Layout results for a whole measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasureLayout {
    pub total_ticks: Ticks,
    pub capacity: Ticks,
    pub fill: MeasureFill,
    /// Pixels the measure's content needs on this staff.
    pub required_width: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measure {
    objects: Vec<MusicalObject>,
    pub layout: MeasureLayout,
}

impl Measure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_objects(objects: Vec<MusicalObject>) -> Self {
        Self {
            objects,
            layout: MeasureLayout::default(),
        }
    }

    pub fn objects(&self) -> &[MusicalObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [MusicalObject] {
        &mut self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&MusicalObject> {
        self.objects.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut MusicalObject> {
        self.objects.get_mut(idx)
    }

    /// Insert at `idx`, clamped to the end.
    pub fn insert(&mut self, idx: usize, object: MusicalObject) -> usize {
        let at = idx.min(self.objects.len());
        self.objects.insert(at, object);
        at
    }

    pub fn push(&mut self, object: MusicalObject) {
        self.objects.push(object);
    }

    pub fn remove(&mut self, idx: usize) -> Option<MusicalObject> {
        if idx < self.objects.len() {
            Some(self.objects.remove(idx))
        } else {
            None
        }
    }

    /// Swap the object at `idx` for `object`, returning the previous one.
    pub fn replace(&mut self, idx: usize, object: MusicalObject) -> Option<MusicalObject> {
        self.objects
            .get_mut(idx)
            .map(|slot| std::mem::replace(slot, object))
    }

    /// Remove and return the objects in `range` (clamped to the measure).
    pub fn drain_range(&mut self, start: usize, end_inclusive: usize) -> Vec<MusicalObject> {
        if start >= self.objects.len() || start > end_inclusive {
            return Vec::new();
        }
        let end = end_inclusive.saturating_add(1).min(self.objects.len());
        self.objects.drain(start..end).collect()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
