//! Dirty measure tracking.
//!
//! Edits record `(staff, from_measure)`: layout of that staff must be redone
//! from the measure onwards, since key and clef changes carry forward.
//! Duplicate and overlapping marks collapse on `take`.
//!
//! Invariants:
//! * `take` returns at most one entry per staff, sorted by staff, holding the
//!   earliest measure marked for it.
//! * After `take`, internal storage is cleared (one-shot consumption).

#[derive(Debug, Default)]
pub struct DirtyMeasures {
    marks: Vec<(usize, usize)>,
    all: bool,
}

impl DirtyMeasures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, staff: usize, from_measure: usize) {
        self.marks.push((staff, from_measure));
    }

    /// Everything needs layout (structural edits, snapshot restores).
    pub fn mark_all(&mut self) {
        self.all = true;
    }

    /// Consume the marks; `None` means the whole movement is dirty.
    pub fn take(&mut self) -> Option<Vec<(usize, usize)>> {
        if std::mem::take(&mut self.all) {
            self.marks.clear();
            return None;
        }
        let mut v: Vec<(usize, usize)> = self.marks.drain(..).collect();
        v.sort_unstable();
        v.dedup_by_key(|(staff, _)| *staff);
        Some(v)
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.marks.is_empty()
    }

    pub fn clear(&mut self) {
        self.marks.clear();
        self.all = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_earliest_measure_per_staff() {
        let mut t = DirtyMeasures::new();
        t.mark(1, 4);
        t.mark(0, 2);
        t.mark(1, 3);
        assert_eq!(t.take(), Some(vec![(0, 2), (1, 3)]));
        assert!(t.is_empty());
    }

    #[test]
    fn mark_all_supersedes_marks() {
        let mut t = DirtyMeasures::new();
        t.mark(0, 1);
        t.mark(2, 1);
        t.mark_all();
        assert_eq!(t.take(), None);
        assert_eq!(t.take(), Some(Vec::new()));
    }

    #[test]
    fn empty_after_clear() {
        let mut t = DirtyMeasures::new();
        t.mark(0, 42);
        t.mark_all();
        t.clear();
        assert!(t.is_empty());
    }
}
