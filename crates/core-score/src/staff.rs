//! Staffs: ordered measure sequences plus per-staff context.

use crate::measure::Measure;
use crate::pitch::{Clef, KeySig, StemDirection, TimeSig};

/// Role of a staff within the visual system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    Primary,
    /// Second voice drawn on the preceding primary staff.
    Secondary,
    /// Lyrics, figures or chord symbols.
    Auxiliary,
}

impl Voice {
    pub fn number(self) -> u8 {
        match self {
            Voice::Primary => 1,
            Voice::Secondary => 2,
            Voice::Auxiliary => 3,
        }
    }
}

/// Clef, key, time and stem state in force at some point of a staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaffContext {
    pub clef: Clef,
    pub keysig: KeySig,
    pub timesig: TimeSig,
    pub stem: StemDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staff {
    pub name: String,
    pub voice: Voice,
    /// Context at the very start of the staff.
    pub initial: StaffContext,
    /// Context as of the leftmost visible measure; refreshed by the resolver.
    pub leftmost: StaffContext,
    /// A parasite staff mirrors the measures of its host.
    pub host: Option<usize>,
    measures: Vec<Measure>,
}

impl Staff {
    /// A staff with `measure_count` empty measures (at least one).
    pub fn new(name: impl Into<String>, voice: Voice, measure_count: usize) -> Self {
        Self {
            name: name.into(),
            voice,
            initial: StaffContext::default(),
            leftmost: StaffContext::default(),
            host: None,
            measures: vec![Measure::new(); measure_count.max(1)],
        }
    }

    pub fn with_context(mut self, context: StaffContext) -> Self {
        self.initial = context;
        self.leftmost = context;
        self
    }

    pub fn is_parasite(&self) -> bool {
        self.host.is_some()
    }

    pub fn measures(&self) -> &[Measure] {
        &self.measures
    }

    pub fn measures_mut(&mut self) -> &mut [Measure] {
        &mut self.measures
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn measure(&self, idx: usize) -> Option<&Measure> {
        self.measures.get(idx)
    }

    pub fn measure_mut(&mut self, idx: usize) -> Option<&mut Measure> {
        self.measures.get_mut(idx)
    }

    pub(crate) fn insert_empty(&mut self, at: usize, count: usize) {
        let at = at.min(self.measures.len());
        self.measures
            .splice(at..at, std::iter::repeat_with(Measure::new).take(count));
    }

    /// Raw removal; may leave the staff without measures. Structural callers
    /// restore the one-measure minimum themselves.
    pub(crate) fn take(&mut self, at: usize) -> Option<Measure> {
        if at < self.measures.len() {
            Some(self.measures.remove(at))
        } else {
            None
        }
    }

    pub(crate) fn put(&mut self, at: usize, measure: Measure) {
        let at = at.min(self.measures.len());
        self.measures.insert(at, measure);
    }

    pub(crate) fn mirror(&mut self, measures: &[Measure]) {
        self.measures = measures.to_vec();
    }
}
