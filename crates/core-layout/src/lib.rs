//! core-layout: context resolution and the incremental layout passes.
//!
//! Exposed components:
//! - `context`: backward scans for the clef/key/time/stem in force at a point
//!   plus the per-staff leftmost-context cache.
//! - `ticks`, `beams`, `accidentals`: the streaming per-measure passes.
//! - `widths`: the pixel-width query seam ([`WidthProvider`]).
//! - `engine`: [`LayoutEngine`] running the passes and fitting columns.
//! - `dirty`: which staffs need layout again, and from which measure.
//! - `viewport`: leftmost visible measure and scroll-to-cursor.

pub mod accidentals;
pub mod beams;
pub mod context;
pub mod dirty;
pub mod engine;
pub mod ticks;
pub mod viewport;
pub mod widths;

pub use context::{ContextKind, context_at, find_preceding, refresh_leftmost};
pub use dirty::DirtyMeasures;
pub use engine::{DEFAULT_STEM_MARGIN, LayoutEngine};
pub use viewport::Viewport;
pub use widths::{StandardWidths, WidthProvider};
