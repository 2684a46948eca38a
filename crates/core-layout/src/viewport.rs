//! Horizontal viewport over measure columns.
//!
//! `first_measure` is the leftmost visible column and `width` the pixels
//! available. Columns use the movement's shared `measure_widths`. Whenever
//! `first_measure` changes every staff's leftmost-context cache is refreshed.

use core_score::Movement;
use tracing::debug;

use crate::context::refresh_leftmost;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_measure: usize,
    pub width: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0, 1200)
    }
}

impl Viewport {
    pub fn new(first_measure: usize, width: u32) -> Self {
        Self {
            first_measure,
            width,
        }
    }

    /// Last column at least partially visible.
    pub fn last_visible(&self, widths: &[u32]) -> usize {
        let mut used = 0u32;
        let mut last = self.first_measure;
        for (idx, w) in widths.iter().enumerate().skip(self.first_measure) {
            last = idx;
            used = used.saturating_add(*w);
            if used >= self.width {
                break;
            }
        }
        last
    }

    /// Scroll to `first`, clamped to the movement, refreshing leftmost
    /// contexts when it changes. Returns true on change.
    pub fn scroll_to(&mut self, movement: &mut Movement, first: usize) -> bool {
        let first = first.min(movement.max_measure_count().saturating_sub(1));
        if first == self.first_measure {
            return false;
        }
        self.first_measure = first;
        refresh_leftmost(movement, first);
        debug!(target: "layout.engine", first_measure = first, "viewport_scrolled");
        true
    }

    /// Scroll by whole columns so `cursor_measure` is visible. A column wider
    /// than the viewport becomes the leftmost one.
    pub fn clamp_cursor_into_view(&mut self, movement: &mut Movement, cursor_measure: usize) -> bool {
        if cursor_measure < self.first_measure {
            return self.scroll_to(movement, cursor_measure);
        }
        let widths = movement.measure_widths.clone();
        if cursor_measure <= self.last_visible(&widths) && self.fits(&widths, cursor_measure) {
            return false;
        }
        let mut first = cursor_measure;
        let mut used = widths.get(cursor_measure).copied().unwrap_or(0);
        while first > 0 {
            let w = widths.get(first - 1).copied().unwrap_or(0);
            if used.saturating_add(w) > self.width {
                break;
            }
            used += w;
            first -= 1;
        }
        self.scroll_to(movement, first)
    }

    fn fits(&self, widths: &[u32], measure: usize) -> bool {
        let span: u32 = widths
            .iter()
            .take(measure + 1)
            .skip(self.first_measure)
            .sum();
        span <= self.width || measure == self.first_measure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_visible_counts_columns() {
        let vp = Viewport::new(1, 300);
        assert_eq!(vp.last_visible(&[100, 100, 100, 100, 100]), 3);
    }

    #[test]
    fn scrolls_right_to_show_cursor() {
        let mut m = Movement::new(1, 10);
        let mut vp = Viewport::new(0, 480);
        assert!(!vp.clamp_cursor_into_view(&mut m, 2));
        assert!(vp.clamp_cursor_into_view(&mut m, 5));
        assert_eq!(vp.first_measure, 3);
        assert!(vp.clamp_cursor_into_view(&mut m, 1));
        assert_eq!(vp.first_measure, 1);
    }

    #[test]
    fn scroll_is_clamped_to_movement() {
        let mut m = Movement::new(1, 3);
        let mut vp = Viewport::default();
        assert!(vp.scroll_to(&mut m, 99));
        assert_eq!(vp.first_measure, 2);
        assert!(!vp.scroll_to(&mut m, 2));
    }
}
