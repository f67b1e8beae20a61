//! Vertical and horizontal scroll state plus the visibility policies.
//!
//! Invariants kept here:
//! * `first_visible_line` stays within `[0, vertical_scroll_max]`;
//! * the vertical maximum follows the listing-size formula: `N` when the
//!   whole document fits, else `N - visible + 1`;
//! * the horizontal offset is pixel-based and never negative. There is no
//!   right-edge maximum: rows can be arbitrarily wide and the ensure policy
//!   below is what pulls the window back.

use crate::mapper::TextMetrics;
use tracing::trace;

/// Minimum plausible listing height, used while viewport metrics are
/// degenerate (before the host reports a real size). Only applies when the
/// document actually holds that many rows.
pub const DOCUMENT_IDEAL_SIZE: usize = 10;

/// Wheel notch scroll distance in lines.
pub const WHEEL_LINES_DEFAULT: usize = 3;

#[derive(Debug, Clone)]
pub struct ViewportModel {
    metrics: TextMetrics,
    width_px: u32,
    height_px: u32,
    first_visible: usize,
    horizontal_offset: u32,
    vscroll_max: usize,
}

impl ViewportModel {
    pub fn new(metrics: TextMetrics) -> Self {
        Self {
            metrics,
            width_px: 0,
            height_px: 0,
            first_visible: 0,
            horizontal_offset: 0,
            vscroll_max: 0,
        }
    }

    pub fn set_viewport_size(&mut self, width_px: u32, height_px: u32) {
        self.width_px = width_px;
        self.height_px = height_px;
    }

    pub fn set_metrics(&mut self, metrics: TextMetrics) {
        self.metrics = metrics;
    }

    pub const fn metrics(&self) -> TextMetrics {
        self.metrics
    }

    pub const fn width_px(&self) -> u32 {
        self.width_px
    }

    pub const fn height_px(&self) -> u32 {
        self.height_px
    }

    pub const fn first_visible_line(&self) -> usize {
        self.first_visible
    }

    pub const fn horizontal_offset(&self) -> u32 {
        self.horizontal_offset
    }

    pub const fn vertical_scroll_max(&self) -> usize {
        self.vscroll_max
    }

    /// Lines the window can show: ceil of height over line height. A
    /// degenerate result (0 or 1) on a document of at least
    /// [`DOCUMENT_IDEAL_SIZE`] rows falls back to that constant.
    pub fn visible_line_count(&self, doc_size: usize) -> usize {
        let line_height = self.metrics.line_height();
        let count = (self.height_px.div_ceil(line_height)) as usize;
        if count <= 1 && doc_size >= DOCUMENT_IDEAL_SIZE {
            DOCUMENT_IDEAL_SIZE
        } else {
            count
        }
    }

    /// Last document line the window covers, clipped to the document.
    pub fn last_visible_line(&self, doc_size: usize) -> Option<usize> {
        let last_doc = doc_size.checked_sub(1)?;
        let visible = self.visible_line_count(doc_size);
        if visible == 0 {
            return None;
        }
        Some((self.first_visible + visible - 1).min(last_doc))
    }

    /// Window membership, deliberately unclipped at the bottom: a line in
    /// the window's final rows counts as visible even when the document ends
    /// above them, which keeps the centering policy from re-scrolling a
    /// fully-shown tail.
    pub fn is_line_visible(&self, line: usize, doc_size: usize) -> bool {
        let visible = self.visible_line_count(doc_size);
        visible != 0
            && line >= self.first_visible
            && line <= self.first_visible + visible - 1
    }

    /// Recompute the vertical range for `doc_size` rows and clamp the scroll
    /// position into it. True when the position had to move.
    pub fn adjust_scroll_range(&mut self, doc_size: usize) -> bool {
        let visible = self.visible_line_count(doc_size);
        self.vscroll_max = if doc_size <= visible {
            doc_size
        } else {
            doc_size - visible + 1
        };
        if self.first_visible > self.vscroll_max {
            self.first_visible = self.vscroll_max;
            trace!(
                target: "viewport",
                first = self.first_visible,
                max = self.vscroll_max,
                "scroll_reclamped"
            );
            return true;
        }
        false
    }

    /// Absolute vertical scroll, clamped to the range. True when it moved.
    pub fn scroll_to(&mut self, line: usize) -> bool {
        let target = line.min(self.vscroll_max);
        if target == self.first_visible {
            return false;
        }
        self.first_visible = target;
        true
    }

    /// Relative vertical scroll (wheel path). True when it moved.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        let target = if delta.is_negative() {
            self.first_visible.saturating_sub(delta.unsigned_abs())
        } else {
            self.first_visible.saturating_add(delta as usize)
        };
        self.scroll_to(target)
    }

    /// Center the window on `line` unless it is already visible. True when
    /// the window moved.
    pub fn ensure_line_visible(&mut self, line: usize, doc_size: usize) -> bool {
        if self.is_line_visible(line, doc_size) {
            return false;
        }
        let half = self.visible_line_count(doc_size) / 2;
        let first = line.saturating_sub(half).min(self.vscroll_max);
        if first == self.first_visible {
            return false;
        }
        self.first_visible = first;
        trace!(target: "viewport", line, first, "centered_on_line");
        true
    }

    /// Three-zone horizontal policy on the cursor column:
    /// past the right edge -> scroll so the column lands on it; inside the
    /// first window-width of content -> snap home; left of the window ->
    /// scroll back to the column. True when the offset moved.
    pub fn ensure_column_visible(&mut self, column: usize) -> bool {
        let x = column_x(column, self.metrics);
        let old = self.horizontal_offset;
        if x > self.horizontal_offset.saturating_add(self.width_px) {
            self.horizontal_offset = x - self.width_px;
        } else if x < self.width_px {
            self.horizontal_offset = 0;
        } else if x < self.horizontal_offset {
            self.horizontal_offset = x;
        }
        if self.horizontal_offset != old {
            trace!(
                target: "viewport",
                column,
                offset = self.horizontal_offset,
                "hscroll_adjusted"
            );
        }
        self.horizontal_offset != old
    }
}

fn column_x(column: usize, metrics: TextMetrics) -> u32 {
    let x = (column as u64).saturating_mul(u64::from(metrics.glyph_advance()));
    u32::try_from(x).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(width: u32, height: u32) -> ViewportModel {
        let mut view = ViewportModel::new(TextMetrics::new(16, 8));
        view.set_viewport_size(width, height);
        view
    }

    #[test]
    fn visible_line_count_is_ceiling() {
        let view = view(640, 320);
        assert_eq!(view.visible_line_count(1000), 20);
        let view = self::view(640, 321);
        assert_eq!(view.visible_line_count(1000), 21);
    }

    #[test]
    fn degenerate_height_falls_back_on_large_documents() {
        let view = view(640, 0);
        assert_eq!(view.visible_line_count(1000), DOCUMENT_IDEAL_SIZE);
        assert_eq!(view.visible_line_count(5), 0);
        let view = self::view(640, 16);
        assert_eq!(view.visible_line_count(1000), DOCUMENT_IDEAL_SIZE);
    }

    #[test]
    fn scroll_range_formula() {
        let mut view = view(640, 320); // 20 lines
        view.adjust_scroll_range(1000);
        assert_eq!(view.vertical_scroll_max(), 981);

        view.adjust_scroll_range(20);
        assert_eq!(view.vertical_scroll_max(), 20);

        view.adjust_scroll_range(5);
        assert_eq!(view.vertical_scroll_max(), 5);
    }

    #[test]
    fn shrinking_range_reclamps_position() {
        let mut view = view(640, 320);
        view.adjust_scroll_range(1000);
        assert!(view.scroll_to(900));
        assert!(view.adjust_scroll_range(100));
        assert_eq!(view.first_visible_line(), 81);
    }

    #[test]
    fn ensure_line_visible_centers() {
        let mut view = view(640, 320); // 20 lines
        view.adjust_scroll_range(1000);
        assert!(view.ensure_line_visible(500, 1000));
        assert_eq!(view.first_visible_line(), 490);

        // Already on screen: nothing happens.
        assert!(!view.ensure_line_visible(495, 1000));
        assert_eq!(view.first_visible_line(), 490);

        // Near the top the centering saturates at zero.
        assert!(view.ensure_line_visible(3, 1000));
        assert_eq!(view.first_visible_line(), 0);

        // Near the bottom it clamps to the scroll maximum.
        assert!(view.ensure_line_visible(999, 1000));
        assert_eq!(view.first_visible_line(), 981);
    }

    #[test]
    fn ensure_column_visible_three_zones() {
        let mut view = view(80, 320); // 10 glyphs of 8px

        // Zone 1: past the right edge, scroll by the overshoot.
        assert!(view.ensure_column_visible(15)); // x = 120 > 0 + 80
        assert_eq!(view.horizontal_offset(), 40);

        // Zone 2: column near the left content edge snaps home.
        assert!(view.ensure_column_visible(4)); // x = 32 < 80
        assert_eq!(view.horizontal_offset(), 0);

        // Zone 3: column left of a scrolled window.
        view.horizontal_offset = 200;
        assert!(view.ensure_column_visible(12)); // x = 96, width <= x < offset
        assert_eq!(view.horizontal_offset(), 96);

        // Inside the window: untouched.
        view.horizontal_offset = 90;
        assert!(!view.ensure_column_visible(13)); // x = 104, 90 <= 104 <= 170
        assert_eq!(view.horizontal_offset(), 90);
    }

    #[test]
    fn scroll_by_clamps_both_ends() {
        let mut view = view(640, 320);
        view.adjust_scroll_range(1000);
        assert!(!view.scroll_by(-3));
        assert_eq!(view.first_visible_line(), 0);
        assert!(view.scroll_by(3));
        assert_eq!(view.first_visible_line(), 3);
        assert!(view.scroll_by(isize::MAX));
        assert_eq!(view.first_visible_line(), 981);
    }

    #[test]
    fn last_visible_line_clips_to_document() {
        let mut view = view(640, 320);
        view.adjust_scroll_range(1000);
        assert_eq!(view.last_visible_line(1000), Some(19));
        view.scroll_to(981);
        assert_eq!(view.last_visible_line(1000), Some(999));
        assert_eq!(view.last_visible_line(0), None);
        assert_eq!(view.last_visible_line(5), Some(4));
    }
}
