//! Pixel-space mapping between host coordinates and listing positions.
//!
//! All x coordinates are content-relative: the host adds the horizontal
//! scroll offset before calling in. Columns are character cells under a
//! fixed glyph advance; a terminal host passes 1x1 metrics so cells and
//! pixels coincide, a pixel host passes its font metrics.

use core_listing::{DocumentGuard, Position};

/// Font geometry the mapper works with. Zero dimensions clamp to 1 so
/// degenerate metrics can never divide by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    line_height: u32,
    glyph_advance: u32,
}

impl TextMetrics {
    pub fn new(line_height: u32, glyph_advance: u32) -> Self {
        Self {
            line_height: line_height.max(1),
            glyph_advance: glyph_advance.max(1),
        }
    }

    /// Terminal cell metrics: one pixel per cell on both axes.
    pub const fn cell() -> Self {
        Self {
            line_height: 1,
            glyph_advance: 1,
        }
    }

    pub const fn line_height(self) -> u32 {
        self.line_height
    }

    pub const fn glyph_advance(self) -> u32 {
        self.glyph_advance
    }
}

/// Content-relative pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelPoint {
    pub x: u32,
    pub y: u32,
}

impl PixelPoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Pixel rectangle of one visible listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Half-open column span of a word inside a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    metrics: TextMetrics,
}

impl CoordinateMapper {
    pub const fn new(metrics: TextMetrics) -> Self {
        Self { metrics }
    }

    pub const fn metrics(&self) -> TextMetrics {
        self.metrics
    }

    /// Map a content-relative point to a listing position. Lines past the
    /// end clamp to the last row, columns clamp to the row's last column.
    /// Empty documents have no positions.
    pub fn position_at(
        &self,
        point: PixelPoint,
        first_visible: usize,
        doc: &DocumentGuard<'_>,
    ) -> Option<Position> {
        let last = doc.last_line()?;
        let line = first_visible
            .saturating_add((point.y / self.metrics.line_height) as usize)
            .min(last);
        let column = ((point.x / self.metrics.glyph_advance) as usize).min(doc.last_column(line));
        Some(Position::new(line, column))
    }

    /// Pixel rect of `line` inside a window of `visible_lines` rows starting
    /// at `first_visible`; `None` when the line falls outside the window.
    pub fn line_rect(
        &self,
        line: usize,
        first_visible: usize,
        visible_lines: usize,
        width: u32,
    ) -> Option<LineRect> {
        if line < first_visible || line >= first_visible.saturating_add(visible_lines) {
            return None;
        }
        let y = ((line - first_visible) as u32) * self.metrics.line_height;
        Some(LineRect {
            x: 0,
            y,
            width,
            height: self.metrics.line_height,
        })
    }

    /// Word hit-test: the identifier-like token under the point, reported as
    /// the hit line plus a half-open column span.
    pub fn word_at(
        &self,
        point: PixelPoint,
        first_visible: usize,
        doc: &DocumentGuard<'_>,
    ) -> Option<(usize, WordSpan)> {
        let pos = self.position_at(point, first_visible, doc)?;
        let text = doc.line_text(pos.line)?;
        word_span(&text, pos.column).map(|span| (pos.line, span))
    }
}

/// Expand the identifier-like token around `column`. `None` on separators or
/// past the end of text. Identifier characters cover the token shapes a
/// listing renders: alphanumerics, `_` and `.`.
pub fn word_span(text: &str, column: usize) -> Option<WordSpan> {
    let chars: Vec<char> = text.chars().collect();
    let ch = *chars.get(column)?;
    if !is_word_char(ch) {
        return None;
    }
    let mut start = column;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = column + 1;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }
    Some(WordSpan { start, end })
}

/// The token covered by `span`, for host symbol lookups.
pub fn word_text(text: &str, span: WordSpan) -> String {
    text.chars()
        .skip(span.start)
        .take(span.end.saturating_sub(span.start))
        .collect()
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
}
