//! Dirty-region bookkeeping.
//!
//! A region is either `Full` (repaint the whole viewport) or a normalized
//! set of half-open line spans: sorted, non-overlapping, with adjacent spans
//! fused. Merging preserves the normal form so the flush consumer can walk
//! spans directly without a sort pass.

use std::ops::Range;

/// Half-open span of document lines.
pub type LineSpan = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyRegion {
    /// Everything visible needs repainting.
    Full,
    /// Specific document lines need repainting.
    Lines(Vec<LineSpan>),
}

impl Default for DirtyRegion {
    fn default() -> Self {
        Self::Lines(Vec::new())
    }
}

impl DirtyRegion {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn line(line: usize) -> Self {
        Self::Lines(vec![line..line + 1])
    }

    pub fn span(span: LineSpan) -> Self {
        if span.is_empty() {
            Self::empty()
        } else {
            Self::Lines(vec![span])
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Lines(spans) if spans.is_empty())
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Escalate to a full repaint. Absorbs everything already recorded.
    pub fn set_full(&mut self) {
        *self = Self::Full;
    }

    /// Add one span, keeping the normal form.
    pub fn add_span(&mut self, span: LineSpan) {
        match self {
            Self::Full => {}
            Self::Lines(spans) => {
                if !span.is_empty() {
                    insert_merged(spans, span);
                }
            }
        }
    }

    pub fn add_line(&mut self, line: usize) {
        self.add_span(line..line + 1);
    }

    /// Union with another region.
    pub fn merge(&mut self, other: DirtyRegion) {
        match other {
            Self::Full => self.set_full(),
            Self::Lines(spans) => {
                for span in spans {
                    self.add_span(span);
                }
            }
        }
    }

    pub fn contains(&self, line: usize) -> bool {
        match self {
            Self::Full => true,
            Self::Lines(spans) => spans.iter().any(|span| span.contains(&line)),
        }
    }

    /// Spans clipped to the visible window; `Full` yields the window itself.
    pub fn spans_in(&self, viewport: LineSpan) -> Vec<LineSpan> {
        match self {
            Self::Full => {
                if viewport.is_empty() {
                    Vec::new()
                } else {
                    vec![viewport]
                }
            }
            Self::Lines(spans) => spans
                .iter()
                .filter_map(|span| intersect(span, &viewport))
                .collect(),
        }
    }

    /// Total lines covered; `None` for a full repaint.
    pub fn line_count(&self) -> Option<usize> {
        match self {
            Self::Full => None,
            Self::Lines(spans) => Some(spans.iter().map(ExactSizeIterator::len).sum()),
        }
    }
}

/// Insert `new` into a normalized span list, fusing overlapping and
/// adjacent neighbors.
fn insert_merged(spans: &mut Vec<LineSpan>, new: LineSpan) {
    // Spans strictly before `new` (with a real gap) keep their place; fusing
    // starts at the first span that touches it.
    let start_idx = spans.partition_point(|span| span.end < new.start);
    let mut merged = new;
    let mut end_idx = start_idx;
    while end_idx < spans.len() && spans[end_idx].start <= merged.end {
        merged.start = merged.start.min(spans[end_idx].start);
        merged.end = merged.end.max(spans[end_idx].end);
        end_idx += 1;
    }
    spans.splice(start_idx..end_idx, std::iter::once(merged));
}

fn intersect(a: &LineSpan, b: &LineSpan) -> Option<LineSpan> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start < end).then_some(start..end)
}
