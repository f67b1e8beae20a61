//! Reaction policy for document changes drained on the UI tick.
//!
//! Worker mutations arrive as index-tagged events through the change
//! subscription and are handled here, on the UI side only. Each event
//! clears the selection and refreshes the scroll range; what repaints
//! depends on where the index falls relative to the window. The caller
//! merges the returned regions and funnels them through the flush
//! scheduler, which is what turns a mutation storm into one repaint.

use core_listing::{ChangeKind, DocumentChange, DocumentGuard};
use core_render::DirtyRegion;
use core_view::ViewportModel;
use tracing::trace;

/// Apply one drained change: selection cleared, scroll range refreshed,
/// repaint demand returned.
///
/// Inserts and removals at or above the last visible line shift every row
/// below them, so they cost a full repaint; past the window they cost
/// nothing. In-place changes repaint their own line only while it is on
/// screen. A scroll-position reclamp (the range shrank out from under the
/// window) moves the whole window and escalates to full.
pub(crate) fn react(
    change: DocumentChange,
    view: &mut ViewportModel,
    guard: &mut DocumentGuard<'_>,
) -> DirtyRegion {
    guard.cursor_mut().clear_selection();
    let size = guard.size();
    let reclamped = view.adjust_scroll_range(size);
    let region = match change.kind {
        ChangeKind::Changed if view.is_line_visible(change.index, size) => {
            DirtyRegion::line(change.index)
        }
        ChangeKind::Changed => DirtyRegion::empty(),
        ChangeKind::Inserted | ChangeKind::Removed => match view.last_visible_line(size) {
            Some(last) if change.index <= last => DirtyRegion::Full,
            _ => DirtyRegion::empty(),
        },
    };
    trace!(
        target: "viewport.reactor",
        kind = ?change.kind,
        index = change.index,
        full = region.is_full() || reclamped,
        "change_reacted"
    );
    if reclamped { DirtyRegion::Full } else { region }
}

/// Pull the cursor back inside the document after a shrink. True when it
/// had to move.
pub(crate) fn clamp_cursor(guard: &mut DocumentGuard<'_>) -> bool {
    let Some(last) = guard.last_line() else {
        return false;
    };
    let pos = guard.cursor().position();
    let line = pos.line.min(last);
    let column = pos.column.min(guard.last_column(line));
    if line == pos.line && column == pos.column {
        return false;
    }
    guard.cursor_mut().move_to(line, column);
    true
}
