//! Cursor navigation over the shared listing document.
//!
//! Motion targets are clamped against the document, so out-of-range commands
//! degrade to no-ops instead of erroring. Page motions read the viewport to
//! size the jump; vertical motions carry the column across and re-clamp it
//! against the destination row.

use core_listing::{DocumentGuard, Position};
use core_view::ViewportModel;
use tracing::trace;

/// Cursor movement vocabulary. Every kind has a move and a select variant,
/// chosen by the `select` flag at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKind {
    NextChar,
    PrevChar,
    NextLine,
    PrevLine,
    NextPage,
    PrevPage,
    DocumentStart,
    DocumentEnd,
    LineStart,
    LineEnd,
}

/// Result of a navigation dispatch: where the active end was and where it
/// landed. `moved` covers selection collapse too, so a clamped motion that
/// only drops the selection still reports a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavOutcome {
    pub moved: bool,
    pub from: Position,
    pub to: Position,
}

impl NavOutcome {
    fn unmoved(at: Position) -> Self {
        Self {
            moved: false,
            from: at,
            to: at,
        }
    }
}

/// Apply one motion to the cursor inside the locked document.
pub fn handle_nav(
    kind: NavKind,
    select: bool,
    doc: &mut DocumentGuard<'_>,
    view: &ViewportModel,
) -> NavOutcome {
    let from = doc.cursor().position();
    let Some(last_line) = doc.last_line() else {
        return NavOutcome::unmoved(from);
    };
    let size = doc.size();

    let target = match kind {
        NavKind::NextChar => Some(Position::new(
            from.line,
            (from.column + 1).min(doc.last_column(from.line)),
        )),
        NavKind::PrevChar => Some(Position::new(from.line, from.column.saturating_sub(1))),
        NavKind::NextLine => Some(vertical(doc, from, (from.line + 1).min(last_line))),
        NavKind::PrevLine => Some(vertical(doc, from, from.line.saturating_sub(1))),
        NavKind::NextPage => (from.line < last_line).then(|| {
            let jump = view.first_visible_line() + view.visible_line_count(size);
            vertical(doc, from, jump.min(last_line))
        }),
        NavKind::PrevPage => (from.line > 0).then(|| {
            let first = view.first_visible_line();
            let visible = view.visible_line_count(size);
            let line = if first > visible { first - visible } else { 0 };
            vertical(doc, from, line)
        }),
        NavKind::DocumentStart => (from.line > 0).then(|| vertical(doc, from, 0)),
        NavKind::DocumentEnd => (from.line < last_line).then(|| vertical(doc, from, last_line)),
        NavKind::LineStart => Some(Position::new(from.line, 0)),
        NavKind::LineEnd => Some(Position::new(from.line, doc.last_column(from.line))),
    };

    let Some(to) = target else {
        return NavOutcome::unmoved(from);
    };

    let moved = if select {
        doc.cursor_mut().select(to.line, to.column)
    } else {
        doc.cursor_mut().move_to(to.line, to.column)
    };
    if moved {
        trace!(
            target: "actions.nav",
            nav = ?kind,
            select,
            line = from.line,
            column = from.column,
            to_line = to.line,
            to_column = to.column,
            "nav"
        );
    }
    NavOutcome { moved, from, to }
}

/// Carry the column onto another line, clamped to that line's width.
fn vertical(doc: &DocumentGuard<'_>, from: Position, line: usize) -> Position {
    Position::new(line, from.column.min(doc.last_column(line)))
}
