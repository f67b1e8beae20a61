//! Navigation commands, drag state, and command enablement.
//!
//! Everything here is pure and synchronous: given a command, the locked
//! document and the viewport geometry, compute the clamped cursor target and
//! apply it. Scroll-into-view, repaint scheduling, and event emission are the
//! controller's follow-up work in `core-model`.

mod drag;
mod enablement;
mod nav;

pub use drag::DragState;
pub use enablement::{CommandSet, CursorFacts, RowFacts, enabled_commands};
pub use nav::{NavKind, NavOutcome, handle_nav};

/// A keymap-level command the controller executes against the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewCommand {
    /// Move the cursor, collapsing any selection.
    Move(NavKind),
    /// Extend the selection toward the motion target.
    Select(NavKind),
    /// Pop the navigation back stack.
    Back,
    /// Pop the navigation forward stack.
    Forward,
    /// Copy the selected text.
    Copy,
}

impl ViewCommand {
    /// The motion this command performs, if it is a motion at all.
    pub fn nav_kind(self) -> Option<(NavKind, bool)> {
        match self {
            ViewCommand::Move(kind) => Some((kind, false)),
            ViewCommand::Select(kind) => Some((kind, true)),
            _ => None,
        }
    }
}
