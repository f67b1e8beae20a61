//! Listing document model: addresses, rows, cursor and the thread-safe
//! document container the viewport core observes.
//!
//! Ownership layout mirrors the view boundary: the document owns the rows
//! *and* the cursor (position, selection, navigation history) so that worker
//! threads and the UI thread contend on exactly one lock. Change
//! notifications are published only after the lock is released and travel to
//! subscribers over unbounded channels; subscribers drain on their own
//! schedule, never inside the mutating thread's critical section.
//!
//! Invariants owned here:
//! * Row order is listing order; indices in change events refer to the
//!   post-mutation row vector.
//! * Symbol names are unique; rename collisions are rejected before any
//!   state changes.
//! * The busy flag is advisory and lock-free; workers flip it around
//!   mutation bursts so the view side can damp cursor blinking.

pub mod address;
pub mod cursor;
pub mod document;
pub mod item;

pub use address::Address;
pub use cursor::{CURSOR_HISTORY_MAX, CursorEffect, ListingCursor, Position};
pub use document::{
    ChangeKind, ChangeSubscription, DocumentChange, DocumentError, DocumentGuard, ListingDocument,
};
pub use item::{ItemKind, ListingItem, SegmentKind, SymbolKind};
