//! Repaint scheduling: dirty-region accounting, flush throttling and the
//! cursor blink ticker.
//!
//! Nothing in this crate draws. The scheduler answers when the host should
//! repaint what, and leaves the how to the host. Timers are
//! modeled as polled deadlines rather than OS timers so tests drive time
//! explicitly and a detaching controller cancels everything by dropping
//! state.
//!
//! Invariants:
//! - At most one flush deadline is armed at a time; requests arriving while
//!   it is armed only grow the pending region.
//! - A flush hands out the coalesced region exactly once, then the
//!   scheduler is idle until the next request.
//! - The blink ticker is independent of flush throttling; its phase keeps
//!   advancing while the document is busy even though no repaint is asked
//!   for in that state.
//!
//! Integration points:
//! - `ViewportController` (core-model) owns one `RenderScheduler` and one
//!   `BlinkTicker`, polls both from the UI tick and forwards flushed
//!   regions to the host as repaint events.
//! - The document-change reactor funnels its per-event repaints through the
//!   same scheduler, which is what coalesces a change storm into one flush.

pub mod blink;
pub mod region;
pub mod scheduler;

pub use blink::{BlinkOutcome, BlinkTicker, CURSOR_BLINK_INTERVAL};
pub use region::{DirtyRegion, LineSpan};
pub use scheduler::{
    FALLBACK_REFRESH_HZ, FlushMetricsSnapshot, RenderScheduler, flush_metrics_snapshot,
};
