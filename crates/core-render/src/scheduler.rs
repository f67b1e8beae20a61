//! Flush throttling over a single armed deadline.
//!
//! Producers report repaint intents as [`DirtyRegion`]s via `request`. The
//! first request arms a one-shot deadline one refresh interval out; every
//! further request before the deadline only grows the pending region. `poll`
//! fires the flush at or after the deadline and hands the coalesced region
//! to the caller exactly once.
//!
//! Busy-document nuance: requests raised while the analysis workers hold the
//! busy flag behave identically (absorbed, never re-armed) but are counted
//! separately so the metrics show how much of the coalescing the busy phase
//! is responsible for.

use crate::region::DirtyRegion;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// Refresh rate assumed when the host reports none or a non-positive rate.
pub const FALLBACK_REFRESH_HZ: f64 = 60.0;

/// Interval between flush opportunities for `hz`, in whole milliseconds,
/// rounded up: a 60 Hz display throttles to 17 ms.
fn refresh_interval(hz: f64) -> Duration {
    let hz = if hz > 0.0 { hz } else { FALLBACK_REFRESH_HZ };
    Duration::from_millis((1000.0 / hz).ceil() as u64)
}

// Process-wide counters; tests assert on deltas between snapshots so
// parallel test binaries stay independent.
static REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static REQUESTS_COALESCED: AtomicU64 = AtomicU64::new(0);
static REQUESTS_BUSY_ABSORBED: AtomicU64 = AtomicU64::new(0);
static FULL_REQUESTS: AtomicU64 = AtomicU64::new(0);
static FLUSHES_TOTAL: AtomicU64 = AtomicU64::new(0);
static FLUSHES_CANCELLED: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushMetricsSnapshot {
    pub requests: u64,
    pub coalesced: u64,
    pub busy_absorbed: u64,
    pub full_requests: u64,
    pub flushes: u64,
    pub cancelled: u64,
}

pub fn flush_metrics_snapshot() -> FlushMetricsSnapshot {
    FlushMetricsSnapshot {
        requests: REQUESTS_TOTAL.load(Ordering::Relaxed),
        coalesced: REQUESTS_COALESCED.load(Ordering::Relaxed),
        busy_absorbed: REQUESTS_BUSY_ABSORBED.load(Ordering::Relaxed),
        full_requests: FULL_REQUESTS.load(Ordering::Relaxed),
        flushes: FLUSHES_TOTAL.load(Ordering::Relaxed),
        cancelled: FLUSHES_CANCELLED.load(Ordering::Relaxed),
    }
}

#[derive(Debug)]
struct PendingFlush {
    region: DirtyRegion,
    due: Instant,
}

#[derive(Debug)]
pub struct RenderScheduler {
    interval: Duration,
    pending: Option<PendingFlush>,
    last_flush: Option<Instant>,
}

impl RenderScheduler {
    pub fn new(refresh_hz: f64) -> Self {
        Self::with_interval(refresh_interval(refresh_hz))
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            last_flush: None,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.interval
    }

    /// Re-derive the interval from a new refresh rate (config reload path).
    /// An armed flush keeps its original deadline.
    pub fn set_refresh_rate(&mut self, refresh_hz: f64) {
        self.interval = refresh_interval(refresh_hz);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the armed flush, for hosts that sleep precisely instead
    /// of polling on a coarse tick.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    pub fn last_flush(&self) -> Option<Instant> {
        self.last_flush
    }

    /// Merge a repaint request. Arms the deadline only when none is
    /// outstanding; empty regions are dropped before they can arm one.
    pub fn request(&mut self, now: Instant, region: DirtyRegion, busy: bool) {
        if region.is_empty() {
            return;
        }
        REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
        if region.is_full() {
            FULL_REQUESTS.fetch_add(1, Ordering::Relaxed);
        }
        match &mut self.pending {
            Some(pending) => {
                REQUESTS_COALESCED.fetch_add(1, Ordering::Relaxed);
                if busy {
                    REQUESTS_BUSY_ABSORBED.fetch_add(1, Ordering::Relaxed);
                }
                pending.region.merge(region);
                trace!(target: "render.scheduler", busy, "repaint_coalesced");
            }
            None => {
                let due = now + self.interval;
                self.pending = Some(PendingFlush { region, due });
                trace!(
                    target: "render.scheduler",
                    interval_ms = self.interval.as_millis() as u64,
                    busy,
                    "flush_armed"
                );
            }
        }
    }

    pub fn request_full(&mut self, now: Instant, busy: bool) {
        self.request(now, DirtyRegion::Full, busy);
    }

    pub fn request_line(&mut self, now: Instant, line: usize, busy: bool) {
        self.request(now, DirtyRegion::line(line), busy);
    }

    /// One-shot flush: at or past the deadline, clears the pending state and
    /// hands out the coalesced region.
    pub fn poll(&mut self, now: Instant) -> Option<DirtyRegion> {
        let due = self.pending.as_ref()?.due;
        if now < due {
            return None;
        }
        let flushed = self.pending.take()?;
        self.last_flush = Some(now);
        FLUSHES_TOTAL.fetch_add(1, Ordering::Relaxed);
        trace!(
            target: "render.scheduler",
            full = flushed.region.is_full(),
            "flush"
        );
        Some(flushed.region)
    }

    /// Drop any armed flush without emitting (detach path).
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            FLUSHES_CANCELLED.fetch_add(1, Ordering::Relaxed);
            trace!(target: "render.scheduler", "flush_cancelled");
        }
    }
}
