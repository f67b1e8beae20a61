//! Cursor blink phase, decoupled from flush throttling.
//!
//! The ticker owns only the phase and its deadline. What a toggle means is
//! decided at poll time from the document/focus state the caller passes in:
//!
//! * busy document: the phase keeps toggling so the cadence survives the
//!   burst, but nobody repaints over the analysis churn;
//! * unfocused: the phase is forced hidden, with exactly one repaint on
//!   the visible-to-hidden edge;
//! * focused and idle: the ordinary toggle-and-repaint blink.

use std::time::{Duration, Instant};
use tracing::trace;

/// Blink half-period: the phase flips at this rate.
pub const CURSOR_BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// What a blink tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkOutcome {
    /// Phase after the tick.
    pub visible: bool,
    /// Whether the cursor line needs repainting.
    pub repaint: bool,
}

#[derive(Debug, Clone)]
pub struct BlinkTicker {
    interval: Duration,
    next: Option<Instant>,
    visible: bool,
}

impl Default for BlinkTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl BlinkTicker {
    pub fn new() -> Self {
        Self::with_interval(CURSOR_BLINK_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
            visible: false,
        }
    }

    /// Arm the ticker (attach path). The phase starts visible.
    pub fn start(&mut self, now: Instant) {
        self.visible = true;
        self.next = Some(now + self.interval);
        trace!(target: "render.blink", "blink_started");
    }

    /// Disarm and hide (detach path).
    pub fn stop(&mut self) {
        self.visible = false;
        self.next = None;
        trace!(target: "render.blink", "blink_stopped");
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }

    /// Key input lands the cursor in the visible phase immediately. True
    /// when the phase actually changed.
    pub fn force_visible(&mut self) -> bool {
        let changed = !self.visible;
        self.visible = true;
        changed
    }

    /// Pointer drags hide the cursor. True when the phase actually changed.
    pub fn force_hidden(&mut self) -> bool {
        let changed = self.visible;
        self.visible = false;
        changed
    }

    /// Deadline poll; see the module docs for the per-state policy.
    pub fn poll(&mut self, now: Instant, busy: bool, focused: bool) -> Option<BlinkOutcome> {
        let next = self.next?;
        if now < next {
            return None;
        }
        self.next = Some(now + self.interval);
        let outcome = if busy {
            self.visible = !self.visible;
            BlinkOutcome {
                visible: self.visible,
                repaint: false,
            }
        } else if !focused {
            let was_visible = self.visible;
            self.visible = false;
            BlinkOutcome {
                visible: false,
                repaint: was_visible,
            }
        } else {
            self.visible = !self.visible;
            BlinkOutcome {
                visible: self.visible,
                repaint: true,
            }
        };
        trace!(
            target: "render.blink",
            visible = outcome.visible,
            repaint = outcome.repaint,
            "blink_tick"
        );
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(500);

    fn running(t0: Instant) -> BlinkTicker {
        let mut ticker = BlinkTicker::new();
        ticker.start(t0);
        ticker
    }

    #[test]
    fn not_started_never_fires() {
        let mut ticker = BlinkTicker::new();
        assert!(ticker.poll(Instant::now(), false, true).is_none());
        assert!(!ticker.is_running());
    }

    #[test]
    fn focused_idle_toggles_and_repaints() {
        let t0 = Instant::now();
        let mut ticker = running(t0);
        assert!(ticker.poll(t0 + INTERVAL / 2, false, true).is_none());

        let tick = ticker.poll(t0 + INTERVAL, false, true).unwrap();
        assert_eq!(
            tick,
            BlinkOutcome {
                visible: false,
                repaint: true
            }
        );
        let tick = ticker.poll(t0 + INTERVAL * 2, false, true).unwrap();
        assert_eq!(
            tick,
            BlinkOutcome {
                visible: true,
                repaint: true
            }
        );
    }

    #[test]
    fn busy_toggles_without_repaint() {
        let t0 = Instant::now();
        let mut ticker = running(t0);
        let tick = ticker.poll(t0 + INTERVAL, true, true).unwrap();
        assert!(!tick.visible);
        assert!(!tick.repaint);
        let tick = ticker.poll(t0 + INTERVAL * 2, true, true).unwrap();
        assert!(tick.visible);
        assert!(!tick.repaint);
    }

    #[test]
    fn unfocused_hides_with_single_repaint() {
        let t0 = Instant::now();
        let mut ticker = running(t0); // phase visible
        let tick = ticker.poll(t0 + INTERVAL, false, false).unwrap();
        assert_eq!(
            tick,
            BlinkOutcome {
                visible: false,
                repaint: true
            }
        );
        // Further unfocused ticks stay hidden and silent.
        let tick = ticker.poll(t0 + INTERVAL * 2, false, false).unwrap();
        assert_eq!(
            tick,
            BlinkOutcome {
                visible: false,
                repaint: false
            }
        );
    }

    #[test]
    fn force_visible_and_hidden_report_edges() {
        let mut ticker = BlinkTicker::new();
        assert!(ticker.force_visible());
        assert!(!ticker.force_visible());
        assert!(ticker.force_hidden());
        assert!(!ticker.force_hidden());
    }

    #[test]
    fn stop_disarms_and_hides() {
        let t0 = Instant::now();
        let mut ticker = running(t0);
        ticker.stop();
        assert!(!ticker.visible());
        assert!(ticker.poll(t0 + INTERVAL * 10, false, true).is_none());
    }
}
