//! Attach/detach lifecycle and the blink policy, driven through the facade
//! with an explicit clock.

use core_actions::NavKind;
use core_listing::{Address, ItemKind, ListingDocument, ListingItem};
use core_model::{ViewEvent, ViewportController};
use core_render::DirtyRegion;
use core_view::TextMetrics;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Comfortably past the 17 ms flush deadline, well short of a blink.
const FLUSH: Duration = Duration::from_millis(100);
/// The default blink half-period.
const BLINK: Duration = Duration::from_millis(500);

fn addr(line: usize) -> Address {
    Address::new(0x0040_1000 + (line as u64) * 4)
}

fn listing(lines: usize) -> Arc<ListingDocument> {
    Arc::new(ListingDocument::with_items(
        (0..lines)
            .map(|i| ListingItem::new(addr(i), ItemKind::Instruction, "xor eax, eax"))
            .collect(),
    ))
}

fn sized_controller(now: Instant) -> ViewportController {
    let mut ctl = ViewportController::new(TextMetrics::cell());
    ctl.resize(now, 80, 20); // cell metrics: an 80x20 character window
    ctl
}

#[test]
fn attach_announces_cursor_and_primes_full_repaint() {
    let t0 = Instant::now();
    let doc = listing(100);
    let mut ctl = sized_controller(t0);

    ctl.attach(t0, Arc::clone(&doc));
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::AddressChanged(addr(0))],
        "idle attach announces the cursor row immediately"
    );
    assert!(ctl.is_attached());
    assert!(ctl.cursor_visible());

    ctl.on_tick(t0 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Full)]
    );
}

#[test]
fn busy_attach_defers_the_announcement() {
    let t0 = Instant::now();
    let doc = listing(100);
    doc.set_busy(true);
    let mut ctl = sized_controller(t0);

    ctl.attach(t0, Arc::clone(&doc));
    assert!(ctl.drain_events().is_empty());

    // The priming repaint still flushes; only the announcement waits.
    ctl.on_tick(t0 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Full)]
    );

    doc.set_busy(false);
    ctl.navigate(t0 + FLUSH, NavKind::NextLine, false);
    assert_eq!(ctl.drain_events(), vec![ViewEvent::AddressChanged(addr(1))]);
}

#[test]
fn detach_revokes_subscription_and_reattach_reannounces() {
    let t0 = Instant::now();
    let doc = listing(100);
    let mut ctl = sized_controller(t0);

    ctl.attach(t0, Arc::clone(&doc));
    assert_eq!(doc.subscriber_count(), 1);

    ctl.detach();
    assert_eq!(doc.subscriber_count(), 0);
    assert!(!ctl.is_attached());
    assert!(ctl.drain_events().is_empty(), "detach drops queued events");

    doc.update_body(5, "int3");
    ctl.on_tick(t0 + FLUSH);
    assert!(ctl.drain_events().is_empty());

    // A fresh attachment starts announcing from scratch.
    ctl.attach(t0 + FLUSH, Arc::clone(&doc));
    assert_eq!(ctl.drain_events(), vec![ViewEvent::AddressChanged(addr(0))]);
}

#[test]
fn worker_thread_mutations_surface_on_the_ui_tick() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = sized_controller(t0);
    ctl.attach(t0, Arc::clone(&doc));
    ctl.on_tick(t0 + FLUSH);
    ctl.drain_events();

    let worker = {
        let doc = Arc::clone(&doc);
        std::thread::spawn(move || {
            doc.set_busy(true);
            for line in 0..8 {
                doc.update_body(line, "nop");
            }
            doc.set_busy(false);
        })
    };
    worker.join().unwrap();

    let t1 = t0 + FLUSH * 2;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Lines(vec![0..8]))]
    );
}

#[test]
fn focus_loss_hides_the_cursor_with_one_repaint() {
    let t0 = Instant::now();
    let doc = listing(100);
    let mut ctl = sized_controller(t0);
    ctl.attach(t0, Arc::clone(&doc));
    ctl.on_tick(t0 + FLUSH);
    ctl.drain_events();

    ctl.set_focus(false);
    assert!(ctl.cursor_visible(), "phase holds until the next deadline");

    ctl.on_tick(t0 + BLINK);
    assert!(!ctl.cursor_visible());
    ctl.on_tick(t0 + BLINK + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Lines(vec![0..1]))]
    );

    // Steady state: later deadlines stay hidden and silent.
    ctl.on_tick(t0 + BLINK * 2 + FLUSH);
    ctl.on_tick(t0 + BLINK * 3);
    assert!(ctl.drain_events().is_empty());
    assert!(!ctl.cursor_visible());
}

#[test]
fn busy_blink_keeps_cadence_without_repaints() {
    let t0 = Instant::now();
    let doc = listing(100);
    doc.set_busy(true);
    let mut ctl = sized_controller(t0);
    ctl.attach(t0, Arc::clone(&doc));
    ctl.on_tick(t0 + FLUSH);
    ctl.drain_events();

    assert!(ctl.cursor_visible());
    ctl.on_tick(t0 + BLINK);
    assert!(!ctl.cursor_visible());
    ctl.on_tick(t0 + BLINK * 2);
    assert!(ctl.cursor_visible());
    assert!(
        ctl.drain_events().is_empty(),
        "phase keeps toggling but nobody paints over the churn"
    );
}
