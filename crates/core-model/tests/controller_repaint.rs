//! Change-driven repaint accounting: coalescing, window clipping, scroll
//! range upkeep and cursor clamping while workers reshape the listing.

use core_listing::{Address, ItemKind, ListingDocument, ListingItem, Position};
use core_model::{ViewEvent, ViewportController, ViewportSettings};
use core_render::DirtyRegion;
use core_view::TextMetrics;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

const FLUSH: Duration = Duration::from_millis(100);

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

/// Controller with the blink parked an hour out, so only change-driven
/// repaints fire.
fn attach_settled(doc: &Arc<ListingDocument>, t0: Instant) -> ViewportController {
    let settings = ViewportSettings {
        blink_interval: Duration::from_secs(3600),
        ..ViewportSettings::default()
    };
    let mut ctl = ViewportController::with_settings(TextMetrics::cell(), settings);
    ctl.resize(t0, 80, 20);
    ctl.attach(t0, Arc::clone(doc));
    ctl.on_tick(t0 + FLUSH);
    ctl.drain_events();
    ctl
}

#[test]
fn change_storm_flushes_as_one_union() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = attach_settled(&doc, t0);

    for line in 2..12 {
        doc.update_body(line, "lea eax, [ebx+4]");
    }
    doc.update_body(700, "int3"); // off-window noise in the same batch

    let t1 = t0 + FLUSH * 2;
    ctl.on_tick(t1);
    assert!(ctl.drain_events().is_empty(), "throttled until the deadline");
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Lines(vec![2..12]))]
    );
}

#[test]
fn visible_change_repaints_exactly_its_line() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = attach_settled(&doc, t0);

    doc.update_body(5, "int3");
    let t1 = t0 + FLUSH * 2;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Lines(vec![5..6]))]
    );
}

#[test]
fn offscreen_change_paints_nothing() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = attach_settled(&doc, t0);

    doc.update_body(500, "int3");
    let t1 = t0 + FLUSH * 2;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);
    assert!(ctl.drain_events().is_empty());
}

#[test]
fn tail_append_grows_scroll_range_silently() {
    let t0 = Instant::now();
    let doc = listing(999);
    let mut ctl = attach_settled(&doc, t0);
    assert_eq!(ctl.viewport().vertical_scroll_max(), 979);

    doc.push(ListingItem::new(addr(999), ItemKind::Instruction, "ret"));
    let t1 = t0 + FLUSH * 2;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);

    assert!(ctl.drain_events().is_empty());
    assert_eq!(ctl.viewport().vertical_scroll_max(), 980);
}

#[test]
fn removal_above_window_forces_full_repaint() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = attach_settled(&doc, t0);

    ctl.goto_address(t0 + FLUSH, addr(50));
    ctl.on_tick(t0 + FLUSH * 2);
    ctl.drain_events();
    assert_eq!(ctl.viewport().first_visible_line(), 40, "jump centered");

    doc.remove(10);
    let t1 = t0 + FLUSH * 3;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Full)]
    );
    // The window keeps its scroll position; the rows shifted under it.
    assert_eq!(ctl.viewport().first_visible_line(), 40);
}

#[test]
fn shrink_under_cursor_clamps_and_reannounces() {
    let t0 = Instant::now();
    let doc = listing(100);
    let mut ctl = attach_settled(&doc, t0);

    ctl.goto_address(t0 + FLUSH, addr(99));
    ctl.on_tick(t0 + FLUSH * 2);
    ctl.drain_events();

    while doc.size() > 50 {
        doc.remove(doc.size() - 1);
    }
    let t1 = t0 + FLUSH * 3;
    ctl.on_tick(t1);
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![
            ViewEvent::AddressChanged(addr(49)),
            ViewEvent::RepaintRequested(DirtyRegion::Full),
        ]
    );
    assert_eq!(ctl.cursor_position(), Some(Position::new(49, 0)));
}

#[test]
fn resize_recomputes_window_and_repaints_fully() {
    let t0 = Instant::now();
    let doc = listing(1000);
    let mut ctl = attach_settled(&doc, t0);

    let t1 = t0 + FLUSH * 2;
    ctl.resize(t1, 80, 30);
    ctl.on_tick(t1 + FLUSH);
    assert_eq!(
        ctl.drain_events(),
        vec![ViewEvent::RepaintRequested(DirtyRegion::Full)]
    );
    assert_eq!(ctl.viewport().visible_line_count(1000), 30);
    assert_eq!(ctl.viewport().vertical_scroll_max(), 970);
}
