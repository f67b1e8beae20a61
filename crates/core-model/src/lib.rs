//! Viewport controller facade: the one object a host drives.
//!
//! Wires the coordinate mapper, scroll model, flush scheduler, blink ticker
//! and the change reactor over a shared [`ListingDocument`]. The host calls
//! in with input (keys already translated to [`ViewCommand`]s, pointer
//! pixels, wheel notches, resize, focus) plus a periodic tick, and drains
//! [`ViewEvent`]s back out: coalesced repaint regions, the cursor row's
//! address, history availability flips.
//!
//! Threading contract: every method here runs on the UI side. Worker
//! threads never call in; their mutations travel through the document's
//! change subscription and are drained by [`ViewportController::on_tick`].
//! Document locks are short-lived and never held across an event push.
//!
//! Time is explicit: methods that can arm or fire deadlines take `now`, so
//! tests drive the clock instead of sleeping.

use core_actions::{
    CommandSet, CursorFacts, DragState, NavKind, RowFacts, ViewCommand, enabled_commands,
    handle_nav,
};
use core_listing::{
    Address, ChangeSubscription, DocumentChange, ListingDocument, ListingItem, Position,
};
use core_render::{
    BlinkTicker, CURSOR_BLINK_INTERVAL, DirtyRegion, FALLBACK_REFRESH_HZ, RenderScheduler,
};
use core_view::{
    CoordinateMapper, PixelPoint, TextMetrics, ViewportModel, WHEEL_LINES_DEFAULT, word_span,
    word_text,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

mod reactor;

/// Host-facing notifications, delivered in emission order through
/// [`ViewportController::drain_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Repaint the given region; carries the union of everything requested
    /// since the previous flush.
    RepaintRequested(DirtyRegion),
    /// The cursor landed on a row with a different address.
    AddressChanged(Address),
    CanGoBackChanged(bool),
    CanGoForwardChanged(bool),
}

/// Tunables the host resolves from its config before construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSettings {
    pub refresh_hz: f64,
    pub blink_interval: Duration,
    pub wheel_lines: usize,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            refresh_hz: FALLBACK_REFRESH_HZ,
            blink_interval: CURSOR_BLINK_INTERVAL,
            wheel_lines: WHEEL_LINES_DEFAULT,
        }
    }
}

struct AttachedDocument {
    doc: Arc<ListingDocument>,
    subscription: ChangeSubscription,
}

pub struct ViewportController {
    view: ViewportModel,
    mapper: CoordinateMapper,
    scheduler: RenderScheduler,
    blink: BlinkTicker,
    drag: DragState,
    wheel_lines: usize,
    focused: bool,
    attached: Option<AttachedDocument>,
    outbox: Vec<ViewEvent>,
    last_address: Option<Address>,
    last_back: bool,
    last_forward: bool,
}

impl ViewportController {
    pub fn new(metrics: TextMetrics) -> Self {
        Self::with_settings(metrics, ViewportSettings::default())
    }

    pub fn with_settings(metrics: TextMetrics, settings: ViewportSettings) -> Self {
        Self {
            view: ViewportModel::new(metrics),
            mapper: CoordinateMapper::new(metrics),
            scheduler: RenderScheduler::new(settings.refresh_hz),
            blink: BlinkTicker::with_interval(settings.blink_interval),
            drag: DragState::Idle,
            wheel_lines: settings.wheel_lines.max(1),
            focused: true,
            attached: None,
            outbox: Vec::new(),
            last_address: None,
            last_back: false,
            last_forward: false,
        }
    }

    // --- lifecycle -----------------------------------------------------

    /// Bind to `doc`: subscribe to its changes, refresh the scroll range,
    /// start blinking and prime a full repaint. When the document is idle
    /// the cursor row is scrolled into view and announced immediately;
    /// under a busy document the announcement waits for the first idle
    /// cursor move.
    pub fn attach(&mut self, now: Instant, doc: Arc<ListingDocument>) {
        self.detach();
        let subscription = doc.subscribe();
        let busy = doc.busy();
        let size = doc.size();
        self.view.adjust_scroll_range(size);
        self.blink.start(now);
        self.scheduler.request_full(now, busy);
        self.attached = Some(AttachedDocument {
            doc: Arc::clone(&doc),
            subscription,
        });
        info!(target: "viewport", rows = size, busy, "attached");
        if !busy {
            self.after_cursor_move(now, &doc, None);
        }
    }

    /// Revoke the subscription and drop all pending flush/blink/event
    /// state. Ticks after this deliver nothing.
    pub fn detach(&mut self) {
        if self.attached.take().is_none() {
            return;
        }
        self.scheduler.cancel();
        self.blink.stop();
        self.drag = DragState::Idle;
        self.outbox.clear();
        self.last_address = None;
        self.last_back = false;
        self.last_forward = false;
        info!(target: "viewport", "detached");
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// New viewport size in pixels: scroll range and horizontal offset are
    /// recomputed for the cursor and the whole window repaints.
    pub fn resize(&mut self, now: Instant, width_px: u32, height_px: u32) {
        self.view.set_viewport_size(width_px, height_px);
        trace!(target: "viewport", width_px, height_px, "resized");
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let busy = doc.busy();
        let (column, size) = {
            let guard = doc.lock();
            (guard.cursor().column(), guard.size())
        };
        self.view.adjust_scroll_range(size);
        self.view.ensure_column_visible(column);
        self.scheduler.request_full(now, busy);
    }

    /// Focus feeds the blink policy; the phase reacts at its next deadline.
    pub fn set_focus(&mut self, focused: bool) {
        self.focused = focused;
        trace!(target: "viewport", focused, "focus_changed");
    }

    pub fn set_wheel_lines(&mut self, lines: usize) {
        self.wheel_lines = lines.max(1);
    }

    pub fn set_refresh_rate(&mut self, refresh_hz: f64) {
        self.scheduler.set_refresh_rate(refresh_hz);
    }

    // --- commands ------------------------------------------------------

    pub fn dispatch(&mut self, now: Instant, command: ViewCommand) {
        match command {
            ViewCommand::Move(kind) => self.navigate(now, kind, false),
            ViewCommand::Select(kind) => self.navigate(now, kind, true),
            ViewCommand::Back => self.go_back(now),
            ViewCommand::Forward => self.go_forward(now),
            // Clipboard transport is host-owned; hosts answer the copy
            // command with `copy_selection`.
            ViewCommand::Copy => {}
        }
    }

    /// Run one navigation command. `select` extends the selection instead
    /// of collapsing it.
    pub fn navigate(&mut self, now: Instant, kind: NavKind, select: bool) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let outcome = {
            let mut guard = doc.lock();
            handle_nav(kind, select, &mut guard, &self.view)
        };
        let shown = self.blink.force_visible();
        if outcome.moved {
            self.after_cursor_move(now, &doc, Some(outcome.from.line));
        } else if shown {
            self.repaint_cursor_line(now, &doc);
        }
    }

    /// Jump to the first row at `address`. False when no row carries it.
    /// A successful jump records history, lands at the line start and
    /// scrolls the row into view.
    pub fn goto_address(&mut self, now: Instant, address: Address) -> bool {
        let Some(doc) = self.attached_doc() else {
            return false;
        };
        let moved_from = {
            let mut guard = doc.lock();
            let Some(line) = guard.index_of_address(address) else {
                return false;
            };
            trace!(target: "viewport", %address, line, "jump");
            let from = guard.cursor().position();
            guard.cursor_mut().go_to(line, 0).moved.then_some(from)
        };
        let shown = self.blink.force_visible();
        match moved_from {
            Some(from) => self.after_cursor_move(now, &doc, Some(from.line)),
            None if shown => self.repaint_cursor_line(now, &doc),
            None => {}
        }
        true
    }

    /// Jump to an exact row. False when the row is not in the document.
    pub fn goto_item(&mut self, now: Instant, item: &ListingItem) -> bool {
        let Some(doc) = self.attached_doc() else {
            return false;
        };
        let moved_from = {
            let mut guard = doc.lock();
            let Some(line) = guard.index_of(item) else {
                return false;
            };
            let from = guard.cursor().position();
            guard.cursor_mut().go_to(line, 0).moved.then_some(from)
        };
        let shown = self.blink.force_visible();
        match moved_from {
            Some(from) => self.after_cursor_move(now, &doc, Some(from.line)),
            None if shown => self.repaint_cursor_line(now, &doc),
            None => {}
        }
        true
    }

    pub fn go_back(&mut self, now: Instant) {
        self.hop_history(now, false);
    }

    pub fn go_forward(&mut self, now: Instant) {
        self.hop_history(now, true);
    }

    fn hop_history(&mut self, now: Instant, forward: bool) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let moved_from = {
            let mut guard = doc.lock();
            if guard.is_empty() {
                return;
            }
            let from = guard.cursor().position();
            let effect = if forward {
                guard.cursor_mut().go_forward()
            } else {
                guard.cursor_mut().go_back()
            };
            if effect.moved {
                // Stacks can hold positions recorded before a shrink.
                reactor::clamp_cursor(&mut guard);
            }
            effect.any().then_some((from, effect.moved))
        };
        let shown = self.blink.force_visible();
        match moved_from {
            Some((from, true)) => self.after_cursor_move(now, &doc, Some(from.line)),
            Some((_, false)) => {
                self.announce_cursor(&doc);
                if shown {
                    self.repaint_cursor_line(now, &doc);
                }
            }
            None => {
                if shown {
                    self.repaint_cursor_line(now, &doc);
                }
            }
        }
    }

    // --- pointer -------------------------------------------------------

    /// Primary button press: the caret moves to the hit position (any
    /// selection collapses) and a drag gesture begins.
    pub fn pointer_pressed(&mut self, now: Instant, point: PixelPoint) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let content = self.content_point(point);
        let moved_from = {
            let mut guard = doc.lock();
            let Some(pos) = self
                .mapper
                .position_at(content, self.view.first_visible_line(), &guard)
            else {
                return;
            };
            let from = guard.cursor().position();
            guard
                .cursor_mut()
                .move_to(pos.line, pos.column)
                .then_some(from)
        };
        self.drag.begin();
        if let Some(from) = moved_from {
            self.after_cursor_move(now, &doc, Some(from.line));
        }
    }

    /// Pointer motion while the button is held extends the selection from
    /// the press anchor and hides the cursor phase.
    pub fn pointer_dragged(&mut self, now: Instant, point: PixelPoint) {
        if !self.drag.is_selecting() {
            return;
        }
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let content = self.content_point(point);
        let extended_from = {
            let mut guard = doc.lock();
            let Some(pos) = self
                .mapper
                .position_at(content, self.view.first_visible_line(), &guard)
            else {
                return;
            };
            let from = guard.cursor().position();
            guard
                .cursor_mut()
                .select(pos.line, pos.column)
                .then_some(from)
        };
        let hidden = self.blink.force_hidden();
        match extended_from {
            Some(from) => self.after_cursor_move(now, &doc, Some(from.line)),
            None if hidden => self.repaint_cursor_line(now, &doc),
            None => {}
        }
    }

    pub fn pointer_released(&mut self, _now: Instant) {
        if self.drag.end() {
            trace!(target: "viewport", "drag_finished");
        }
    }

    /// Double click selects the identifier-like word under the pointer:
    /// caret to the word start, selection to its end.
    pub fn pointer_double_clicked(&mut self, now: Instant, point: PixelPoint) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let content = self.content_point(point);
        let selected_from = {
            let mut guard = doc.lock();
            let Some((line, span)) = self
                .mapper
                .word_at(content, self.view.first_visible_line(), &guard)
            else {
                return;
            };
            let from = guard.cursor().position();
            let moved = guard.cursor_mut().move_to(line, span.start);
            let extended = guard.cursor_mut().select(line, span.end);
            (moved || extended).then_some(from)
        };
        if let Some(from) = selected_from {
            self.after_cursor_move(now, &doc, Some(from.line));
        }
    }

    /// Scroll by wheel notches; positive notches move the window down the
    /// listing. Distance per notch comes from the settings.
    pub fn wheel(&mut self, now: Instant, notches: i32) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let delta = notches as isize * self.wheel_lines as isize;
        if self.view.scroll_by(delta) {
            self.scheduler.request_full(now, doc.busy());
        }
    }

    // --- tick ----------------------------------------------------------

    /// One UI tick: drain worker changes through the reactor, advance the
    /// blink phase, then fire a due flush as a single repaint event.
    pub fn on_tick(&mut self, now: Instant) {
        let Some(doc) = self.attached_doc() else {
            return;
        };
        let busy = doc.busy();

        let changes: Vec<DocumentChange> = self
            .attached
            .as_ref()
            .map(|attached| attached.subscription.drain().collect())
            .unwrap_or_default();
        if !changes.is_empty() {
            let drained = changes.len();
            let mut region = DirtyRegion::empty();
            let clamped_from = {
                let mut guard = doc.lock();
                for change in changes {
                    region.merge(reactor::react(change, &mut self.view, &mut guard));
                }
                let before = guard.cursor().position();
                reactor::clamp_cursor(&mut guard).then_some(before)
            };
            debug!(
                target: "viewport.reactor",
                drained,
                full = region.is_full(),
                "changes_drained"
            );
            self.scheduler.request(now, region, busy);
            if let Some(from) = clamped_from {
                self.after_cursor_move(now, &doc, Some(from.line));
            }
        }

        if let Some(outcome) = self.blink.poll(now, busy, self.focused)
            && outcome.repaint
        {
            self.repaint_cursor_line(now, &doc);
        }

        if let Some(region) = self.scheduler.poll(now) {
            self.outbox.push(ViewEvent::RepaintRequested(region));
        }
    }

    /// Take everything emitted since the previous drain, in emission order.
    pub fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.outbox)
    }

    // --- queries -------------------------------------------------------

    pub fn viewport(&self) -> &ViewportModel {
        &self.view
    }

    /// Blink phase: whether the caret is in its visible half-period.
    pub fn cursor_visible(&self) -> bool {
        self.blink.visible()
    }

    pub fn cursor_position(&self) -> Option<Position> {
        let attached = self.attached.as_ref()?;
        let guard = attached.doc.lock();
        (!guard.is_empty()).then(|| guard.cursor().position())
    }

    /// Active selection endpoints in document order.
    pub fn selection(&self) -> Option<(Position, Position)> {
        let attached = self.attached.as_ref()?;
        let guard = attached.doc.lock();
        guard
            .cursor()
            .has_selection()
            .then(|| guard.cursor().selection())
    }

    pub fn can_go_back(&self) -> bool {
        self.attached
            .as_ref()
            .is_some_and(|attached| attached.doc.lock().cursor().can_go_back())
    }

    pub fn can_go_forward(&self) -> bool {
        self.attached
            .as_ref()
            .is_some_and(|attached| attached.doc.lock().cursor().can_go_forward())
    }

    /// Selected text, column-sliced at both ends and newline-joined.
    pub fn copy_selection(&self) -> Option<String> {
        let attached = self.attached.as_ref()?;
        attached.doc.lock().selected_text()
    }

    /// Identifier-like token at the caret, for host symbol lookups. A caret
    /// sitting just past a word (end of a double-click selection) still
    /// reports that word.
    pub fn word_under_cursor(&self) -> Option<String> {
        let attached = self.attached.as_ref()?;
        let guard = attached.doc.lock();
        let pos = guard.cursor().position();
        let text = guard.line_text(pos.line)?;
        let span = word_span(&text, pos.column)
            .or_else(|| word_span(&text, pos.column.checked_sub(1)?))?;
        Some(word_text(&text, span))
    }

    /// Context commands for the current caret row.
    pub fn enabled_commands(&self) -> CommandSet {
        let Some(attached) = self.attached.as_ref() else {
            return CommandSet::empty();
        };
        let guard = attached.doc.lock();
        let row = RowFacts::at(&guard, guard.cursor().line());
        enabled_commands(row, CursorFacts::of(guard.cursor()))
    }

    // --- internals -----------------------------------------------------

    fn attached_doc(&self) -> Option<Arc<ListingDocument>> {
        self.attached
            .as_ref()
            .map(|attached| Arc::clone(&attached.doc))
    }

    /// Window-relative pointer coordinates shifted into content space.
    fn content_point(&self, point: PixelPoint) -> PixelPoint {
        PixelPoint::new(
            point.x.saturating_add(self.view.horizontal_offset()),
            point.y,
        )
    }

    /// Repaint bookkeeping and announcements after any cursor change: a
    /// still-visible caret repaints its old and new lines, an off-screen
    /// one centers the window and repaints fully, and a horizontal shift
    /// escalates to full as well.
    fn after_cursor_move(
        &mut self,
        now: Instant,
        doc: &Arc<ListingDocument>,
        old_line: Option<usize>,
    ) {
        let busy = doc.busy();
        let (pos, size) = {
            let guard = doc.lock();
            (guard.cursor().position(), guard.size())
        };
        let mut region = DirtyRegion::empty();
        if size != 0 && self.view.is_line_visible(pos.line, size) {
            if let Some(old) = old_line {
                region.add_line(old);
            }
            region.add_line(pos.line);
        } else {
            self.view.ensure_line_visible(pos.line, size);
            region.set_full();
        }
        if self.view.ensure_column_visible(pos.column) {
            region.set_full();
        }
        self.scheduler.request(now, region, busy);
        self.announce_cursor(doc);
    }

    /// Emit address and history events when they differ from the last
    /// announced values.
    fn announce_cursor(&mut self, doc: &Arc<ListingDocument>) {
        let (address, back, forward) = {
            let guard = doc.lock();
            let cursor = guard.cursor();
            (
                guard.address_at(cursor.line()),
                cursor.can_go_back(),
                cursor.can_go_forward(),
            )
        };
        if let Some(address) = address
            && self.last_address != Some(address)
        {
            self.last_address = Some(address);
            self.outbox.push(ViewEvent::AddressChanged(address));
        }
        if back != self.last_back {
            self.last_back = back;
            self.outbox.push(ViewEvent::CanGoBackChanged(back));
        }
        if forward != self.last_forward {
            self.last_forward = forward;
            self.outbox.push(ViewEvent::CanGoForwardChanged(forward));
        }
    }

    /// Queue a repaint of the caret line (blink phase edges). Off-screen
    /// carets and empty documents need nothing.
    fn repaint_cursor_line(&mut self, now: Instant, doc: &Arc<ListingDocument>) {
        let busy = doc.busy();
        let (line, size) = {
            let guard = doc.lock();
            (guard.cursor().line(), guard.size())
        };
        if size != 0 && self.view.is_line_visible(line, size) {
            self.scheduler.request_line(now, line, busy);
        }
    }
}
