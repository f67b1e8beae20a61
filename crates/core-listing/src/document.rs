//! Thread-safe listing document: rows, cursor and change publication.
//!
//! Locking contract: all row/cursor access goes through a short-lived
//! [`DocumentGuard`]. Mutators acquire the lock, apply the change, release,
//! and only then publish the change event, so no subscriber ever observes
//! the lock held across a notification. The busy flag lives outside the lock
//! entirely; workers flip it around mutation bursts.
//!
//! Subscriptions are revocable handles over unbounded channels. Publication
//! never blocks; a dropped receiver is pruned on the next publish.

use crate::cursor::ListingCursor;
use crate::item::{ItemKind, ListingItem, SegmentKind, SymbolKind};
use crate::Address;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use thiserror::Error;
use tracing::trace;

/// What a mutation did to the row vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Row content changed in place (comment, rename, re-rendered text).
    Changed,
    /// A row appeared at `index`; following rows shifted down.
    Inserted,
    /// The row previously at `index` is gone; following rows shifted up.
    Removed,
}

/// Change event published to subscribers after each mutation. Indices refer
/// to the post-mutation row vector for `Inserted`/`Changed` and to the
/// pre-mutation vector for `Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub index: usize,
}

/// Domain errors for metadata mutations driven by host calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("symbol name already in use: {0}")]
    DuplicateName(String),
    #[error("no row at address {0}")]
    UnknownAddress(Address),
    #[error("row at address {0} does not define a symbol")]
    NotASymbol(Address),
}

#[derive(Default)]
struct DocumentInner {
    items: Vec<ListingItem>,
    cursor: ListingCursor,
    /// Name -> defining address. Kept in lockstep with symbol-defining rows
    /// so rename collisions are detected without a row scan.
    symbols: HashMap<String, Address>,
}

/// Thread-safe listing store shared between analysis workers and the UI.
pub struct ListingDocument {
    inner: Mutex<DocumentInner>,
    busy: AtomicBool,
    subscribers: Mutex<Vec<(u64, Sender<DocumentChange>)>>,
    next_subscriber: AtomicU64,
}

impl Default for ListingDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingDocument {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<ListingItem>) -> Self {
        let mut symbols = HashMap::new();
        for item in &items {
            if let Some(name) = item.symbol_name() {
                symbols.insert(name.to_string(), item.address);
            }
        }
        Self {
            inner: Mutex::new(DocumentInner {
                items,
                cursor: ListingCursor::new(),
                symbols,
            }),
            busy: AtomicBool::new(false),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber: AtomicU64::new(0),
        }
    }

    /// Whether analysis is actively mutating the document.
    pub fn busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
        trace!(target: "listing.doc", busy, "busy_flag");
    }

    /// Exclusive, short-lived access to rows and cursor. A poisoned lock
    /// still yields the inner state: every read re-clamps against current
    /// bounds, so recovery cannot observe a broken invariant.
    pub fn lock(&self) -> DocumentGuard<'_> {
        DocumentGuard {
            inner: self.lock_inner(),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, DocumentInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Row count. Shorthand for `lock().size()` where no other state is
    /// needed in the same critical section.
    pub fn size(&self) -> usize {
        self.lock_inner().items.len()
    }

    /// Register a change subscriber. The handle revokes itself on drop; it
    /// holds only a weak back-reference and never extends the document's
    /// lifetime.
    pub fn subscribe(self: &Arc<Self>) -> ChangeSubscription {
        let (tx, rx) = unbounded();
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.lock_subscribers().push((id, tx));
        trace!(target: "listing.doc", id, "subscriber_added");
        ChangeSubscription {
            id,
            rx,
            doc: Arc::downgrade(self),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(u64, Sender<DocumentChange>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn unsubscribe(&self, id: u64) {
        self.lock_subscribers().retain(|(sid, _)| *sid != id);
        trace!(target: "listing.doc", id, "subscriber_removed");
    }

    /// Fan a change out to every subscriber. Senders are snapshotted first so
    /// the registry lock is never held while sending; dead receivers are
    /// pruned afterwards.
    fn publish(&self, change: DocumentChange) {
        let senders: Vec<(u64, Sender<DocumentChange>)> = self.lock_subscribers().clone();
        let mut dead = Vec::new();
        for (id, tx) in &senders {
            if tx.send(change).is_err() {
                dead.push(*id);
            }
        }
        if !dead.is_empty() {
            self.lock_subscribers()
                .retain(|(id, _)| !dead.contains(id));
        }
        trace!(
            target: "listing.doc",
            kind = ?change.kind,
            index = change.index,
            "change_published"
        );
    }

    // --- mutators (worker/host API) ------------------------------------

    /// Append a row. Returns its index.
    pub fn push(&self, item: ListingItem) -> usize {
        let index = {
            let mut inner = self.lock_inner();
            register_symbol(&mut inner, &item);
            inner.items.push(item);
            inner.items.len() - 1
        };
        self.publish(DocumentChange {
            kind: ChangeKind::Inserted,
            index,
        });
        index
    }

    /// Insert a row at `index` (clamped to the row count). Returns the
    /// effective index.
    pub fn insert(&self, index: usize, item: ListingItem) -> usize {
        let index = {
            let mut inner = self.lock_inner();
            let index = index.min(inner.items.len());
            register_symbol(&mut inner, &item);
            inner.items.insert(index, item);
            index
        };
        self.publish(DocumentChange {
            kind: ChangeKind::Inserted,
            index,
        });
        index
    }

    /// Remove the row at `index`. Out-of-range indices are inert.
    pub fn remove(&self, index: usize) -> Option<ListingItem> {
        let removed = {
            let mut inner = self.lock_inner();
            if index >= inner.items.len() {
                return None;
            }
            let item = inner.items.remove(index);
            unregister_symbol(&mut inner, &item);
            item
        };
        self.publish(DocumentChange {
            kind: ChangeKind::Removed,
            index,
        });
        Some(removed)
    }

    /// Replace the rendered body of the row at `index` (analysis refined its
    /// output). Out-of-range indices are inert.
    pub fn update_body(&self, index: usize, body: impl Into<String>) -> bool {
        let updated = {
            let mut inner = self.lock_inner();
            match inner.items.get_mut(index) {
                Some(item) => {
                    item.body = body.into();
                    true
                }
                None => false,
            }
        };
        if updated {
            self.publish(DocumentChange {
                kind: ChangeKind::Changed,
                index,
            });
        }
        updated
    }

    /// Attach or clear the comment on the first row at `address`, preferring
    /// an instruction row when several share the address. Empty text clears.
    pub fn set_comment(&self, address: Address, comment: &str) -> Result<usize, DocumentError> {
        let index = {
            let mut inner = self.lock_inner();
            let index = index_for_comment(&inner, address)
                .ok_or(DocumentError::UnknownAddress(address))?;
            inner.items[index].comment = if comment.is_empty() {
                None
            } else {
                Some(comment.to_string())
            };
            index
        };
        self.publish(DocumentChange {
            kind: ChangeKind::Changed,
            index,
        });
        Ok(index)
    }

    /// Rename the symbol defined at `address`. Fails without touching any
    /// state when the name is taken by another address, when no row defines
    /// a symbol there, or when the symbol is locked.
    pub fn rename(&self, address: Address, name: &str) -> Result<usize, DocumentError> {
        let index = {
            let mut inner = self.lock_inner();
            let index = inner
                .items
                .iter()
                .position(|item| item.address == address && item.kind.defines_symbol())
                .ok_or(DocumentError::NotASymbol(address))?;
            if inner.items[index]
                .symbol
                .is_some_and(SymbolKind::is_locked)
            {
                return Err(DocumentError::NotASymbol(address));
            }
            if let Some(&owner) = inner.symbols.get(name)
                && owner != address
            {
                return Err(DocumentError::DuplicateName(name.to_string()));
            }
            let old_name = inner.items[index].symbol_name().map(str::to_string);
            if let Some(old) = old_name {
                inner.symbols.remove(&old);
            }
            inner.items[index].body = format!("{name}:");
            inner.symbols.insert(name.to_string(), address);
            index
        };
        self.publish(DocumentChange {
            kind: ChangeKind::Changed,
            index,
        });
        trace!(target: "listing.doc", %address, name, "symbol_renamed");
        Ok(index)
    }
}

fn register_symbol(inner: &mut DocumentInner, item: &ListingItem) {
    if let Some(name) = item.symbol_name() {
        inner.symbols.insert(name.to_string(), item.address);
    }
}

fn unregister_symbol(inner: &mut DocumentInner, item: &ListingItem) {
    if let Some(name) = item.symbol_name()
        && inner.symbols.get(name) == Some(&item.address)
    {
        inner.symbols.remove(name);
    }
}

/// Instruction rows win address lookups for comments; otherwise the first
/// row at the address is taken.
fn index_for_comment(inner: &DocumentInner, address: Address) -> Option<usize> {
    let mut first = None;
    for (index, item) in inner.items.iter().enumerate() {
        if item.address != address {
            continue;
        }
        if item.kind == ItemKind::Instruction {
            return Some(index);
        }
        if first.is_none() {
            first = Some(index);
        }
    }
    first
}

/// Exclusive view over rows and cursor. Keep guards short-lived: nothing
/// here blocks, and the facade never holds one across a repaint request or
/// an outgoing notification.
pub struct DocumentGuard<'a> {
    inner: MutexGuard<'a, DocumentInner>,
}

impl DocumentGuard<'_> {
    pub fn size(&self) -> usize {
        self.inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    pub fn last_line(&self) -> Option<usize> {
        self.inner.items.len().checked_sub(1)
    }

    pub fn item_at(&self, line: usize) -> Option<&ListingItem> {
        self.inner.items.get(line)
    }

    pub fn address_at(&self, line: usize) -> Option<Address> {
        self.item_at(line).map(|item| item.address)
    }

    pub fn line_text(&self, line: usize) -> Option<Cow<'_, str>> {
        self.item_at(line).map(ListingItem::text)
    }

    /// Rendered width of `line`; 0 for out-of-range lines so clamping math
    /// stays total.
    pub fn last_column(&self, line: usize) -> usize {
        self.item_at(line).map_or(0, ListingItem::last_column)
    }

    pub fn symbol_at(&self, line: usize) -> Option<SymbolKind> {
        self.item_at(line).and_then(|item| item.symbol)
    }

    pub fn segment_at(&self, line: usize) -> Option<SegmentKind> {
        self.item_at(line).map(|item| item.segment)
    }

    /// Index of the function header covering `line`: the nearest
    /// [`ItemKind::Function`] row at or above it, scanning in listing order
    /// and stopping at segment headers. Analysis emits function bodies
    /// contiguously under their header row, so listing order stands in for
    /// byte extents.
    pub fn enclosing_function(&self, line: usize) -> Option<usize> {
        if line >= self.inner.items.len() {
            return None;
        }
        for index in (0..=line).rev() {
            match self.inner.items[index].kind {
                ItemKind::Function => return Some(index),
                ItemKind::Segment => return None,
                _ => {}
            }
        }
        None
    }

    /// First row at `address` in listing order. Rows are address-ordered by
    /// construction but insertion does not enforce it, so lookup stays a
    /// linear scan.
    pub fn index_of_address(&self, address: Address) -> Option<usize> {
        self.inner
            .items
            .iter()
            .position(|item| item.address == address)
    }

    /// Index of an exact row.
    pub fn index_of(&self, item: &ListingItem) -> Option<usize> {
        self.inner.items.iter().position(|candidate| candidate == item)
    }

    pub fn cursor(&self) -> &ListingCursor {
        &self.inner.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut ListingCursor {
        &mut self.inner.cursor
    }

    /// Assemble the selected text: column-sliced at both ends, whole rows in
    /// between, newline-joined. `None` without an active selection.
    pub fn selected_text(&self) -> Option<String> {
        let cursor = self.cursor();
        if !cursor.has_selection() {
            return None;
        }
        let (start, end) = cursor.selection();
        if start.line == end.line {
            let text = self.line_text(start.line)?;
            return Some(column_slice(&text, start.column, Some(end.column)).to_string());
        }

        let mut out = String::new();
        for line in start.line..=end.line.min(self.last_line()?) {
            let Some(text) = self.line_text(line) else {
                continue;
            };
            if line == start.line {
                out.push_str(column_slice(&text, start.column, None));
            } else if line == end.line {
                out.push('\n');
                out.push_str(column_slice(&text, 0, Some(end.column)));
            } else {
                out.push('\n');
                out.push_str(&text);
            }
        }
        Some(out)
    }
}

/// Byte offset of `column` in `text`, saturating past the end.
fn byte_at(text: &str, column: usize) -> usize {
    text.char_indices()
        .nth(column)
        .map_or(text.len(), |(offset, _)| offset)
}

fn column_slice(text: &str, start: usize, end: Option<usize>) -> &str {
    let from = byte_at(text, start);
    let to = end.map_or(text.len(), |column| byte_at(text, column));
    &text[from..to.max(from)]
}

/// Revocable change subscription. Dropping the handle removes the
/// subscriber.
#[derive(Debug)]
pub struct ChangeSubscription {
    id: u64,
    rx: Receiver<DocumentChange>,
    doc: Weak<ListingDocument>,
}

impl ChangeSubscription {
    /// Drain queued changes without blocking. Called on the UI tick.
    pub fn drain(&self) -> impl Iterator<Item = DocumentChange> + '_ {
        self.rx.try_iter()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(doc) = self.doc.upgrade() {
            doc.unsubscribe(self.id);
        }
    }
}
