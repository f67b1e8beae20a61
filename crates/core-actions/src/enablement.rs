//! Context-command enablement for the row under the caret.
//!
//! Pure fact-to-flag mapping: the host snapshots [`RowFacts`] and
//! [`CursorFacts`] under one document lock, releases it, and builds its
//! menu from the returned set. No command here executes anything.

use bitflags::bitflags;
use core_listing::{DocumentGuard, ItemKind, ListingCursor, SegmentKind, SymbolKind};

bitflags! {
    /// Context commands available for one caret snapshot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CommandSet: u16 {
        const RENAME        = 0b0000_0000_0001;
        const COMMENT       = 0b0000_0000_0010;
        const XREFS         = 0b0000_0000_0100;
        const FOLLOW        = 0b0000_0000_1000;
        const FOLLOW_PTR    = 0b0000_0001_0000;
        const GOTO          = 0b0000_0010_0000;
        const CALL_GRAPH    = 0b0000_0100_0000;
        const HEX_DUMP      = 0b0000_1000_0000;
        const HEX_DUMP_FUNC = 0b0001_0000_0000;
        const BACK          = 0b0010_0000_0000;
        const FORWARD       = 0b0100_0000_0000;
        const COPY          = 0b1000_0000_0000;
    }
}

/// Facts about the row under the caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowFacts {
    pub is_instruction: bool,
    pub symbol: Option<SymbolKind>,
    /// `None` only when no row exists at the caret line.
    pub segment: Option<SegmentKind>,
    pub in_function: bool,
}

impl RowFacts {
    /// Snapshot facts for `line`. Out-of-range lines (and the empty
    /// document) report no facts, leaving only the always-on commands.
    pub fn at(doc: &DocumentGuard<'_>, line: usize) -> Self {
        let Some(item) = doc.item_at(line) else {
            return Self::default();
        };
        Self {
            is_instruction: item.kind == ItemKind::Instruction,
            symbol: item.symbol,
            segment: Some(item.segment),
            in_function: doc.enclosing_function(line).is_some(),
        }
    }
}

/// Caret-wide facts independent of the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorFacts {
    pub has_selection: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

impl CursorFacts {
    pub fn of(cursor: &ListingCursor) -> Self {
        Self {
            has_selection: cursor.has_selection(),
            can_go_back: cursor.can_go_back(),
            can_go_forward: cursor.can_go_forward(),
        }
    }
}

/// Build the command set for one caret snapshot.
///
/// Address navigation is always on. Everything else keys off the facts:
/// comments attach to instructions, symbol commands need a symbol (rename
/// additionally an unlocked one, follow a code one, follow-pointer a
/// pointer), the call graph needs a function context, and hex dumps need
/// initialized bytes, so BSS rows never offer them.
pub fn enabled_commands(row: RowFacts, cursor: CursorFacts) -> CommandSet {
    let mut set = CommandSet::GOTO;
    if row.is_instruction {
        set |= CommandSet::COMMENT;
    }
    if cursor.has_selection {
        set |= CommandSet::COPY;
    }
    if cursor.can_go_back {
        set |= CommandSet::BACK;
    }
    if cursor.can_go_forward {
        set |= CommandSet::FORWARD;
    }
    if let Some(symbol) = row.symbol {
        set |= CommandSet::XREFS;
        if !symbol.is_locked() {
            set |= CommandSet::RENAME;
        }
        if symbol.is_code() {
            set |= CommandSet::FOLLOW;
        }
        if symbol == SymbolKind::Pointer {
            set |= CommandSet::FOLLOW_PTR;
        }
    }
    if row.in_function || row.symbol == Some(SymbolKind::Function) {
        set |= CommandSet::CALL_GRAPH;
    }
    if let Some(segment) = row.segment
        && segment != SegmentKind::Bss
    {
        set |= CommandSet::HEX_DUMP;
        if row.in_function {
            set |= CommandSet::HEX_DUMP_FUNC;
        }
    }
    set
}
