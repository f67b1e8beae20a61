//! Listing rows and their classification.
//!
//! A row's `body` is the fully rendered listing text produced by analysis;
//! the viewport core never re-renders it, only measures and slices it.
//! Comments are out-of-band metadata appended at display time so metadata
//! edits never touch the analysis output.

use crate::Address;
use std::borrow::Cow;

/// Row classification at listing-order granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Segment,
    Function,
    Instruction,
    Symbol,
    Empty,
}

impl ItemKind {
    /// Rows that define a name in the symbol table.
    pub const fn defines_symbol(self) -> bool {
        matches!(self, Self::Function | Self::Symbol)
    }
}

/// Symbol classification attached to symbol-defining rows. The viewport core
/// never interprets these; command enablement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Code,
    Data,
    String,
    Pointer,
    /// Imported names are locked: they cannot be renamed.
    Import,
}

impl SymbolKind {
    pub const fn is_code(self) -> bool {
        matches!(self, Self::Function | Self::Code)
    }

    pub const fn is_locked(self) -> bool {
        matches!(self, Self::Import)
    }
}

/// Segment classification of the surrounding section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Code,
    Data,
    /// Uninitialized data: has addresses but no bytes to dump.
    Bss,
}

/// One rendered listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub address: Address,
    pub kind: ItemKind,
    pub body: String,
    pub comment: Option<String>,
    pub symbol: Option<SymbolKind>,
    pub segment: SegmentKind,
}

impl ListingItem {
    pub fn new(address: Address, kind: ItemKind, body: impl Into<String>) -> Self {
        Self {
            address,
            kind,
            body: body.into(),
            comment: None,
            symbol: None,
            segment: SegmentKind::Code,
        }
    }

    pub fn with_symbol(mut self, symbol: SymbolKind) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_segment(mut self, segment: SegmentKind) -> Self {
        self.segment = segment;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Display text: the body plus the comment suffix when present. Borrows
    /// when no comment is attached, which is the common case.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.comment {
            None => Cow::Borrowed(self.body.as_str()),
            Some(comment) => Cow::Owned(format!("{} ; {}", self.body, comment)),
        }
    }

    /// Rendered width in columns. The cursor may sit at exactly this column
    /// (end of row), so valid columns are `0..=last_column()`.
    pub fn last_column(&self) -> usize {
        let base = self.body.chars().count();
        match &self.comment {
            None => base,
            Some(comment) => base + 3 + comment.chars().count(),
        }
    }

    /// Symbol name this row defines, if any: the body up to the label colon.
    pub fn symbol_name(&self) -> Option<&str> {
        if !self.kind.defines_symbol() {
            return None;
        }
        let name = self.body.trim_end_matches(':');
        (!name.is_empty()).then_some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_comment_borrows_body() {
        let item = ListingItem::new(Address::new(0x1000), ItemKind::Instruction, "mov eax, ebx");
        assert!(matches!(item.text(), Cow::Borrowed(_)));
        assert_eq!(item.text(), "mov eax, ebx");
    }

    #[test]
    fn text_with_comment_appends_suffix() {
        let item = ListingItem::new(Address::new(0x1000), ItemKind::Instruction, "ret")
            .with_comment("end of handler");
        assert_eq!(item.text(), "ret ; end of handler");
    }

    #[test]
    fn last_column_matches_rendered_length() {
        let plain = ListingItem::new(Address::new(0), ItemKind::Instruction, "push ebp");
        assert_eq!(plain.last_column(), plain.text().chars().count());

        let commented = plain.clone().with_comment("prologue");
        assert_eq!(commented.last_column(), commented.text().chars().count());
    }

    #[test]
    fn symbol_name_strips_label_colon() {
        let func = ListingItem::new(Address::new(0x401000), ItemKind::Function, "sub_00401000:")
            .with_symbol(SymbolKind::Function);
        assert_eq!(func.symbol_name(), Some("sub_00401000"));

        let insn = ListingItem::new(Address::new(0x401001), ItemKind::Instruction, "nop");
        assert_eq!(insn.symbol_name(), None);
    }
}
