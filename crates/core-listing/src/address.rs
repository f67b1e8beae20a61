//! Virtual addresses as carried by listing rows.

use std::fmt;

/// Virtual address of a listing row. Multiple rows may share one address
/// (a function header and its first instruction, for example); address
/// lookup resolves to the first row in listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub u64);

impl Address {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Address at a positive byte offset, saturating at the top of the
    /// address space.
    pub const fn offset(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(Address::new(0x401000).to_string(), "00401000");
        assert_eq!(Address::new(0x1_0040_1000).to_string(), "100401000");
    }

    #[test]
    fn ordering_follows_numeric_value() {
        assert!(Address::new(0x400000) < Address::new(0x401000));
    }

    #[test]
    fn offset_saturates() {
        assert_eq!(Address::new(u64::MAX).offset(16), Address::new(u64::MAX));
        assert_eq!(Address::new(0x1000).offset(4), Address::new(0x1004));
    }
}
