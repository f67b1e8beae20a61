//! Pointer gesture state between press and release.
//!
//! The host forwards raw pointer transitions; this remembers whether a
//! press is still held so that motion extends the selection instead of
//! moving the caret. One button, one gesture: listings have no
//! multi-pointer interactions.

/// Drag phase of the primary pointer button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DragState {
    /// No button held; pointer motion is ignored.
    #[default]
    Idle,
    /// Button held since the press; motion extends the selection.
    Selecting,
}

impl DragState {
    pub fn begin(&mut self) {
        *self = Self::Selecting;
    }

    /// Finish the gesture. Returns whether a drag was in progress, letting
    /// the host tell a click release from a drag release.
    pub fn end(&mut self) -> bool {
        std::mem::replace(self, Self::Idle) == Self::Selecting
    }

    pub const fn is_selecting(self) -> bool {
        matches!(self, Self::Selecting)
    }
}
