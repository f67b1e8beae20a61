//! Cursor, selection and navigation history for the listing document.
//!
//! The cursor is plain data. Clamping against document bounds happens in the
//! command layer, which sees the document and the viewport together; here we
//! only guarantee the structural laws:
//!
//! * selection is the (anchor, position) pair, active iff they differ;
//! * any plain move collapses the selection onto the new position;
//! * the back/forward stacks mirror: going back pushes the pre-move position
//!   forward and vice versa, and a fresh jump clears the forward stack.
//!
//! Every mutation reports what actually changed so the facade can skip
//! redundant notifications.

/// Retained entries per history stack; the oldest entry falls off first.
pub const CURSOR_HISTORY_MAX: usize = 128;

/// A listing coordinate. Ordering is document order: by line, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Summary of a cursor mutation: which observable facts changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorEffect {
    /// Position or selection endpoint changed.
    pub moved: bool,
    /// Back-stack availability flipped.
    pub back_changed: bool,
    /// Forward-stack availability flipped.
    pub forward_changed: bool,
}

impl CursorEffect {
    pub const NONE: Self = Self {
        moved: false,
        back_changed: false,
        forward_changed: false,
    };

    pub fn any(self) -> bool {
        self.moved || self.back_changed || self.forward_changed
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListingCursor {
    position: Position,
    anchor: Position,
    back: Vec<Position>,
    forward: Vec<Position>,
}

impl ListingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn has_selection(&self) -> bool {
        self.position != self.anchor
    }

    /// Selection endpoints in document order.
    pub fn selection(&self) -> (Position, Position) {
        if self.anchor <= self.position {
            (self.anchor, self.position)
        } else {
            (self.position, self.anchor)
        }
    }

    pub fn selection_start(&self) -> Position {
        self.selection().0
    }

    pub fn selection_end(&self) -> Position {
        self.selection().1
    }

    /// Collapse the selection and move. True when either endpoint changed.
    pub fn move_to(&mut self, line: usize, column: usize) -> bool {
        let target = Position::new(line, column);
        let changed = self.position != target || self.anchor != target;
        self.position = target;
        self.anchor = target;
        changed
    }

    /// Move the active end only, keeping the anchor (selection extension).
    pub fn select(&mut self, line: usize, column: usize) -> bool {
        let target = Position::new(line, column);
        let changed = self.position != target;
        self.position = target;
        changed
    }

    /// Collapse the selection onto the current position.
    pub fn clear_selection(&mut self) -> bool {
        let changed = self.anchor != self.position;
        self.anchor = self.position;
        changed
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Jump with history: push the pre-jump position on the back stack and
    /// clear the forward stack. Jumping to the current position only
    /// collapses the selection and records nothing.
    pub fn go_to(&mut self, line: usize, column: usize) -> CursorEffect {
        let target = Position::new(line, column);
        if target == self.position {
            return CursorEffect {
                moved: self.clear_selection(),
                ..CursorEffect::NONE
            };
        }
        let back_changed = self.back.is_empty();
        push_capped(&mut self.back, self.position);
        let forward_changed = !self.forward.is_empty();
        self.forward.clear();
        self.position = target;
        self.anchor = target;
        CursorEffect {
            moved: true,
            back_changed,
            forward_changed,
        }
    }

    /// Pop the back stack; the pre-move position lands on the forward stack.
    pub fn go_back(&mut self) -> CursorEffect {
        let Some(target) = self.back.pop() else {
            return CursorEffect::NONE;
        };
        let forward_changed = self.forward.is_empty();
        push_capped(&mut self.forward, self.position);
        let moved = self.position != target || self.anchor != target;
        self.position = target;
        self.anchor = target;
        CursorEffect {
            moved,
            back_changed: self.back.is_empty(),
            forward_changed,
        }
    }

    /// Pop the forward stack; mirror of [`go_back`](Self::go_back).
    pub fn go_forward(&mut self) -> CursorEffect {
        let Some(target) = self.forward.pop() else {
            return CursorEffect::NONE;
        };
        let back_changed = self.back.is_empty();
        push_capped(&mut self.back, self.position);
        let moved = self.position != target || self.anchor != target;
        self.position = target;
        self.anchor = target;
        CursorEffect {
            moved,
            back_changed,
            forward_changed: self.forward.is_empty(),
        }
    }
}

fn push_capped(stack: &mut Vec<Position>, position: Position) {
    stack.push(position);
    if stack.len() > CURSOR_HISTORY_MAX {
        stack.remove(0);
    }
}
