//! Terminal capability probing.
//!
//! Records the booleans the host consults when deciding which escape-sequence
//! features to enable at startup.
//!
//! Design considerations:
//! * Must be cheap: detection runs once at startup.
//! * Cross-platform: for now we optimistically assume mouse capture and
//!   focus-change reporting everywhere crossterm runs; later refinements may
//!   emit a probe sequence and measure the terminal response.
//! * Extensible: struct is non-exhaustive so additional capabilities can be
//!   added without breaking downstream code.
//!
//! The focus flag matters to the cursor blink policy: without focus events
//! the cursor would stay force-hidden after the first focus loss, so hosts
//! should skip the unfocused branch when the flag is off.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TerminalCapabilities {
    pub supports_mouse_capture: bool,
    pub supports_focus_change: bool,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        // Optimistic policy: every terminal we target speaks SGR mouse and
        // focus-change reporting. Round-trip probing can refine this later.
        Self {
            supports_mouse_capture: true,
            supports_focus_change: true,
        }
    }
}
