//! Async terminal input service.
//!
//! Owns the background task that reads `crossterm` events off the terminal
//! and republishes them as normalized [`core_events::Event`] values on the
//! runtime channel. Key, mouse, resize, and focus events are translated here;
//! everything downstream (keymap, viewport) works in terminal-agnostic types.

mod async_service;
mod translate;

pub use async_service::AsyncInputShutdown;

use async_service::spawn_async_event_task;

use core_events::{Event, KeyModifiers};
use crossterm::event::KeyModifiers as CMods;
use tokio::task::JoinHandle;

/// Spawn the async input service backed by `crossterm::EventStream`.
///
/// Returns the `JoinHandle` for the background task alongside a shutdown handle
/// that can be used to request immediate termination.
pub fn spawn_async_input(
    sender: tokio::sync::mpsc::Sender<Event>,
) -> (JoinHandle<()>, AsyncInputShutdown) {
    spawn_async_event_task(sender)
}

pub(crate) fn map_mods(m: CMods) -> KeyModifiers {
    let mut out = KeyModifiers::empty();
    if m.contains(CMods::CONTROL) {
        out |= KeyModifiers::CTRL;
    }
    if m.contains(CMods::ALT) {
        out |= KeyModifiers::ALT;
    }
    if m.contains(CMods::SHIFT) {
        out |= KeyModifiers::SHIFT;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_flags_translate_bitwise() {
        assert_eq!(map_mods(CMods::NONE), KeyModifiers::empty());
        assert_eq!(map_mods(CMods::CONTROL), KeyModifiers::CTRL);
        assert_eq!(
            map_mods(CMods::CONTROL | CMods::SHIFT),
            KeyModifiers::CTRL | KeyModifiers::SHIFT
        );
    }

    #[test]
    fn unknown_modifier_bits_are_dropped() {
        assert_eq!(map_mods(CMods::SUPER | CMods::META), KeyModifiers::empty());
    }
}
