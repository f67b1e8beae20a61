use core_events::{KeyCode, MouseButton, MouseEventKind};
use crossterm::event::{
    KeyCode as CKeyCode, MouseButton as CMouseButton, MouseEventKind as CMouseEventKind,
};

/// Map a crossterm key code onto the reduced set the keymap understands.
///
/// Returns `None` for keys the viewer has no binding surface for (function
/// keys, media keys, lock keys).
pub(crate) fn map_key_code(code: CKeyCode) -> Option<KeyCode> {
    let mapped = match code {
        CKeyCode::Char(c) => KeyCode::Char(c),
        CKeyCode::Enter => KeyCode::Enter,
        CKeyCode::Esc => KeyCode::Esc,
        CKeyCode::Backspace => KeyCode::Backspace,
        CKeyCode::Tab | CKeyCode::BackTab => KeyCode::Tab,
        CKeyCode::Up => KeyCode::Up,
        CKeyCode::Down => KeyCode::Down,
        CKeyCode::Left => KeyCode::Left,
        CKeyCode::Right => KeyCode::Right,
        CKeyCode::Home => KeyCode::Home,
        CKeyCode::End => KeyCode::End,
        CKeyCode::PageUp => KeyCode::PageUp,
        CKeyCode::PageDown => KeyCode::PageDown,
        CKeyCode::Insert
        | CKeyCode::Delete
        | CKeyCode::F(_)
        | CKeyCode::Null
        | CKeyCode::CapsLock
        | CKeyCode::ScrollLock
        | CKeyCode::NumLock
        | CKeyCode::PrintScreen
        | CKeyCode::Pause
        | CKeyCode::Menu
        | CKeyCode::KeypadBegin
        | CKeyCode::Media(_)
        | CKeyCode::Modifier(_) => return None,
    };
    Some(mapped)
}

/// Map a crossterm mouse action onto the viewer's mouse vocabulary.
///
/// Horizontal wheel ticks return `None`; the listing scrolls vertically only.
pub(crate) fn map_mouse_kind(kind: CMouseEventKind) -> Option<MouseEventKind> {
    let mapped = match kind {
        CMouseEventKind::Down(button) => MouseEventKind::Down(map_mouse_button(button)),
        CMouseEventKind::Up(button) => MouseEventKind::Up(map_mouse_button(button)),
        CMouseEventKind::Drag(button) => MouseEventKind::Drag(map_mouse_button(button)),
        CMouseEventKind::Moved => MouseEventKind::Moved,
        CMouseEventKind::ScrollUp => MouseEventKind::ScrollUp,
        CMouseEventKind::ScrollDown => MouseEventKind::ScrollDown,
        CMouseEventKind::ScrollLeft | CMouseEventKind::ScrollRight => return None,
    };
    Some(mapped)
}

fn map_mouse_button(button: CMouseButton) -> MouseButton {
    match button {
        CMouseButton::Left => MouseButton::Left,
        CMouseButton::Middle => MouseButton::Middle,
        CMouseButton::Right => MouseButton::Right,
    }
}
