/// Keyboard key identifier.
///
/// Only the keys the viewer binds are named; everything else maps to
/// `Key::Unknown` carrying the platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Space,
    P,
    Q,

    /// Platform-dependent key not represented here.
    Unknown(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// Platform-agnostic input event.
///
/// The runtime translates window-system events into these before handing them
/// to the application, so application code never sees `winit` types.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        key: Key,
        state: KeyState,
        /// Auto-repeat from a held key.
        repeat: bool,
    },

    /// Window gained (`true`) or lost (`false`) focus.
    Focused(bool),

    /// The user asked the window to close (title-bar button, Alt+F4, ...).
    CloseRequested,
}

impl InputEvent {
    /// Returns the key for a fresh (non-repeat) key press.
    pub fn key_pressed(&self) -> Option<Key> {
        match self {
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                repeat: false,
            } => Some(*key),
            _ => None,
        }
    }
}
