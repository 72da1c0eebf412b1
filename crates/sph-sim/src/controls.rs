use sph_engine::input::{InputEvent, Key};

use crate::scheduler::ControlEvent;

/// Maps translated input events to scheduler control events.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub pause: Vec<Key>,
    pub close: Vec<Key>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause: vec![Key::Space, Key::P],
            close: vec![Key::Escape, Key::Q],
        }
    }
}

impl KeyBindings {
    /// Held keys (auto-repeat) are ignored so a long press toggles pause once.
    pub fn map(&self, event: &InputEvent) -> Option<ControlEvent> {
        if *event == InputEvent::CloseRequested {
            return Some(ControlEvent::CloseRequest);
        }

        let key = event.key_pressed()?;
        if self.pause.contains(&key) {
            Some(ControlEvent::PauseToggle)
        } else if self.close.contains(&key) {
            Some(ControlEvent::CloseRequest)
        } else {
            None
        }
    }
}
