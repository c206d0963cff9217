//! Keyboard event stream
//!
//! The keymap is never interpreted: its descriptor is closed on arrival and
//! keys are labelled from the evdev table in [`crate::keycodes`].

use crate::keycodes;
use log::debug;

/// Key state carried by `wl_keyboard.key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    /// Protocol value 1 is pressed; anything else counts as released
    pub fn from_raw(raw: u32) -> Self {
        if raw == 1 {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }
}

/// Modifier masks from the last `wl_keyboard.modifiers`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardEvent {
    /// Keymap announcement; the descriptor itself is closed by the caller
    Keymap { format: u32, size: u32 },
    Enter { serial: u32, keys: Vec<u32> },
    Leave { serial: u32 },
    Key { serial: u32, time: u32, key: u32, state: KeyState },
    Modifiers(Modifiers),
    RepeatInfo { rate: i32, delay: i32 },
}

#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    focused: bool,
    modifiers: Modifiers,
    repeat: Option<(i32, i32)>,
    keymap_format: Option<u32>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event, returning the log line it produces
    pub fn handle(&mut self, event: KeyboardEvent) -> Option<String> {
        match event {
            KeyboardEvent::Keymap { format, size } => {
                debug!("Keymap announced (format={}, {} bytes), not mapped", format, size);
                self.keymap_format = Some(format);
                None
            }
            KeyboardEvent::Enter { keys, .. } => {
                self.focused = true;
                debug!("Keyboard focus gained with {} keys held", keys.len());
                Some("Keyboard Focus Gained".to_string())
            }
            KeyboardEvent::Leave { .. } => {
                self.focused = false;
                Some("Keyboard Focus Lost".to_string())
            }
            KeyboardEvent::Key { key, state, .. } => {
                debug!("Keyboard event: key={} state={:?}", key, state);
                let direction = match state {
                    KeyState::Pressed => "Down",
                    KeyState::Released => "Up",
                };
                Some(format!("{} {} ({})", direction, keycodes::label(key), key))
            }
            KeyboardEvent::Modifiers(modifiers) => {
                self.modifiers = modifiers;
                None
            }
            KeyboardEvent::RepeatInfo { rate, delay } => {
                self.repeat = Some((rate, delay));
                None
            }
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// `(rate, delay)` from the last repeat hint
    pub fn repeat_info(&self) -> Option<(i32, i32)> {
        self.repeat
    }

    pub fn keymap_format(&self) -> Option<u32> {
        self.keymap_format
    }
}
