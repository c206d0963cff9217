//! Pointer event stream

use log::trace;

/// Button state carried by `wl_pointer.button`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

impl ButtonState {
    /// Protocol value 1 is pressed; anything else counts as released
    pub fn from_raw(raw: u32) -> Self {
        if raw == 1 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    Enter { serial: u32, x: f64, y: f64 },
    Leave { serial: u32 },
    Motion { time: u32, x: f64, y: f64 },
    Button { serial: u32, time: u32, button: u32, state: ButtonState },
    Axis { time: u32, axis: u32, value: f64 },
    Frame,
}

/// Focus and position of one pointer
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    focused: bool,
    position: (f64, f64),
    enter_serial: Option<u32>,
    pressed_buttons: Vec<u32>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event, returning the log line it produces. Motion and
    /// frame markers only update state.
    pub fn handle(&mut self, event: PointerEvent) -> Option<String> {
        match event {
            PointerEvent::Enter { serial, x, y } => {
                self.focused = true;
                self.enter_serial = Some(serial);
                self.position = (x, y);
                Some("Pointer Enter".to_string())
            }
            PointerEvent::Leave { .. } => {
                self.focused = false;
                self.enter_serial = None;
                self.pressed_buttons.clear();
                Some("Pointer Leave".to_string())
            }
            PointerEvent::Motion { x, y, .. } => {
                self.position = (x, y);
                trace!("Pointer motion to ({:.1}, {:.1})", x, y);
                None
            }
            PointerEvent::Button { button, state, .. } => {
                let label = match state {
                    ButtonState::Pressed => {
                        if !self.pressed_buttons.contains(&button) {
                            self.pressed_buttons.push(button);
                        }
                        "Press"
                    }
                    ButtonState::Released => {
                        self.pressed_buttons.retain(|b| *b != button);
                        "Release"
                    }
                };
                Some(format!("Button {} {}", button, label))
            }
            PointerEvent::Axis { axis, value, .. } => {
                trace!("Pointer axis {} value {:.2}", axis, value);
                Some("Scroll".to_string())
            }
            PointerEvent::Frame => None,
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn enter_serial(&self) -> Option<u32> {
        self.enter_serial
    }

    pub fn pressed_buttons(&self) -> &[u32] {
        &self.pressed_buttons
    }
}
