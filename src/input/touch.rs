//! Touch event stream

use log::{debug, trace};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum TouchEvent {
    Down { serial: u32, time: u32, id: i32, x: f64, y: f64 },
    Up { serial: u32, time: u32, id: i32 },
    Motion { time: u32, id: i32, x: f64, y: f64 },
    /// End of an atomic batch of touch events
    Frame,
    Cancel,
}

/// Active contacts keyed by touch id
#[derive(Debug, Clone, Default)]
pub struct TouchState {
    contacts: BTreeMap<i32, (f64, f64)>,
}

impl TouchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event, returning the log line it produces
    pub fn handle(&mut self, event: TouchEvent) -> Option<String> {
        match event {
            TouchEvent::Down { id, x, y, .. } => {
                self.contacts.insert(id, (x, y));
                Some(format!("Touch Down {}", id))
            }
            TouchEvent::Up { id, .. } => {
                self.contacts.remove(&id);
                Some(format!("Touch Up {}", id))
            }
            TouchEvent::Motion { id, x, y, .. } => {
                if let Some(point) = self.contacts.get_mut(&id) {
                    *point = (x, y);
                } else {
                    trace!("Motion for unknown touch contact {}", id);
                }
                None
            }
            TouchEvent::Frame => None,
            TouchEvent::Cancel => {
                debug!("Touch sequence cancelled, dropping {} contacts", self.contacts.len());
                self.contacts.clear();
                Some("Touch Cancel".to_string())
            }
        }
    }

    pub fn active_contacts(&self) -> impl Iterator<Item = i32> + '_ {
        self.contacts.keys().copied()
    }

    pub fn contact(&self, id: i32) -> Option<(f64, f64)> {
        self.contacts.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_motion_up() {
        let mut touch = TouchState::new();
        let line = touch.handle(TouchEvent::Down { serial: 1, time: 0, id: 2, x: 1.0, y: 1.0 });
        assert_eq!(line.as_deref(), Some("Touch Down 2"));

        assert_eq!(touch.handle(TouchEvent::Motion { time: 1, id: 2, x: 3.0, y: 4.0 }), None);
        assert_eq!(touch.contact(2), Some((3.0, 4.0)));
        assert_eq!(touch.handle(TouchEvent::Frame), None);

        let line = touch.handle(TouchEvent::Up { serial: 2, time: 2, id: 2 });
        assert_eq!(line.as_deref(), Some("Touch Up 2"));
        assert_eq!(touch.active_contacts().count(), 0);
    }

    #[test]
    fn test_cancel_clears_contacts() {
        let mut touch = TouchState::new();
        touch.handle(TouchEvent::Down { serial: 1, time: 0, id: 0, x: 0.0, y: 0.0 });
        touch.handle(TouchEvent::Down { serial: 2, time: 0, id: 1, x: 0.0, y: 0.0 });
        assert_eq!(touch.active_contacts().collect::<Vec<_>>(), vec![0, 1]);

        assert_eq!(touch.handle(TouchEvent::Cancel).as_deref(), Some("Touch Cancel"));
        assert_eq!(touch.active_contacts().count(), 0);
    }
}
