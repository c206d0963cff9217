//! Seats and their input devices
//!
//! Each `wl_seat` global becomes a [`Seat`] keyed by its registry name. A
//! seat's capability mask decides which device streams exist: a device is
//! acquired when its bit appears and released when the bit goes away.

pub mod keyboard;
pub mod pointer;
pub mod touch;

pub use keyboard::{KeyState, KeyboardEvent, KeyboardState, Modifiers};
pub use pointer::{ButtonState, PointerEvent, PointerState};
pub use touch::{TouchEvent, TouchState};

use crate::error::ClientError;
use log::{debug, info, warn};
use std::fmt;
use std::ops::BitOr;

/// `wl_seat` capability bitmask
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const POINTER: Capabilities = Capabilities(1);
    pub const KEYBOARD: Capabilities = Capabilities(2);
    pub const TOUCH: Capabilities = Capabilities(4);

    const KNOWN: u32 = 0b111;

    /// Builds a mask from the protocol value, dropping unknown bits
    pub fn from_bits(bits: u32) -> Self {
        Capabilities(bits & Self::KNOWN)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Capabilities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Capabilities;

    fn bitor(self, rhs: Capabilities) -> Capabilities {
        Capabilities(self.0 | rhs.0)
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Device::ALL
            .iter()
            .filter(|d| self.contains(d.capability()))
            .map(|d| d.name())
            .collect();
        if names.is_empty() {
            write!(f, "Capabilities(none)")
        } else {
            write!(f, "Capabilities({})", names.join(" | "))
        }
    }
}

/// Input device kinds a seat can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Pointer,
    Keyboard,
    Touch,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Pointer, Device::Keyboard, Device::Touch];

    pub fn capability(&self) -> Capabilities {
        match self {
            Device::Pointer => Capabilities::POINTER,
            Device::Keyboard => Capabilities::KEYBOARD,
            Device::Touch => Capabilities::TOUCH,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Device::Pointer => "pointer",
            Device::Keyboard => "keyboard",
            Device::Touch => "touch",
        }
    }
}

/// Handle changes produced by capability reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Acquire(Device),
    Release(Device),
}

/// One input seat
#[derive(Debug, Clone)]
pub struct Seat {
    id: u32,
    version: u32,
    name: Option<String>,
    capabilities: Capabilities,
    pointer: Option<PointerState>,
    keyboard: Option<KeyboardState>,
    touch: Option<TouchState>,
}

impl Seat {
    pub fn new(id: u32, version: u32) -> Self {
        Self {
            id,
            version,
            name: None,
            capabilities: Capabilities::NONE,
            pointer: None,
            keyboard: None,
            touch: None,
        }
    }

    /// Brings the device handles in line with `capabilities`
    pub fn reconcile(&mut self, capabilities: Capabilities) -> Vec<DeviceChange> {
        let mut changes = Vec::new();

        for device in Device::ALL {
            let wanted = capabilities.contains(device.capability());
            match (wanted, self.has(device)) {
                (true, false) => {
                    self.attach(device);
                    changes.push(DeviceChange::Acquire(device));
                }
                (false, true) => {
                    self.detach(device);
                    changes.push(DeviceChange::Release(device));
                }
                _ => {}
            }
        }

        self.capabilities = capabilities;
        changes
    }

    /// Devices currently held, for teardown
    pub fn held_devices(&self) -> Vec<Device> {
        Device::ALL.into_iter().filter(|d| self.has(*d)).collect()
    }

    pub fn has(&self, device: Device) -> bool {
        match device {
            Device::Pointer => self.pointer.is_some(),
            Device::Keyboard => self.keyboard.is_some(),
            Device::Touch => self.touch.is_some(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn pointer(&self) -> Option<&PointerState> {
        self.pointer.as_ref()
    }

    pub fn keyboard(&self) -> Option<&KeyboardState> {
        self.keyboard.as_ref()
    }

    pub fn touch(&self) -> Option<&TouchState> {
        self.touch.as_ref()
    }

    fn attach(&mut self, device: Device) {
        match device {
            Device::Pointer => self.pointer = Some(PointerState::new()),
            Device::Keyboard => self.keyboard = Some(KeyboardState::new()),
            Device::Touch => self.touch = Some(TouchState::new()),
        }
    }

    fn detach(&mut self, device: Device) {
        match device {
            Device::Pointer => self.pointer = None,
            Device::Keyboard => self.keyboard = None,
            Device::Touch => self.touch = None,
        }
    }
}

/// All known seats, in advertisement order
#[derive(Debug, Default)]
pub struct SeatManager {
    seats: Vec<Seat>,
}

impl SeatManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: u32, version: u32) {
        if self.seats.iter().any(|s| s.id == id) {
            return;
        }
        debug!("Tracking seat {} (v{})", id, version);
        self.seats.push(Seat::new(id, version));
    }

    /// Forgets a seat, returning it so the caller can release its devices
    pub fn remove(&mut self, id: u32) -> Option<Seat> {
        let idx = self.seats.iter().position(|s| s.id == id)?;
        Some(self.seats.remove(idx))
    }

    pub fn get(&self, id: u32) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Result<&mut Seat, ClientError> {
        self.seats
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(ClientError::UnknownSeat(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Seat> {
        self.seats.iter()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn set_capabilities(
        &mut self,
        id: u32,
        capabilities: Capabilities,
    ) -> Result<Vec<DeviceChange>, ClientError> {
        let seat = self.get_mut(id)?;
        info!("Seat {} capabilities: {:?}", id, capabilities);
        let changes = seat.reconcile(capabilities);
        for change in &changes {
            match change {
                DeviceChange::Acquire(device) => info!("Seat {} has {}", id, device.name()),
                DeviceChange::Release(device) => info!("Seat {} lost {}", id, device.name()),
            }
        }
        Ok(changes)
    }

    pub fn set_name(&mut self, id: u32, name: String) -> Result<(), ClientError> {
        let seat = self.get_mut(id)?;
        info!("Seat {} name: {}", id, name);
        seat.name = Some(name);
        Ok(())
    }

    pub fn pointer_event(
        &mut self,
        id: u32,
        event: PointerEvent,
    ) -> Result<Option<String>, ClientError> {
        let seat = self.get_mut(id)?;
        Ok(match seat.pointer.as_mut() {
            Some(pointer) => pointer.handle(event),
            None => {
                warn!("Pointer event on seat {} without a pointer", id);
                None
            }
        })
    }

    pub fn keyboard_event(
        &mut self,
        id: u32,
        event: KeyboardEvent,
    ) -> Result<Option<String>, ClientError> {
        let seat = self.get_mut(id)?;
        Ok(match seat.keyboard.as_mut() {
            Some(keyboard) => keyboard.handle(event),
            None => {
                warn!("Keyboard event on seat {} without a keyboard", id);
                None
            }
        })
    }

    pub fn touch_event(
        &mut self,
        id: u32,
        event: TouchEvent,
    ) -> Result<Option<String>, ClientError> {
        let seat = self.get_mut(id)?;
        Ok(match seat.touch.as_mut() {
            Some(touch) => touch.handle(event),
            None => {
                warn!("Touch event on seat {} without a touch device", id);
                None
            }
        })
    }
}
