//! Sans-IO protocol core
//!
//! [`ClientCore`] owns every piece of client state: bound globals, the xdg
//! handshake, buffer bookkeeping, seats and the on-screen event log. It is
//! fed decoded compositor events and answers with an ordered queue of
//! [`Request`]s. The Wayland glue drains that queue inside the callback that
//! produced it, so a configure's ack and the frame it unlocks go out before
//! the next event is read.
//!
//! # Usage
//!
//! ```
//! use waysnitch::client::{ClientCore, Request};
//! use waysnitch::config::ClientConfig;
//!
//! let mut core = ClientCore::new(&ClientConfig::default());
//! core.on_global(1, "wl_compositor", 4);
//! core.on_global(2, "wl_shm", 1);
//! core.on_global(3, "xdg_wm_base", 2);
//! core.finish_initial_sync().unwrap();
//! core.create_window().unwrap();
//!
//! core.on_surface_configure(7);
//! let requests = core.take_requests();
//! assert!(requests.contains(&Request::AckConfigure { serial: 7 }));
//! ```

use crate::config::{ClientConfig, WindowConfig};
use crate::error::ClientError;
use crate::event_log::EventLog;
use crate::input::{
    Capabilities, Device, DeviceChange, KeyboardEvent, PointerEvent, SeatManager, TouchEvent,
};
use crate::protocol::{HandshakeState, SurfaceHandshake};
use crate::registry::{BindPlan, GlobalResolver, Interface, Removal};
use log::{debug, error, info, warn};

/// Work the transport must carry out, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Bind a registry global
    Bind(BindPlan),
    /// Create the surface, xdg_surface and toplevel and set title/app id
    CreateWindow { title: String, app_id: String },
    /// Empty commit that starts configure negotiation
    InitialCommit,
    Pong { serial: u32 },
    AckConfigure { serial: u32 },
    /// Allocate the shm buffer for the first time
    AllocateBuffer { width: u32, height: u32 },
    /// Replace the shm buffer with one of a new size
    ReallocateBuffer { width: u32, height: u32 },
    /// Redraw the buffer from the event log, then attach, damage and commit
    Present { width: u32, height: u32 },
    GetDevice { seat: u32, device: Device },
    ReleaseDevice { seat: u32, device: Device },
    /// Release the seat object itself
    ForgetSeat { seat: u32 },
}

/// Client-side view of the single shm buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferState {
    pub width: u32,
    pub height: u32,
    /// Attached and not yet released by the compositor
    pub busy: bool,
}

/// Protocol state for one toplevel window and its seats
#[derive(Debug)]
pub struct ClientCore {
    window: WindowConfig,
    globals: GlobalResolver,
    handshake: SurfaceHandshake,
    size: (u32, u32),
    toplevel_states: Vec<u32>,
    buffer: Option<BufferState>,
    redraw_pending: bool,
    seats: SeatManager,
    log: EventLog,
    requests: Vec<Request>,
}

impl ClientCore {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            window: config.window.clone(),
            globals: GlobalResolver::new(),
            handshake: SurfaceHandshake::new(),
            size: (config.window.default_width, config.window.default_height),
            toplevel_states: Vec::new(),
            buffer: None,
            redraw_pending: false,
            seats: SeatManager::new(),
            log: EventLog::with_format(config.log.capacity, &config.log.timestamp_format),
            requests: Vec::new(),
        }
    }

    /// Drains the requests produced so far
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    // Registry

    pub fn on_global(&mut self, name: u32, interface: &str, version: u32) {
        if let Some(plan) = self.globals.on_global(name, interface, version) {
            if plan.interface == Interface::Seat {
                self.seats.add(plan.name, plan.version);
            }
            self.requests.push(Request::Bind(plan));
        }
    }

    pub fn on_global_remove(&mut self, name: u32) {
        if let Removal::Seat(id) = self.globals.on_global_remove(name) {
            if let Some(seat) = self.seats.remove(id) {
                for device in seat.held_devices() {
                    self.requests.push(Request::ReleaseDevice { seat: id, device });
                }
            }
            self.requests.push(Request::ForgetSeat { seat: id });
        }
    }

    /// Called once the initial registry roundtrip has completed
    pub fn finish_initial_sync(&mut self) -> Result<(), ClientError> {
        self.globals.finish_initial_sync()?;
        info!(
            "Required globals bound, {} seat(s) advertised",
            self.globals.seats().len()
        );
        Ok(())
    }

    /// Creates the toplevel and sends the empty initial commit
    pub fn create_window(&mut self) -> Result<(), ClientError> {
        self.globals.check_required()?;

        if let Err(e) = self.handshake.initial_commit() {
            warn!("Not creating window twice: {}", e);
            return Ok(());
        }

        info!("Creating toplevel '{}' ({})", self.window.title, self.window.app_id);
        self.requests.push(Request::CreateWindow {
            title: self.window.title.clone(),
            app_id: self.window.app_id.clone(),
        });
        self.requests.push(Request::InitialCommit);
        Ok(())
    }

    // Shell

    /// Liveness pings are answered in every state
    pub fn on_ping(&mut self, serial: u32) {
        debug!("Ping {}", serial);
        self.requests.push(Request::Pong { serial });
    }

    /// Records a toplevel geometry suggestion. Non-positive sizes mean "no
    /// preference" and keep the current size.
    pub fn on_toplevel_configure(&mut self, width: i32, height: i32, states: &[u32]) {
        self.toplevel_states = states.to_vec();

        if width <= 0 || height <= 0 {
            debug!("Toplevel configure without size preference ({}x{})", width, height);
            return;
        }

        let size = (width as u32, height as u32);
        if size != self.size {
            debug!("Toplevel size {}x{} -> {}x{}", self.size.0, self.size.1, size.0, size.1);
            self.size = size;
        }
    }

    /// Acks the configure, makes sure a buffer exists and draws
    pub fn on_surface_configure(&mut self, serial: u32) {
        if let Err(e) = self.handshake.on_configure(serial) {
            debug!("Ignoring configure {}: {}", serial, e);
            return;
        }

        self.requests.push(Request::AckConfigure { serial });
        if let Err(e) = self.handshake.ack(serial) {
            error!("Configure {} could not be acknowledged: {}", serial, e);
            return;
        }

        let (width, height) = self.size;
        match self.buffer {
            None => {
                info!("Surface configured, allocating {}x{} buffer", width, height);
                self.requests.push(Request::AllocateBuffer { width, height });
                self.buffer = Some(BufferState {
                    width,
                    height,
                    busy: false,
                });
            }
            Some(buffer)
                if self.window.resize_buffer_on_configure
                    && (buffer.width, buffer.height) != (width, height) =>
            {
                info!(
                    "Resizing buffer {}x{} -> {}x{}",
                    buffer.width, buffer.height, width, height
                );
                self.requests.push(Request::ReallocateBuffer { width, height });
                self.buffer = Some(BufferState {
                    width,
                    height,
                    busy: false,
                });
                self.redraw_pending = false;
            }
            Some(_) => {}
        }

        self.present();
    }

    pub fn on_toplevel_close(&mut self) {
        info!("Compositor requested close");
        self.handshake.close();
    }

    /// The compositor finished reading the buffer
    pub fn on_buffer_release(&mut self) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.busy = false;
        }
        if self.redraw_pending {
            self.redraw_pending = false;
            self.present();
        }
    }

    // Seats

    pub fn on_seat_capabilities(&mut self, seat: u32, raw: u32) -> Result<(), ClientError> {
        let changes = self
            .seats
            .set_capabilities(seat, Capabilities::from_bits(raw))?;
        for change in changes {
            self.requests.push(match change {
                DeviceChange::Acquire(device) => Request::GetDevice { seat, device },
                DeviceChange::Release(device) => Request::ReleaseDevice { seat, device },
            });
        }
        Ok(())
    }

    pub fn on_seat_name(&mut self, seat: u32, name: String) -> Result<(), ClientError> {
        self.seats.set_name(seat, name)
    }

    pub fn on_pointer(&mut self, seat: u32, event: PointerEvent) -> Result<(), ClientError> {
        if let Some(line) = self.seats.pointer_event(seat, event)? {
            self.record(line);
        }
        Ok(())
    }

    pub fn on_keyboard(&mut self, seat: u32, event: KeyboardEvent) -> Result<(), ClientError> {
        if let Some(line) = self.seats.keyboard_event(seat, event)? {
            self.record(line);
        }
        Ok(())
    }

    pub fn on_touch(&mut self, seat: u32, event: TouchEvent) -> Result<(), ClientError> {
        if let Some(line) = self.seats.touch_event(seat, event)? {
            self.record(line);
        }
        Ok(())
    }

    fn record(&mut self, line: String) {
        debug!("Event: {}", line);
        self.log.push(line);
        self.present();
    }

    /// Requests a frame if one may be shown now. Frames are dropped before
    /// the first ack and deferred while the compositor holds the buffer.
    fn present(&mut self) {
        if !self.handshake.can_present() {
            debug!("Dropping render in state {:?}", self.handshake.state());
            return;
        }

        let buffer = match self.buffer.as_mut() {
            Some(buffer) => buffer,
            None => return,
        };

        if buffer.busy {
            if !self.redraw_pending {
                debug!("Buffer still held by the compositor, parking redraw until release");
            }
            self.redraw_pending = true;
            return;
        }

        if let Err(e) = self.handshake.validate_commit(true) {
            error!("Refusing commit: {}", e);
            return;
        }

        buffer.busy = true;
        self.requests.push(Request::Present {
            width: buffer.width,
            height: buffer.height,
        });
    }

    // Accessors

    pub fn is_closed(&self) -> bool {
        self.handshake.is_closed()
    }

    pub fn is_configured(&self) -> bool {
        self.handshake.is_configured()
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn handshake(&self) -> &SurfaceHandshake {
        &self.handshake
    }

    pub fn globals(&self) -> &GlobalResolver {
        &self.globals
    }

    pub fn seats(&self) -> &SeatManager {
        &self.seats
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Current window size, from the last usable toplevel configure
    pub fn window_size(&self) -> (u32, u32) {
        self.size
    }

    pub fn toplevel_states(&self) -> &[u32] {
        &self.toplevel_states
    }

    pub fn buffer(&self) -> Option<BufferState> {
        self.buffer
    }

    pub fn redraw_pending(&self) -> bool {
        self.redraw_pending
    }
}
