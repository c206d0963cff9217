//! Wayland transport glue
//!
//! This is the only module that talks to `wayland-client`. Each `Dispatch`
//! impl decodes one protocol event, hands it to [`ClientCore`] and then
//! executes whatever requests the core queued, still inside the same
//! callback. Proxies are looked up by plain ids (registry names for seats)
//! so nothing here holds a back reference to its owner.

use crate::client::{ClientCore, Request};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::{
    ButtonState, Device, KeyState, KeyboardEvent, Modifiers, PointerEvent, TouchEvent,
};
use crate::registry::Interface;
use crate::renderer;
use crate::shm::{BufferGeometry, ShmRegion};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::os::fd::AsFd;
use wayland_client::{
    delegate_noop,
    protocol::{
        wl_buffer::{self, WlBuffer},
        wl_compositor::WlCompositor,
        wl_keyboard::{self, WlKeyboard},
        wl_pointer::{self, WlPointer},
        wl_registry::{self, WlRegistry},
        wl_seat::{self, WlSeat},
        wl_shm::{self, WlShm},
        wl_shm_pool::WlShmPool,
        wl_surface::WlSurface,
        wl_touch::{self, WlTouch},
    },
    Connection, Dispatch, Proxy, QueueHandle, WEnum,
};
use wayland_protocols::xdg::shell::client::{
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};

/// `release` on pointer, keyboard and touch exists since seat v3
const DEVICE_RELEASE_SINCE: u32 = 3;

/// Device proxies owned by one seat
struct SeatProxies {
    seat: WlSeat,
    pointer: Option<WlPointer>,
    keyboard: Option<WlKeyboard>,
    touch: Option<WlTouch>,
}

impl SeatProxies {
    fn new(seat: WlSeat) -> Self {
        Self {
            seat,
            pointer: None,
            keyboard: None,
            touch: None,
        }
    }

    fn release(&mut self, device: Device) {
        match device {
            Device::Pointer => {
                if let Some(pointer) = self.pointer.take() {
                    if pointer.version() >= DEVICE_RELEASE_SINCE {
                        pointer.release();
                    }
                }
            }
            Device::Keyboard => {
                if let Some(keyboard) = self.keyboard.take() {
                    if keyboard.version() >= DEVICE_RELEASE_SINCE {
                        keyboard.release();
                    }
                }
            }
            Device::Touch => {
                if let Some(touch) = self.touch.take() {
                    if touch.version() >= DEVICE_RELEASE_SINCE {
                        touch.release();
                    }
                }
            }
        }
    }

    fn release_all(&mut self) {
        for device in Device::ALL {
            self.release(device);
        }
    }
}

struct WindowProxies {
    surface: WlSurface,
    xdg_surface: XdgSurface,
    toplevel: XdgToplevel,
}

struct ShmBuffer {
    region: ShmRegion,
    buffer: WlBuffer,
}

/// State handed to every `Dispatch` impl
pub struct AppState {
    core: ClientCore,
    registry: WlRegistry,
    compositor: Option<WlCompositor>,
    shm: Option<WlShm>,
    wm_base: Option<XdgWmBase>,
    seats: HashMap<u32, SeatProxies>,
    window: Option<WindowProxies>,
    buffer: Option<ShmBuffer>,
    fatal: Option<ClientError>,
}

impl AppState {
    fn new(core: ClientCore, registry: WlRegistry) -> Self {
        Self {
            core,
            registry,
            compositor: None,
            shm: None,
            wm_base: None,
            seats: HashMap::new(),
            window: None,
            buffer: None,
            fatal: None,
        }
    }

    /// Logs recoverable errors and keeps the first fatal one for the main loop
    fn report(&mut self, result: Result<(), ClientError>) {
        match result {
            Ok(()) => {}
            Err(e) if !e.is_fatal() => warn!("Dropping event: {}", e),
            Err(e) => {
                error!("{}", e);
                if self.fatal.is_none() {
                    self.fatal = Some(e);
                }
            }
        }
    }

    /// Executes the core's queued requests in order
    fn flush_requests(&mut self, qh: &QueueHandle<Self>) {
        for request in self.core.take_requests() {
            let result = self.execute(request, qh);
            self.report(result);
        }
    }

    fn execute(&mut self, request: Request, qh: &QueueHandle<Self>) -> Result<(), ClientError> {
        match request {
            Request::Bind(plan) => {
                let (name, version) = (plan.name, plan.version);
                match plan.interface {
                    Interface::Compositor => {
                        self.compositor =
                            Some(self.registry.bind::<WlCompositor, _, _>(name, version, qh, ()));
                    }
                    Interface::Shm => {
                        self.shm = Some(self.registry.bind::<WlShm, _, _>(name, version, qh, ()));
                    }
                    Interface::WmBase => {
                        self.wm_base =
                            Some(self.registry.bind::<XdgWmBase, _, _>(name, version, qh, ()));
                    }
                    Interface::Seat => {
                        let seat = self.registry.bind::<WlSeat, _, _>(name, version, qh, name);
                        self.seats.insert(name, SeatProxies::new(seat));
                    }
                }
            }
            Request::CreateWindow { title, app_id } => {
                let compositor = self
                    .compositor
                    .as_ref()
                    .ok_or(ClientError::MissingGlobal(Interface::Compositor.name()))?;
                let wm_base = self
                    .wm_base
                    .as_ref()
                    .ok_or(ClientError::MissingGlobal(Interface::WmBase.name()))?;

                let surface = compositor.create_surface(qh, ());
                let xdg_surface = wm_base.get_xdg_surface(&surface, qh, ());
                let toplevel = xdg_surface.get_toplevel(qh, ());
                toplevel.set_title(title);
                toplevel.set_app_id(app_id);

                self.window = Some(WindowProxies {
                    surface,
                    xdg_surface,
                    toplevel,
                });
            }
            Request::InitialCommit => {
                if let Some(window) = &self.window {
                    window.surface.commit();
                }
            }
            Request::Pong { serial } => {
                if let Some(wm_base) = &self.wm_base {
                    wm_base.pong(serial);
                }
            }
            Request::AckConfigure { serial } => {
                if let Some(window) = &self.window {
                    window.xdg_surface.ack_configure(serial);
                }
            }
            Request::AllocateBuffer { width, height } => {
                self.allocate_buffer(width, height, qh)?;
            }
            Request::ReallocateBuffer { width, height } => {
                if let Some(old) = self.buffer.take() {
                    old.buffer.destroy();
                }
                self.allocate_buffer(width, height, qh)?;
            }
            Request::Present { width, height } => self.present(width, height),
            Request::GetDevice { seat, device } => {
                let proxies = self
                    .seats
                    .get_mut(&seat)
                    .ok_or(ClientError::UnknownSeat(seat))?;
                match device {
                    Device::Pointer => proxies.pointer = Some(proxies.seat.get_pointer(qh, seat)),
                    Device::Keyboard => {
                        proxies.keyboard = Some(proxies.seat.get_keyboard(qh, seat))
                    }
                    Device::Touch => proxies.touch = Some(proxies.seat.get_touch(qh, seat)),
                }
            }
            Request::ReleaseDevice { seat, device } => {
                if let Some(proxies) = self.seats.get_mut(&seat) {
                    proxies.release(device);
                }
            }
            Request::ForgetSeat { seat } => {
                // wl_seat.release needs v5; the proxy is simply dropped
                if let Some(mut proxies) = self.seats.remove(&seat) {
                    proxies.release_all();
                }
            }
        }
        Ok(())
    }

    fn allocate_buffer(
        &mut self,
        width: u32,
        height: u32,
        qh: &QueueHandle<Self>,
    ) -> Result<(), ClientError> {
        let shm = self
            .shm
            .as_ref()
            .ok_or(ClientError::MissingGlobal(Interface::Shm.name()))?;

        let geometry = BufferGeometry::new(width, height);
        let mut region = ShmRegion::allocate(geometry)?;

        let fd = region.fd().ok_or_else(|| ClientError::ResourceAllocation {
            what: "shm pool",
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "descriptor already closed"),
        })?;
        let pool = shm.create_pool(fd.as_fd(), geometry.size as i32, qh, ());
        let buffer = pool.create_buffer(
            0,
            width as i32,
            height as i32,
            geometry.stride as i32,
            wl_shm::Format::Argb8888,
            qh,
            (),
        );
        pool.destroy();
        region.close_fd();

        info!("Created {}x{} ARGB8888 buffer", width, height);
        self.buffer = Some(ShmBuffer { region, buffer });
        Ok(())
    }

    fn present(&mut self, width: u32, height: u32) {
        let (window, shm_buffer) = match (&self.window, self.buffer.as_mut()) {
            (Some(window), Some(shm_buffer)) => (window, shm_buffer),
            _ => {
                warn!("Present requested without a window or buffer");
                return;
            }
        };

        let geometry = shm_buffer.region.geometry();
        let lines = self.core.event_log().lines();
        renderer::draw_frame(
            shm_buffer.region.pixels_mut(),
            geometry.width as usize,
            geometry.height as usize,
            geometry.stride as usize,
            &lines,
        );

        window.surface.attach(Some(&shm_buffer.buffer), 0, 0);
        window.surface.damage(0, 0, width as i32, height as i32);
        window.surface.commit();
    }

    fn teardown(&mut self) {
        for proxies in self.seats.values_mut() {
            proxies.release_all();
        }
        self.seats.clear();

        if let Some(shm_buffer) = self.buffer.take() {
            shm_buffer.buffer.destroy();
        }
        if let Some(window) = self.window.take() {
            window.toplevel.destroy();
            window.xdg_surface.destroy();
            window.surface.destroy();
        }
        if let Some(wm_base) = self.wm_base.take() {
            wm_base.destroy();
        }
        debug!("Protocol objects destroyed");
    }
}

/// Connects, runs the window until the compositor closes it and tears down
pub fn run(config: &ClientConfig) -> Result<(), ClientError> {
    let conn =
        Connection::connect_to_env().map_err(|e| ClientError::ConnectionFailure(e.to_string()))?;
    info!("🔌 Connected to Wayland compositor");

    let mut event_queue = conn.new_event_queue::<AppState>();
    let qh = event_queue.handle();
    let registry = conn.display().get_registry(&qh, ());

    let mut state = AppState::new(ClientCore::new(config), registry);

    event_queue
        .roundtrip(&mut state)
        .map_err(|e| ClientError::Dispatch(e.to_string()))?;
    if let Some(e) = state.fatal.take() {
        return Err(e);
    }

    state.core.finish_initial_sync()?;
    state.core.create_window()?;
    state.flush_requests(&qh);

    while !state.core.is_closed() {
        let dispatched = event_queue.blocking_dispatch(&mut state);
        if let Some(e) = state.fatal.take() {
            return Err(e);
        }
        if loop_step(dispatched) == LoopStep::Disconnected {
            break;
        }
    }

    info!("Shutting down");
    state.teardown();
    if let Err(e) = conn.flush() {
        debug!("Final flush failed: {}", e);
    }
    Ok(())
}

/// Outcome of one `blocking_dispatch` iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopStep {
    Continue,
    /// The transport failed; the session ends without an error status
    Disconnected,
}

fn loop_step<E: std::fmt::Display>(dispatched: Result<usize, E>) -> LoopStep {
    match dispatched {
        Ok(_) => LoopStep::Continue,
        Err(e) => {
            warn!("Lost connection to the compositor: {}", e);
            LoopStep::Disconnected
        }
    }
}

/// Splits a protocol `array` argument into native-endian `u32`s, dropping
/// any trailing partial word
fn decode_u32_array(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn button_state(state: WEnum<wl_pointer::ButtonState>) -> ButtonState {
    match state {
        WEnum::Value(wl_pointer::ButtonState::Pressed) => ButtonState::Pressed,
        WEnum::Value(_) => ButtonState::Released,
        WEnum::Unknown(raw) => ButtonState::from_raw(raw),
    }
}

fn key_state(state: WEnum<wl_keyboard::KeyState>) -> KeyState {
    match state {
        WEnum::Value(wl_keyboard::KeyState::Pressed) => KeyState::Pressed,
        WEnum::Value(_) => KeyState::Released,
        WEnum::Unknown(raw) => KeyState::from_raw(raw),
    }
}

impl Dispatch<WlRegistry, ()> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => state.core.on_global(name, &interface, version),
            wl_registry::Event::GlobalRemove { name } => state.core.on_global_remove(name),
            _ => {}
        }
        state.flush_requests(qh);
    }
}

impl Dispatch<WlSeat, u32> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &WlSeat,
        event: wl_seat::Event,
        seat: &u32,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let result = match event {
            wl_seat::Event::Capabilities { capabilities } => {
                let raw = match capabilities {
                    WEnum::Value(caps) => caps.bits(),
                    WEnum::Unknown(raw) => raw,
                };
                state.core.on_seat_capabilities(*seat, raw)
            }
            wl_seat::Event::Name { name } => state.core.on_seat_name(*seat, name),
            _ => Ok(()),
        };
        state.report(result);
        state.flush_requests(qh);
    }
}

impl Dispatch<WlPointer, u32> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &WlPointer,
        event: wl_pointer::Event,
        seat: &u32,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_pointer::Event::Enter {
                serial,
                surface_x,
                surface_y,
                ..
            } => PointerEvent::Enter {
                serial,
                x: surface_x,
                y: surface_y,
            },
            wl_pointer::Event::Leave { serial, .. } => PointerEvent::Leave { serial },
            wl_pointer::Event::Motion {
                time,
                surface_x,
                surface_y,
            } => PointerEvent::Motion {
                time,
                x: surface_x,
                y: surface_y,
            },
            wl_pointer::Event::Button {
                serial,
                time,
                button,
                state: pressed,
            } => PointerEvent::Button {
                serial,
                time,
                button,
                state: button_state(pressed),
            },
            wl_pointer::Event::Axis { time, axis, value } => PointerEvent::Axis {
                time,
                axis: match axis {
                    WEnum::Value(wl_pointer::Axis::HorizontalScroll) => 1,
                    WEnum::Value(_) => 0,
                    WEnum::Unknown(raw) => raw,
                },
                value,
            },
            wl_pointer::Event::Frame => PointerEvent::Frame,
            _ => return,
        };
        let result = state.core.on_pointer(*seat, event);
        state.report(result);
        state.flush_requests(qh);
    }
}

impl Dispatch<WlKeyboard, u32> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &WlKeyboard,
        event: wl_keyboard::Event,
        seat: &u32,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_keyboard::Event::Keymap { format, fd, size } => {
                // Never mapped; close it right away
                drop(fd);
                KeyboardEvent::Keymap {
                    format: match format {
                        WEnum::Value(wl_keyboard::KeymapFormat::XkbV1) => 1,
                        WEnum::Value(_) => 0,
                        WEnum::Unknown(raw) => raw,
                    },
                    size,
                }
            }
            wl_keyboard::Event::Enter { serial, keys, .. } => KeyboardEvent::Enter {
                serial,
                keys: decode_u32_array(&keys),
            },
            wl_keyboard::Event::Leave { serial, .. } => KeyboardEvent::Leave { serial },
            wl_keyboard::Event::Key {
                serial,
                time,
                key,
                state: pressed,
            } => KeyboardEvent::Key {
                serial,
                time,
                key,
                state: key_state(pressed),
            },
            wl_keyboard::Event::Modifiers {
                mods_depressed,
                mods_latched,
                mods_locked,
                group,
                ..
            } => KeyboardEvent::Modifiers(Modifiers {
                depressed: mods_depressed,
                latched: mods_latched,
                locked: mods_locked,
                group,
            }),
            wl_keyboard::Event::RepeatInfo { rate, delay } => {
                KeyboardEvent::RepeatInfo { rate, delay }
            }
            _ => return,
        };
        let result = state.core.on_keyboard(*seat, event);
        state.report(result);
        state.flush_requests(qh);
    }
}

impl Dispatch<WlTouch, u32> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &WlTouch,
        event: wl_touch::Event,
        seat: &u32,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_touch::Event::Down {
                serial,
                time,
                id,
                x,
                y,
                ..
            } => TouchEvent::Down {
                serial,
                time,
                id,
                x,
                y,
            },
            wl_touch::Event::Up { serial, time, id } => TouchEvent::Up { serial, time, id },
            wl_touch::Event::Motion { time, id, x, y } => TouchEvent::Motion { time, id, x, y },
            wl_touch::Event::Frame => TouchEvent::Frame,
            wl_touch::Event::Cancel => TouchEvent::Cancel,
            _ => return,
        };
        let result = state.core.on_touch(*seat, event);
        state.report(result);
        state.flush_requests(qh);
    }
}

impl Dispatch<XdgWmBase, ()> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            state.core.on_ping(serial);
            state.flush_requests(qh);
        }
    }
}

impl Dispatch<XdgSurface, ()> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &XdgSurface,
        event: xdg_surface::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let xdg_surface::Event::Configure { serial } = event {
            state.core.on_surface_configure(serial);
            state.flush_requests(qh);
        }
    }
}

impl Dispatch<XdgToplevel, ()> for AppState {
    fn event(
        state: &mut Self,
        _proxy: &XdgToplevel,
        event: xdg_toplevel::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure {
                width,
                height,
                states,
            } => {
                let states = decode_u32_array(&states);
                state.core.on_toplevel_configure(width, height, &states);
            }
            xdg_toplevel::Event::Close => state.core.on_toplevel_close(),
            _ => {}
        }
        state.flush_requests(qh);
    }
}

impl Dispatch<WlBuffer, ()> for AppState {
    fn event(
        state: &mut Self,
        proxy: &WlBuffer,
        event: wl_buffer::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            // A replaced buffer may still be released late
            let current = state.buffer.as_ref().map_or(false, |b| &b.buffer == proxy);
            if current {
                state.core.on_buffer_release();
                state.flush_requests(qh);
            }
        }
    }
}

delegate_noop!(AppState: ignore WlCompositor);
delegate_noop!(AppState: ignore WlShm);
delegate_noop!(AppState: ignore WlShmPool);
delegate_noop!(AppState: ignore WlSurface);
