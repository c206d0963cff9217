//! Global registry resolution
//!
//! Tracks the globals advertised by the compositor and decides which of them
//! the client binds. Compositor, shm and the xdg shell are singletons where the
//! first advertisement wins; every `wl_seat` advertisement becomes its own seat.

use crate::error::ClientError;
use log::{debug, info, warn};

/// Interfaces this client knows how to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    /// `wl_compositor`, the surface factory
    Compositor,
    /// `wl_shm`, the shared-memory allocator
    Shm,
    /// `xdg_wm_base`, the shell
    WmBase,
    /// `wl_seat`, one per input seat
    Seat,
}

impl Interface {
    /// Singletons that must be bound after the initial roundtrip, in check order
    pub const REQUIRED: [Interface; 3] = [Interface::Compositor, Interface::Shm, Interface::WmBase];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "wl_compositor" => Some(Interface::Compositor),
            "wl_shm" => Some(Interface::Shm),
            "xdg_wm_base" => Some(Interface::WmBase),
            "wl_seat" => Some(Interface::Seat),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Interface::Compositor => "wl_compositor",
            Interface::Shm => "wl_shm",
            Interface::WmBase => "xdg_wm_base",
            Interface::Seat => "wl_seat",
        }
    }

    /// Version this client binds at. Seats use v4 for seat names and
    /// device release.
    pub fn supported_version(&self) -> u32 {
        match self {
            Interface::Seat => 4,
            _ => 1,
        }
    }
}

/// A global advertised by the compositor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalBinding {
    pub name: u32,
    pub interface: String,
    pub version: u32,
}

/// A bind the caller must issue on the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindPlan {
    pub name: u32,
    pub interface: Interface,
    pub version: u32,
}

/// What a `global_remove` referred to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// A bound seat went away
    Seat(u32),
    /// A bound singleton went away; its handle is kept
    Singleton(Interface),
    /// A global this client never bound
    Unbound,
}

/// Resolves advertised globals into bindings
#[derive(Debug, Default)]
pub struct GlobalResolver {
    compositor: Option<GlobalBinding>,
    shm: Option<GlobalBinding>,
    wm_base: Option<GlobalBinding>,
    seats: Vec<GlobalBinding>,
    synced: bool,
}

impl GlobalResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles one `(name, interface, version)` advertisement
    pub fn on_global(&mut self, name: u32, interface: &str, version: u32) -> Option<BindPlan> {
        debug!("Registry advertised {} v{} (name={})", interface, version, name);

        let kind = Interface::from_name(interface)?;
        let wanted = kind.supported_version();

        let bind_version = match kind {
            Interface::Seat => wanted.min(version),
            _ if version < wanted => {
                warn!(
                    "Ignoring {} v{}: client needs at least v{}",
                    interface, version, wanted
                );
                return None;
            }
            _ => wanted,
        };

        let binding = GlobalBinding {
            name,
            interface: interface.to_string(),
            version: bind_version,
        };

        match kind {
            Interface::Seat => {
                if self.seats.iter().any(|s| s.name == name) {
                    debug!("Seat global {} already bound", name);
                    return None;
                }
                if self.synced {
                    info!("Seat {} advertised after initial sync", name);
                }
                self.seats.push(binding);
            }
            _ => {
                let slot = self.slot_mut(kind)?;
                if let Some(existing) = slot {
                    debug!(
                        "{} already bound to global {}, ignoring global {}",
                        interface, existing.name, name
                    );
                    return None;
                }
                *slot = Some(binding);
            }
        }

        info!("Binding {} v{} (name={})", interface, bind_version, name);
        Some(BindPlan {
            name,
            interface: kind,
            version: bind_version,
        })
    }

    /// Handles a `global_remove`. Only seat removals change any state.
    pub fn on_global_remove(&mut self, name: u32) -> Removal {
        if let Some(idx) = self.seats.iter().position(|s| s.name == name) {
            self.seats.remove(idx);
            info!("Seat global {} removed", name);
            return Removal::Seat(name);
        }

        for kind in Interface::REQUIRED {
            if self.binding(kind).map(|b| b.name) == Some(name) {
                warn!("Global {} ({}) removed while bound; keeping handle", name, kind.name());
                return Removal::Singleton(kind);
            }
        }

        debug!("Ignoring removal of unbound global {}", name);
        Removal::Unbound
    }

    /// Marks the initial roundtrip complete and checks the required set
    pub fn finish_initial_sync(&mut self) -> Result<(), ClientError> {
        self.synced = true;
        self.check_required()
    }

    /// Fails with the first required interface that is not bound
    pub fn check_required(&self) -> Result<(), ClientError> {
        for kind in Interface::REQUIRED {
            if self.binding(kind).is_none() {
                return Err(ClientError::MissingGlobal(kind.name()));
            }
        }
        Ok(())
    }

    pub fn binding(&self, kind: Interface) -> Option<&GlobalBinding> {
        match kind {
            Interface::Compositor => self.compositor.as_ref(),
            Interface::Shm => self.shm.as_ref(),
            Interface::WmBase => self.wm_base.as_ref(),
            Interface::Seat => self.seats.first(),
        }
    }

    pub fn seats(&self) -> &[GlobalBinding] {
        &self.seats
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    fn slot_mut(&mut self, kind: Interface) -> Option<&mut Option<GlobalBinding>> {
        match kind {
            Interface::Compositor => Some(&mut self.compositor),
            Interface::Shm => Some(&mut self.shm),
            Interface::WmBase => Some(&mut self.wm_base),
            Interface::Seat => None,
        }
    }
}
