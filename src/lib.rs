//! # Waysnitch
//!
//! A minimal Wayland client that opens one xdg-shell toplevel and paints a
//! live, scrolling log of pointer, keyboard and touch events into a shared
//! memory buffer.
//!
//! ## Architecture
//!
//! - `client`: sans-IO protocol core; turns compositor events into requests
//! - `wayland`: `wayland-client` glue that executes those requests
//! - `registry`: global discovery and binding decisions
//! - `protocol`: configure/ack/commit handshake tracking
//! - `input`: seats, capability reconciliation and device streams
//! - `shm`: memfd-backed pixel buffers
//! - `event_log`: bounded on-screen event history
//! - `renderer`: software text rendering into the pixel buffer
//! - `keycodes`: evdev scancode labels
//! - `config`: configuration parsing and validation
//!
//! ## Usage
//!
//! ```rust,no_run
//! use waysnitch::ClientConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::default();
//!     waysnitch::wayland::run(&config)?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event_log;
pub mod input;
pub mod keycodes;
pub mod protocol;
pub mod registry;
pub mod renderer;
pub mod shm;
pub mod wayland;

// Re-export main types for easy access
pub use client::{ClientCore, Request};
pub use config::ClientConfig;
pub use error::ClientError;
pub use event_log::{EventLog, SharedEventLog};

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for Waysnitch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
