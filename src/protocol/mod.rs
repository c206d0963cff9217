//! Client-side protocol sequencing
//!
//! The xdg-shell handshake requires that the client:
//!
//! - sends an empty initial commit before any configure arrives
//! - acknowledges each `xdg_surface.configure` with its exact serial
//! - never commits a buffer before the first acknowledgment
//!
//! # Usage
//!
//! ```
//! use waysnitch::protocol::{HandshakeState, SurfaceHandshake};
//!
//! let mut handshake = SurfaceHandshake::new();
//! handshake.initial_commit().unwrap();
//!
//! handshake.on_configure(42).unwrap();
//! handshake.ack(42).unwrap();
//!
//! assert_eq!(handshake.state(), HandshakeState::Configured);
//! handshake.validate_commit(true).unwrap();
//! ```

pub mod handshake;

pub use handshake::{HandshakeError, HandshakeState, SurfaceHandshake};
