//! XDG surface handshake tracking, client side
//!
//! A toplevel goes through a fixed sequence before content may be shown:
//! 1. **Created**: `wl_surface`, `xdg_surface` and `xdg_toplevel` exist
//! 2. **ConfigurePending**: the initial empty commit was sent; waiting for
//!    the compositor's first `xdg_surface.configure`
//! 3. **Configured**: a configure serial was acknowledged; buffers may be
//!    attached and committed
//! 4. **Closed**: the compositor asked the window to close (terminal)
//!
//! Every configure must be answered with `ack_configure` carrying the same
//! serial before the next commit. Committing a buffer before any ack is a
//! protocol error the compositor may kill the client for, so the tracker
//! refuses it.

use log::{debug, error, warn};
use std::collections::VecDeque;
use std::fmt;

/// Maximum number of unacknowledged configure serials to remember
const MAX_PENDING_CONFIGURES: usize = 32;

/// Handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// Surface objects exist, nothing committed yet
    Created,
    /// Initial commit sent, waiting for the first configure
    ConfigurePending,
    /// At least one configure acknowledged
    Configured,
    /// Compositor requested close
    Closed,
}

/// Handshake violations the tracker refuses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The initial commit was requested twice or after configuration
    InitialCommitOutOfOrder { state: HandshakeState },
    /// Tried to ack a serial the compositor never sent
    UnknownSerial { serial: u32, pending: Vec<u32> },
    /// Tried to commit a buffer before acknowledging any configure
    BufferBeforeAck { commit_count: u64 },
    /// The window is closed
    Closed,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::InitialCommitOutOfOrder { state } => {
                write!(f, "initial commit not allowed in state {:?}", state)
            }
            HandshakeError::UnknownSerial { serial, pending } => {
                write!(f, "ack for unknown configure serial {} (pending: {:?})", serial, pending)
            }
            HandshakeError::BufferBeforeAck { commit_count } => {
                write!(f, "buffer commit before ack_configure (commit #{})", commit_count)
            }
            HandshakeError::Closed => write!(f, "surface is closed"),
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Tracks the configure/ack/commit sequence for one toplevel
#[derive(Debug, Clone)]
pub struct SurfaceHandshake {
    state: HandshakeState,
    pending_serials: VecDeque<u32>,
    last_acked_serial: Option<u32>,
    configure_count: u64,
    commit_count: u64,
}

impl SurfaceHandshake {
    pub fn new() -> Self {
        Self {
            state: HandshakeState::Created,
            pending_serials: VecDeque::new(),
            last_acked_serial: None,
            configure_count: 0,
            commit_count: 0,
        }
    }

    /// Records the empty commit that starts negotiation
    pub fn initial_commit(&mut self) -> Result<(), HandshakeError> {
        if self.state != HandshakeState::Created {
            return Err(HandshakeError::InitialCommitOutOfOrder { state: self.state });
        }
        self.commit_count += 1;
        self.transition(HandshakeState::ConfigurePending);
        Ok(())
    }

    /// Records an `xdg_surface.configure` serial
    pub fn on_configure(&mut self, serial: u32) -> Result<(), HandshakeError> {
        if self.state == HandshakeState::Closed {
            return Err(HandshakeError::Closed);
        }

        if self.pending_serials.len() >= MAX_PENDING_CONFIGURES {
            warn!(
                "{} configure serials pending, dropping oldest",
                self.pending_serials.len()
            );
            self.pending_serials.pop_front();
        }

        self.pending_serials.push_back(serial);
        self.configure_count += 1;
        debug!(
            "Configure received: serial={}, pending={}",
            serial,
            self.pending_serials.len()
        );
        Ok(())
    }

    /// Records the `ack_configure` for `serial`. Older pending serials are
    /// superseded by it.
    pub fn ack(&mut self, serial: u32) -> Result<(), HandshakeError> {
        if self.state == HandshakeState::Closed {
            return Err(HandshakeError::Closed);
        }

        let idx = match self.pending_serials.iter().position(|s| *s == serial) {
            Some(idx) => idx,
            None => {
                error!(
                    "Refusing ack for unknown serial {} (pending: {:?})",
                    serial, self.pending_serials
                );
                return Err(HandshakeError::UnknownSerial {
                    serial,
                    pending: self.pending_serials.iter().copied().collect(),
                });
            }
        };

        self.pending_serials.drain(..=idx);
        self.last_acked_serial = Some(serial);
        self.transition(HandshakeState::Configured);
        debug!("Acknowledged configure serial {}", serial);
        Ok(())
    }

    /// Checks that a commit is allowed and counts it
    pub fn validate_commit(&mut self, has_buffer: bool) -> Result<(), HandshakeError> {
        if self.state == HandshakeState::Closed {
            return Err(HandshakeError::Closed);
        }
        if has_buffer && self.last_acked_serial.is_none() {
            return Err(HandshakeError::BufferBeforeAck {
                commit_count: self.commit_count + 1,
            });
        }
        self.commit_count += 1;
        Ok(())
    }

    /// Marks the window closed
    pub fn close(&mut self) {
        self.transition(HandshakeState::Closed);
    }

    /// Whether content may be attached and committed right now
    pub fn can_present(&self) -> bool {
        self.state == HandshakeState::Configured
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_configured(&self) -> bool {
        self.last_acked_serial.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state == HandshakeState::Closed
    }

    pub fn last_acked_serial(&self) -> Option<u32> {
        self.last_acked_serial
    }

    pub fn pending_serials(&self) -> impl Iterator<Item = u32> + '_ {
        self.pending_serials.iter().copied()
    }

    pub fn configure_count(&self) -> u64 {
        self.configure_count
    }

    pub fn commit_count(&self) -> u64 {
        self.commit_count
    }

    fn transition(&mut self, new_state: HandshakeState) {
        if self.state != new_state {
            debug!("Surface state transition: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
        }
    }
}

impl Default for SurfaceHandshake {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_configure_ack_flow() {
        let mut handshake = SurfaceHandshake::new();
        assert_eq!(handshake.state(), HandshakeState::Created);

        handshake.initial_commit().unwrap();
        assert_eq!(handshake.state(), HandshakeState::ConfigurePending);
        assert!(!handshake.can_present());

        handshake.on_configure(100).unwrap();
        handshake.ack(100).unwrap();
        assert_eq!(handshake.state(), HandshakeState::Configured);
        assert!(handshake.can_present());

        handshake.validate_commit(true).unwrap();
        assert_eq!(handshake.commit_count(), 2);
    }

    #[test]
    fn test_buffer_before_ack_error() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        handshake.on_configure(100).unwrap();

        let result = handshake.validate_commit(true);
        assert_eq!(result, Err(HandshakeError::BufferBeforeAck { commit_count: 2 }));
        assert!(handshake.validate_commit(false).is_ok());
    }

    #[test]
    fn test_invalid_ack_serial() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        handshake.on_configure(100).unwrap();

        let result = handshake.ack(999);
        assert!(matches!(result, Err(HandshakeError::UnknownSerial { serial: 999, .. })));
        assert!(!handshake.is_configured());
    }

    #[test]
    fn test_initial_commit_only_once() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        assert!(handshake.initial_commit().is_err());
    }

    #[test]
    fn test_ack_supersedes_older_serials() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        handshake.on_configure(1).unwrap();
        handshake.on_configure(2).unwrap();
        handshake.on_configure(3).unwrap();

        handshake.ack(2).unwrap();
        assert_eq!(handshake.pending_serials().collect::<Vec<_>>(), vec![3]);
        assert_eq!(handshake.last_acked_serial(), Some(2));
    }

    #[test]
    fn test_pending_serials_are_bounded() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        for serial in 0..40 {
            handshake.on_configure(serial).unwrap();
        }
        assert_eq!(handshake.pending_serials().count(), MAX_PENDING_CONFIGURES);
        assert!(handshake.ack(0).is_err());
        assert!(handshake.ack(39).is_ok());
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut handshake = SurfaceHandshake::new();
        handshake.initial_commit().unwrap();
        handshake.on_configure(5).unwrap();
        handshake.ack(5).unwrap();

        handshake.close();
        assert!(handshake.is_closed());
        assert!(!handshake.can_present());
        assert_eq!(handshake.on_configure(6), Err(HandshakeError::Closed));
        assert_eq!(handshake.validate_commit(true), Err(HandshakeError::Closed));
    }
}
