//! Error types for the Waysnitch client

use std::io;
use thiserror::Error;

/// Errors surfaced by the client.
///
/// Everything except [`ClientError::UnknownSeat`] is fatal: the binary logs the
/// diagnostic and exits with a non-zero status. There is no retry path.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The compositor could not be reached
    #[error("failed to connect to the Wayland compositor: {0}")]
    ConnectionFailure(String),

    /// A required global was not advertised before the initial roundtrip finished
    #[error("compositor did not advertise required global `{0}`")]
    MissingGlobal(&'static str),

    /// Anonymous memory file, truncation or mapping failed
    #[error("failed to allocate {what}: {source}")]
    ResourceAllocation {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    /// A seat event referenced a seat that is not tracked
    #[error("event for untracked seat {0}")]
    UnknownSeat(u32),

    /// Reading or dispatching protocol messages failed
    #[error("Wayland dispatch failed: {0}")]
    Dispatch(String),
}

impl ClientError {
    /// Whether this error must terminate the process
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ClientError::UnknownSeat(_))
    }
}
