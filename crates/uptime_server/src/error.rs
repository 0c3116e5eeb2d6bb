//! Error types for the listener and for individual connections.

use std::time::Duration;
use thiserror::Error;
use uptime_protocol::ProtocolError;

/// Listener-level errors. Any of these ends the server process.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server is already running")]
    AlreadyRunning,
}

/// Reasons a single connection ends abnormally. These never leave the
/// handler that owns the connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("no heartbeat received within {0:?}")]
    IdleTimeout(Duration),
    #[error("connection closed by server")]
    ForcedClose,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
