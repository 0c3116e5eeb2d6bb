//! Per-client record stored in the registry.

use super::SessionId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use uptime_protocol::client_id;

/// Represents one live accepted connection.
///
/// The record does not own the stream itself; the handler task does. What the
/// registry keeps is the close trigger for that stream, which is enough for
/// the listener to tear the connection down from outside.
#[derive(Debug, Clone)]
pub struct ClientRecord {
    /// `host:port` of the peer, the registry key
    pub client_id: String,

    /// The remote network address of the client
    pub peer: SocketAddr,

    /// When this connection was accepted
    pub connected_at: Instant,

    /// Distinguishes this connection from a later one with the same id
    pub session: SessionId,

    closer: Arc<Notify>,
}

impl ClientRecord {
    pub fn new(peer: SocketAddr, session: SessionId) -> Self {
        Self {
            client_id: client_id(peer),
            peer,
            connected_at: Instant::now(),
            session,
            closer: Arc::new(Notify::new()),
        }
    }

    /// Handle the owning handler waits on alongside its reads.
    pub fn close_signal(&self) -> Arc<Notify> {
        self.closer.clone()
    }

    /// Asks the owning handler to drop its stream.
    ///
    /// The permit is stored if the handler is not currently waiting, so a close
    /// requested between two reads is not lost.
    pub fn close(&self) {
        self.closer.notify_one();
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
