//! # Uptime Protocol
//!
//! Shared vocabulary for the uptime monitor: the two wire tokens exchanged
//! between client and server, the timing constants both sides agree on, and
//! the lifecycle events each component reports through an injected
//! [`EventSink`].
//!
//! ## Wire Format
//!
//! The protocol is deliberately tiny. Over a plain TCP stream:
//!
//! * Client → Server: the literal bytes `KEEPALIVE`
//! * Server → Client: the literal bytes `OK`
//!
//! There is no length prefix and no sequence number. Each send is expected to
//! arrive as exactly one read of at most [`RECV_BUFFER_SIZE`] bytes. A zero
//! byte read means the peer closed the connection.
//!
//! ## Logging
//!
//! Library code never installs a global logger. Components receive an
//! `Arc<dyn EventSink>` and report [`LifecycleEvent`]s through it; the binary
//! decides where those go (log file, stdout, both), while tests plug in a
//! [`MemorySink`] and assert on what was recorded.

pub use error::ProtocolError;
pub use events::{EventSink, LifecycleEvent, MemorySink, Severity, TracingSink};
pub use protocol::{
    client_id, format_duration, parse_interval_secs, Message, ACK, DEFAULT_CLIENT_HOST,
    DEFAULT_IDLE_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_PORT, DEFAULT_RESPONSE_TIMEOUT,
    DEFAULT_SERVER_HOST, KEEPALIVE, RECONNECT_DELAY, RECV_BUFFER_SIZE,
};

pub mod error;
pub mod events;
pub mod protocol;
