//! Wire tokens, timing constants and small helpers shared by both roles.

use crate::error::ProtocolError;
use std::net::SocketAddr;
use std::time::Duration;

/// Heartbeat request sent by the client.
pub const KEEPALIVE: &[u8] = b"KEEPALIVE";

/// Acknowledgement sent back by the server.
pub const ACK: &[u8] = b"OK";

/// Upper bound for a single read on either side of the connection.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Fixed pause between a failed attempt and the next connect.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Pause between heartbeats while connected.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(250);

/// How long the client waits for an acknowledgement before giving up.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a handler waits for the next heartbeat before dropping the client.
///
/// Clients must heartbeat more often than this to keep their session.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CLIENT_HOST: &str = "localhost";
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// The two meaningful messages of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Keepalive,
    Ack,
}

impl Message {
    /// Raw bytes put on the wire for this message.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Message::Keepalive => KEEPALIVE,
            Message::Ack => ACK,
        }
    }

    /// Interprets a payload received by the server.
    ///
    /// Surrounding ASCII whitespace is ignored, so `b"KEEPALIVE\n"` is still a
    /// heartbeat. Anything else is reported as unrecognized and left to the
    /// caller's policy.
    pub fn parse_request(payload: &[u8]) -> Result<Message, ProtocolError> {
        if payload.trim_ascii() == KEEPALIVE {
            Ok(Message::Keepalive)
        } else {
            Err(ProtocolError::UnrecognizedPayload(payload.to_vec()))
        }
    }

    /// Checks a payload received by the client. No trimming: the reply must be
    /// exactly `OK`.
    pub fn is_ack(payload: &[u8]) -> bool {
        payload == ACK
    }
}

/// Registry key for an accepted connection, `host:port` of the peer.
pub fn client_id(peer: SocketAddr) -> String {
    format!("{}:{}", peer.ip(), peer.port())
}

/// Renders a duration as seconds with millisecond precision (`12.345`).
pub fn format_duration(duration: Duration) -> String {
    format!("{:.3}", duration.as_secs_f64())
}

/// Parses a number of seconds such as `0.25` into a [`Duration`].
///
/// Zero is accepted. Negative, NaN and infinite values are rejected.
pub fn parse_interval_secs(raw: &str) -> Result<Duration, ProtocolError> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidInterval(raw.to_string()))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(ProtocolError::InvalidInterval(raw.to_string()));
    }

    Duration::try_from_secs_f64(secs).map_err(|_| ProtocolError::InvalidInterval(raw.to_string()))
}
