//! Errors raised by the client state machine.

use std::time::Duration;
use thiserror::Error;

/// Client errors. None of them is fatal to the client process; each one ends
/// the current session at most.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{0}")]
    Connect(std::io::Error),
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("send failed: {0}")]
    Send(std::io::Error),
    #[error("receive failed: {0}")]
    Receive(std::io::Error),
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),
    #[error("connection closed by server")]
    PeerClosed,
    #[error("unexpected response: {0:?}")]
    UnexpectedResponse(Vec<u8>),
    #[error("not connected")]
    NotConnected,
}

impl ClientError {
    /// Human-readable reason recorded when this error ends a session.
    pub fn disconnect_reason(&self) -> String {
        match self {
            ClientError::UnexpectedResponse(_) => "Unexpected server response".to_string(),
            other => format!("Keepalive failed: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_reasons() {
        let unexpected = ClientError::UnexpectedResponse(b"NO".to_vec());
        assert_eq!(unexpected.disconnect_reason(), "Unexpected server response");

        assert_eq!(
            ClientError::PeerClosed.disconnect_reason(),
            "Keepalive failed: connection closed by server"
        );

        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        assert!(ClientError::Send(reset)
            .disconnect_reason()
            .starts_with("Keepalive failed: send failed:"));
    }
}
