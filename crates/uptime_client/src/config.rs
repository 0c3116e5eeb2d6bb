//! Client configuration types and defaults.

use std::time::Duration;
use uptime_protocol::{
    DEFAULT_CLIENT_HOST, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_PORT, DEFAULT_RESPONSE_TIMEOUT,
    RECONNECT_DELAY,
};

/// Configuration structure for the uptime client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Host name or address of the server
    pub host: String,

    /// TCP port of the server
    pub port: u16,

    /// Pause between heartbeats while connected; zero is allowed. Must stay
    /// below the server's idle deadline or the server drops the session
    /// between heartbeats.
    pub keepalive_interval: Duration,

    /// Pause after a failed connect or a lost connection
    pub reconnect_delay: Duration,

    /// How long to wait for `OK`; `None` waits forever
    pub response_timeout: Option<Duration>,

    /// How long a single connect attempt may take; `None` leaves it to the OS
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CLIENT_HOST.to_string(),
            port: DEFAULT_PORT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            reconnect_delay: RECONNECT_DELAY,
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
            connect_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// `host:port` as shown in log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
