//! Server configuration types and defaults.
//!
//! This module contains the listener configuration and the policy applied to
//! payloads that are neither of the two protocol tokens.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use uptime_protocol::{DEFAULT_IDLE_TIMEOUT, DEFAULT_PORT};

/// What a handler does with a payload that is not a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPayloadPolicy {
    /// Log a protocol violation and close the connection.
    #[default]
    Reject,
    /// Drop the payload silently and keep reading.
    Ignore,
}

/// Configuration structure for the uptime server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the listener to
    pub bind_address: SocketAddr,

    /// Read deadline for each handler; `None` waits forever
    pub idle_timeout: Option<Duration>,

    /// Handling of payloads other than `KEEPALIVE`
    pub unknown_payload: UnknownPayloadPolicy,

    /// Listen backlog passed to the socket
    pub backlog: i32,

    /// How long `stop()` waits for handlers to deregister
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            unknown_payload: UnknownPayloadPolicy::Reject,
            backlog: 5,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl ServerConfig {
    /// Creates a configuration bound to `bind_address` with every other
    /// setting at its default.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }
}
