//! # Uptime Server
//!
//! The listening side of the uptime monitor. Clients connect over TCP and send
//! `KEEPALIVE` at a fixed cadence; the server answers each with `OK` and keeps
//! a registry of who is currently connected.
//!
//! ## Architecture
//!
//! * **Listener** ([`UptimeServer`]) - binds with `SO_REUSEADDR`, accepts
//!   indefinitely, spawns one handler task per connection and never waits on
//!   any of them
//! * **Connection handler** - one tokio task per client; answers heartbeats,
//!   enforces an idle deadline, and always deregisters on exit
//! * **Registry** ([`ClientRegistry`]) - `DashMap` keyed by `host:port`,
//!   mutated concurrently by handlers and enumerated by `stop()`
//!
//! ## Shutdown
//!
//! [`UptimeServer::stop`] clears the running flag, wakes the accept loop and
//! fires the close trigger of every registered connection. Handlers blocked
//! in a read are released by that trigger and run their normal cleanup, so
//! the registry drains on its own.
//!
//! ## Error Handling
//!
//! Listener failures ([`ServerError`]) are fatal to the server. Connection
//! failures ([`ConnectionError`]) stay inside the handler that owns the
//! connection and are only reported through the event sink.

pub use config::{ServerConfig, UnknownPayloadPolicy};
pub use connection::{ClientRecord, ClientRegistry};
pub use error::{ConnectionError, ServerError};
pub use server::UptimeServer;

pub mod config;
pub mod connection;
pub mod error;
pub mod server;
