//! Connection management for accepted clients.
//!
//! This module handles the lifecycle of client connections: the record kept
//! for each live client, the shared registry of those records, and the
//! per-connection heartbeat handler.

pub mod client;
pub mod handler;
pub mod registry;

pub use client::ClientRecord;
pub use handler::handle_client;
pub use registry::ClientRegistry;

/// Monotonic identifier for one accepted connection.
///
/// Two connections can share a client identifier (same `host:port`), but never
/// a session id.
pub type SessionId = u64;
