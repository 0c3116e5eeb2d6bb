//! Server module containing the listener and its accept loop.

pub mod core;

pub use self::core::UptimeServer;
