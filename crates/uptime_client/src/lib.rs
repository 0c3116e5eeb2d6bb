//! # Uptime Client
//!
//! The connecting side of the uptime monitor. A [`ClientAgent`] owns a single
//! outbound TCP connection and proves reachability by sending `KEEPALIVE` at a
//! fixed interval, expecting `OK` back each time.
//!
//! ## State Machine
//!
//! ```text
//!            connect ok                      OK received
//!   Disconnected ───────────▶ Connected ◀──────────────┐
//!     ▲     │                   │    └─────────────────┘
//!     │     │ connect failed    │ wrong reply / I/O error / timeout
//!     │     ▼                   ▼
//!     └── wait reconnect_delay ◀┘
//! ```
//!
//! The agent never exits on connection trouble. The only way out of
//! [`ClientAgent::run`] is its shutdown future, after which the session is
//! closed with the reason "User interrupted".

pub use agent::{ClientAgent, ConnectionState, SessionStats, USER_INTERRUPTED};
pub use config::ClientConfig;
pub use error::ClientError;

pub mod agent;
pub mod config;
pub mod error;
