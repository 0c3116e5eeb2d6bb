//! Lifecycle events and the sinks that record them.
//!
//! Every state transition on either side of the connection is described by a
//! [`LifecycleEvent`]. Components hold an `Arc<dyn EventSink>` handed to them
//! at construction time instead of writing to a process-wide logger, which
//! keeps them testable in isolation.

use crate::protocol::format_duration;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// How loudly an event should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// A single observable step in a connection's life.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    // Client side
    Connected { endpoint: String },
    ConnectFailed { error: String },
    ReconnectScheduled { delay: Duration },
    UnexpectedResponse { payload: Vec<u8> },
    Disconnected { duration: Duration, reason: String },

    // Server side
    ServerStarted { addr: String },
    ServerError { error: String },
    ServerStopped,
    ClientJoined { client_id: String },
    ConnectionLost { client_id: String, duration: Duration, error: String },
    /// `reason` is kept for observers; the log line does not include it.
    ClientLeft { client_id: String, duration: Duration, reason: String },
    ProtocolViolation { client_id: String, payload: Vec<u8> },
}

impl LifecycleEvent {
    pub fn severity(&self) -> Severity {
        match self {
            LifecycleEvent::ConnectFailed { .. }
            | LifecycleEvent::UnexpectedResponse { .. }
            | LifecycleEvent::ServerError { .. } => Severity::Error,
            LifecycleEvent::ProtocolViolation { .. } => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Events that are echoed to stdout in addition to the log.
    ///
    /// Per-client join/leave on the server and retry bookkeeping stay in the
    /// log file only.
    pub fn is_console(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Connected { .. }
                | LifecycleEvent::ConnectFailed { .. }
                | LifecycleEvent::Disconnected { .. }
                | LifecycleEvent::ServerStarted { .. }
                | LifecycleEvent::ServerError { .. }
                | LifecycleEvent::ServerStopped
        )
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Connected { endpoint } => {
                write!(f, "Connected to server at {endpoint}")
            }
            LifecycleEvent::ConnectFailed { error } => write!(f, "Connection failed: {error}"),
            LifecycleEvent::ReconnectScheduled { delay } => {
                write!(f, "Will attempt to reconnect in {} second", delay.as_secs_f64())
            }
            LifecycleEvent::UnexpectedResponse { payload } => {
                write!(f, "Unexpected response: {:?}", String::from_utf8_lossy(payload))
            }
            LifecycleEvent::Disconnected { duration, reason } => write!(
                f,
                "Disconnected from server after {} seconds. Reason: {reason}",
                format_duration(*duration)
            ),
            LifecycleEvent::ServerStarted { addr } => write!(f, "Server started on {addr}"),
            LifecycleEvent::ServerError { error } => write!(f, "Server error: {error}"),
            LifecycleEvent::ServerStopped => write!(f, "Server stopped"),
            LifecycleEvent::ClientJoined { client_id } => {
                write!(f, "New connection from {client_id}")
            }
            LifecycleEvent::ConnectionLost { client_id, duration, error } => write!(
                f,
                "Connection lost from {client_id} after {} seconds. Error: {error}",
                format_duration(*duration)
            ),
            LifecycleEvent::ClientLeft { client_id, duration, .. } => write!(
                f,
                "Client {client_id} disconnected after {} seconds",
                format_duration(*duration)
            ),
            LifecycleEvent::ProtocolViolation { client_id, payload } => write!(
                f,
                "Unrecognized payload from {client_id}: {:?}",
                String::from_utf8_lossy(payload)
            ),
        }
    }
}

/// Destination for lifecycle events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: LifecycleEvent);
}

/// Forwards events to `tracing` and optionally mirrors console events to stdout.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    console: bool,
}

impl TracingSink {
    pub fn new(console: bool) -> Self {
        Self { console }
    }
}

impl EventSink for TracingSink {
    fn record(&self, event: LifecycleEvent) {
        match event.severity() {
            Severity::Info => info!(target: "uptime::lifecycle", "{}", event),
            Severity::Warn => warn!(target: "uptime::lifecycle", "{}", event),
            Severity::Error => error!(target: "uptime::lifecycle", "{}", event),
        }

        if self.console && event.is_console() {
            println!("{event}");
        }
    }
}

/// Keeps every recorded event in memory, in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    pub fn count_matching<F>(&self, predicate: F) -> usize
    where
        F: Fn(&LifecycleEvent) -> bool,
    {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    /// Rendered log lines, as they would appear in the log file.
    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: LifecycleEvent) {
        self.events.lock().push(event);
    }
}
