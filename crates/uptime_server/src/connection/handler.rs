//! Heartbeat handler, one task per accepted connection.
//!
//! The handler registers its client, answers every `KEEPALIVE` with `OK`, and
//! on any exit (peer close, transport error, idle deadline, forced close from
//! the listener) shuts its stream down, reports the disconnect and only then
//! deregisters. Errors are reported through the event sink and never
//! propagate to the accept loop.

use super::{ClientRecord, ClientRegistry};
use crate::config::UnknownPayloadPolicy;
use crate::error::ConnectionError;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio::time::timeout;
use tracing::{debug, trace};
use uptime_protocol::{EventSink, LifecycleEvent, Message, ProtocolError, ACK, RECV_BUFFER_SIZE};

/// Everything a handler shares with the listener that spawned it.
#[derive(Clone)]
pub struct HandlerContext {
    pub registry: Arc<ClientRegistry>,
    pub sink: Arc<dyn EventSink>,
    pub running: Arc<AtomicBool>,
    pub idle_timeout: Option<Duration>,
    pub unknown_payload: UnknownPayloadPolicy,
}

/// How a connection ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CleanExit {
    PeerClosed,
    ServerStopping,
}

impl CleanExit {
    fn as_str(&self) -> &'static str {
        match self {
            CleanExit::PeerClosed => "peer closed the connection",
            CleanExit::ServerStopping => "server stopping",
        }
    }
}

/// Services one client for the lifetime of its connection.
pub async fn handle_client(mut stream: TcpStream, peer: SocketAddr, ctx: HandlerContext) {
    let record = ClientRecord::new(peer, ctx.registry.next_session());
    let client_id = record.client_id.clone();
    let session = record.session;
    let connected_at = record.connected_at;
    let close_signal = record.close_signal();

    ctx.registry.insert(record);
    ctx.sink.record(LifecycleEvent::ClientJoined {
        client_id: client_id.clone(),
    });

    let outcome = serve_heartbeats(&mut stream, &client_id, &close_signal, &ctx).await;

    let reason = match &outcome {
        Ok(exit) => exit.as_str().to_string(),
        Err(e) => {
            ctx.sink.record(LifecycleEvent::ConnectionLost {
                client_id: client_id.clone(),
                duration: connected_at.elapsed(),
                error: e.to_string(),
            });
            e.to_string()
        }
    };

    if let Err(e) = stream.shutdown().await {
        trace!("Shutdown of {} failed: {}", client_id, e);
    }
    drop(stream);

    ctx.sink.record(LifecycleEvent::ClientLeft {
        client_id: client_id.clone(),
        duration: connected_at.elapsed(),
        reason,
    });

    // Last step: `stop()` treats an empty registry as "all handlers done"
    ctx.registry.remove(&client_id, session);
}

/// The protocol loop. Steady-state traffic is not logged.
async fn serve_heartbeats(
    stream: &mut TcpStream,
    client_id: &str,
    close_signal: &Notify,
    ctx: &HandlerContext,
) -> Result<CleanExit, ConnectionError> {
    let mut buf = [0u8; RECV_BUFFER_SIZE];

    while ctx.running.load(Ordering::SeqCst) {
        let read = tokio::select! {
            _ = close_signal.notified() => return Err(ConnectionError::ForcedClose),
            read = read_with_deadline(stream, &mut buf, ctx.idle_timeout) => read?,
        };

        if read == 0 {
            return Ok(CleanExit::PeerClosed);
        }

        let payload = &buf[..read];
        match Message::parse_request(payload) {
            Ok(Message::Keepalive) => stream.write_all(ACK).await?,
            Ok(Message::Ack) | Err(_) => match ctx.unknown_payload {
                UnknownPayloadPolicy::Ignore => {
                    debug!("Ignoring {} byte payload from {}", read, client_id);
                }
                UnknownPayloadPolicy::Reject => {
                    ctx.sink.record(LifecycleEvent::ProtocolViolation {
                        client_id: client_id.to_string(),
                        payload: payload.to_vec(),
                    });
                    return Err(ProtocolError::UnrecognizedPayload(payload.to_vec()).into());
                }
            },
        }
    }

    Ok(CleanExit::ServerStopping)
}

async fn read_with_deadline(
    stream: &mut TcpStream,
    buf: &mut [u8],
    deadline: Option<Duration>,
) -> Result<usize, ConnectionError> {
    match deadline {
        Some(limit) => match timeout(limit, stream.read(buf)).await {
            Ok(read) => Ok(read?),
            Err(_) => Err(ConnectionError::IdleTimeout(limit)),
        },
        None => Ok(stream.read(buf).await?),
    }
}
