//! The client state machine.
//!
//! A [`ClientAgent`] is either `Disconnected` or `Connected`. While connected it
//! sends `KEEPALIVE`, waits for `OK`, then sleeps for the keepalive interval.
//! Any failure closes the connection, records how long it lasted, and puts the
//! agent back into `Disconnected`, from where it retries after the fixed
//! reconnect delay. The loop never gives up on its own.

use crate::config::ClientConfig;
use crate::error::ClientError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};
use uptime_protocol::{EventSink, LifecycleEvent, Message, KEEPALIVE, RECV_BUFFER_SIZE};

/// Reason recorded when the process is interrupted.
pub const USER_INTERRUPTED: &str = "User interrupted";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// Counters kept across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub heartbeats_sent: u64,
    pub acks_received: u64,
    pub sessions: u64,
}

/// An established connection. Exists only while the agent is connected.
#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    connected_at: Instant,
}

/// Keeps one logical session with the server alive, forever.
pub struct ClientAgent {
    config: ClientConfig,
    sink: Arc<dyn EventSink>,
    connection: Option<Connection>,
    stats: SessionStats,
}

impl ClientAgent {
    /// Creates a disconnected agent.
    ///
    /// # Arguments
    ///
    /// * `config` - Server endpoint, cadence and timeouts
    /// * `sink` - Where connection lifecycle events are reported
    pub fn new(config: ClientConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            sink,
            connection: None,
            stats: SessionStats::default(),
        }
    }

    /// Current state of the connection state machine.
    pub fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Counters accumulated over every session so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// How long the current session has lasted, if there is one.
    pub fn connected_for(&self) -> Option<Duration> {
        self.connection.as_ref().map(|c| c.connected_at.elapsed())
    }

    /// Attempts `Disconnected -> Connected`. Does nothing when already connected.
    ///
    /// Records `Connected` on success and `ConnectFailed` on failure.
    ///
    /// # Returns
    ///
    /// `Ok(())` once a connection is open, or the connect error. The agent
    /// stays `Disconnected` on error.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.is_connected() {
            return Ok(());
        }

        match self.open_stream().await {
            Ok(stream) => {
                self.connection = Some(Connection {
                    stream,
                    connected_at: Instant::now(),
                });
                self.stats.sessions += 1;
                self.sink.record(LifecycleEvent::Connected {
                    endpoint: self.config.endpoint(),
                });
                Ok(())
            }
            Err(e) => {
                self.sink.record(LifecycleEvent::ConnectFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn open_stream(&self) -> Result<TcpStream, ClientError> {
        let connect = TcpStream::connect((self.config.host.as_str(), self.config.port));

        let stream = match self.config.connect_timeout {
            Some(limit) => timeout(limit, connect)
                .await
                .map_err(|_| ClientError::ConnectTimeout(limit))?,
            None => connect.await,
        }
        .map_err(ClientError::Connect)?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(stream)
    }

    /// Sends one heartbeat and waits for the acknowledgement.
    ///
    /// On any failure the session is ended through [`disconnect`](Self::disconnect)
    /// before the error is returned.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - the server answered exactly `OK`
    /// * `Err(ClientError::NotConnected)` - there was no session to use
    /// * `Err(_)` - send, receive, timeout or reply failure; the agent is now
    ///   `Disconnected`
    pub async fn send_keepalive(&mut self) -> Result<(), ClientError> {
        let response_timeout = self.config.response_timeout;
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;

        let outcome = exchange(&mut connection.stream, response_timeout, &mut self.stats).await;

        match outcome {
            Ok(response) if Message::is_ack(&response) => {
                self.stats.acks_received += 1;
                trace!("Heartbeat acknowledged");
                Ok(())
            }
            Ok(response) => {
                self.sink.record(LifecycleEvent::UnexpectedResponse {
                    payload: response.clone(),
                });
                let e = ClientError::UnexpectedResponse(response);
                self.disconnect(&e.disconnect_reason()).await;
                Err(e)
            }
            Err(e) => {
                self.disconnect(&e.disconnect_reason()).await;
                Err(e)
            }
        }
    }

    /// Ends the current session with `reason`.
    ///
    /// Closing errors are ignored. Returns how long the session lasted, or
    /// `None` (and records nothing) when there was no session to end.
    pub async fn disconnect(&mut self, reason: &str) -> Option<Duration> {
        let Connection {
            mut stream,
            connected_at,
        } = self.connection.take()?;

        if let Err(e) = stream.shutdown().await {
            trace!("Ignoring error while closing connection: {}", e);
        }
        drop(stream);

        let duration = connected_at.elapsed();
        self.sink.record(LifecycleEvent::Disconnected {
            duration,
            reason: reason.to_string(),
        });

        Some(duration)
    }

    /// Runs one step of the control loop and returns how long to wait before
    /// the next one.
    ///
    /// # Returns
    ///
    /// The keepalive interval after an acknowledged heartbeat, otherwise the
    /// reconnect delay.
    pub async fn run_once(&mut self) -> Duration {
        if !self.is_connected() && self.connect().await.is_err() {
            self.sink.record(LifecycleEvent::ReconnectScheduled {
                delay: self.config.reconnect_delay,
            });
            return self.config.reconnect_delay;
        }

        match self.send_keepalive().await {
            Ok(()) => self.config.keepalive_interval,
            Err(_) => self.config.reconnect_delay,
        }
    }

    /// Drives the agent until `shutdown` completes, then disconnects with the
    /// reason "User interrupted".
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Future that resolves when the process should stop. It is
    ///   raced against both the network step and the pause after it.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let delay = tokio::select! {
                _ = &mut shutdown => break,
                delay = self.run_once() => delay,
            };

            tokio::select! {
                _ = &mut shutdown => break,
                _ = pause(delay) => {}
            }
        }

        self.disconnect(USER_INTERRUPTED).await;
    }
}

/// One request/response exchange on an open stream.
async fn exchange(
    stream: &mut TcpStream,
    response_timeout: Option<Duration>,
    stats: &mut SessionStats,
) -> Result<Vec<u8>, ClientError> {
    stream.write_all(KEEPALIVE).await.map_err(ClientError::Send)?;
    stats.heartbeats_sent += 1;

    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let read = match response_timeout {
        Some(limit) => timeout(limit, stream.read(&mut buf))
            .await
            .map_err(|_| ClientError::ResponseTimeout(limit))?,
        None => stream.read(&mut buf).await,
    }
    .map_err(ClientError::Receive)?;

    if read == 0 {
        return Err(ClientError::PeerClosed);
    }

    Ok(buf[..read].to_vec())
}

/// Sleeps for `delay`; a zero delay still yields to the scheduler.
async fn pause(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        sleep(delay).await;
    }
}
