//! Core listener implementation.
//!
//! This module contains the `UptimeServer` struct: socket setup, the accept
//! loop that spawns one handler per connection, and the shutdown path that
//! tears every live connection down.

use crate::{
    config::ServerConfig,
    connection::{
        handler::{handle_client, HandlerContext},
        ClientRegistry,
    },
    error::ServerError,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uptime_protocol::{EventSink, LifecycleEvent};

/// The uptime server.
///
/// Accepts connections indefinitely, runs an independent heartbeat handler
/// for each one, and keeps the [`ClientRegistry`] of live clients. Accepting
/// never waits on any handler's traffic.
pub struct UptimeServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Where lifecycle events are reported
    sink: Arc<dyn EventSink>,

    /// Live clients, shared with every handler
    registry: Arc<ClientRegistry>,

    /// Cleared by `stop()`; handlers check it between reads
    running: Arc<AtomicBool>,

    /// Set once `stop()` has run for the current run, so a second call is a
    /// no-op. Cleared again by a successful `bind()`.
    stopped: AtomicBool,

    /// Address the listener actually bound to
    local_addr: OnceLock<SocketAddr>,

    /// Channel for waking the accept loop on shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl UptimeServer {
    pub fn new(config: ServerConfig, sink: Arc<dyn EventSink>) -> Self {
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            sink,
            registry: Arc::new(ClientRegistry::new()),
            running: Arc::new(AtomicBool::new(false)),
            stopped: AtomicBool::new(false),
            local_addr: OnceLock::new(),
            shutdown_sender,
        }
    }

    /// Binds the listening socket and runs the accept loop until `stop()`.
    ///
    /// Bind and accept failures are fatal: they are reported, the server is
    /// stopped, and the error is returned to the caller.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = match self.bind() {
            Ok(listener) => listener,
            Err(e) => {
                self.sink.record(LifecycleEvent::ServerError {
                    error: e.to_string(),
                });
                self.stop().await;
                return Err(e);
            }
        };

        self.serve(listener).await
    }

    /// Creates the listening socket with `SO_REUSEADDR` and marks the server
    /// as running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }
        // A new run gets its own stop()
        self.stopped.store(false, Ordering::SeqCst);

        let listener = match self.create_listener() {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let local = listener.local_addr().unwrap_or(self.config.bind_address);
        let _ = self.local_addr.set(local);
        self.sink.record(LifecycleEvent::ServerStarted {
            addr: local.to_string(),
        });

        Ok(listener)
    }

    fn create_listener(&self) -> Result<TcpListener, ServerError> {
        let address = self.config.bind_address;

        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::Network(format!("Failed to set SO_REUSEADDR: {e}")))?;

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed on {address}: {e}")))?;
        socket
            .listen(self.config.backlog)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;

        TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// The listener is dropped, closing the socket, when the loop ends.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();

        let ctx = HandlerContext {
            registry: self.registry.clone(),
            sink: self.sink.clone(),
            running: self.running.clone(),
            idle_timeout: self.config.idle_timeout,
            unknown_payload: self.config.unknown_payload,
        };

        while self.is_running() {
            tokio::select! {
                _ = shutdown_receiver.recv() => {
                    debug!("Accept loop received shutdown signal");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(handle_client(stream, peer, ctx));
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        self.sink.record(LifecycleEvent::ServerError {
                            error: e.to_string(),
                        });
                        self.stop().await;
                        return Err(ServerError::Network(format!("Accept failed: {e}")));
                    }
                }
            }
        }

        drop(listener);
        Ok(())
    }

    /// Stops accepting, closes every registered connection and waits (up to
    /// the configured grace period) for the handlers to finish.
    ///
    /// Handlers deregister as their very last step, so once the registry is
    /// empty every `ClientLeft` has been recorded. Calling it again does
    /// nothing until the next successful `bind()`.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_sender.send(());

        let closed = self.registry.close_all();
        if closed > 0 {
            info!("Closing {} client connection(s)", closed);
        }

        let grace = self.config.shutdown_grace;
        if timeout(grace, self.registry.wait_until_empty()).await.is_err() {
            warn!(
                "{} client(s) still registered after {:?}: {:?}",
                self.registry.len(),
                grace,
                self.registry.client_ids()
            );
        }

        self.sink.record(LifecycleEvent::ServerStopped);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> Arc<ClientRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.config.bind_address
    }

    /// The bound address, including the port picked for `:0`. `None` until
    /// `bind()` has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}
