//! Signal handling for graceful shutdown.

use std::future::Future;
use tokio::signal;
use tracing::{error, info};

/// Returns when the process is asked to stop.
///
/// Handles SIGINT and SIGTERM on Unix and Ctrl+C on Windows. Errors only if
/// the handlers cannot be installed.
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// The shutdown trigger used by both roles.
///
/// Resolves once a shutdown signal arrives. If the handlers cannot be
/// installed the failure is logged and the future never resolves, so the
/// process keeps running until it is killed.
pub async fn shutdown_requested() {
    until_signalled(wait_for_shutdown()).await
}

async fn until_signalled<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Signal handling failed, continuing without it: {}", e);
        std::future::pending::<()>().await;
    }
}
