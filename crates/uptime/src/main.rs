//! # Uptime Monitor
//!
//! One binary, two roles. `uptime server` listens for heartbeat clients and
//! answers every `KEEPALIVE` with `OK`; `uptime client` keeps one connection
//! to a server alive forever, reconnecting after any failure.

mod cli;
mod config;
mod logging;
mod signals;

use crate::cli::{Cli, ClientArgs, Role, ServerArgs};
use crate::config::AppConfig;
use crate::logging::{setup_logging, CLIENT_LOG_FILE, SERVER_LOG_FILE};
use crate::signals::shutdown_requested;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use uptime_client::ClientAgent;
use uptime_protocol::TracingSink;
use uptime_server::UptimeServer;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.role {
        Role::Server(args) => run_server(args).await,
        Role::Client(args) => run_client(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(args: ServerArgs) -> Result<()> {
    let mut config = AppConfig::load(&args.common).await?;
    config.apply_server_args(&args);
    config.validate().map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    setup_logging(&config.logging, SERVER_LOG_FILE)?;
    let server_config = config.to_server_config().await?;
    info!("Starting server with {:?}", server_config);

    let server = Arc::new(UptimeServer::new(
        server_config,
        Arc::new(TracingSink::new(true)),
    ));

    let mut accept_loop = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    tokio::select! {
        finished = &mut accept_loop => {
            finished
                .context("Server task failed")?
                .context("Server failed")?;
        }
        _ = shutdown_requested() => {
            server.stop().await;
            accept_loop
                .await
                .context("Server task failed")?
                .context("Server failed")?;
        }
    }

    Ok(())
}

async fn run_client(args: ClientArgs) -> Result<()> {
    let mut config = AppConfig::load(&args.common).await?;
    config.apply_client_args(&args);
    config.validate().map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

    setup_logging(&config.logging, CLIENT_LOG_FILE)?;
    if let Some(warning) = config.idle_deadline_warning() {
        warn!("{}", warning);
        println!("Warning: {warning}");
    }
    let client_config = config.to_client_config()?;
    info!("Starting client with {:?}", client_config);

    let mut agent = ClientAgent::new(client_config, Arc::new(TracingSink::new(true)));

    let session = tokio::spawn(async move {
        agent.run(shutdown_requested()).await;
        agent.stats()
    });

    match session.await {
        Ok(stats) => {
            info!(
                "Client finished: {} session(s), {} heartbeat(s), {} ack(s)",
                stats.sessions, stats.heartbeats_sent, stats.acks_received
            );
            Ok(())
        }
        Err(e) => Err(anyhow!("Client error: {e}")),
    }
}
