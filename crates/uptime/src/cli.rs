//! Command-line interface handling for the uptime monitor.
//!
//! Every option can also come from the environment, which is how the monitor
//! is normally configured (`SERVER_HOST`, `SERVER_PORT`, `KEEPALIVE_INTERVAL`).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use uptime_protocol::parse_interval_secs;
use uptime_server::UnknownPayloadPolicy;

/// Command line arguments parsed from user input.
#[derive(Parser, Debug)]
#[command(author, version, about = "TCP keepalive uptime monitor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub role: Role,
}

/// Which side of the protocol this process runs.
#[derive(Subcommand, Debug)]
pub enum Role {
    /// Accept clients and answer their heartbeats
    Server(ServerArgs),
    /// Connect to a server and send heartbeats forever
    Client(ClientArgs),
}

/// Options shared by both roles.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Optional TOML configuration file
    #[arg(short, long, env = "UPTIME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append-only log file (defaults to server_log.txt / client_log.txt)
    #[arg(long, env = "UPTIME_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Write the log file as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Address to bind to
    #[arg(long, env = "SERVER_HOST")]
    pub host: Option<String>,

    /// TCP port to listen on
    #[arg(short, long, env = "SERVER_PORT")]
    pub port: Option<u16>,

    /// Seconds without a heartbeat before a client is dropped (0 disables)
    #[arg(long, env = "IDLE_TIMEOUT", value_parser = parse_interval_secs)]
    pub idle_timeout: Option<Duration>,

    /// What to do with payloads other than KEEPALIVE
    #[arg(long, value_enum)]
    pub unknown_payload: Option<UnknownPayloadPolicy>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Server host to connect to
    #[arg(long, env = "SERVER_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT")]
    pub port: Option<u16>,

    /// Seconds between heartbeats
    #[arg(short, long, env = "KEEPALIVE_INTERVAL", value_parser = parse_interval_secs)]
    pub interval: Option<Duration>,

    /// Seconds to wait for the server's acknowledgement (0 disables)
    #[arg(long, env = "RESPONSE_TIMEOUT", value_parser = parse_interval_secs)]
    pub response_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_client_flags() {
        let cli = Cli::try_parse_from([
            "uptime",
            "client",
            "--host",
            "10.1.2.3",
            "--port",
            "6000",
            "--interval",
            "0.5",
            "--log-level",
            "debug",
        ])
        .unwrap();

        let Role::Client(args) = cli.role else {
            panic!("expected client role");
        };
        assert_eq!(args.host.as_deref(), Some("10.1.2.3"));
        assert_eq!(args.port, Some(6000));
        assert_eq!(args.interval, Some(Duration::from_millis(500)));
        assert_eq!(args.common.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_server_flags() {
        let cli = Cli::try_parse_from([
            "uptime",
            "server",
            "--port",
            "7000",
            "--idle-timeout",
            "0",
            "--unknown-payload",
            "ignore",
            "--json-logs",
        ])
        .unwrap();

        let Role::Server(args) = cli.role else {
            panic!("expected server role");
        };
        assert_eq!(args.port, Some(7000));
        assert_eq!(args.idle_timeout, Some(Duration::ZERO));
        assert_eq!(args.unknown_payload, Some(UnknownPayloadPolicy::Ignore));
        assert!(args.common.json_logs);
    }

    #[test]
    fn test_unknown_payload_policy_values() {
        for (raw, expected) in [
            ("reject", UnknownPayloadPolicy::Reject),
            ("ignore", UnknownPayloadPolicy::Ignore),
        ] {
            let cli =
                Cli::try_parse_from(["uptime", "server", "--unknown-payload", raw]).unwrap();
            let Role::Server(args) = cli.role else {
                panic!("expected server role");
            };
            assert_eq!(args.unknown_payload, Some(expected));
        }
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["uptime", "client", "--interval", "-1"]).is_err());
        assert!(Cli::try_parse_from(["uptime", "client", "--port", "70000"]).is_err());
        assert!(Cli::try_parse_from(["uptime", "server", "--unknown-payload", "drop"]).is_err());
        assert!(Cli::try_parse_from(["uptime"]).is_err());
    }
}
