//! Configuration management for the uptime monitor.
//!
//! Settings come from three places, highest precedence first: command-line
//! flags (and their environment variables), an optional TOML file, and the
//! built-in defaults of each role.

use crate::cli::{ClientArgs, CommonArgs, ServerArgs};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::info;
use uptime_client::ClientConfig;
use uptime_protocol::{
    DEFAULT_CLIENT_HOST, DEFAULT_IDLE_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL, DEFAULT_PORT,
    DEFAULT_RESPONSE_TIMEOUT, DEFAULT_SERVER_HOST,
};
use uptime_server::{ServerConfig, UnknownPayloadPolicy};

/// Application configuration loaded from TOML file.
///
/// Every table is optional; missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Heartbeat client settings
    pub client: ClientSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Listener settings. Timeouts are in seconds; 0 disables them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Host or address to bind to
    pub host: String,
    /// TCP port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Seconds without a heartbeat before a client is dropped
    pub idle_timeout_secs: f64,
    /// `reject` closes connections that send anything but `KEEPALIVE`
    pub unknown_payload: UnknownPayloadPolicy,
    /// Seconds `stop()` waits for handlers to finish
    pub shutdown_grace_secs: f64,
}

/// Client settings. Timeouts are in seconds; 0 disables them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Server host to connect to
    pub host: String,
    /// Server port
    pub port: u16,
    /// Seconds between heartbeats
    pub keepalive_interval_secs: f64,
    /// Seconds to wait for `OK`
    pub response_timeout_secs: f64,
    /// Seconds a single connect attempt may take
    pub connect_timeout_secs: f64,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to write the log file as JSON lines
    pub json_format: bool,
    /// Log file path; the role's default file when unset
    pub file_path: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_PORT,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs_f64(),
            unknown_payload: UnknownPayloadPolicy::Reject,
            shutdown_grace_secs: 2.0,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_CLIENT_HOST.to_string(),
            port: DEFAULT_PORT,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL.as_secs_f64(),
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT.as_secs_f64(),
            connect_timeout_secs: DEFAULT_RESPONSE_TIMEOUT.as_secs_f64(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// that path and the defaults are returned.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Loads the file named by `--config`, or the defaults when there is none.
    pub async fn load(common: &CommonArgs) -> Result<Self> {
        match &common.config {
            Some(path) => Self::load_from_file(path).await,
            None => Ok(Self::default()),
        }
    }

    fn apply_common_args(&mut self, common: &CommonArgs) {
        if let Some(log_file) = &common.log_file {
            self.logging.file_path = Some(log_file.display().to_string());
        }
        if let Some(level) = &common.log_level {
            self.logging.level = level.clone();
        }
        if common.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Applies command-line and environment overrides for the server role.
    pub fn apply_server_args(&mut self, args: &ServerArgs) {
        self.apply_common_args(&args.common);

        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(idle) = args.idle_timeout {
            self.server.idle_timeout_secs = idle.as_secs_f64();
        }
        if let Some(policy) = args.unknown_payload {
            self.server.unknown_payload = policy;
        }
    }

    /// Applies command-line and environment overrides for the client role.
    pub fn apply_client_args(&mut self, args: &ClientArgs) {
        self.apply_common_args(&args.common);

        if let Some(host) = &args.host {
            self.client.host = host.clone();
        }
        if let Some(port) = args.port {
            self.client.port = port;
        }
        if let Some(interval) = args.interval {
            self.client.keepalive_interval_secs = interval.as_secs_f64();
        }
        if let Some(limit) = args.response_timeout {
            self.client.response_timeout_secs = limit.as_secs_f64();
        }
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Returns an error string describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_host(&self.server.host) {
            return Err(format!("Invalid server host: {:?}", self.server.host));
        }
        if !is_valid_host(&self.client.host) {
            return Err(format!("Invalid client host: {:?}", self.client.host));
        }
        if self.client.port == 0 {
            return Err("Client port must be between 1 and 65535".to_string());
        }

        for (name, value) in [
            ("server.idle_timeout_secs", self.server.idle_timeout_secs),
            ("server.shutdown_grace_secs", self.server.shutdown_grace_secs),
            ("client.keepalive_interval_secs", self.client.keepalive_interval_secs),
            ("client.response_timeout_secs", self.client.response_timeout_secs),
            ("client.connect_timeout_secs", self.client.connect_timeout_secs),
        ] {
            seconds(value).map_err(|e| format!("Invalid {name}: {e}"))?;
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }

    /// Warns when the client's heartbeat interval is not shorter than the
    /// server's idle deadline.
    ///
    /// Such a client is valid but gets dropped by the server between every
    /// pair of heartbeats, so it never keeps a session. The deadline compared
    /// against is the `[server]` table of the same configuration, which is the
    /// server default unless the file says otherwise.
    ///
    /// # Returns
    ///
    /// The warning text, or `None` when the interval fits.
    pub fn idle_deadline_warning(&self) -> Option<String> {
        let deadline = self.server.idle_timeout_secs;
        let interval = self.client.keepalive_interval_secs;

        (deadline > 0.0 && interval >= deadline).then(|| {
            format!(
                "Keepalive interval of {interval} seconds is not shorter than the server idle \
                 deadline of {deadline} seconds; the server will drop this client between heartbeats"
            )
        })
    }

    /// Builds the listener configuration, resolving the bind host.
    pub async fn to_server_config(&self) -> Result<ServerConfig> {
        let bind_address = resolve_bind_address(&self.server.host, self.server.port).await?;

        Ok(ServerConfig {
            bind_address,
            idle_timeout: optional_seconds(self.server.idle_timeout_secs)?,
            unknown_payload: self.server.unknown_payload,
            shutdown_grace: seconds(self.server.shutdown_grace_secs).map_err(|e| anyhow!(e))?,
            ..ServerConfig::default()
        })
    }

    pub fn to_client_config(&self) -> Result<ClientConfig> {
        Ok(ClientConfig {
            keepalive_interval: seconds(self.client.keepalive_interval_secs)
                .map_err(|e| anyhow!(e))?,
            response_timeout: optional_seconds(self.client.response_timeout_secs)?,
            connect_timeout: optional_seconds(self.client.connect_timeout_secs)?,
            ..ClientConfig::new(self.client.host.clone(), self.client.port)
        })
    }
}

fn seconds(value: f64) -> Result<Duration, String> {
    if value.is_sign_negative() {
        return Err(format!("{value} is negative"));
    }
    Duration::try_from_secs_f64(value).map_err(|e| format!("{value}: {e}"))
}

/// Zero means "no limit".
fn optional_seconds(value: f64) -> Result<Option<Duration>> {
    let duration = seconds(value).map_err(|e| anyhow!(e))?;
    Ok((!duration.is_zero()).then_some(duration))
}

fn is_valid_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }

    !host.is_empty()
        && host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

async fn resolve_bind_address(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve bind host {host}"))?
        .next()
        .ok_or_else(|| anyhow!("Bind host {host} resolved to no addresses"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.idle_timeout_secs, 30.0);
        assert_eq!(config.server.unknown_payload, UnknownPayloadPolicy::Reject);
        assert_eq!(config.client.host, "localhost");
        assert_eq!(config.client.port, 5000);
        assert_eq!(config.client.keepalive_interval_secs, 0.25);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.logging.file_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[client]
host = "monitor.internal"
keepalive_interval_secs = 1.5

[server]
unknown_payload = "ignore"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.client.host, "monitor.internal");
        assert_eq!(config.client.keepalive_interval_secs, 1.5);
        assert_eq!(config.client.port, 5000);
        assert_eq!(config.server.unknown_payload, UnknownPayloadPolicy::Ignore);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[tokio::test]
    async fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path: PathBuf = dir.path().join("uptime.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nport = \"not a number\"").unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let mut config = AppConfig::default();
        config.client.host = "from-file".to_string();
        config.client.port = 6000;

        let args = ClientArgs {
            host: Some("from-cli".to_string()),
            interval: Some(Duration::from_millis(100)),
            response_timeout: Some(Duration::ZERO),
            common: CommonArgs {
                log_level: Some("debug".to_string()),
                json_logs: true,
                ..Default::default()
            },
            ..Default::default()
        };
        config.apply_client_args(&args);

        assert_eq!(config.client.host, "from-cli");
        assert_eq!(config.client.port, 6000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);

        let client = config.to_client_config().unwrap();
        assert_eq!(client.keepalive_interval, Duration::from_millis(100));
        assert_eq!(client.response_timeout, None);
        assert_eq!(client.endpoint(), "from-cli:6000");
    }

    #[test]
    fn test_server_overrides() {
        let mut config = AppConfig::default();
        let args = ServerArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(7001),
            idle_timeout: Some(Duration::from_secs(5)),
            unknown_payload: Some(UnknownPayloadPolicy::Ignore),
            ..Default::default()
        };
        config.apply_server_args(&args);

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7001);
        assert_eq!(config.server.idle_timeout_secs, 5.0);
        assert_eq!(config.server.unknown_payload, UnknownPayloadPolicy::Ignore);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.client.port = 0;
        assert!(config.validate().unwrap_err().contains("port"));

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("log level"));

        let mut config = AppConfig::default();
        config.server.host = "not a host!".to_string();
        assert!(config.validate().unwrap_err().contains("server host"));

        let mut config = AppConfig::default();
        config.client.keepalive_interval_secs = -1.0;
        assert!(config.validate().unwrap_err().contains("keepalive_interval_secs"));

        let mut config = AppConfig::default();
        config.server.idle_timeout_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_is_valid() {
        let mut config = AppConfig::default();
        config.client.keepalive_interval_secs = 0.0;
        assert!(config.validate().is_ok());
        assert_eq!(config.to_client_config().unwrap().keepalive_interval, Duration::ZERO);
    }

    #[test]
    fn test_interval_at_or_above_idle_deadline_warns() {
        let mut config = AppConfig::default();
        assert!(config.idle_deadline_warning().is_none());

        config.client.keepalive_interval_secs = 30.0;
        let warning = config.idle_deadline_warning().unwrap();
        assert!(warning.contains("30 seconds"), "{warning}");

        config.client.keepalive_interval_secs = 45.0;
        assert!(config.idle_deadline_warning().is_some());

        // Still a valid configuration, only a warning
        assert!(config.validate().is_ok());

        config.server.idle_timeout_secs = 0.0;
        assert!(config.idle_deadline_warning().is_none());

        config.server.idle_timeout_secs = 60.0;
        assert!(config.idle_deadline_warning().is_none());
    }

    #[test]
    fn test_host_validation() {
        assert!(is_valid_host("localhost"));
        assert!(is_valid_host("uptime-01.example.com"));
        assert!(is_valid_host("::1"));
        assert!(is_valid_host("10.0.0.1"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("-bad.example"));
        assert!(!is_valid_host("a..b"));
    }

    #[tokio::test]
    async fn test_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.server.idle_timeout_secs = 0.0;

        let server = config.to_server_config().await.unwrap();
        assert_eq!(server.bind_address, "127.0.0.1:0".parse::<SocketAddr>().unwrap());
        assert_eq!(server.idle_timeout, None);
        assert_eq!(server.backlog, 5);
    }

    #[tokio::test]
    async fn test_bind_host_name_is_resolved() {
        let mut config = AppConfig::default();
        config.server.host = "localhost".to_string();
        config.server.port = 5050;

        let server = config.to_server_config().await.unwrap();
        assert!(server.bind_address.ip().is_loopback());
        assert_eq!(server.bind_address.port(), 5050);
    }
}
