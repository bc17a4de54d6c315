use std::path::Path;
use std::time::Duration;

use anyhow::{Context, ensure};
use serde::Deserialize;

/// Environment variable naming an optional YAML configuration file.
pub const CONFIG_ENV: &str = "JAIL_CONN_CONFIG";

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Size ceilings and timeouts applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Ceiling on a request body: a `Content-Length` above it is refused
    /// before any body byte is read. Reads themselves are chunked by
    /// `net_buffer_size`.
    pub max_receive_size: usize,
    /// Largest header section accepted before the blank line.
    pub header_size_limit: usize,
    /// Bytes moved per transport read or write.
    pub net_buffer_size: usize,
    /// Quiet time tolerated mid-transfer; reset by every successful transfer.
    pub idle_timeout_ms: u64,
    /// Upper bound on a single receive or send call.
    pub request_timeout_ms: u64,
    /// Poll quantum between deadline checks.
    pub poll_interval_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_receive_size: 16 * 1024 * 1024,
            header_size_limit: 8 * 1024,
            net_buffer_size: 10 * 1024,
            idle_timeout_ms: 5_000,
            request_timeout_ms: 60_000,
            poll_interval_ms: 10,
        }
    }
}

impl Limits {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Loads the configuration for this process.
    ///
    /// Starts from the file named by `JAIL_CONN_CONFIG` (or the defaults when
    /// unset), then lets `LISTEN` override the listen address.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            config.server.listen_addr = listen_addr;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("loading config file {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("invalid YAML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let limits = &self.limits;
        ensure!(!self.server.listen_addr.is_empty(), "listen_addr must not be empty");
        ensure!(limits.header_size_limit > 0, "header_size_limit must be positive");
        ensure!(limits.net_buffer_size > 0, "net_buffer_size must be positive");
        ensure!(limits.idle_timeout_ms > 0, "idle_timeout_ms must be positive");
        ensure!(limits.request_timeout_ms > 0, "request_timeout_ms must be positive");
        ensure!(limits.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(
            limits.header_size_limit <= limits.max_receive_size,
            "header_size_limit ({}) exceeds max_receive_size ({})",
            limits.header_size_limit,
            limits.max_receive_size
        );
        Ok(())
    }
}
