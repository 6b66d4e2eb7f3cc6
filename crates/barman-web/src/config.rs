//! Configuration for the web console.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use barman_core::RunnerConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Prefix used when `BARMAN_WEB_USE_PREFIX` is set without `BARMAN_WEB_PREFIX`.
pub const DEFAULT_PREFIX: &str = "sudo -u barman";

/// Default listening port.
pub const DEFAULT_HTTP_PORT: u16 = 5555;

/// Configuration for the web console.
#[derive(Clone)]
pub struct WebConfig {
    /// Path or name of the `barman` binary.
    pub tool_path: String,

    /// Whether `prefix` is prepended to every invocation.
    pub use_prefix: bool,

    /// Wrapping command, e.g. `["sudo", "-u", "barman"]`.
    pub prefix: Vec<String>,

    /// Upper bound on a single invocation (default: none).
    pub command_timeout: Option<Duration>,

    /// HTTP server bind address.
    pub http_addr: SocketAddr,

    /// Username of the bootstrap administrator.
    pub admin_username: String,

    /// Password of the bootstrap administrator. Generated at startup if unset.
    pub admin_password: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BARMAN_WEB_PREFIX {value:?}: {reason}")]
    InvalidPrefix { value: String, reason: String },

    #[error("BARMAN_WEB_USE_PREFIX is set but the prefix is empty")]
    EmptyPrefix,

    #[error("invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            tool_path: barman_core::DEFAULT_TOOL.to_string(),
            use_prefix: false,
            prefix: split_prefix(DEFAULT_PREFIX).unwrap_or_default(),
            command_timeout: None,
            http_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_HTTP_PORT),
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }
}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("tool_path", &self.tool_path)
            .field("use_prefix", &self.use_prefix)
            .field("prefix", &self.prefix)
            .field("command_timeout", &self.command_timeout)
            .field("http_addr", &self.http_addr)
            .field("admin_username", &self.admin_username)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BARMAN_WEB_TOOL` | `barman` |
    /// | `BARMAN_WEB_USE_PREFIX` | `false` |
    /// | `BARMAN_WEB_PREFIX` | `sudo -u barman` |
    /// | `BARMAN_WEB_COMMAND_TIMEOUT_SECS` | unset (no timeout) |
    /// | `BARMAN_WEB_HTTP_HOST` | `127.0.0.1` |
    /// | `BARMAN_WEB_HTTP_PORT` | `5555` |
    /// | `BARMAN_WEB_ADMIN_USERNAME` | `admin` |
    /// | `BARMAN_WEB_ADMIN_PASSWORD` | generated |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default = Self::default();

        let http_host: IpAddr = match lookup("BARMAN_WEB_HTTP_HOST") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "BARMAN_WEB_HTTP_HOST",
                value: v,
            })?,
            None => default.http_addr.ip(),
        };

        let http_port: u16 = match lookup("BARMAN_WEB_HTTP_PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "BARMAN_WEB_HTTP_PORT",
                value: v,
            })?,
            None => default.http_addr.port(),
        };

        let command_timeout = match lookup("BARMAN_WEB_COMMAND_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        name: "BARMAN_WEB_COMMAND_TIMEOUT_SECS",
                        value: v,
                    })
                }
            },
            None => default.command_timeout,
        };

        let use_prefix = lookup("BARMAN_WEB_USE_PREFIX")
            .map(|v| parse_flag(&v))
            .unwrap_or(default.use_prefix);

        let prefix = match lookup("BARMAN_WEB_PREFIX") {
            Some(v) => split_prefix(&v)?,
            None => default.prefix,
        };

        if use_prefix && prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }

        Ok(Self {
            tool_path: lookup("BARMAN_WEB_TOOL").unwrap_or(default.tool_path),
            use_prefix,
            prefix,
            command_timeout,
            http_addr: SocketAddr::new(http_host, http_port),
            admin_username: lookup("BARMAN_WEB_ADMIN_USERNAME")
                .unwrap_or(default.admin_username),
            admin_password: lookup("BARMAN_WEB_ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        })
    }

    /// Command-execution context for the runner.
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new(&self.tool_path);
        if self.use_prefix {
            config = config.prefix(self.prefix.iter().cloned());
        }
        if let Some(timeout) = self.command_timeout {
            config = config.timeout(timeout);
        }
        config
    }

    /// Validate configuration but only log warnings instead of failing.
    pub fn validate_warn(&self) {
        // Bare names are resolved through PATH at spawn time
        if self.tool_path.contains('/') && !Path::new(&self.tool_path).exists() {
            tracing::warn!("Barman binary not found: {:?}", self.tool_path);
        }

        if self.admin_password.is_none() {
            tracing::warn!("BARMAN_WEB_ADMIN_PASSWORD not set, a random password will be generated");
        }

        if !self.http_addr.ip().is_loopback() {
            tracing::warn!(addr = %self.http_addr, "Listening on a non-loopback address");
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_prefix(value: &str) -> Result<Vec<String>, ConfigError> {
    shell_words::split(value).map_err(|e| ConfigError::InvalidPrefix {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
