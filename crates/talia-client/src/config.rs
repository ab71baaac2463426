// Client configuration loading and validation (client.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use talia_core::backoff::Backoff;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server: ServerConfig,
    pub connection: ConnectionConfig,
    pub sync: SyncConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the HTTP game API.
    pub http_base: String,
    /// Base URL of the realtime endpoint.
    pub ws_base: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_base: "http://localhost:8000".into(),
            ws_base: "ws://localhost:8000".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub heartbeat_secs: u64,
    pub reconnect_base_ms: u64,
    pub reconnect_growth: f64,
    pub reconnect_cap_secs: u64,
    pub settle_ms: u64,
    /// 0 disables the pong watchdog.
    pub pong_timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            heartbeat_secs: 25,
            reconnect_base_ms: 3000,
            reconnect_growth: 1.5,
            reconnect_cap_secs: 30,
            settle_ms: 500,
            pong_timeout_secs: 60,
        }
    }
}

impl ConnectionConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn pong_timeout(&self) -> Option<Duration> {
        (self.pong_timeout_secs > 0).then(|| Duration::from_secs(self.pong_timeout_secs))
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_base_ms),
            self.reconnect_growth,
            Duration::from_secs(self.reconnect_cap_secs),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    /// Give up on a collaborator request after this long.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            poll_interval_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub bubble_ms: u64,
    /// Used when a disconnect notice carries no timeout of its own.
    pub disconnect_timeout_secs: u64,
    pub trick_display_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            bubble_ms: 2500,
            disconnect_timeout_secs: 60,
            trick_display_ms: 1500,
        }
    }
}

impl UiConfig {
    pub fn bubble_ttl(&self) -> Duration {
        Duration::from_millis(self.bubble_ms)
    }

    pub fn trick_display(&self) -> Duration {
        Duration::from_millis(self.trick_display_ms)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate the config file at `path`.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let config: ClientConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &ClientConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if !(server.http_base.starts_with("http://") || server.http_base.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "server.http_base".into(),
            message: format!("must start with http:// or https://, got {:?}", server.http_base),
        });
    }
    if !(server.ws_base.starts_with("ws://") || server.ws_base.starts_with("wss://")) {
        return Err(ConfigError::ValidationError {
            field: "server.ws_base".into(),
            message: format!("must start with ws:// or wss://, got {:?}", server.ws_base),
        });
    }

    let conn = &config.connection;
    let positive_fields: &[(&str, u64)] = &[
        ("connection.heartbeat_secs", conn.heartbeat_secs),
        ("connection.reconnect_base_ms", conn.reconnect_base_ms),
        ("connection.reconnect_cap_secs", conn.reconnect_cap_secs),
        ("sync.poll_interval_secs", config.sync.poll_interval_secs),
        ("sync.request_timeout_secs", config.sync.request_timeout_secs),
        ("ui.disconnect_timeout_secs", config.ui.disconnect_timeout_secs),
    ];
    for (name, val) in positive_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    if !(conn.reconnect_growth >= 1.0 && conn.reconnect_growth.is_finite()) {
        return Err(ConfigError::ValidationError {
            field: "connection.reconnect_growth".into(),
            message: format!("must be >= 1.0, got {}", conn.reconnect_growth),
        });
    }

    if conn.reconnect_cap_secs.saturating_mul(1000) < conn.reconnect_base_ms {
        return Err(ConfigError::ValidationError {
            field: "connection.reconnect_cap_secs".into(),
            message: format!(
                "must not be below reconnect_base_ms ({} ms)",
                conn.reconnect_base_ms
            ),
        });
    }

    if !(2000..=2500).contains(&config.ui.bubble_ms) {
        return Err(ConfigError::ValidationError {
            field: "ui.bubble_ms".into(),
            message: format!("must be between 2000 and 2500, got {}", config.ui.bubble_ms),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
