//! Service configuration: TOML file, environment, then command-line flags.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Full configuration for the telemetry service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct TelemetryConfig {
    /// HTTP listener settings.
    server: ServerConfig,
    /// Database and pool settings.
    store: StoreConfig,
    /// Move sequencer retry policy.
    sequencer: SequencerConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Interface to bind.
    host: String,
    /// Port to bind.
    port: u16,
    /// Deadline applied to each request, in milliseconds.
    request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_ms: 5_000,
        }
    }
}

impl ServerConfig {
    /// Request deadline as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Database location and pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct StoreConfig {
    /// Path of the SQLite database file.
    database_url: String,
    /// Upper bound on pooled connections.
    max_connections: u32,
    /// Idle connections kept open.
    min_idle: u32,
    /// How long to wait for a free connection.
    connection_timeout_secs: u64,
    /// Idle connections older than this are closed.
    idle_timeout_secs: Option<u64>,
    /// Connections older than this are recycled.
    max_lifetime_secs: Option<u64>,
    /// How long a writer waits for the database lock.
    busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "frogjump_telemetry.db".to_string(),
            max_connections: 10,
            min_idle: 0,
            connection_timeout_secs: 30,
            idle_timeout_secs: Some(300),
            max_lifetime_secs: None,
            busy_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    /// Default pool settings for the database at `database_url`.
    pub fn for_path(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }
}

/// Retry policy for move sequence assignment under contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct SequencerConfig {
    /// Insert attempts before a sequence conflict is reported.
    max_attempts: u32,
    /// Backoff step; attempt `n` waits `n * backoff_ms`.
    backoff_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff_ms: 5,
        }
    }
}

impl TelemetryConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(database_url = %config.store.database_url, "Config loaded successfully");
        Ok(config)
    }

    /// Applies the environment variables the deployment scripts set.
    ///
    /// Recognized: `DATABASE_URL`, `DB_MAX_CONNS`, `DB_MIN_CONNS`,
    /// `DB_MAX_CONN_IDLE`, `DB_MAX_CONN_LIFETIME`, `HOST`, `PORT`,
    /// `REQUEST_TIMEOUT_MS`.
    ///
    /// The two connection durations take unit suffixes (`90s`, `5m`,
    /// `1h30m`); a bare number is seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a numeric or duration variable does not
    /// parse.
    #[instrument(skip(self, lookup))]
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(max) = parse_var(&lookup, "DB_MAX_CONNS")? {
            self.store.max_connections = max;
        }
        if let Some(min) = parse_var(&lookup, "DB_MIN_CONNS")? {
            self.store.min_idle = min;
        }
        if let Some(idle) = parse_duration_secs(&lookup, "DB_MAX_CONN_IDLE")? {
            self.store.idle_timeout_secs = Some(idle);
        }
        if let Some(lifetime) = parse_duration_secs(&lookup, "DB_MAX_CONN_LIFETIME")? {
            self.store.max_lifetime_secs = Some(lifetime);
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(timeout) = parse_var(&lookup, "REQUEST_TIMEOUT_MS")? {
            self.server.request_timeout_ms = timeout;
        }
        Ok(self)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first violated constraint.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database_url.trim().is_empty() {
            return Err(ConfigError::new("store.database_url must not be empty"));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::new("store.max_connections must be at least 1"));
        }
        if self.store.min_idle > self.store.max_connections {
            return Err(ConfigError::new(
                "store.min_idle must not exceed store.max_connections",
            ));
        }
        if self.sequencer.max_attempts == 0 {
            return Err(ConfigError::new("sequencer.max_attempts must be at least 1"));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::new("server.request_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::new(format!("Invalid {}='{}': {}", key, raw, e)))
        })
        .transpose()
}

/// Reads a duration variable as whole seconds.
fn parse_duration_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| {
            let trimmed = raw.trim();
            if let Ok(secs) = trimmed.parse::<u64>() {
                return Ok(secs);
            }
            humantime::parse_duration(trimmed)
                .map(|duration| duration.as_secs())
                .map_err(|e| ConfigError::new(format!("Invalid {}='{}': {}", key, raw, e)))
        })
        .transpose()
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new config error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
