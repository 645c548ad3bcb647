//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RECORDS, DEFAULT_SAMPLE_INTERVAL, DEFAULT_TRIM_INTERVAL,
    RetentionPolicy, TrackerOptions, clamp_interval,
};
use crate::source::HttpSourceConfig;
use crate::storage::MEMORY_URL;
use crate::storage::db::DEFAULT_MAX_CONNECTIONS;

use super::validation::{ConfigError, expand_env_vars, validate_http_url};

// =============================================================================
// Constants
// =============================================================================

/// Configuration file read when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Default store URL, relative to the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:data/isstrack.db?mode=rwc";

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 3000).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, or `memory` for the in-process store.
    /// `${VAR}` references are expanded on load.
    pub url: String,

    /// Connection pool size (default: 5).
    pub max_connections: u32,

    /// Bound on each store call (default: 10s).
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Sampler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Period between samples (default: 60s, minimum: 1s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// Retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum readings kept (default: 1000).
    pub max_records: u64,

    /// Period between trims (default: 30m, minimum: 1s).
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            interval: DEFAULT_TRIM_INTERVAL,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web server configuration.
    pub server: ServerConfig,

    /// Store configuration.
    pub database: DatabaseConfig,

    /// Upstream snapshot source.
    pub source: HttpSourceConfig,

    /// Sampler configuration.
    pub sampler: SamplerConfig,

    /// Retention configuration.
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment references in the database URL are expanded before
    /// validation.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.database.url = expand_env_vars(&config.database.url);
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise start from defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` if an existing file is unreadable or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        // Validate database
        let url = self.database.url.trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError(
                "database url must not be empty".to_string(),
            ));
        }
        if url != MEMORY_URL && !url.starts_with("sqlite:") {
            return Err(ConfigError::ValidationError(format!(
                "database url must be '{MEMORY_URL}' or a sqlite: URL, got '{url}'"
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database max_connections must be positive".to_string(),
            ));
        }
        if self.database.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "database timeout must be positive".to_string(),
            ));
        }

        // Validate source
        validate_http_url("source.url", &self.source.url)?;
        if self.source.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "source timeout must be positive".to_string(),
            ));
        }

        // Validate retention
        if self.retention.max_records == 0 {
            return Err(ConfigError::ValidationError(
                "retention max_records must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Engine options derived from this configuration.
    ///
    /// Intervals below the scheduler minimum are clamped with a warning.
    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            sample_interval: clamp_interval(self.sampler.interval),
            trim_interval: clamp_interval(self.retention.interval),
            retention: RetentionPolicy::new(self.retention.max_records),
            source_timeout: self.source.timeout,
            store_timeout: self.database.timeout,
        }
    }
}
