//! Configuration module for isstrack.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Store settings (connection URL, pool size, call timeout)
//! - Upstream source, sampler and retention settings

mod app;
mod validation;

pub use app::{
    AppConfig, DEFAULT_CONFIG_PATH, DatabaseConfig, RetentionConfig, SamplerConfig, ServerConfig,
};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
