//! Error hierarchy for skillcue.

use thiserror::Error;

/// Errors from configuration loading.
///
/// The loader never surfaces these to hook callers; they exist so that
/// diagnostics (`skillcue check-config`) can report what went wrong.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Invalid rule for skill '{name}': {message}")]
    InvalidSkill { name: String, message: String },
}
