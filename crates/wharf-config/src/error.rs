//! Configuration error types.

use thiserror::Error;

/// Errors that can occur while reading or writing wharf configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file exists but does not parse.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// No home directory, so the default config location cannot be resolved.
    #[error("cannot determine home directory")]
    NoHomeDir,
}
