//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read or written.
    #[error("config I/O failed for {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file's RON content did not parse.
    #[error("config at {path} is malformed: {source}")]
    Malformed {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error with position info.
        #[source]
        source: ron::error::SpannedError,
    },

    /// The in-memory config could not be serialized to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}
