//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the configuration subsystem.
///
/// Only programmer/operator mistakes (invalid builder input, forbidden paths)
/// and real I/O failures surface as errors. Malformed data arriving from
/// files or environment variables never does: those values degrade to the
/// compiled default for the affected field.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A programmatically supplied value is outside its valid set or range.
    #[error("Invalid value for {field}: {message}")]
    Invalid {
        /// The field name that has an invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// A caller-supplied path failed validation before touching the filesystem.
    #[error("Invalid path {path:?}: {message}")]
    InvalidPath {
        /// The offending path, as supplied.
        path: String,
        /// Description of why the path is rejected.
        message: String,
    },

    /// Failed to read a configuration file.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Path to the file that couldn't be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
