//! Error types for config loading and strict value coercion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by [`read_in_config`](crate::Resolver::read_in_config)
/// and [`unmarshal_key`](crate::Resolver::unmarshal_key).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `<name>.<ext>` file was found in any registered search path.
    ///
    /// Recoverable: callers typically log a warning and continue with
    /// environment and default values only.
    #[error("config file {name:?} not found in search paths {searched:?}")]
    NotFound {
        name: String,
        searched: Vec<PathBuf>,
    },

    /// A matching file exists but its content is malformed.
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A matching file exists but could not be read.
    #[error("failed to read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A resolved subtree did not deserialize into the target type.
    #[error("failed to deserialize subtree at {key:?}: {message}")]
    Deserialize { key: String, message: String },
}

impl ConfigError {
    /// Whether the caller is expected to recover by falling back to
    /// environment and default resolution.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

/// Errors produced by the fallible `try_get_*` accessors.
///
/// The lenient getters swallow these and return zero values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// No source defines the key path.
    #[error("key {key:?} is not defined by any source")]
    Missing { key: String },

    /// The winning value does not coerce to the requested type.
    #[error("key {key:?} holds a {found} value, which does not coerce to {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}
