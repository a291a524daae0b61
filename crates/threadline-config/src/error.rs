//! Config loading and validation errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A runtime override path was given but does not exist.
    #[error("runtime config layer not found: {0}")]
    MissingRuntimeLayer(PathBuf),
    /// JSON5 syntax error in a layer.
    #[error("cannot parse {origin} as JSON5: {source}")]
    Parse {
        origin: String,
        #[source]
        source: json5::Error,
    },
    /// The merged value does not fit the config model.
    #[error("cannot decode config: {0}")]
    Decode(#[from] serde_json::Error),
    /// A field has an unsupported key, type, or value.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            path: path.into(),
            message: message.into(),
        }
    }
}
