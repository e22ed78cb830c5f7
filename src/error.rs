//! Unified error type for the trace service.
//!
//! Wraps the layer errors (identity, validation, storage, configuration) and
//! presents one interface to callers.

use edgetrace_core::{IdError, QueryError, StoreError};
use thiserror::Error;

use crate::config::ConfigError;

/// All trace service errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A store call failed
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Node identity could not be resolved, or an id is malformed
    #[error("identity error: {0}")]
    Identity(#[from] IdError),

    /// A query or ingestion record failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] QueryError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for trace service operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a storage failure.
    ///
    /// Every [`StoreError`] kind is reported to end users as the same opaque
    /// storage failure.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Check if the caller sent something invalid.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::Serialization(_))
    }

    /// Check if the call was cancelled or ran out of time.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Storage(e) if e.is_interrupted())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
