//! Error types for the trace store layers
//!
//! - [`IdError`]: node identity resolution and identifier parsing
//! - [`QueryError`]: calling-layer validation of queries and ingestion records
//! - [`StoreError`]: failures of the store operations themselves
//!
//! Store errors are coarse on purpose. Detailed causes (per-item bulk
//! rejection reasons, backend response bodies) are logged where they occur
//! and only summarized here.

use crate::context::Interrupted;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Identifier errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The configured node identity source could not be resolved
    #[error("node identity unavailable from {source_name}: {reason}")]
    NodeIdentityUnavailable {
        /// Identity source (interface name or literal)
        source_name: String,
        /// Why resolution failed
        reason: String,
    },

    /// Instance tag does not fit in 4 bits
    #[error("instance tag {0} out of range (0-15)")]
    InvalidInstanceTag(u8),

    /// String is not a 32-character hex identifier
    #[error("invalid identifier '{0}'")]
    InvalidId(String),
}

/// Validation errors raised before a query or record reaches the store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Query parameter name is not recognized
    #[error("invalid field name '{0}'")]
    UnknownParameter(String),

    /// Query parameter value is invalid
    #[error("invalid query field '{field}': {reason}")]
    InvalidField {
        /// Parameter name
        field: String,
        /// What is wrong with the value
        reason: String,
    },

    /// Upper time bound precedes the lower one
    #[error("invalid time range: timestamp__lte precedes timestamp__gte")]
    InvalidTimeRange,

    /// Ingestion without a device id
    #[error("empty device id")]
    EmptyDeviceId,

    /// Ingestion record carries an unusable timestamp
    #[error("invalid timestamp in record {index}: {reason}")]
    InvalidTimestamp {
        /// Position of the record in the batch
        index: usize,
        /// What is wrong with the timestamp
        reason: String,
    },
}

impl QueryError {
    pub(crate) fn field(field: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Store operation errors
///
/// No variant is retried internally; each store call is exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend unreachable at startup
    #[error("failed to initialize the search backend: {0}")]
    Initialization(String),

    /// Fewer write intents were built than records submitted
    ///
    /// Raised before any network call, so nothing was written.
    #[error("unmatched number of bulk actions: {built} built for {expected} records")]
    BatchCountMismatch {
        /// Records submitted
        expected: usize,
        /// Intents built
        built: usize,
    },

    /// The bulk request failed or rejected at least one item
    ///
    /// Items accepted in the same batch stay written.
    #[error("bulk request failed: {reason}")]
    BulkWriteFailed {
        /// Summary of the failure
        reason: String,
    },

    /// The backend failed to execute a search
    #[error("failed to query the trace logs: {0}")]
    QueryExecutionFailed(String),

    /// A search hit could not be decoded into a trace
    #[error("failed to decode search hit {index}: {reason}")]
    DecodeFailed {
        /// Position of the hit in the response
        index: usize,
        /// Decoder message
        reason: String,
    },

    /// The caller cancelled the call
    #[error("call cancelled")]
    Cancelled,

    /// The caller's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Check if the call was cut short by its execution context.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, StoreError::Cancelled | StoreError::DeadlineExceeded)
    }
}

impl From<Interrupted> for StoreError {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => StoreError::Cancelled,
            Interrupted::DeadlineExceeded => StoreError::DeadlineExceeded,
        }
    }
}
