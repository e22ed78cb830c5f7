//! Convenient imports for edgetrace.
//!
//! ```ignore
//! use edgetrace::prelude::*;
//!
//! let service = TraceService::builder().memory().build()?;
//! ```

// Entry point
pub use crate::service::{TraceService, TraceServiceBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Configuration
pub use crate::config::ServiceConfig;

// Ingestion
pub use crate::ingest::{parse_batch, IngestRecord};

// Core types
pub use edgetrace_core::{
    CallContext, NodeId, ParsedQuery, SortOrder, TemporalId, TracePage, TraceQuery,
    TraceResponse,
};

// Re-export serde_json for convenience
pub use serde_json::json;
