//! Core types for the edge trace store
//!
//! This crate defines the fundamental types shared by every layer:
//! - [`TemporalId`] and [`TemporalIdGenerator`]: time-ordered 16-byte identifiers
//! - [`Trace`], [`StoredTrace`], [`TraceResponse`], [`TracePage`]: the record model
//! - [`TraceQuery`] and [`TraceQueryBuilder`]: search criteria
//! - [`CallContext`]: request-scoped deadline, cancellation and span
//! - [`StoreError`], [`IdError`], [`QueryError`]: layered error kinds

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod error;
pub mod id;
pub mod query;
pub mod time;
pub mod trace;

pub use context::{CallContext, CancelHandle, Interrupted};
pub use error::{IdError, QueryError, StoreError, StoreResult};
pub use id::{
    Clock, NodeId, NodeIdentity, SystemClock, TemporalId, TemporalIdGenerator, MAX_INSTANCE_TAG,
    SEQUENCE_BITS, SEQUENCE_MASK,
};
pub use query::{
    ParsedQuery, SortOrder, TraceQuery, TraceQueryBuilder, DEFAULT_LIMIT, MAX_LIMIT, MIN_LIMIT,
};
pub use time::{MAX_SUPPORTED_TIMESTAMP_MS, MIN_SUPPORTED_TIMESTAMP_MS};
pub use trace::{fields, StoredTrace, Trace, TracePage, TraceResponse};
