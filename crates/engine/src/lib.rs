//! Trace store engine
//!
//! [`TraceStore`] persists batches of traces through a
//! [`SearchBackend`](edgetrace_search::SearchBackend) and answers
//! cursor-paginated searches. [`page::assemble`] turns raw hits into a
//! [`TracePage`](edgetrace_core::TracePage).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod page;
pub mod store;

pub use page::{assemble, to_response};
pub use store::TraceStore;
