//! TraceStore: batched writes and paginated search over a search backend
//!
//! The store holds an immutable backend handle and two target names fixed at
//! construction: reads go to the search target, writes to the write target.
//! It keeps no other state, so one instance can be shared by any number of
//! threads.
//!
//! ## Write semantics
//!
//! One `add` issues one bulk request. A batch is not atomic: when the backend
//! rejects some items the call fails with [`StoreError::BulkWriteFailed`],
//! but the accepted items stay written. Per-item reasons go to the log only.
//!
//! ## Search semantics
//!
//! Time bounds outside the supported range either prove the result empty
//! (answered without contacting the backend) or are dropped. The backend is
//! asked for `limit + 1` hits sorted by id and resumes strictly past the
//! cursor. Nothing is retried.

use std::sync::Arc;

use edgetrace_core::{
    CallContext, StoreError, StoreResult, StoredTrace, Trace, TracePage, TraceQuery,
    MAX_SUPPORTED_TIMESTAMP_MS, MIN_SUPPORTED_TIMESTAMP_MS,
};
use edgetrace_search::{translate, BackendError, SearchBackend, SearchRequest, WriteIntent};
use tracing::{debug, error, info_span, warn};

use crate::page;

const COMPONENT: &str = "storage";

/// Trace persistence and search
#[derive(Clone)]
pub struct TraceStore {
    backend: Arc<dyn SearchBackend>,
    search_target: String,
    write_target: String,
}

impl std::fmt::Debug for TraceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceStore")
            .field("search_target", &self.search_target)
            .field("write_target", &self.write_target)
            .finish_non_exhaustive()
    }
}

impl TraceStore {
    /// Create a store over `backend`.
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        search_target: impl Into<String>,
        write_target: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            search_target: search_target.into(),
            write_target: write_target.into(),
        }
    }

    /// Target searched by [`search`](Self::search)
    pub fn search_target(&self) -> &str {
        &self.search_target
    }

    /// Target written by [`add`](Self::add)
    pub fn write_target(&self) -> &str {
        &self.write_target
    }

    /// Persist `traces` in one bulk request.
    ///
    /// An empty batch succeeds without contacting the backend.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BatchCountMismatch`] if a record cannot be turned into
    ///   a document; nothing is sent
    /// - [`StoreError::BulkWriteFailed`] if the request fails or any item is
    ///   rejected; accepted items are not rolled back
    /// - [`StoreError::Cancelled`] / [`StoreError::DeadlineExceeded`] from `ctx`
    pub fn add(&self, ctx: &CallContext, traces: &[Trace]) -> StoreResult<()> {
        let span = info_span!(
            parent: ctx.span(),
            "TraceStore.add",
            component = COMPONENT,
            request_id = %ctx.request_id(),
            account_id = %ctx.account_id(),
            records = traces.len(),
        );
        let _guard = span.enter();

        if traces.is_empty() {
            return Ok(());
        }

        let intents: Vec<WriteIntent> = traces
            .iter()
            .filter_map(|trace| {
                let doc = StoredTrace::derive(trace).and_then(|s| serde_json::to_value(s).ok());
                if doc.is_none() {
                    warn!(
                        trace_id = %trace.id,
                        timestamp = trace.timestamp,
                        "record has no document form"
                    );
                }
                doc.map(WriteIntent::index)
            })
            .collect();

        if intents.len() != traces.len() {
            error!(
                expected = traces.len(),
                built = intents.len(),
                "unmatched number of bulk actions"
            );
            return Err(StoreError::BatchCountMismatch {
                expected: traces.len(),
                built: intents.len(),
            });
        }

        ctx.check()?;

        let response = self
            .backend
            .bulk_write(ctx, &self.write_target, &intents)
            .map_err(|e| {
                error!(error = %e, "bulk request failed");
                write_error(e)
            })?;

        let mut failed = 0usize;
        for item in response.failed() {
            failed += 1;
            let trace_id = traces
                .get(item.position)
                .map(|t| t.id.to_string())
                .unwrap_or_default();
            error!(
                position = item.position,
                trace_id = %trace_id,
                status = item.status,
                reason = item.reason.as_deref().unwrap_or("unknown"),
                "bulk item rejected"
            );
        }

        if failed > 0 {
            return Err(StoreError::BulkWriteFailed {
                reason: format!("{failed} of {} items rejected", intents.len()),
            });
        }

        if response.items.len() != intents.len() {
            error!(
                sent = intents.len(),
                reported = response.items.len(),
                "bulk response does not account for every item"
            );
            return Err(StoreError::BulkWriteFailed {
                reason: format!(
                    "{} of {} items reported",
                    response.items.len(),
                    intents.len()
                ),
            });
        }

        debug!(written = intents.len(), "bulk write complete");
        Ok(())
    }

    /// Run a paginated search.
    ///
    /// # Errors
    ///
    /// - [`StoreError::QueryExecutionFailed`] if the backend fails
    /// - [`StoreError::DecodeFailed`] if any hit on the page cannot be decoded
    /// - [`StoreError::Cancelled`] / [`StoreError::DeadlineExceeded`] from `ctx`
    pub fn search(
        &self,
        ctx: &CallContext,
        query: &TraceQuery,
        include_total_count: bool,
    ) -> StoreResult<TracePage> {
        let span = info_span!(
            parent: ctx.span(),
            "TraceStore.search",
            component = COMPONENT,
            request_id = %ctx.request_id(),
            account_id = %ctx.account_id(),
            limit = query.limit,
            order = %query.order,
        );
        let _guard = span.enter();

        if is_provably_empty(query) {
            debug!(after = ?query.after, before = ?query.before, "time range outside supported range");
            return Ok(TracePage::empty(query, include_total_count));
        }

        let clamped = clamp_time_range(query);
        let filter = translate(&clamped);
        let size = usize::try_from(clamped.limit.saturating_add(1)).unwrap_or(usize::MAX);
        let request = SearchRequest::new(filter, clamped.order, size)
            .search_after(clamped.cursor.clone())
            .track_total_hits(include_total_count);

        ctx.check()?;

        let response = self
            .backend
            .search(ctx, &self.search_target, &request)
            .map_err(|e| {
                error!(error = %e, "search failed");
                search_error(e)
            })?;

        ctx.check()?;

        let page = page::assemble(&clamped, response.hits, response.total, include_total_count)?;
        debug!(returned = page.len(), has_more = page.has_more, "search complete");
        Ok(page)
    }
}

/// A lower bound past the maximum, or an upper bound before the minimum.
fn is_provably_empty(query: &TraceQuery) -> bool {
    query.after.map_or(false, |a| a > MAX_SUPPORTED_TIMESTAMP_MS)
        || query.before.map_or(false, |b| b < MIN_SUPPORTED_TIMESTAMP_MS)
}

/// Drop bounds that reach past the supported range on their own side.
fn clamp_time_range(query: &TraceQuery) -> TraceQuery {
    let mut clamped = query.clone();
    if clamped.before.map_or(false, |b| b > MAX_SUPPORTED_TIMESTAMP_MS) {
        clamped.before = None;
    }
    if clamped.after.map_or(false, |a| a < MIN_SUPPORTED_TIMESTAMP_MS) {
        clamped.after = None;
    }
    clamped
}

fn write_error(err: BackendError) -> StoreError {
    match err {
        BackendError::Interrupted(i) => i.into(),
        other => StoreError::BulkWriteFailed {
            reason: other.to_string(),
        },
    }
}

fn search_error(err: BackendError) -> StoreError {
    match err {
        BackendError::Interrupted(i) => i.into(),
        other => StoreError::QueryExecutionFailed(other.to_string()),
    }
}
