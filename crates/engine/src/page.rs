//! Page assembly
//!
//! The store asks the backend for `limit + 1` hits. The extra hit only tells
//! us whether another page exists; it is never decoded.

use edgetrace_core::trace::{LIST_OBJECT, TRACE_OBJECT};
use edgetrace_core::{StoreError, StoreResult, StoredTrace, TracePage, TraceQuery, TraceResponse};
use edgetrace_search::RawHit;

/// Page entry for a stored document.
pub fn to_response(stored: StoredTrace) -> TraceResponse {
    TraceResponse {
        account_id: stored.account_id,
        device_id: stored.device_id,
        id: stored.id,
        object: TRACE_OBJECT.to_string(),
        etag: stored.created_at.clone(),
        created_at: stored.created_at,
        timestamp: stored.timestring,
        trace: stored.trace,
        trace_type: stored.trace_type,
    }
}

/// Build the page for `query` from the raw hits of an over-fetching search.
///
/// `after` echoes the query's cursor, not the last id on the page.
pub fn assemble(
    query: &TraceQuery,
    hits: Vec<RawHit>,
    total: Option<u64>,
    include_total_count: bool,
) -> StoreResult<TracePage> {
    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
    let has_more = hits.len() > limit;

    let data = hits
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, hit)| {
            serde_json::from_value::<StoredTrace>(hit.source)
                .map(to_response)
                .map_err(|e| StoreError::DecodeFailed {
                    index,
                    reason: e.to_string(),
                })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(TracePage {
        object: LIST_OBJECT.to_string(),
        limit: query.limit,
        after: query.cursor.clone(),
        order: query.order,
        has_more,
        data,
        total_count: include_total_count.then(|| total.unwrap_or(0)),
    })
}
