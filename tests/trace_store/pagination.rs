//! Pagination Tests
//!
//! - limit + 1 over-fetch drives has_more
//! - cursor pages never overlap and cover every match
//! - the page echoes the cursor it was requested with

use crate::*;
use std::collections::HashSet;

fn walk(service: &TraceService, order: SortOrder, limit: u64) -> Vec<TracePage> {
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut builder = service.query_builder().account("a1").order(order).limit(limit);
        if let Some(c) = &cursor {
            builder = builder.cursor(c.clone());
        }
        let page = search(service, builder);
        cursor = page.last_id().map(str::to_string);
        let more = page.has_more;
        pages.push(page);
        if !more {
            return pages;
        }
    }
}

#[test]
fn test_two_item_pages_do_not_overlap() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 5);

    let first = search(&service, service.query_builder().account("a1").limit(2));
    assert_eq!(first.data.len(), 2);
    assert!(first.has_more);

    let cursor = first.last_id().unwrap().to_string();
    let second = search(&service, service.query_builder().account("a1").limit(2).cursor(cursor));
    assert_eq!(second.data.len(), 2);

    let page_one: HashSet<String> = ids_of(&first).into_iter().collect();
    assert!(ids_of(&second).iter().all(|id| !page_one.contains(id)));
}

#[test]
fn test_walk_covers_everything_once() {
    let (_backend, service) = memory_service();
    let ids: Vec<String> = ingest_n(&service, "d1", "a1", 11).iter().map(ToString::to_string).collect();

    for order in [SortOrder::Asc, SortOrder::Desc] {
        let pages = walk(&service, order, 3);
        assert_eq!(pages.len(), 4);
        assert_eq!(pages.iter().map(TracePage::len).collect::<Vec<_>>(), vec![3, 3, 3, 2]);

        let seen: Vec<String> = pages.iter().flat_map(ids_of).collect();
        let mut expected = ids.clone();
        if order == SortOrder::Desc {
            expected.reverse();
        }
        assert_eq!(seen, expected);
    }
}

#[test]
fn test_exact_multiple_of_limit() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 4);

    let pages = walk(&service, SortOrder::Asc, 2);
    assert_eq!(pages.len(), 2);
    assert!(pages[0].has_more);
    assert!(!pages[1].has_more);
    assert_eq!(pages[1].len(), 2);
}

#[test]
fn test_page_echoes_request_cursor() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 6);

    let first = search(&service, service.query_builder().account("a1").limit(2));
    assert_eq!(first.after, None);

    let cursor = first.last_id().unwrap().to_string();
    let second = search(&service, service.query_builder().account("a1").limit(2).cursor(cursor.clone()));
    assert_eq!(second.after.as_deref(), Some(cursor.as_str()));
    assert_ne!(second.after.as_deref(), second.last_id());
}

#[test]
fn test_uppercase_cursor_is_normalized() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 4);

    let first = search(&service, service.query_builder().account("a1").limit(2));
    let cursor = first.last_id().unwrap().to_string();

    let upper = search(
        &service,
        service
            .query_builder()
            .account("a1")
            .params([("limit", "2"), ("after", cursor.to_ascii_uppercase().as_str())])
            .unwrap(),
    );
    assert_eq!(upper.after.as_deref(), Some(cursor.as_str()));
    assert_eq!(upper.data.len(), 2);
}

#[test]
fn test_total_count_ignores_cursor() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 5);

    let first = search(&service, service.query_builder().account("a1").limit(2));
    let cursor = first.last_id().unwrap().to_string();
    let second = search(
        &service,
        service.query_builder().account("a1").limit(2).cursor(cursor).include_total_count(true),
    );
    assert_eq!(second.total_count, Some(5));
}
