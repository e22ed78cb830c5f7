//! Search Tests
//!
//! - Filters: account, device set, type, time range, id
//! - Sort order
//! - Out-of-range time bounds
//! - Total count opt-in

use crate::*;

fn seed(service: &TraceService) {
    let ctx = service.context("seed", "a1");
    let batch = |device: &str, account: &str, records: &[IngestRecord]| {
        service.ingest(&ctx, device, account, records).unwrap();
    };
    batch("d1", "a1", &[record(0, "boot", json!({})), record(10, "crash", json!({}))]);
    batch("d2", "a1", &[record(20, "boot", json!({})), record(30, "boot", json!({}))]);
    batch("d3", "a1", &[record(40, "crash", json!({}))]);
    batch("d1", "a2", &[record(50, "boot", json!({}))]);
}

fn millis(second: u32) -> i64 {
    1_672_531_200_000 + i64::from(second) * 1000
}

#[test]
fn test_account_isolation() {
    let (_backend, service) = memory_service();
    seed(&service);

    let a1 = search(&service, service.query_builder().account("a1").include_total_count(true));
    assert_eq!(a1.total_count, Some(5));
    assert!(a1.data.iter().all(|t| t.account_id == "a1"));

    let a2 = search(&service, service.query_builder().account("a2"));
    assert_eq!(a2.data.len(), 1);

    let none = search(&service, service.query_builder().account("a3").include_total_count(true));
    assert!(none.data.is_empty());
    assert_eq!(none.total_count, Some(0));
}

#[test]
fn test_device_set_matches_any() {
    let (_backend, service) = memory_service();
    seed(&service);

    let page = search(&service, service.query_builder().account("a1").devices(["d1", "d3"]));
    let mut devices: Vec<&str> = page.data.iter().map(|t| t.device_id.as_str()).collect();
    devices.sort_unstable();
    assert_eq!(devices, vec!["d1", "d1", "d3"]);
}

#[test]
fn test_device_set_from_request_parameter() {
    let (_backend, service) = memory_service();
    seed(&service);

    let parsed = service
        .query_builder()
        .account("a1")
        .params([("device_id__in", "d2,d3"), ("order", "asc")])
        .and_then(|b| b.build())
        .unwrap();
    assert_eq!(parsed.query.devices, vec!["d2", "d3"]);

    let ctx = service.context("req", "a1");
    let page = service.search(&ctx, &parsed).unwrap();
    let devices: Vec<&str> = page.data.iter().map(|t| t.device_id.as_str()).collect();
    assert_eq!(devices, vec!["d2", "d2", "d3"]);
}

#[test]
fn test_type_filter() {
    let (_backend, service) = memory_service();
    seed(&service);

    let page = search(
        &service,
        service.query_builder().account("a1").params([("type__eq", "crash")]).unwrap(),
    );
    assert_eq!(page.data.len(), 2);
    assert!(page.data.iter().all(|t| t.trace_type == "crash"));
}

#[test]
fn test_time_range_is_inclusive() {
    let (_backend, service) = memory_service();
    seed(&service);

    let page = search(
        &service,
        service
            .query_builder()
            .account("a1")
            .params([
                ("timestamp__gte", "2023-01-01T00:00:10Z"),
                ("timestamp__lte", "2023-01-01T00:00:30Z"),
            ])
            .unwrap(),
    );
    let mut times: Vec<&str> = page.data.iter().map(|t| t.timestamp.as_str()).collect();
    times.sort_unstable();
    assert_eq!(
        times,
        vec![
            "2023-01-01T00:00:10.000Z",
            "2023-01-01T00:00:20.000Z",
            "2023-01-01T00:00:30.000Z",
        ]
    );
}

#[test]
fn test_one_sided_ranges() {
    let (_backend, service) = memory_service();
    seed(&service);

    let from = search(&service, service.query_builder().account("a1").after(millis(30)));
    assert_eq!(from.data.len(), 2);

    let until = search(&service, service.query_builder().account("a1").before(millis(0)));
    assert_eq!(until.data.len(), 1);
}

#[test]
fn test_id_filter() {
    let (_backend, service) = memory_service();
    let ids = ingest_n(&service, "d1", "a1", 5);
    let target = ids[2].to_string();

    let page = search(&service, service.query_builder().account("a1").id(target.clone()));
    assert_eq!(ids_of(&page), vec![target]);
}

#[test]
fn test_sort_order() {
    let (_backend, service) = memory_service();
    let ids: Vec<String> = ingest_n(&service, "d1", "a1", 6).iter().map(ToString::to_string).collect();

    let desc = search(&service, service.query_builder().account("a1"));
    let mut expected = ids.clone();
    expected.reverse();
    assert_eq!(ids_of(&desc), expected);
    assert_eq!(desc.order, SortOrder::Desc);

    let asc = search(&service, service.query_builder().account("a1").order(SortOrder::Asc));
    assert_eq!(ids_of(&asc), ids);
}

#[test]
fn test_lower_bound_past_maximum_skips_backend() {
    let (backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 3);

    let page = search(
        &service,
        service
            .query_builder()
            .account("a1")
            .after(edgetrace::edgetrace_core::MAX_SUPPORTED_TIMESTAMP_MS + 1)
            .limit(7)
            .include_total_count(true),
    );
    assert!(page.data.is_empty());
    assert!(!page.has_more);
    assert_eq!(page.limit, 7);
    assert_eq!(page.total_count, Some(0));
    assert_eq!(backend.search_calls(), 0);
}

#[test]
fn test_upper_bound_before_epoch_skips_backend() {
    let (backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 3);

    let page = search(&service, service.query_builder().account("a1").before(-1));
    assert!(page.data.is_empty());
    assert_eq!(page.total_count, None);
    assert_eq!(backend.search_calls(), 0);
}

#[test]
fn test_bounds_past_the_range_are_dropped() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 3);

    let page = search(
        &service,
        service
            .query_builder()
            .account("a1")
            .after(-1_000)
            .before(edgetrace::edgetrace_core::MAX_SUPPORTED_TIMESTAMP_MS + 1_000),
    );
    assert_eq!(page.data.len(), 3);
}

#[test]
fn test_total_count_only_on_request() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 4);

    let without = search(&service, service.query_builder().account("a1").limit(2));
    assert_eq!(without.total_count, None);
    let json = serde_json::to_value(&without).unwrap();
    assert!(json.get("total_count").is_none());

    let with = search(
        &service,
        service.query_builder().account("a1").limit(2).params([("include", "total_count")]).unwrap(),
    );
    assert_eq!(with.total_count, Some(4));
    assert_eq!(with.data.len(), 2);
}

#[test]
fn test_page_json_shape() {
    let (_backend, service) = memory_service();
    ingest_n(&service, "d1", "a1", 1);

    let page = search(&service, service.query_builder().account("a1"));
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["object"], "list");
    assert_eq!(json["limit"], 100);
    assert_eq!(json["order"], "DESC");
    assert_eq!(json["has_more"], false);
    assert!(json["after"].is_null());
    assert_eq!(json["data"][0]["object"], "device-trace");
}

#[test]
fn test_invalid_requests_rejected_before_search() {
    let (_backend, service) = memory_service();
    let reject = |params: &[(&str, &str)]| {
        service
            .query_builder()
            .account("a1")
            .params(params.iter().copied())
            .and_then(|b| b.build())
            .is_err()
    };
    assert!(reject(&[("limit", "1")]));
    assert!(reject(&[("limit", "1001")]));
    assert!(reject(&[("order", "sideways")]));
    assert!(reject(&[("after", "not-an-id")]));
    assert!(reject(&[("type__eq", "")]));
    assert!(reject(&[("device_id", "d1")]));
    assert!(reject(&[("device_id__in", "")]));
    assert!(reject(&[("device_id__in", ",")]));
    assert!(reject(&[
        ("timestamp__gte", "2023-01-02T00:00:00Z"),
        ("timestamp__lte", "2023-01-01T00:00:00Z"),
    ]));
}
