//! Integration tests using wiremock to simulate the ODP API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use http::Method;
use serde::Deserialize;
use tempfile::TempDir;
use uspto_odp::bulk_data::BulkDataClient;
use uspto_odp::{ApiRequest, Error, OdpClient, PageCursor, RetryPolicy};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct TestRecord {
    id: u32,
    name: String,
}

fn client_for(server: &MockServer) -> OdpClient {
    init_tracing();
    OdpClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap()
}

/// Honors `RUST_LOG` when debugging a failing test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A retry policy with delays short enough for tests.
fn fast_retries(max_retries: usize) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_factor: 0.01,
        ..RetryPolicy::default()
    }
}

#[tokio::test]
async fn test_successful_get_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1,
                "name": "Test"
            })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let record: TestRecord = client.fetch(ApiRequest::get("records/1")).await.unwrap();

    assert_eq!(
        record,
        TestRecord {
            id: 1,
            name: "Test".to_string()
        }
    );
}

#[tokio::test]
async fn test_successful_post_with_json_body() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!({"q": "productTitle:patent", "limit": 5});

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(&body))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2,
                "name": "Created"
            })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let record: TestRecord = client
        .fetch(ApiRequest::post("search").with_json_body(body))
        .await
        .unwrap();

    assert_eq!(record.id, 2);
}

#[tokio::test]
async fn test_api_key_header_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .and(header("x-api-key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "name": "Test"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OdpClient::builder()
        .base_url(mock_server.uri())
        .api_key("secret-key")
        .build()
        .unwrap();

    let _: TestRecord = client.fetch(ApiRequest::get("records/1")).await.unwrap();
}

#[tokio::test]
async fn test_query_parameters_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "productTitle:patent"))
        .and(query_param("offset", "50"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "name": "Test"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let _: TestRecord = client
        .fetch(
            ApiRequest::get("search")
                .with_query("q", "productTitle:patent")
                .with_query("offset", 50)
                .with_query("limit", 25),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_not_found_maps_to_typed_error_with_details() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/999"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errorDetails": "No record matches identifier 999",
                "requestIdentifier": "req-abc-123"
            })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.fetch_json(ApiRequest::get("records/999")).await;

    match result {
        Err(Error::NotFound(e)) => {
            assert_eq!(e.status_code.map(|s| s.as_u16()), Some(404));
            assert_eq!(e.details.as_deref(), Some("No record matches identifier 999"));
            assert_eq!(e.request_identifier.as_deref(), Some("req-abc-123"));
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_then_success_on_500() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    // First two requests fail with 500, third succeeds
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(move |_req: &Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("Server error")
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": 1,
                    "name": "Recovered"
                }))
            }
        })
        .mount(&mock_server)
        .await;

    let client = OdpClient::builder()
        .base_url(mock_server.uri())
        .retry_policy(fast_retries(3))
        .build()
        .unwrap();

    let record: TestRecord = client.fetch(ApiRequest::get("flaky")).await.unwrap();

    assert_eq!(record.name, "Recovered");
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_budget_exhausted_surfaces_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        // 1 initial attempt + 2 retries
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = OdpClient::builder()
        .base_url(mock_server.uri())
        .retry_policy(fast_retries(2))
        .build()
        .unwrap();

    let result = client.fetch_json(ApiRequest::get("broken")).await;

    match result {
        Err(Error::ServerError(e)) => {
            assert_eq!(e.status_code.map(|s| s.as_u16()), Some(503));
        }
        other => panic!("Expected ServerError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_after_header_honored() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(move |_req: &Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_string("Rate limited")
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": 1,
                    "name": "Test"
                }))
            }
        })
        .mount(&mock_server)
        .await;

    let client = OdpClient::builder()
        .base_url(mock_server.uri())
        .retry_policy(fast_retries(3))
        .build()
        .unwrap();

    let start = std::time::Instant::now();
    let record: TestRecord = client.fetch(ApiRequest::get("throttled")).await.unwrap();

    assert_eq!(record.id, 1);
    assert_eq!(attempt_count.load(Ordering::SeqCst), 2);
    // The server asked for 1 second; the policy's own delay would be ~10ms.
    assert!(start.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn test_rate_limit_error_carries_retry_after() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/throttled"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_string("Rate limited"),
        )
        .mount(&mock_server)
        .await;

    let client = OdpClient::builder()
        .base_url(mock_server.uri())
        .retry_policy(RetryPolicy::none())
        .build()
        .unwrap();

    let result = client.fetch_json(ApiRequest::get("throttled")).await;

    match result {
        Err(Error::RateLimit { retry_after, .. }) => {
            assert_eq!(retry_after, Some(Duration::from_secs(30)));
        }
        other => panic!("Expected RateLimit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_method_rejected_before_dispatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/records/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client
        .send(ApiRequest::new(Method::DELETE, "records/1"))
        .await;

    match result {
        Err(Error::UnsupportedMethod(m)) => assert_eq!(m, Method::DELETE),
        other => panic!("Expected UnsupportedMethod, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_returns_raw_response_without_parsing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/raw.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(b"not json at all".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let response = client.stream(ApiRequest::get("files/raw.bin")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"not json at all");
}

#[tokio::test]
async fn test_typed_record_preserves_payload_verbatim() {
    let mock_server = MockServer::start().await;
    let body = serde_json::json!({"key": "value"});

    Mock::given(method("GET"))
        .and(path("/raw"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let value: serde_json::Value = client.fetch(ApiRequest::get("raw")).await.unwrap();

    assert_eq!(value, body);
}

#[tokio::test]
async fn test_fetch_json_empty_body_is_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let value = client.fetch_json(ApiRequest::get("empty")).await.unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn test_non_json_success_body_preserved_in_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.fetch::<TestRecord>(ApiRequest::get("records/1")).await;

    match result {
        Err(Error::UnexpectedResponse {
            status, raw_body, ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_body, "invalid json");
        }
        other => panic!("Expected UnexpectedResponse, got {other:?}"),
    }
}

fn product_page_body(offset: u64, total: u64, limit: u64) -> serde_json::Value {
    let end = (offset + limit).min(total);
    let products: Vec<serde_json::Value> = (offset..end)
        .map(|i| {
            serde_json::json!({
                "productIdentifier": format!("PROD-{i}"),
                "productTitleText": format!("Product {i}")
            })
        })
        .collect();
    serde_json::json!({
        "count": products.len(),
        "bulkDataProductBag": products
    })
}

#[tokio::test]
async fn test_paginate_products_across_pages() {
    let mock_server = MockServer::start().await;

    // 5 products served in pages of 2: full, full, short.
    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/products/search"))
        .respond_with(move |req: &Request| {
            let offset: u64 = req
                .url
                .query_pairs()
                .find(|(k, _)| k == "offset")
                .and_then(|(_, v)| v.parse().ok())
                .unwrap_or(0);
            ResponseTemplate::new(200).set_body_json(product_page_body(offset, 5, 2))
        })
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = BulkDataClient::new(client_for(&mock_server));
    let products: Vec<_> = client
        .paginate_products("productTitle:patent", PageCursor::new(0, 2))
        .try_collect()
        .await
        .unwrap();

    assert_eq!(products.len(), 5);
    let ids: Vec<&str> = products
        .iter()
        .map(|p| p.product_identifier.as_str())
        .collect();
    assert_eq!(ids, ["PROD-0", "PROD-1", "PROD-2", "PROD-3", "PROD-4"]);
}

#[tokio::test]
async fn test_paginate_products_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/products/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = BulkDataClient::new(client_for(&mock_server));
    let products: Vec<_> = client
        .paginate_products("productTitle:nothing", PageCursor::default())
        .try_collect()
        .await
        .unwrap();

    assert!(products.is_empty());
}

#[tokio::test]
async fn test_get_product_by_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/datasets/products/PTGRXML"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "productIdentifier": "PTGRXML",
                "productTitleText": "Patent grant full-text (XML)",
                "productFileBag": {
                    "count": 1,
                    "fileDataBag": [{
                        "fileName": "ipg260101.zip",
                        "fileDownloadURI": "https://bulkdata.example.com/files/ipg260101.zip"
                    }]
                }
            })),
        )
        .mount(&mock_server)
        .await;

    let client = BulkDataClient::new(client_for(&mock_server));
    let product = client.get_product_by_id("PTGRXML").await.unwrap();

    assert_eq!(product.product_identifier, "PTGRXML");
    let bag = product.product_file_bag.unwrap();
    assert_eq!(bag.file_data_bag[0].file_name, "ipg260101.zip");
}

#[tokio::test]
async fn test_download_uses_content_disposition_filename() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/ipg260101.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-disposition", "attachment; filename=\"weekly.zip\"")
                .set_body_bytes(b"zip bytes".to_vec()),
        )
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = BulkDataClient::new(client_for(&mock_server));
    let uri = format!("{}/files/ipg260101.zip", mock_server.uri());

    let saved = client.download_file(&uri, dir.path()).await.unwrap();

    assert_eq!(saved, dir.path().join("weekly.zip"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"zip bytes");
}

#[tokio::test]
async fn test_download_falls_back_to_uri_filename() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/ipg260101.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"zip bytes".to_vec()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = BulkDataClient::new(client_for(&mock_server));
    let uri = format!("{}/files/ipg260101.zip", mock_server.uri());

    let saved = client.download_file(&uri, dir.path()).await.unwrap();

    assert_eq!(saved, dir.path().join("ipg260101.zip"));
}

#[tokio::test]
async fn test_download_of_missing_file_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/files/nope.zip"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "errorDetails": "file not found"
        })))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let client = BulkDataClient::new(client_for(&mock_server));
    let uri = format!("{}/files/nope.zip", mock_server.uri());

    let result = client.download_file(&uri, dir.path()).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    // Nothing should have been written.
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}
