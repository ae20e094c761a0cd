// Integration tests for ReqwestBaseQuery using wiremock.
// Payload parsing edge cases are unit tested in src/base_query/http.rs

use apistore::base_query::{BaseQuery, QueryOutcome, ReqwestBaseQuery, RequestOptions};
use apistore::config::ApiConfig;
use apistore::error::{ApiError, UNKNOWN_CODE, UNKNOWN_MESSAGE};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter() -> ReqwestBaseQuery {
    ReqwestBaseQuery::from_config(&ApiConfig::default()).expect("client builds")
}

#[tokio::test]
async fn test_get_sends_body_as_query_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pokemon"))
        .and(query_param("limit", "20"))
        .and(query_param("offset", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 1302 })))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions::get(format!("{}/pokemon", server.uri()))
        .body(json!({ "limit": 20, "offset": 40, "skip": null }));
    let outcome = adapter().query(options).await;

    assert_eq!(outcome, QueryOutcome::Data(json!({ "count": 1302 })));

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
    assert!(!received[0].url.query().unwrap_or_default().contains("skip"));
}

#[tokio::test]
async fn test_post_sends_body_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/posts"))
        .and(body_json(json!({ "title": "hello" })))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 101 })))
        .expect(1)
        .mount(&server)
        .await;

    let options =
        RequestOptions::post(format!("{}/posts", server.uri())).body(json!({ "title": "hello" }));
    let outcome = adapter().query(options).await;

    assert_eq!(outcome, QueryOutcome::Data(json!({ "id": 101 })));

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received[0].url.query(), None);
}

#[tokio::test]
async fn test_request_headers_override_defaults() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/posts"))
        .and(header("x-api-key", "secret"))
        .and(header("accept", "text/plain"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let base_query = adapter()
        .with_default_header("x-api-key", "secret")
        .with_default_header("accept", "application/json");
    let options =
        RequestOptions::get(format!("{}/posts", server.uri())).header("accept", "text/plain");

    // A non-JSON body comes back as a string.
    assert_eq!(base_query.query(options).await, QueryOutcome::Data(json!("ok")));
}

#[tokio::test]
async fn test_structured_error_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "code": "E1", "message": "bad" })),
        )
        .mount(&server)
        .await;

    let outcome = adapter()
        .query(RequestOptions::get(format!("{}/fail", server.uri())))
        .await;

    assert_eq!(outcome, QueryOutcome::Error(ApiError::new("bad", "E1")));
}

#[tokio::test]
async fn test_numeric_code_and_empty_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fail"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "code": 17, "message": "" })),
        )
        .mount(&server)
        .await;

    let outcome = adapter()
        .query(RequestOptions::get(format!("{}/fail", server.uri())))
        .await;

    // The empty message keeps the default; the numeric code is kept as text.
    assert_eq!(outcome, QueryOutcome::Error(ApiError::new(UNKNOWN_MESSAGE, "17")));
}

#[tokio::test]
async fn test_string_error_payload() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let outcome = adapter()
        .query(RequestOptions::delete(format!("{}/posts/1", server.uri())))
        .await;

    assert_eq!(outcome, QueryOutcome::Error(ApiError::unknown("Not Found")));
}

#[tokio::test]
async fn test_connection_failure() {
    // Nothing listens on the discard port.
    let outcome = adapter()
        .query(RequestOptions::get("http://127.0.0.1:9/unreachable"))
        .await;

    let error = outcome.error().expect("transport failure").clone();
    assert_eq!(error.code, UNKNOWN_CODE);
    assert!(!error.message.is_empty());
}

#[tokio::test]
async fn test_invalid_method() {
    let outcome = adapter()
        .query(RequestOptions::new("no spaces allowed", "http://127.0.0.1:9/"))
        .await;

    let error = outcome.error().expect("rejected before sending").clone();
    assert_eq!(error.code, UNKNOWN_CODE);
    assert!(error.message.contains("no spaces allowed"));
}
