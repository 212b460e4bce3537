//! Integration tests for the translation service API.
//!
//! These tests drive the axum router with mock upstream capabilities and
//! verify request validation, the full translation flow, and pre-warming.

mod common;

use apiglot::{
    health_handler, prewarm_handler, ready_handler, translate_handler, AppState, SpecStore,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use common::{sample_spec, test_config, MockEmbedder, MockFetcher, ScriptedChat};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

/// Build a state over mock capabilities with the given chat script.
fn mock_state(
    cache_dir: &std::path::Path,
    fetcher: Arc<MockFetcher>,
    chat_responses: Vec<&str>,
) -> Arc<AppState> {
    let config = test_config(cache_dir);
    let store = Arc::new(SpecStore::open(cache_dir).unwrap());
    Arc::new(AppState::with_components(
        config,
        store,
        fetcher,
        Arc::new(MockEmbedder::new()),
        Arc::new(ScriptedChat::new(chat_responses)),
    ))
}

fn create_test_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/translate", post(translate_handler))
        .route("/prewarm", post(prewarm_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// Helper to make a JSON request to the router.
async fn json_request(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.unwrap_or(json!({})).to_string()))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.oneshot(req).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, body)
}

// ============================================================================
// Health Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_200() {
    let app = Router::new().route("/health", get(health_handler));
    let (status, body) = json_request(app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint_returns_200() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let (status, body) = json_request(app, "GET", "/ready", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Validation Tests
// ============================================================================

#[tokio::test]
async fn test_translate_empty_query_returns_400() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let body = json!({
        "query": "",
        "spec_url": "https://api.example.com/openapi.json"
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_translate_non_http_url_returns_400() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let body = json!({
        "query": "list all pets",
        "spec_url": "file:///etc/passwd"
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("http"));
}

#[tokio::test]
async fn test_translate_zero_top_k_returns_400() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let body = json!({
        "query": "list all pets",
        "spec_url": "https://api.example.com/openapi.json",
        "top_k": 0
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("top_k"));
}

// ============================================================================
// Translation Flow Tests
// ============================================================================

#[tokio::test]
async fn test_translate_returns_constructed_request() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let selection = r#"[{"path": "/pets", "method": "GET", "summary": "List all pets", "description": "Returns every pet in the store."}]"#;
    let construction = r#"{
        "method": "GET",
        "url": "https://api.example.com/pets",
        "headers": {"Accept": "application/json"},
        "query_params": {},
        "body": null,
        "description": "Lists every pet in the store"
    }"#;
    let app = create_test_app(mock_state(
        dir.path(),
        Arc::clone(&fetcher),
        vec![selection, construction],
    ));

    let body = json!({
        "query": "show me all the pets",
        "spec_url": "https://api.example.com/openapi.json"
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["request"]["method"], "GET");
    assert_eq!(response["request"]["url"], "https://api.example.com/pets");
    assert_eq!(response["selected"].as_array().unwrap().len(), 1);

    // All three spec endpoints fit under the default top-K of 10.
    let retrieved = response["retrieved"].as_array().unwrap();
    assert_eq!(retrieved.len(), 3);
    let scores: Vec<f64> = retrieved
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    for i in 1..scores.len() {
        assert!(
            scores[i - 1] >= scores[i],
            "Retrieved candidates should be sorted by score descending"
        );
    }

    assert_eq!(fetcher.fetches(), 1);
}

#[tokio::test]
async fn test_translate_reuses_cache_across_requests() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let selection = r#"[{"path": "/pets", "method": "GET"}]"#;
    let construction = r#"{"method": "GET", "url": "/pets"}"#;

    // One scripted pair per request.
    let state = mock_state(
        dir.path(),
        Arc::clone(&fetcher),
        vec![selection, construction, selection, construction],
    );

    let body = json!({
        "query": "show me all the pets",
        "spec_url": "https://api.example.com/openapi.json"
    });

    let (status1, _) = json_request(
        create_test_app(Arc::clone(&state)),
        "POST",
        "/translate",
        Some(body.clone()),
    )
    .await;
    let (status2, _) =
        json_request(create_test_app(state), "POST", "/translate", Some(body)).await;

    assert_eq!(status1, StatusCode::OK);
    assert_eq!(status2, StatusCode::OK);

    // The spec was fetched and embedded once; the second request only
    // embedded its query.
    assert_eq!(fetcher.fetches(), 1);
}

#[tokio::test]
async fn test_translate_empty_spec_returns_404() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(json!({ "paths": {} })));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let body = json!({
        "query": "anything at all",
        "spec_url": "https://empty.example/openapi.json"
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("no endpoints"));
}

#[tokio::test]
async fn test_translate_empty_selection_returns_502() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    // Model answers with an empty selection; the pipeline must refuse to
    // fabricate a request from nothing.
    let app = create_test_app(mock_state(dir.path(), fetcher, vec!["[]"]));

    let body = json!({
        "query": "do something impossible",
        "spec_url": "https://api.example.com/openapi.json"
    });

    let (status, response) = json_request(app, "POST", "/translate", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(response["error"]
        .as_str()
        .unwrap()
        .contains("selection"));
}

// ============================================================================
// Pre-warm Tests
// ============================================================================

#[tokio::test]
async fn test_prewarm_populates_then_reports_cached() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let state = mock_state(dir.path(), Arc::clone(&fetcher), vec![]);

    let body = json!({ "spec_url": "https://api.example.com/openapi.json" });

    let (status1, response1) = json_request(
        create_test_app(Arc::clone(&state)),
        "POST",
        "/prewarm",
        Some(body.clone()),
    )
    .await;
    let (status2, response2) =
        json_request(create_test_app(state), "POST", "/prewarm", Some(body)).await;

    assert_eq!(status1, StatusCode::OK);
    assert_eq!(response1["endpoints"], 3);
    assert_eq!(response1["already_cached"], false);

    assert_eq!(status2, StatusCode::OK);
    assert_eq!(response2["already_cached"], true);
    assert_eq!(fetcher.fetches(), 1);
}

#[tokio::test]
async fn test_prewarm_empty_url_returns_400() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(MockFetcher::new(sample_spec()));
    let app = create_test_app(mock_state(dir.path(), fetcher, vec![]));

    let (status, _) = json_request(app, "POST", "/prewarm", Some(json!({ "spec_url": "" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
