use super::*;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use lidco_core::{LidcoConfig, SessionBuilder};
use lidco_llm::{MockFailure, MockModelClient, ModelResponse, RetryConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app(mock: Arc<MockModelClient>) -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LidcoConfig::default();
    config.llm.router.default_model = "mock-model".to_string();
    config.llm.router.retry = RetryConfig::immediate();
    config.memory.enabled = false;
    config.agents.load_agent_files = false;

    let session = SessionBuilder::new(config, dir.path())
        .with_client("", mock)
        .build()
        .await
        .unwrap();
    (app(Arc::new(session)), dir)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app(Arc::new(MockModelClient::default())).await;
    let (status, body) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_list_and_reload_agents() {
    let (app, _dir) = test_app(Arc::new(MockModelClient::default())).await;

    let (status, body) = send_json(&app, get("/api/agents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 9);
    assert_eq!(body["data"][0]["name"], "architect");

    let (_, body) = send_json(&app, post("/api/agents/reload", json!({}))).await;
    assert_eq!(body["data"]["generation"], 2);
    assert_eq!(body["data"]["agents"], 9);
}

#[tokio::test]
async fn test_chat() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("Hello from coder."));
    let (app, _dir) = test_app(mock).await;

    let (status, body) = send_json(
        &app,
        post("/api/chat", json!({"message": "hi", "agent": "coder"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Hello from coder.");
    assert_eq!(body["agent"], "coder");
    assert_eq!(body["model_used"], "mock-model");
    assert_eq!(body["incomplete"], false);
    assert!(body["error"].is_null());

    let (_, body) = send_json(&app, get("/api/history")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let (app, _dir) = test_app(Arc::new(MockModelClient::default())).await;

    let (status, body) = send_json(&app, post("/api/chat", json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_chat_unknown_agent_is_routed() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("debugger"));
    mock.push_response(ModelResponse::text("Found it."));
    let (app, _dir) = test_app(mock).await;

    let (status, body) = send_json(
        &app,
        post("/api/chat", json!({"message": "hi", "agent": "ghost"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent"], "debugger");
    assert_eq!(body["content"], "Found it.");
}

#[tokio::test]
async fn test_chat_stream_sse() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("Streamed."));
    let (app, _dir) = test_app(mock).await;

    let (status, body) = send(
        &app,
        post("/api/chat/stream", json!({"message": "hi", "agent": "coder"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(names.first(), Some(&"start"));
    assert_eq!(names.last(), Some(&"done"));
    assert_eq!(names.iter().filter(|n| **n == "done" || **n == "error").count(), 1);
    assert!(body.contains(r#"data: {"text":"Streamed."}"#));
}

#[tokio::test]
async fn test_chat_stream_model_failure_ends_in_error() {
    let mock = Arc::new(MockModelClient::default());
    mock.fail_model("mock-model", MockFailure::Auth);
    let (app, _dir) = test_app(mock).await;
    let (_, body) = send(
        &app,
        post("/api/chat/stream", json!({"message": "hi", "agent": "coder"})),
    )
    .await;

    let names: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .collect();
    assert_eq!(names.first(), Some(&"start"));
    assert_eq!(names.last(), Some(&"error"));
    assert!(!names.contains(&"done"));
}

#[tokio::test]
async fn test_cancel_and_clear() {
    let (app, _dir) = test_app(Arc::new(MockModelClient::default())).await;

    let (_, body) = send_json(&app, post("/api/chat/cancel", json!({}))).await;
    assert_eq!(body["data"]["cancelled"], 0);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/api/history")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], true);

    let (_, body) = send_json(&app, get("/api/status")).await;
    assert_eq!(body["data"]["history_turns"], 0);
    assert_eq!(body["data"]["agent_count"], 9);
}
