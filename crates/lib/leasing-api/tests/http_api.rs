use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use leasing_api::{ApiServerConfig, build_router};
use leasing_core::services::{RegistryConfig, SchemaRegistry};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("leasing-core")
        .join("tests")
        .join("data")
}

async fn app() -> Router {
    app_with(RegistryConfig::new(data_dir())).await
}

async fn chart_app(charts_dir: &Path) -> Router {
    app_with(RegistryConfig::new(data_dir()).with_charts_dir(charts_dir)).await
}

async fn app_with(config: RegistryConfig) -> Router {
    let registry = SchemaRegistry::in_memory(&config)
        .await
        .unwrap_or_else(|err| panic!("failed to build registry: {err}"));
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("valid address");
    build_router(Arc::new(registry), &ApiServerConfig::new(addr)).expect("valid allow-list")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:8000")
        .body(Body::empty())
        .expect("request")
}

fn call(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/tools/call")
        .header(header::HOST, "localhost:8000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_table_counts() {
    let response = app().await.oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tables"]["nearby_units"], 5);
    assert_eq!(body["tables"]["guest_cards"], 7);
    assert_eq!(body["absent"], json!([]));
}

#[tokio::test]
async fn index_and_catalog_list_endpoints() {
    let response = app().await.oneshot(get("/")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["endpoints"]["mcp"], "/mcp");

    let response = app().await.oneshot(get("/api/tools")).await.expect("response");
    let body = json_body(response).await;
    let names: Vec<&str> = body["tools"]
        .as_array()
        .expect("tool list")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"market_rent_analysis"));
    assert!(names.contains(&"create_individual_chart"));
}

#[tokio::test]
async fn call_accepts_name_and_argument_aliases() {
    let request = call(&json!({ "tool": "qualified_prospects", "args": { "min_income": 9000 } }));
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isError"], false);
    let text = body["content"][0]["text"].as_str().expect("text content");
    assert!(text.contains("### Results: 2 of 7 prospects qualify (28.6%)"));

    let request = call(&json!({ "name": "market_rent_analysis" }));
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chart_calls_return_embedded_png() {
    let charts = TempDir::new().expect("temp dir");
    let request = call(&json!({ "name": "create_individual_chart", "arguments": { "chart_type": "rent_histogram" } }));
    let response = chart_app(charts.path())
        .await
        .oneshot(request)
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isError"], false);
    let text = body["content"][0]["text"].as_str().expect("text content");
    assert!(text.contains("![rent_histogram](data:image/png;base64,iVBORw0KGgo"));

    let request = call(&json!({ "name": "create_individual_chart", "arguments": { "chart_type": "radar" } }));
    let response = chart_app(charts.path())
        .await
        .oneshot(request)
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isError"], true);

    let request = call(&json!({ "name": "create_individual_chart" }));
    let response = chart_app(charts.path())
        .await
        .oneshot(request)
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_tool_lists_available_tools() {
    let response = app()
        .await
        .oneshot(call(&json!({ "name": "drop_everything" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "unknown tool: drop_everything");
    assert!(
        body["available"]
            .as_array()
            .is_some_and(|tools| tools.contains(&json!("get_schema")))
    );
}

#[tokio::test]
async fn bad_arguments_and_bodies_are_client_errors() {
    let response = app()
        .await
        .oneshot(call(&json!({ "name": "query_database", "arguments": {} })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/tools/call")
        .header(header::HOST, "localhost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = app().await.oneshot(malformed).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn control_errors_are_tool_results() {
    let request = call(&json!({ "name": "query_database", "input": { "query": "DELETE guest_cards" } }));
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isError"], true);
    assert_eq!(
        body["content"][0]["text"],
        "Error: Only SELECT queries are allowed."
    );
}

#[tokio::test]
async fn disallowed_host_and_origin_are_rejected() {
    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "attacker.example")
        .body(Body::empty())
        .expect("request");
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::MISDIRECTED_REQUEST);

    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "localhost")
        .header(header::ORIGIN, "https://attacker.example")
        .body(Body::empty())
        .expect("request");
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/health")
        .header(header::HOST, "127.0.0.1:8000")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .expect("request");
    let response = app().await.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}
