// ABOUTME: Integration tests for the registry HTTP surface
// ABOUTME: Drives the axum router in-process with tower::ServiceExt

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use aviary_registry::{create_router, AppState, MemoryStore};

fn test_app() -> axum::Router {
    let store = Arc::new(MemoryStore::new(chrono::Duration::seconds(60)));
    create_router(AppState { store })
}

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn register_body(agent_id: &str) -> serde_json::Value {
    serde_json::json!({
        "agent_id": agent_id,
        "base_url": "http://localhost:8010",
        "tools": [{"name": "bio-lookup", "description": "Marine biology lookups"}],
        "secret_token": "s3cret"
    })
}

#[tokio::test]
async fn register_rejects_missing_fields() {
    let app = test_app();

    let response = app
        .oneshot(json_request(
            "/register",
            serde_json::json!({"agent_id": "bio-agent"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("incomplete"));
}

#[tokio::test]
async fn register_then_list_exposes_no_secret() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request("/register", register_body("bio-agent")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list_agents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("s3cret"));
    assert!(!text.contains("secret_token"));

    let body: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["bio-agent"]["base_url"], "http://localhost:8010");
    assert_eq!(body["bio-agent"]["tools"][0]["name"], "bio-lookup");
}

#[tokio::test]
async fn reregister_replaces_the_previous_payload() {
    let app = test_app();

    app.clone()
        .oneshot(json_request("/register", register_body("bio-agent")))
        .await
        .unwrap();

    let mut second = register_body("bio-agent");
    second["base_url"] = serde_json::json!("http://replacement:9000");
    app.clone()
        .oneshot(json_request("/register", second))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list_agents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(body["bio-agent"]["base_url"], "http://replacement:9000");
}

#[tokio::test]
async fn deregister_unknown_agent_is_404() {
    let app = test_app();

    let response = app
        .oneshot(json_request(
            "/deregister",
            serde_json::json!({"agent_id": "ghost"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deregister_removes_a_registered_agent() {
    let app = test_app();

    app.clone()
        .oneshot(json_request("/register", register_body("bio-agent")))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "/deregister",
            serde_json::json!({"agent_id": "bio-agent"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list_agents")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body.as_object().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_store_mode() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
}
