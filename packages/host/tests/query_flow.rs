// ABOUTME: End-to-end tests: registry service + mocked specialist + host router
// ABOUTME: Asserts verbatim A2A payload passthrough and the response envelope

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aviary_core::A2AMessage;
use aviary_host::{AppState, DiscoveryCache, Dispatcher, RoutingPolicy};
use aviary_registry::{AppState as RegistryState, MemoryStore};

/// Spawn a real registry service on an ephemeral port and return its base URL.
async fn spawn_registry() -> String {
    let store = Arc::new(MemoryStore::new(chrono::Duration::seconds(60)));
    let app = aviary_registry::create_router(RegistryState { store });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn register_bio_agent(registry_url: &str, specialist_url: &str) {
    let response = reqwest::Client::new()
        .post(format!("{registry_url}/register"))
        .json(&serde_json::json!({
            "agent_id": "bio-agent",
            "base_url": specialist_url,
            "tools": [{
                "name": "bio-lookup",
                "description": "Answers questions about marine biology"
            }],
            "secret_token": "s3cret"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

fn host_app(registry_url: &str) -> axum::Router {
    let mut secrets = HashMap::new();
    secrets.insert("bio-agent".to_string(), "s3cret".to_string());

    let discovery = Arc::new(DiscoveryCache::new(registry_url, Duration::from_secs(1)));
    let dispatcher = Arc::new(Dispatcher::new("host-agent", registry_url, secrets));

    aviary_host::create_router(AppState {
        discovery,
        dispatcher,
        policy: Arc::new(RoutingPolicy::embedded_default()),
    })
}

fn query_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn query_is_forwarded_verbatim_and_attributed() {
    let registry_url = spawn_registry().await;

    let specialist = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&specialist)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "answer": "Reef ecosystems host most marine species.\n\nSources: reef.md",
            "result": "Reef ecosystems host most marine species.\n\nSources: reef.md",
            "sources": ["reef.md"],
            "chosen_temperature": 0.3,
            "similarity": 0.82
        })))
        .expect(1)
        .mount(&specialist)
        .await;

    register_bio_agent(&registry_url, &specialist.uri()).await;

    let app = host_app(&registry_url);
    let user_query = "Me fale sobre biologia marinha";
    let response = app
        .oneshot(query_request(
            serde_json::json!({"query": user_query, "uuid": "sess-42"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["source_agent_id"], "bio-agent");
    assert_eq!(body["source_tool"], "bio-lookup");
    assert_eq!(body["sources"][0], "reef.md");
    assert!(body["answer"].as_str().unwrap().contains("Reef ecosystems"));

    // The forwarded A2A envelope must carry the user's query verbatim.
    let requests = specialist.received_requests().await.unwrap();
    let execute = requests
        .iter()
        .find(|r| r.url.path() == "/execute")
        .expect("specialist never received the A2A message");
    assert_eq!(
        execute.headers.get("authorization").unwrap(),
        "Bearer s3cret"
    );
    let message: A2AMessage = serde_json::from_slice(&execute.body).unwrap();
    assert_eq!(message.payload.query, user_query);
    assert_eq!(message.payload.session_id.as_deref(), Some("sess-42"));
    assert_eq!(message.sender_agent_id, "host-agent");
    assert_eq!(message.receiver_agent_id, "bio-agent");
    assert!(message.message_id.starts_with("msg_"));
}

#[tokio::test]
async fn capabilities_query_lists_discovered_agents() {
    let registry_url = spawn_registry().await;

    let specialist = MockServer::start().await;
    register_bio_agent(&registry_url, &specialist.uri()).await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(serde_json::json!({"query": "o que voce faz"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["agents"][0]["agent_id"], "bio-agent");
    assert!(body["answer"].as_str().unwrap().contains("bio-lookup"));
}

#[tokio::test]
async fn routing_miss_falls_back_to_the_capabilities_listing() {
    let registry_url = spawn_registry().await;

    let specialist = MockServer::start().await;
    register_bio_agent(&registry_url, &specialist.uri()).await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(
            serde_json::json!({"query": "qual a capital da frança"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["answer"].as_str().unwrap().contains("host agent"));
    assert_eq!(body["agents"][0]["agent_id"], "bio-agent");
}

#[tokio::test]
async fn capabilities_query_answers_even_with_an_empty_registry() {
    let registry_url = spawn_registry().await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(serde_json::json!({"query": "o que voce faz"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["agents"].as_array().unwrap().is_empty());
    assert!(body["answer"]
        .as_str()
        .unwrap()
        .contains("no agents registered"));
}

#[tokio::test]
async fn empty_registry_yields_service_unavailable() {
    let registry_url = spawn_registry().await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(serde_json::json!({"query": "biologia"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let registry_url = spawn_registry().await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(serde_json::json!({"query": "   "})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unhealthy_specialist_is_deregistered_and_reported_unavailable() {
    let registry_url = spawn_registry().await;

    let specialist = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&specialist)
        .await;
    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&specialist)
        .await;

    register_bio_agent(&registry_url, &specialist.uri()).await;

    let app = host_app(&registry_url);
    let response = app
        .oneshot(query_request(serde_json::json!({"query": "biologia marinha"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // The best-effort deregistration runs detached; wait for it to land,
    // then confirm the registry no longer lists the agent.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let listings: serde_json::Value = reqwest::get(format!("{registry_url}/list_agents"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listings.as_object().unwrap().is_empty());
}
