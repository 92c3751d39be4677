//! Shared helpers: a test server over a mock warehouse.

use axum::http::StatusCode;
use axum_test_helper::TestClient;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use warehouse_gateway::config::CorsSettings;
use warehouse_gateway::db::{MockWarehouse, SessionProbe};
use warehouse_gateway::gateway::QueryGateway;
use warehouse_gateway::routes::create_router;
use warehouse_gateway::state::ServerState;

/// Starts a server backed by `warehouse` and returns it with the session probe.
pub fn test_client(warehouse: MockWarehouse) -> (TestClient, Arc<SessionProbe>) {
    let probe = warehouse.probe();
    let state = ServerState::new(QueryGateway::new(Arc::new(warehouse)));
    let router = create_router(state, &CorsSettings::default());
    (TestClient::new(router), probe)
}

/// POSTs a raw body as JSON and decodes the JSON response.
pub async fn post_raw(client: &TestClient, url: &str, body: &str) -> (StatusCode, JsonValue) {
    let res = client
        .post(url)
        .body(body.to_string())
        .header("Content-Type", "application/json")
        .send()
        .await;

    let status = res.status();
    let text = res.text().await;
    let json = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("response is not JSON ({e}): {text}"));
    (status, json)
}

pub async fn post_json(client: &TestClient, url: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    post_raw(client, url, &body.to_string()).await
}

pub async fn get_json(client: &TestClient, url: &str) -> (StatusCode, JsonValue) {
    let res = client.get(url).send().await;
    let status = res.status();
    let text = res.text().await;
    let json = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("response is not JSON ({e}): {text}"));
    (status, json)
}

/// Asserts the `timestamp` field holds an RFC 3339 value.
pub fn assert_timestamp(body: &JsonValue) {
    let timestamp = body["timestamp"]
        .as_str()
        .unwrap_or_else(|| panic!("missing timestamp in {body}"));
    assert!(
        chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(),
        "not an ISO-8601 timestamp: {timestamp}"
    );
}
