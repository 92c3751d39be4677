//! Snowflake REST client tests against an in-process fake endpoint.
//!
//! The fake speaks just enough of the session protocol (login, query,
//! result polling and logout) to exercise `SnowflakeWarehouse` end to end.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use warehouse_gateway::config::WarehouseConfig;
use warehouse_gateway::db::{SnowflakeWarehouse, Value};
use warehouse_gateway::error::GatewayError;
use warehouse_gateway::gateway::QueryGateway;

const TOKEN: &str = "test-session-token";
const PASSWORD: &str = "secret";

/// Counts protocol calls and records every query request body.
#[derive(Default)]
struct FakeSnowflake {
    logins: AtomicUsize,
    logouts: AtomicUsize,
    polls: AtomicUsize,
    login_params: Mutex<Vec<HashMap<String, String>>>,
    queries: Mutex<Vec<JsonValue>>,
}

impl FakeSnowflake {
    fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn queries(&self) -> Vec<JsonValue> {
        self.queries.lock().unwrap().clone()
    }
}

async fn login(
    State(fake): State<Arc<FakeSnowflake>>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<JsonValue>,
) -> Json<JsonValue> {
    fake.logins.fetch_add(1, Ordering::SeqCst);
    fake.login_params.lock().unwrap().push(params);

    if body["data"]["PASSWORD"] != PASSWORD {
        return Json(json!({
            "success": false,
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "data": null
        }));
    }
    Json(json!({
        "success": true,
        "data": {"token": TOKEN, "serverVersion": "8.40.1"}
    }))
}

async fn query(
    State(fake): State<Arc<FakeSnowflake>>,
    headers: HeaderMap,
    Json(body): Json<JsonValue>,
) -> Json<JsonValue> {
    let expected = format!("Snowflake Token=\"{TOKEN}\"");
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Json(json!({
            "success": false,
            "code": "390104",
            "message": "User must login again to access the service.",
            "data": null
        }));
    }

    fake.queries.lock().unwrap().push(body.clone());
    let sql = body["sqlText"].as_str().unwrap_or_default();

    if sql.contains("BOOM") {
        return Json(json!({"success": false, "code": "002003", "message": "boom", "data": null}));
    }
    if sql.contains("SLOW") {
        return Json(json!({
            "success": true,
            "code": "333334",
            "message": "Asynchronous execution in progress.",
            "data": {"queryId": "01b2", "getResultUrl": "/queries/01b2/result"}
        }));
    }

    Json(json!({
        "success": true,
        "data": {
            "queryId": "01b1",
            "rowtype": [
                {"name": "X", "type": "fixed", "scale": 0},
                {"name": "P", "type": "text"}
            ],
            "rowset": [["1", body["bindings"]["1"]["value"]]]
        }
    }))
}

async fn result(State(fake): State<Arc<FakeSnowflake>>) -> Json<JsonValue> {
    fake.polls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "success": true,
        "data": {
            "queryId": "01b2",
            "rowtype": [{"name": "X", "type": "fixed", "scale": 0}],
            "rowset": [["7"]]
        }
    }))
}

async fn logout(
    State(fake): State<Arc<FakeSnowflake>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<JsonValue> {
    if params.get("delete").map(String::as_str) == Some("true") {
        fake.logouts.fetch_add(1, Ordering::SeqCst);
    }
    Json(json!({"success": true, "data": null}))
}

/// Serves the fake on an ephemeral local port.
fn start_fake() -> (Arc<FakeSnowflake>, SocketAddr) {
    let fake = Arc::new(FakeSnowflake::default());
    let app = Router::new()
        .route("/session/v1/login-request", post(login))
        .route("/queries/v1/query-request", post(query))
        .route("/queries/:query_id/result", get(result))
        .route("/session", post(logout))
        .with_state(Arc::clone(&fake));

    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);

    (fake, addr)
}

fn gateway(addr: SocketAddr, password: &str) -> QueryGateway {
    let config = WarehouseConfig {
        account: "xy12345".to_string(),
        user: "GATEWAY".to_string(),
        password: password.to_string(),
        warehouse: "TEST_WH".to_string(),
        database: "TEST_DB".to_string(),
        schema: "PUBLIC".to_string(),
        host: Some(format!("http://{addr}")),
        login_timeout_secs: 5,
        network_timeout_secs: 5,
        ..Default::default()
    };
    let warehouse = SnowflakeWarehouse::new(Arc::new(config)).unwrap();
    QueryGateway::new(Arc::new(warehouse))
}

#[tokio::test]
async fn test_select_binds_params_and_logs_out() {
    let (fake, addr) = start_fake();
    let gateway = gateway(addr, PASSWORD);

    let records = gateway
        .execute_query("SELECT 1 AS X, ? AS P", &[Value::from("v")])
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["X"], Value::Int(1));
    assert_eq!(records[0]["P"], Value::from("v"));
    assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["X", "P"]);

    let queries = fake.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["bindings"]["1"], json!({"type": "TEXT", "value": "v"}));
    assert_eq!(queries[0]["sequenceId"], 1);

    let login_params = fake.login_params.lock().unwrap().clone();
    assert_eq!(login_params[0].get("warehouse").map(String::as_str), Some("TEST_WH"));
    assert_eq!(login_params[0].get("databaseName").map(String::as_str), Some("TEST_DB"));

    assert_eq!(fake.logins(), 1);
    assert_eq!(fake.logouts(), 1);
}

#[tokio::test]
async fn test_query_failure_still_logs_out() {
    let (fake, addr) = start_fake();
    let gateway = gateway(addr, PASSWORD);

    let err = gateway.execute_query("SELECT BOOM", &[]).await.unwrap_err();

    assert!(matches!(err, GatewayError::Query(ref m) if m == "boom (code 002003)"));
    assert_eq!(fake.logins(), 1);
    assert_eq!(fake.logouts(), 1);
}

#[tokio::test]
async fn test_running_statement_is_polled_to_completion() {
    let (fake, addr) = start_fake();
    let gateway = gateway(addr, PASSWORD);

    let records = gateway.execute_query("SELECT SLOW", &[]).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["X"], Value::Int(7));
    assert_eq!(fake.polls(), 1);
    assert_eq!(fake.logouts(), fake.logins());
}

#[tokio::test]
async fn test_sessions_balance_across_requests() {
    let (fake, addr) = start_fake();
    let gateway = gateway(addr, PASSWORD);

    gateway.execute_query("SELECT 1 AS X", &[]).await.unwrap();
    gateway.execute_query("SELECT BOOM", &[]).await.unwrap_err();
    gateway.execute_query("SELECT SLOW", &[]).await.unwrap();

    assert_eq!(fake.logins(), 3);
    assert_eq!(fake.logouts(), 3);
}

#[tokio::test]
async fn test_rejected_login_is_connection_error() {
    let (fake, addr) = start_fake();
    let gateway = gateway(addr, "wrong");

    let err = gateway.execute_query("SELECT 1 AS X", &[]).await.unwrap_err();

    assert!(matches!(err, GatewayError::Connection(ref m) if m.contains("390100")));
    assert_eq!(fake.logins(), 1);
    assert!(fake.queries().is_empty());
    assert_eq!(fake.logouts(), 0);
}
