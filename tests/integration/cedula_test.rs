//! National ID lookup tests.

use super::common::{assert_timestamp, post_json, post_raw, test_client};
use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use warehouse_gateway::db::{ColumnInfo, MockWarehouse, QueryResult, Value};
use warehouse_gateway::routes::CEDULA_QUERY;

#[tokio::test]
async fn test_existing_cedula() {
    let (client, probe) = test_client(MockWarehouse::demo());

    let (status, body) =
        post_json(&client, "/consultar-cedula", json!({"cedula": "1020304050"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["existe"], true);
    assert_eq!(body["datos"], json!({"CEDULA": "1020304050"}));
    assert_eq!(body["total_encontrados"], 1);
    assert_eq!(body["mensaje"], "✅ La cédula 1020304050 existe en SAP");
    assert_timestamp(&body);
    assert_eq!(probe.open_sessions(), 0);
}

#[tokio::test]
async fn test_missing_cedula_value() {
    let (client, probe) = test_client(MockWarehouse::demo());

    let (status, body) = post_json(&client, "/consultar-cedula", json!({"cedula": "999"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["existe"], false);
    assert_eq!(body["datos"], json!(null));
    assert_eq!(body["total_encontrados"], 0);
    assert_eq!(body["mensaje"], "⚠️ La cédula 999 no existe en SAP");
    assert_eq!(probe.open_sessions(), 0);
}

#[tokio::test]
async fn test_cedula_is_trimmed_and_bound() {
    let (client, probe) = test_client(MockWarehouse::demo());

    let (status, body) =
        post_json(&client, "/consultar-cedula", json!({"cedula": "  79865432  "})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["existe"], true);

    let executed = probe.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].0, CEDULA_QUERY);
    assert_eq!(executed[0].1, vec![Value::from("79865432")]);
}

#[tokio::test]
async fn test_numeric_cedula() {
    let (client, _probe) = test_client(MockWarehouse::demo());

    let (status, body) = post_json(&client, "/consultar-cedula", json!({"cedula": 52123456})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["datos"], json!({"CEDULA": "52123456"}));
}

#[tokio::test]
async fn test_first_row_returned_when_several_match() {
    let warehouse = MockWarehouse::new().with_responder("FROM KNA1", |params| {
        let cedula = params[0].to_display_string();
        Ok(QueryResult::with_data(
            vec![ColumnInfo::new("CEDULA", "text")],
            vec![vec![Value::from(cedula.clone())], vec![Value::from(cedula)]],
        ))
    });
    let (client, _probe) = test_client(warehouse);

    let (_, body) = post_json(&client, "/consultar-cedula", json!({"cedula": "42"})).await;

    assert_eq!(body["existe"], true);
    assert_eq!(body["total_encontrados"], 2);
    assert_eq!(body["datos"], json!({"CEDULA": "42"}));
}

#[tokio::test]
async fn test_cedula_required() {
    let (client, probe) = test_client(MockWarehouse::demo());

    let (status, body) = post_json(&client, "/consultar-cedula", json!({"nombre": "x"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Parámetro cedula es requerido"}));
    assert_eq!(probe.connect_attempts(), 0);
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let (client, probe) = test_client(MockWarehouse::demo());

    let (status, body) = post_raw(&client, "/consultar-cedula", "cedula=1").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(probe.connect_attempts(), 0);
}

#[tokio::test]
async fn test_backend_failure() {
    let (client, probe) = test_client(
        MockWarehouse::new().with_query_error("FROM KNA1", "Object 'KNA1' does not exist"),
    );

    let (status, body) = post_json(&client, "/consultar-cedula", json!({"cedula": "1"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["existe"], false);
    assert_eq!(body["error"], "Object 'KNA1' does not exist");
    assert_eq!(
        body["mensaje"],
        "⚠️ Error consultando cédula: Object 'KNA1' does not exist"
    );
    assert_timestamp(&body);
    assert_eq!(probe.sessions_opened(), 1);
    assert_eq!(probe.open_sessions(), 0);
}

#[tokio::test]
async fn test_connection_failure() {
    let (client, probe) =
        test_client(MockWarehouse::demo().with_connect_error("Incorrect username or password"));

    let (status, body) = post_json(&client, "/consultar-cedula", json!({"cedula": "1"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["existe"], false);
    assert_eq!(probe.sessions_opened(), 0);
}
