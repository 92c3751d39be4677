use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use super::timestamp;
use crate::state::ServerState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    snowflake_version: String,
}

#[derive(Serialize)]
struct HealthErrorResponse {
    status: &'static str,
    error: String,
    timestamp: String,
}

/// Opens a session and asks the warehouse for its version.
pub async fn get_health(State(state): State<ServerState>) -> Response {
    match state.gateway.server_version().await {
        Ok(snowflake_version) => Json(HealthResponse {
            status: "healthy",
            timestamp: timestamp(),
            snowflake_version,
        })
        .into_response(),
        Err(err) => {
            error!("Health check failed ({}): {}", err.category(), err.message());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthErrorResponse {
                    status: "error",
                    error: err.message().to_string(),
                    timestamp: timestamp(),
                }),
            )
                .into_response()
        }
    }
}
