use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info};

use super::timestamp;
use crate::{
    db::{Record, Value},
    error::{GatewayError, Result},
    extract::JsonBody,
    state::ServerState,
};

/// Unrestricted passthrough for testing. Never expose outside a trusted network.
#[derive(Debug, Default, Deserialize)]
pub struct CustomQueryRequest {
    #[serde(default)]
    pub query: Option<JsonValue>,
    #[serde(default)]
    pub params: Option<JsonValue>,
}

impl CustomQueryRequest {
    /// The statement text, sent to the warehouse as given. Only an absent or
    /// null field is rejected; a non-string value is forwarded as its JSON text
    /// and left for the warehouse to refuse.
    pub fn query(&self) -> Result<String> {
        match &self.query {
            None | Some(JsonValue::Null) => {
                Err(GatewayError::validation("Parámetro query es requerido"))
            }
            Some(JsonValue::String(query)) => Ok(query.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    /// Positional bind values; absent or null means none.
    pub fn params(&self) -> Result<Vec<Value>> {
        match &self.params {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    Value::from_json(item).ok_or_else(|| {
                        GatewayError::validation(format!(
                            "El parámetro {} debe ser un valor escalar",
                            i + 1
                        ))
                    })
                })
                .collect(),
            Some(_) => Err(GatewayError::validation("Parámetro params debe ser una lista")),
        }
    }
}

#[derive(Serialize)]
struct QueryCustomResponse {
    success: bool,
    data: Vec<Record>,
    count: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct QueryCustomErrorResponse {
    success: bool,
    error: String,
    timestamp: String,
}

pub async fn post_query_custom(
    State(state): State<ServerState>,
    JsonBody(request): JsonBody<CustomQueryRequest>,
) -> Result<Response> {
    let query = request.query()?;
    let params = request.params()?;
    info!("Executing custom query with {} parameters", params.len());

    match state.gateway.execute_query(&query, &params).await {
        Ok(data) => Ok(Json(QueryCustomResponse {
            success: true,
            count: data.len(),
            data,
            timestamp: timestamp(),
        })
        .into_response()),
        Err(err) => {
            error!("Custom query failed ({}): {}", err.category(), err.message());
            let body = QueryCustomErrorResponse {
                success: false,
                error: err.message().to_string(),
                timestamp: timestamp(),
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}
