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

/// Looks a national ID up in the customer master table.
pub const CEDULA_QUERY: &str = "SELECT STCD1 AS CEDULA FROM KNA1 WHERE STCD1 = ? LIMIT 10";

#[derive(Debug, Default, Deserialize)]
pub struct CedulaRequest {
    #[serde(default)]
    pub cedula: Option<JsonValue>,
}

impl CedulaRequest {
    /// The trimmed ID. Numbers and booleans are accepted in their JSON text
    /// form, so `true` looks up `"true"`. A null `cedula` counts as missing
    /// and is rejected rather than looked up as a literal.
    pub fn cedula(&self) -> Result<String> {
        match &self.cedula {
            None | Some(JsonValue::Null) => {
                Err(GatewayError::validation("Parámetro cedula es requerido"))
            }
            Some(JsonValue::String(s)) => Ok(s.trim().to_string()),
            Some(JsonValue::Number(n)) => Ok(n.to_string()),
            Some(JsonValue::Bool(b)) => Ok(b.to_string()),
            Some(JsonValue::Array(_) | JsonValue::Object(_)) => {
                Err(GatewayError::validation("Parámetro cedula debe ser un texto"))
            }
        }
    }
}

#[derive(Serialize)]
struct CedulaResponse {
    existe: bool,
    mensaje: String,
    datos: Option<Record>,
    total_encontrados: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct CedulaErrorResponse {
    existe: bool,
    mensaje: String,
    error: String,
    timestamp: String,
}

pub async fn post_consultar_cedula(
    State(state): State<ServerState>,
    JsonBody(request): JsonBody<CedulaRequest>,
) -> Result<Response> {
    let cedula = request.cedula()?;
    info!("Consulting cedula: {cedula}");

    let records = match state
        .gateway
        .execute_query(CEDULA_QUERY, &[Value::from(cedula.as_str())])
        .await
    {
        Ok(records) => records,
        Err(err) => {
            error!("Cedula lookup failed ({}): {}", err.category(), err.message());
            let body = CedulaErrorResponse {
                existe: false,
                mensaje: format!("⚠️ Error consultando cédula: {}", err.message()),
                error: err.message().to_string(),
                timestamp: timestamp(),
            };
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
        }
    };

    let total_encontrados = records.len();
    let existe = total_encontrados > 0;
    let mensaje = if existe {
        format!("✅ La cédula {cedula} existe en SAP")
    } else {
        format!("⚠️ La cédula {cedula} no existe en SAP")
    };
    info!("Cedula lookup completed: {total_encontrados} records");

    Ok(Json(CedulaResponse {
        existe,
        mensaje,
        datos: records.into_iter().next(),
        total_encontrados,
        timestamp: timestamp(),
    })
    .into_response())
}
