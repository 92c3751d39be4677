use axum::{
    async_trait,
    body::Bytes,
    extract::FromRequest,
    http::Request,
};
use serde::de::DeserializeOwned;

use crate::error::{GatewayError, Result};

/// JSON request body that never produces axum's plain-text rejections.
///
/// A body that is empty, not JSON, or not a JSON object decodes to
/// `T::default()`, so handlers report the missing field themselves.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for JsonBody<T>
where
    T: DeserializeOwned + Default + Send,
    Bytes: FromRequest<S, B>,
    B: Send + 'static,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_err| GatewayError::validation("No se pudo leer el cuerpo de la petición"))?;

        parse_body(&bytes).map(JsonBody)
    }
}

pub fn parse_body<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value @ serde_json::Value::Object(_)) => serde_json::from_value(value)
            .map_err(|e| GatewayError::validation(format!("Cuerpo JSON inválido: {e}"))),
        _ => Ok(T::default()),
    }
}
