mod get_health;
mod post_consultar_cedula;
mod post_query_custom;

use crate::{config::CorsSettings, middleware::build_cors_from_config, state::ServerState};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use tower_http::trace::TraceLayer;

pub use get_health::get_health;
pub use post_consultar_cedula::{post_consultar_cedula, CedulaRequest, CEDULA_QUERY};
pub use post_query_custom::{post_query_custom, CustomQueryRequest};

pub fn create_router(state: ServerState, cors: &CorsSettings) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/consultar-cedula", post(post_consultar_cedula))
        .route("/query-custom", post(post_query_custom))
        .layer(build_cors_from_config(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// ISO-8601 timestamp stamped on every response body.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
