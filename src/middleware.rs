//! HTTP middleware construction.

use crate::config::CorsSettings;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, warn};

/// Build the CORS layer from server configuration.
///
/// An empty origin list, or one containing `"*"`, allows any origin.
pub fn build_cors_from_config(settings: &CorsSettings) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if settings.allows_any_origin() {
        debug!("CORS: Allowing any origin");
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("CORS: Ignoring invalid origin {origin:?}");
                None
            }
        })
        .collect();
    debug!("CORS: Allowed origins: {:?}", settings.allowed_origins);

    cors.allow_origin(AllowOrigin::list(origins))
}
