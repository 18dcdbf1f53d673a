use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

use crate::presentation::handlers::api_types::ErrorEnvelope;
use crate::presentation::state::AppState;

pub const API_KEY_HEADER: &str = "api-key";
pub const MISSING_API_KEY_MESSAGE: &str = "Access denied due to missing api-key header.";
pub const INVALID_API_KEY_MESSAGE: &str = "Access denied due to invalid api-key header.";

/// Any non-empty `api-key` passes unless `server.api_key` pins an exact value.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let Some(provided) = provided else {
        tracing::warn!("Rejected request without api-key header");
        return ErrorEnvelope::new("401", MISSING_API_KEY_MESSAGE)
            .into_response_with(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = state.settings.server.api_key.as_deref() {
        if provided != expected {
            tracing::warn!("Rejected request with mismatched api-key");
            return ErrorEnvelope::new("401", INVALID_API_KEY_MESSAGE)
                .into_response_with(StatusCode::UNAUTHORIZED);
        }
    }

    next.run(request).await
}
