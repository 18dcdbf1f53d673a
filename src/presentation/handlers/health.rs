use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::api_types::{HealthResponse, ModelSummary};
use crate::presentation::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.transcription_service.registry();

    let available_models = registry
        .list_models()
        .into_iter()
        .map(|(key, info)| {
            let descriptor = info.descriptor;
            (
                key,
                ModelSummary {
                    model: descriptor.model_identifier().to_string(),
                    device: descriptor.device().to_string(),
                    compute_type: descriptor.compute_precision().to_string(),
                    aliases: info.aliases,
                },
            )
        })
        .collect();

    let status = if registry.is_empty() { "degraded" } else { "ok" };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            available_models,
            default_model: registry.default_model(),
            model_aliases: registry.resolver().entries().collect(),
        }),
    )
}
