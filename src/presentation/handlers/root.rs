use axum::Json;
use axum::response::IntoResponse;

use super::api_types::ServiceInfo;

pub const SERVICE_NAME: &str = "Local Azure OpenAI Whisper API";

pub async fn root_handler() -> impl IntoResponse {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        endpoints: [
            (
                "transcription",
                "/openai/deployments/{deployment_id}/audio/transcriptions",
            ),
            ("health", "/health"),
        ]
        .into_iter()
        .collect(),
    })
}
