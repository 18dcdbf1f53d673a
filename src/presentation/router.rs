use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{health_handler, root_handler, transcription_handler};
use crate::presentation::middleware::api_key_middleware;
use crate::presentation::state::AppState;

pub const TRANSCRIPTION_ROUTE: &str = "/openai/deployments/{deployment_id}/audio/transcriptions";

const BYTES_PER_MB: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let upload_limit = state.settings.server.max_upload_mb.max(1) * BYTES_PER_MB;

    let transcription = Router::new()
        .route(TRANSCRIPTION_ROUTE, post(transcription_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(transcription)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
