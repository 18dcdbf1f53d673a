use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;

use super::api_types::ErrorEnvelope;
use crate::application::services::TranscriptionServiceError;
use crate::domain::{AudioInput, ResponseFormat, TranscriptionRequest};
use crate::infrastructure::observability::transcript_preview;
use crate::presentation::state::AppState;

const INTERNAL_ERROR_CODE: &str = "InternalServerError";

#[derive(Default)]
struct TranscriptionForm {
    file: Option<(Bytes, Option<String>)>,
    language: Option<String>,
    prompt: Option<String>,
    response_format: Option<String>,
}

fn bad_request(message: impl Into<String>) -> Response {
    ErrorEnvelope::new("400", message).into_response_with(StatusCode::BAD_REQUEST)
}

async fn read_form(multipart: &mut Multipart) -> Result<TranscriptionForm, Response> {
    let mut form = TranscriptionForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart");
                return Err(bad_request(format!("Failed to read multipart: {}", e)));
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().map(String::from);
            let data = field.bytes().await.map_err(|e| {
                tracing::warn!(error = %e, "Failed to read uploaded file");
                bad_request(format!("Failed to read file: {}", e))
            })?;
            form.file = Some((data, file_name));
            continue;
        }

        let value = field.text().await.map_err(|e| {
            tracing::warn!(field = %name, error = %e, "Failed to read form field");
            bad_request(format!("Failed to read field {}: {}", name, e))
        })?;
        match name.as_str() {
            "language" => form.language = Some(value),
            "prompt" => form.prompt = Some(value),
            "response_format" => form.response_format = Some(value),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

#[tracing::instrument(skip(state, multipart))]
pub async fn transcription_handler(
    State(state): State<AppState>,
    Path(deployment_id): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let Some((data, file_name)) = form.file else {
        tracing::warn!("Transcription request with no file");
        return bad_request("No file uploaded");
    };

    let format = ResponseFormat::parse_lenient(form.response_format.as_deref());

    tracing::info!(
        file = file_name.as_deref().unwrap_or("unknown"),
        bytes = data.len(),
        language = ?form.language,
        prompt = %form.prompt.as_deref().map(transcript_preview).unwrap_or_default(),
        format = %format,
        "Transcription request"
    );

    let request = TranscriptionRequest::new(AudioInput::from_upload(data, file_name))
        .with_language(form.language)
        .with_prompt(form.prompt)
        .with_format(format);

    match state
        .transcription_service
        .transcribe(&deployment_id, request)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(TranscriptionServiceError::NoBackendAvailable(e)) => {
            tracing::error!(error = %e, "No backend available");
            ErrorEnvelope::new("503", e.to_string()).into_response_with(StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(e) => {
            tracing::error!(error = %e, "Transcription failed");
            ErrorEnvelope::new(INTERNAL_ERROR_CODE, e.to_string())
                .into_response_with(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
