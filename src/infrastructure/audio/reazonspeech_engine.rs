use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::{
    BackendDescriptor, ComputeDevice, TranscriptionRequest, TranscriptionResult,
};

use super::audio_normalizer::AudioNormalizer;
use super::wav_encoder::encode_wav_pcm16;

pub const DEFAULT_REAZONSPEECH_MODEL: &str = "reazonspeech-k2-v2";
const REAZONSPEECH_LANGUAGE: &str = "ja";
const SIDECAR_PRECISION: &str = "float32";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// ReazonSpeech served by a sidecar with an OpenAI-compatible text endpoint.
///
/// Japanese only and unsegmented. Audio is normalized here so the sidecar
/// always receives 16 kHz mono 16-bit WAV, and the duration is taken from
/// the normalized samples.
pub struct ReazonSpeechEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    normalizer: Arc<AudioNormalizer>,
    descriptor: BackendDescriptor,
}

impl ReazonSpeechEngine {
    pub fn new(base_url: &str, model: Option<String>, normalizer: Arc<AudioNormalizer>) -> Self {
        Self::with_timeout(base_url, model, normalizer, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        model: Option<String>,
        normalizer: Arc<AudioNormalizer>,
        timeout: Duration,
    ) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_REAZONSPEECH_MODEL.to_string());
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            descriptor: BackendDescriptor::new(model.clone(), ComputeDevice::Cpu, SIDECAR_PRECISION),
            model,
            normalizer,
        }
    }
}

#[async_trait]
impl TranscriptionEngine for ReazonSpeechEngine {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        if request.language.as_deref().is_some_and(|l| l != REAZONSPEECH_LANGUAGE) {
            tracing::debug!(language = ?request.language, "ReazonSpeech is Japanese only, ignoring language hint");
        }
        if request.prompt.is_some() {
            tracing::debug!("ReazonSpeech does not accept prompts, ignoring");
        }

        let normalizer = Arc::clone(&self.normalizer);
        let audio = request.audio;
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&audio))
            .await
            .map_err(|e| TranscriptionError::InferenceFailed(format!("decode worker: {}", e)))??;

        let duration = normalized.duration_secs();
        if normalized.is_empty() {
            return Ok(TranscriptionResult::new(
                "",
                duration,
                Some(REAZONSPEECH_LANGUAGE),
            ));
        }

        let wav = encode_wav_pcm16(&normalized)
            .map_err(|e| TranscriptionError::DecodingFailed(format!("wav encode: {}", e)))?;

        let file_part = multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", file_part);

        let url = format!("{}/audio/transcriptions", self.base_url);
        tracing::debug!(url = %url, model = %self.model, "Sending audio to ReazonSpeech");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("read response: {}", e)))?;

        tracing::info!(
            chars = text.chars().count(),
            duration_secs = duration,
            "ReazonSpeech transcription completed"
        );

        Ok(TranscriptionResult::new(
            &text,
            duration,
            Some(REAZONSPEECH_LANGUAGE),
        ))
    }
}
