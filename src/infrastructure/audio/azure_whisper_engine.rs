use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::{
    AudioInput, BackendDescriptor, ComputeDevice, Segment, TranscriptionRequest,
    TranscriptionResult,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
const REMOTE_PRECISION: &str = "remote";

/// Forwards uploads to an Azure OpenAI Whisper deployment.
///
/// Segment statistics the service reports are carried through; fields it
/// omits are left at their defaults.
pub struct AzureWhisperEngine {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    descriptor: BackendDescriptor,
}

impl AzureWhisperEngine {
    pub fn new(base_url: &str, deployment: &str, api_key: &str, api_version: &str) -> Self {
        Self::with_timeout(base_url, deployment, api_key, api_version, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        deployment: &str,
        api_key: &str,
        api_version: &str,
        timeout: Duration,
    ) -> Self {
        let endpoint = format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            base_url.trim_end_matches('/'),
            deployment,
            api_version,
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            descriptor: BackendDescriptor::new(
                format!("azure:{}", deployment),
                ComputeDevice::Cpu,
                REMOTE_PRECISION,
            ),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Deserialize)]
struct AzureTranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Vec<AzureChunk>,
}

#[derive(Deserialize)]
struct AzureChunk {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    seek: usize,
    #[serde(default)]
    tokens: Vec<u32>,
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    avg_logprob: f64,
    #[serde(default)]
    compression_ratio: f64,
    #[serde(default)]
    no_speech_prob: f64,
}

impl From<AzureChunk> for Segment {
    fn from(chunk: AzureChunk) -> Self {
        Segment {
            seek: chunk.seek,
            tokens: chunk.tokens,
            temperature: chunk.temperature,
            avg_logprob: chunk.avg_logprob,
            compression_ratio: chunk.compression_ratio,
            no_speech_prob: chunk.no_speech_prob,
            ..Segment::span(chunk.start, chunk.end, chunk.text)
        }
    }
}

async fn upload_bytes(audio: &AudioInput) -> Result<(Bytes, String), TranscriptionError> {
    let file_name = audio.file_name().unwrap_or("audio.wav").to_string();
    let data = match audio {
        AudioInput::Bytes { data, .. } => data.clone(),
        AudioInput::Path(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| TranscriptionError::DecodingFailed(format!("read audio: {}", e)))?,
    };
    Ok((data, file_name))
}

#[async_trait]
impl TranscriptionEngine for AzureWhisperEngine {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn runs_locally(&self) -> bool {
        false
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let (data, file_name) = upload_bytes(&request.audio).await?;

        let file_part = multipart::Part::bytes(data.to_vec())
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("mime: {}", e)))?;

        let mut form = multipart::Form::new()
            .text("response_format", "verbose_json")
            .part("file", file_part);
        if let Some(language) = &request.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &request.prompt {
            form = form.text("prompt", prompt.clone());
        }

        tracing::debug!(endpoint = %self.endpoint, "Sending audio to Azure OpenAI Whisper");

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
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

        let result: AzureTranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("parse response: {}", e)))?;

        let duration = result
            .duration
            .or_else(|| result.segments.last().map(|c| c.end))
            .unwrap_or(0.0);
        let language = result.language.or(request.language);
        let segments: Vec<Segment> = result
            .segments
            .into_iter()
            .map(Segment::from)
            .collect();

        tracing::info!(
            chars = result.text.chars().count(),
            segments = segments.len(),
            "Azure OpenAI Whisper transcription completed"
        );

        Ok(TranscriptionResult::new(&result.text, duration, language.as_deref())
            .with_segments(segments))
    }
}
