use async_trait::async_trait;

use crate::domain::{BackendDescriptor, TranscriptionRequest, TranscriptionResult};

use super::audio_decoder::DecodeError;

/// A speech recognition backend.
///
/// Implementations must remove any temporary files they create before
/// returning, whether inference succeeded or not.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    fn descriptor(&self) -> &BackendDescriptor;

    /// Whether inference runs on this host. Local engines are subject to
    /// admission control; remote ones are not.
    fn runs_locally(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
}

impl From<DecodeError> for TranscriptionError {
    fn from(e: DecodeError) -> Self {
        TranscriptionError::DecodingFailed(e.to_string())
    }
}
