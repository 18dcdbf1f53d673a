use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::application::ports::TranscriptionError;
use crate::domain::TranscriptionRequest;
use crate::infrastructure::observability::transcript_preview;

use super::model_registry::{ModelRegistry, RegistryError};
use super::response_builder::{TranscriptionResponse, build_response};

/// Routes a request to a backend and shapes its result.
///
/// Locally executing backends get a semaphore bounding concurrent inferences
/// so parallel requests queue instead of oversubscribing the CPU.
pub struct TranscriptionService {
    registry: Arc<ModelRegistry>,
    admission: HashMap<String, Arc<Semaphore>>,
    default_language: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionServiceError {
    #[error(transparent)]
    NoBackendAvailable(#[from] RegistryError),
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),
}

impl TranscriptionService {
    pub fn new(
        registry: Arc<ModelRegistry>,
        max_concurrent_inferences: usize,
        default_language: Option<String>,
    ) -> Self {
        let permits = max_concurrent_inferences.max(1);
        let admission = registry
            .engines()
            .filter(|(_, engine)| engine.runs_locally())
            .map(|(key, _)| (key.to_string(), Arc::new(Semaphore::new(permits))))
            .collect();

        Self {
            registry,
            admission,
            default_language: default_language.filter(|l| !l.trim().is_empty()),
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    #[tracing::instrument(skip(self, request), fields(backend = tracing::field::Empty, format = %request.format))]
    pub async fn transcribe(
        &self,
        deployment_id: &str,
        mut request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, TranscriptionServiceError> {
        let (key, engine) = self.registry.resolve_loaded(deployment_id)?;
        tracing::Span::current().record("backend", key);

        if request.language.is_none() {
            request.language = self.default_language.clone();
        }
        let format = request.format;

        let _permit = match self.admission.get(key) {
            Some(semaphore) => Some(Arc::clone(semaphore).acquire_owned().await.map_err(|e| {
                TranscriptionError::InferenceFailed(format!("admission queue closed: {}", e))
            })?),
            None => None,
        };

        let started = Instant::now();
        let result = engine.transcribe(request).await?;

        tracing::info!(
            inference_ms = started.elapsed().as_millis() as u64,
            duration_secs = result.duration_seconds,
            segments = result.segments.len(),
            text = %transcript_preview(&result.text),
            "Transcription completed"
        );

        Ok(build_response(&result, format))
    }
}
