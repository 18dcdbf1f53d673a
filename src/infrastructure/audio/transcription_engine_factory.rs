use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::application::services::{AZURE_WHISPER, KOTOBA_WHISPER, ModelRegistry, REAZONSPEECH};
use crate::presentation::config::{
    AzureWhisperSettings, BackendsSettings, KotobaWhisperSettings, ReazonSpeechSettings,
};

use super::audio_normalizer::AudioNormalizer;
use super::azure_whisper_engine::AzureWhisperEngine;
use super::candle_whisper_engine::{CandleWhisperEngine, CandleWhisperOptions};
use super::reazonspeech_engine::ReazonSpeechEngine;

pub struct TranscriptionEngineFactory;

impl TranscriptionEngineFactory {
    /// Loads every configured backend into a fresh registry.
    ///
    /// The Kotoba-Whisper engine is the default deployment and must load.
    /// Optional backends that fail are logged and left out.
    pub fn build_registry(
        settings: &BackendsSettings,
        normalizer: Arc<AudioNormalizer>,
    ) -> Result<ModelRegistry, TranscriptionError> {
        let primary = Self::create_kotoba_whisper(&settings.kotoba_whisper, Arc::clone(&normalizer))
            .inspect_err(|e| {
                tracing::error!(error = %e, backend = KOTOBA_WHISPER, "Default backend failed to load");
            })?;

        Ok(Self::assemble_registry(settings, normalizer, primary))
    }

    /// Registers an already loaded default engine, then every enabled
    /// optional backend that can be created.
    pub fn assemble_registry(
        settings: &BackendsSettings,
        normalizer: Arc<AudioNormalizer>,
        primary: Arc<dyn TranscriptionEngine>,
    ) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(KOTOBA_WHISPER, primary);

        if settings.reazonspeech.enabled {
            match Self::create_reazonspeech(&settings.reazonspeech, normalizer) {
                Ok(engine) => registry.register(REAZONSPEECH, engine),
                Err(e) => {
                    tracing::warn!(error = %e, backend = REAZONSPEECH, "Optional backend unavailable")
                }
            }
        }

        if settings.azure_whisper.enabled {
            match Self::create_azure_whisper(&settings.azure_whisper) {
                Ok(engine) => registry.register(AZURE_WHISPER, engine),
                Err(e) => {
                    tracing::warn!(error = %e, backend = AZURE_WHISPER, "Optional backend unavailable")
                }
            }
        }

        registry
    }

    pub fn create_kotoba_whisper(
        settings: &KotobaWhisperSettings,
        normalizer: Arc<AudioNormalizer>,
    ) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        let options = CandleWhisperOptions {
            model_id: settings.model_id.clone(),
            revision: settings.revision.clone(),
            use_gpu: settings.use_gpu,
            cache_dir: settings.cache_dir.clone(),
            max_new_tokens: settings.max_new_tokens,
            timestamps: settings.timestamps,
        };
        let engine = CandleWhisperEngine::new(options, normalizer)?;
        Ok(Arc::new(engine))
    }

    pub fn create_reazonspeech(
        settings: &ReazonSpeechSettings,
        normalizer: Arc<AudioNormalizer>,
    ) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        if settings.base_url.trim().is_empty() {
            return Err(TranscriptionError::ModelLoadFailed(
                "reazonspeech base_url required".to_string(),
            ));
        }
        let engine = ReazonSpeechEngine::with_timeout(
            &settings.base_url,
            settings.model.clone(),
            normalizer,
            Duration::from_secs(settings.request_timeout_secs),
        );
        Ok(Arc::new(engine))
    }

    pub fn create_azure_whisper(
        settings: &AzureWhisperSettings,
    ) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        if settings.base_url.trim().is_empty() {
            return Err(TranscriptionError::ModelLoadFailed(
                "azure_whisper base_url required".to_string(),
            ));
        }
        let api_key = settings.api_key.as_deref().ok_or_else(|| {
            TranscriptionError::ModelLoadFailed("azure_whisper api_key required".to_string())
        })?;
        let engine = AzureWhisperEngine::with_timeout(
            &settings.base_url,
            &settings.deployment,
            api_key,
            &settings.api_version,
            Duration::from_secs(settings.request_timeout_secs),
        );
        Ok(Arc::new(engine))
    }
}
