mod alias_resolver;
mod model_registry;
mod response_builder;
mod transcription_service;

pub use alias_resolver::{
    AZURE_WHISPER, AliasResolver, DEFAULT_MODEL, KOTOBA_WHISPER, MODEL_ALIASES, REAZONSPEECH,
};
pub use model_registry::{ModelInfo, ModelRegistry, RegistryError};
pub use response_builder::{TRANSCRIBE_TASK, TranscriptionResponse, build_response};
pub use transcription_service::{TranscriptionService, TranscriptionServiceError};
