mod environment;
mod settings;

pub use environment::{ENVIRONMENT_VAR, Environment};
pub use settings::{
    AzureWhisperSettings, BackendsSettings, CliOverrides, KotobaWhisperSettings, LoggingSettings,
    ReazonSpeechSettings, ServerSettings, Settings, TranscriptionSettings,
};
