use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::environment::Environment;

pub const ENV_PREFIX: &str = "APP";
pub const CONFIG_DIR: &str = "config";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub transcription: TranscriptionSettings,
    pub backends: BackendsSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
    /// When set, the `api-key` header must match exactly.
    pub api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_upload_mb: 25,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub enable_json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    pub default_language: Option<String>,
    pub max_concurrent_inferences: usize,
    pub temp_dir: Option<PathBuf>,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            default_language: Some("ja".to_string()),
            max_concurrent_inferences: 1,
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackendsSettings {
    pub kotoba_whisper: KotobaWhisperSettings,
    pub reazonspeech: ReazonSpeechSettings,
    pub azure_whisper: AzureWhisperSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KotobaWhisperSettings {
    pub model_id: String,
    pub revision: Option<String>,
    pub use_gpu: bool,
    pub cache_dir: Option<PathBuf>,
    pub max_new_tokens: Option<usize>,
    pub timestamps: bool,
}

impl Default for KotobaWhisperSettings {
    fn default() -> Self {
        Self {
            model_id: "kotoba-tech/kotoba-whisper-v2.0".to_string(),
            revision: None,
            use_gpu: false,
            cache_dir: None,
            max_new_tokens: None,
            timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReazonSpeechSettings {
    pub enabled: bool,
    pub base_url: String,
    pub model: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ReazonSpeechSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://127.0.0.1:8001/v1".to_string(),
            model: None,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AzureWhisperSettings {
    pub enabled: bool,
    pub base_url: String,
    pub deployment: String,
    pub api_key: Option<String>,
    pub api_version: String,
    pub request_timeout_secs: u64,
}

impl Default for AzureWhisperSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            deployment: "whisper".to_string(),
            api_key: None,
            api_version: "2024-06-01".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Command-line values that take precedence over every other source.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
    pub gpu: bool,
}

impl Settings {
    pub fn load(environment: Environment) -> Result<Self, config::ConfigError> {
        Self::load_from(Path::new(CONFIG_DIR), environment, std::env::vars())
    }

    /// Layers `base`, then `{environment}` files from `config_dir`, then
    /// `APP_*` variables (`__` between sections), then the legacy variables
    /// `WHISPER_MODEL`, `USE_GPU`, `MODEL_CACHE_DIR` and `SERVER_PORT`.
    pub fn load_from(
        config_dir: &Path,
        environment: Environment,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, config::ConfigError> {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let prefixed: config::Map<String, String> = vars
            .iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .cloned()
            .collect();

        let mut builder = config::Config::builder()
            .add_source(config::File::from(config_dir.join("base")).required(false))
            .add_source(
                config::File::from(config_dir.join(environment.as_str().to_lowercase()))
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(prefixed)),
            );

        for (key, value) in legacy_overrides(&vars) {
            builder = builder.set_override(key, value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(model) = overrides.model {
            self.backends.kotoba_whisper.model_id = model;
        }
        if overrides.gpu {
            self.backends.kotoba_whisper.use_gpu = true;
        }
    }
}

fn legacy_overrides(vars: &[(String, String)]) -> Vec<(&'static str, String)> {
    vars.iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .filter_map(|(key, value)| {
            let value = value.trim();
            match key.as_str() {
                "WHISPER_MODEL" => Some(("backends.kotoba_whisper.model_id", value.to_string())),
                "USE_GPU" => Some((
                    "backends.kotoba_whisper.use_gpu",
                    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes").to_string(),
                )),
                "MODEL_CACHE_DIR" => Some(("backends.kotoba_whisper.cache_dir", value.to_string())),
                "SERVER_PORT" => Some(("server.port", value.to_string())),
                _ => None,
            }
        })
        .collect()
}

