use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::response_format::ResponseFormat;

/// Audio handed to a backend, either uploaded bytes or a file on disk.
#[derive(Debug, Clone)]
pub enum AudioInput {
    Bytes {
        data: Bytes,
        file_name: Option<String>,
    },
    Path(PathBuf),
}

impl AudioInput {
    pub fn from_upload(data: impl Into<Bytes>, file_name: Option<String>) -> Self {
        AudioInput::Bytes {
            data: data.into(),
            file_name,
        }
    }

    /// Lowercase file extension, used as a container hint.
    pub fn extension(&self) -> Option<String> {
        let path = match self {
            AudioInput::Bytes { file_name, .. } => Path::new(file_name.as_deref()?),
            AudioInput::Path(path) => path.as_path(),
        };
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn file_name(&self) -> Option<&str> {
        match self {
            AudioInput::Bytes { file_name, .. } => file_name.as_deref(),
            AudioInput::Path(path) => path.file_name().and_then(|n| n.to_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: AudioInput,
    pub language: Option<String>,
    pub prompt: Option<String>,
    pub format: ResponseFormat,
}

impl TranscriptionRequest {
    pub fn new(audio: AudioInput) -> Self {
        Self {
            audio,
            language: None,
            prompt: None,
            format: ResponseFormat::default(),
        }
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|l| !l.trim().is_empty());
        self
    }

    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }
}
