use std::path::Path;

/// Raw decoder output before normalization.
///
/// `samples` are interleaved when `channels > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

pub trait AudioDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioDecoderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AudioDecoderError {
    #[error("decoding failed: {0}")]
    DecodingFailed(String),
    #[error("decoder binary not available: {0}")]
    BinaryNotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no decoder could read the audio (primary: {primary}; fallback: {fallback})")]
    Undecodable {
        primary: AudioDecoderError,
        fallback: AudioDecoderError,
    },
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}
