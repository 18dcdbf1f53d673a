use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tempfile::NamedTempFile;

use crate::application::ports::{AudioDecoder, DecodeError, DecodedAudio};
use crate::domain::{AudioInput, NormalizedAudio, TARGET_SAMPLE_RATE};

use super::audio_decoder::{FfmpegAudioDecoder, SymphoniaAudioDecoder};
use super::resampler::{downmix, resample};

const UPLOAD_PREFIX: &str = "speech-gateway-";

/// Turns any supported input into 16 kHz mono f32 samples.
///
/// Uploads are staged in a temporary file which is removed when this call
/// returns, whichever decoder ran and whether it failed.
pub struct AudioNormalizer {
    primary: Arc<dyn AudioDecoder>,
    fallback: Arc<dyn AudioDecoder>,
    temp_dir: Option<PathBuf>,
}

impl AudioNormalizer {
    pub fn new(primary: Arc<dyn AudioDecoder>, fallback: Arc<dyn AudioDecoder>) -> Self {
        Self {
            primary,
            fallback,
            temp_dir: None,
        }
    }

    pub fn with_temp_dir(mut self, temp_dir: Option<PathBuf>) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn normalize(&self, input: &AudioInput) -> Result<NormalizedAudio, DecodeError> {
        match input {
            AudioInput::Path(path) => self.normalize_path(path),
            AudioInput::Bytes { data, .. } => {
                let staged = self.stage_upload(data, input.extension().as_deref())?;
                self.normalize_path(staged.path())
            }
        }
    }

    pub fn normalize_path(&self, path: &Path) -> Result<NormalizedAudio, DecodeError> {
        let started = Instant::now();
        let decoded = self.decode_with_fallback(path)?;
        let source_rate = decoded.sample_rate;
        let source_channels = decoded.channels;

        let audio = to_canonical(decoded)?;

        tracing::debug!(
            source_rate,
            source_channels,
            samples = audio.samples().len(),
            duration_secs = audio.duration_secs(),
            decode_ms = started.elapsed().as_millis() as u64,
            "Audio normalized to 16kHz mono PCM"
        );

        Ok(audio)
    }

    fn decode_with_fallback(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        let primary = match self.primary.decode(path) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => e,
        };

        tracing::warn!(
            decoder = self.primary.name(),
            fallback = self.fallback.name(),
            error = %primary,
            "Primary decoder failed, using fallback"
        );

        self.fallback
            .decode(path)
            .map_err(|fallback| DecodeError::Undecodable { primary, fallback })
    }

    fn stage_upload(&self, data: &[u8], extension: Option<&str>) -> std::io::Result<NamedTempFile> {
        let suffix = extension.map(|e| format!(".{}", e)).unwrap_or_default();
        let mut builder = tempfile::Builder::new();
        builder.prefix(UPLOAD_PREFIX).suffix(&suffix);

        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(data)?;
        file.flush()?;
        Ok(file)
    }
}

impl Default for AudioNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(SymphoniaAudioDecoder), Arc::new(FfmpegAudioDecoder))
    }
}

fn to_canonical(decoded: DecodedAudio) -> Result<NormalizedAudio, DecodeError> {
    let mono = if decoded.channels > 1 {
        downmix(&decoded.samples, decoded.channels)
    } else {
        decoded.samples
    };

    let samples = if decoded.sample_rate == TARGET_SAMPLE_RATE {
        mono
    } else {
        resample(&mono, decoded.sample_rate, TARGET_SAMPLE_RATE)?
    };

    Ok(NormalizedAudio::new(samples))
}
