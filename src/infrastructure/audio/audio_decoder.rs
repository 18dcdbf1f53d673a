use std::fs::File;
use std::path::Path;
use std::process::Command;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioDecoder, AudioDecoderError, DecodedAudio};
use crate::domain::TARGET_SAMPLE_RATE;

pub const FFMPEG_BINARY: &str = "ffmpeg";

/// Fast structured decode through symphonia.
///
/// Yields interleaved f32 samples at the file's native rate and channel count.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaAudioDecoder;

impl AudioDecoder for SymphoniaAudioDecoder {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioDecoderError> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioDecoderError::DecodingFailed(format!("probe: {}", e)))?;

        let mut format = probed.format;

        let track = format.default_track().ok_or_else(|| {
            AudioDecoderError::DecodingFailed("no audio track found".to_string())
        })?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let mut sample_rate = codec_params.sample_rate;
        let mut channels = codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioDecoderError::DecodingFailed(format!("codec: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(symphonia::core::errors::Error::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioDecoderError::DecodingFailed(format!("packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    tracing::warn!(error = %e, "Skipping corrupt audio frame");
                    continue;
                }
                Err(e) => {
                    return Err(AudioDecoderError::DecodingFailed(format!("decode: {}", e)));
                }
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count());

            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        let sample_rate = sample_rate.ok_or_else(|| {
            AudioDecoderError::DecodingFailed("unknown sample rate".to_string())
        })?;

        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels: channels.unwrap_or(1).max(1),
        })
    }
}

/// General purpose fallback through the ffmpeg binary.
///
/// ffmpeg demuxes any container it knows, downmixes to mono and resamples to
/// 16 kHz, emitting signed 16-bit PCM which is scaled into [-1, 1].
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegAudioDecoder;

impl AudioDecoder for FfmpegAudioDecoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn decode(&self, path: &Path) -> Result<DecodedAudio, AudioDecoderError> {
        let rate = TARGET_SAMPLE_RATE.to_string();
        let output = Command::new(FFMPEG_BINARY)
            .args(["-nostdin", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-vn", "-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1", "-ar"])
            .arg(&rate)
            .arg("-")
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    AudioDecoderError::BinaryNotFound(FFMPEG_BINARY.to_string())
                }
                _ => AudioDecoderError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioDecoderError::DecodingFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let samples = output
            .stdout
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        Ok(DecodedAudio {
            samples,
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
        })
    }
}

pub fn check_ffmpeg_binary() -> Result<(), AudioDecoderError> {
    let output = Command::new(FFMPEG_BINARY)
        .arg("-version")
        .output()
        .map_err(|_| AudioDecoderError::BinaryNotFound(FFMPEG_BINARY.to_string()))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(AudioDecoderError::BinaryNotFound(FFMPEG_BINARY.to_string()))
    }
}
