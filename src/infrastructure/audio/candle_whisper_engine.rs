use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use candle_core::{D, DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_nn::ops::softmax;
use candle_transformers::models::whisper::{self as m, Config};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::{
    BackendDescriptor, ComputeDevice, NormalizedAudio, Segment, TranscriptionRequest,
    TranscriptionResult,
};

use super::audio_normalizer::AudioNormalizer;
use super::mel_filters::mel_filters;
use super::whisper_languages::{WHISPER_LANGUAGES, language_token};
use super::whisper_timestamps::{
    TIMESTAMP_BEGIN_TOKEN, apply_timestamp_rules, log_softmax, split_at_timestamps,
};

pub const DEFAULT_WHISPER_MODEL: &str = "kotoba-tech/kotoba-whisper-v2.0";

const NO_SPEECH_THRESHOLD: f64 = 0.6;
const LOGPROB_THRESHOLD: f64 = -1.0;
const START_OF_PREV_TOKEN: &str = "<|startofprev|>";

#[derive(Debug, Clone)]
pub struct CandleWhisperOptions {
    /// Hugging Face repository id or a local directory holding
    /// `config.json`, `tokenizer.json` and `model.safetensors`.
    pub model_id: String,
    pub revision: Option<String>,
    pub use_gpu: bool,
    pub cache_dir: Option<PathBuf>,
    pub max_new_tokens: Option<usize>,
    /// Decode with timestamp tokens and split windows into phrases.
    pub timestamps: bool,
}

impl Default for CandleWhisperOptions {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_WHISPER_MODEL.to_string(),
            revision: None,
            use_gpu: false,
            cache_dir: None,
            max_new_tokens: None,
            timestamps: true,
        }
    }
}

/// Whisper running in-process on candle.
///
/// Produces the richest segments of all engines: tokens, average
/// log-probability, compression ratio and no-speech probability per window.
pub struct CandleWhisperEngine {
    session: Arc<WhisperSession>,
    normalizer: Arc<AudioNormalizer>,
    descriptor: BackendDescriptor,
}

struct WhisperSession {
    model: Mutex<m::model::Whisper>,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    dtype: DType,
    mel_filters: Vec<f32>,
    tokens: SpecialTokens,
    suppress_mask: Tensor,
    max_new_tokens: usize,
}

struct SpecialTokens {
    sot: u32,
    transcribe: u32,
    no_timestamps: u32,
    eot: u32,
    no_speech: Option<u32>,
    start_of_prev: Option<u32>,
    timestamp_begin: Option<u32>,
}

struct DecodedWindow {
    text: String,
    tokens: Vec<u32>,
    avg_logprob: f64,
    no_speech_prob: f64,
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl CandleWhisperEngine {
    pub fn new(
        options: CandleWhisperOptions,
        normalizer: Arc<AudioNormalizer>,
    ) -> Result<Self, TranscriptionError> {
        let device = Self::select_device(options.use_gpu);
        let dtype = Self::select_dtype(&device);

        tracing::info!(
            device = ?device,
            dtype = ?dtype,
            model = %options.model_id,
            "Initializing Candle Whisper transcription engine"
        );

        let files = locate_model_files(&options)?;

        let config_contents = std::fs::read_to_string(&files.config)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("read config: {}", e)))?;
        let config: Config = serde_json::from_str(&config_contents)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("parse config: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("tokenizer: {}", e)))?;

        let mut tokens = SpecialTokens::from_tokenizer(&tokenizer)?;
        if !options.timestamps {
            tokens.timestamp_begin = None;
        } else if tokens.timestamp_begin.is_none() {
            tracing::warn!("Tokenizer has no timestamp tokens, decoding whole windows");
        }

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights], dtype, &device)
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("weights: {}", e)))?
        };

        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("model: {}", e)))?;

        let mut mask = vec![0f32; config.vocab_size];
        for &token in &config.suppress_tokens {
            if let Some(slot) = mask.get_mut(token as usize) {
                *slot = f32::NEG_INFINITY;
            }
        }
        let suppress_mask = Tensor::new(mask.as_slice(), &device)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("suppress mask: {}", e)))?;

        let mel_filters = mel_filters(config.num_mel_bins, m::N_FFT, m::SAMPLE_RATE);
        let max_new_tokens = options
            .max_new_tokens
            .unwrap_or(config.max_target_positions / 2);

        let descriptor = BackendDescriptor::new(
            options.model_id.clone(),
            if device.is_cpu() {
                ComputeDevice::Cpu
            } else {
                ComputeDevice::Gpu
            },
            precision_name(dtype),
        );

        tracing::info!("Candle Whisper engine loaded successfully");

        Ok(Self {
            session: Arc::new(WhisperSession {
                model: Mutex::new(model),
                tokenizer,
                config,
                device,
                dtype,
                mel_filters,
                tokens,
                suppress_mask,
                max_new_tokens,
            }),
            normalizer,
            descriptor,
        })
    }

    pub fn select_dtype(device: &Device) -> DType {
        if device.is_cpu() {
            DType::F32
        } else {
            DType::F16
        }
    }

    fn select_device(use_gpu: bool) -> Device {
        if !use_gpu {
            return Device::Cpu;
        }
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
        tracing::warn!("GPU requested but no CUDA or Metal device is available, using CPU");
        Device::Cpu
    }
}

#[async_trait]
impl TranscriptionEngine for CandleWhisperEngine {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let session = Arc::clone(&self.session);
        let normalizer = Arc::clone(&self.normalizer);

        tokio::task::spawn_blocking(move || {
            let audio = normalizer.normalize(&request.audio)?;
            session.transcribe(
                &audio,
                request.language.as_deref(),
                request.prompt.as_deref(),
            )
        })
        .await
        .map_err(|e| TranscriptionError::InferenceFailed(format!("inference worker: {}", e)))?
    }
}

impl WhisperSession {
    fn transcribe(
        &self,
        audio: &NormalizedAudio,
        language: Option<&str>,
        prompt: Option<&str>,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        if audio.is_empty() {
            return Ok(TranscriptionResult::new("", 0.0, language));
        }

        let started = Instant::now();
        let mel = self.log_mel(audio.samples()).map_err(inference_error)?;
        let (_, _, mel_frames) = mel.dims3().map_err(inference_error)?;
        let content_frames = mel_frames.min(audio.samples().len().div_ceil(m::HOP_LENGTH));

        let mut model = self
            .model
            .lock()
            .map_err(|_| TranscriptionError::InferenceFailed("model lock poisoned".to_string()))?;

        let result = self.run(&mut model, &mel, content_frames, language, prompt);
        model.reset_kv_cache();
        let (language, segments) = result.map_err(inference_error)?;

        let text: String = segments.iter().map(|s| s.text.as_str()).collect();

        tracing::info!(
            segments = segments.len(),
            chars = text.chars().count(),
            language = ?language,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Audio transcription completed"
        );

        Ok(
            TranscriptionResult::new(&text, audio.duration_secs(), language.as_deref())
                .with_segments(segments),
        )
    }

    fn run(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
        content_frames: usize,
        language: Option<&str>,
        prompt: Option<&str>,
    ) -> candle_core::Result<(Option<String>, Vec<Segment>)> {
        let (language, language_token) = self.resolve_language(model, mel, language)?;
        let prompt_tokens = self.prompt_tokens(prompt)?;

        let mut seek = 0;
        let mut segments = Vec::new();

        while seek < content_frames {
            let window_size = usize::min(content_frames - seek, m::N_FRAMES);
            let window = mel.narrow(2, seek, window_size)?;
            let window_start = frames_to_secs(seek);
            let window_secs = frames_to_secs(window_size);

            tracing::debug!(seek, start = window_start, window_secs, "Decoding audio window");
            let decoded = self.decode_window(model, &window, language_token, &prompt_tokens)?;
            let window_seek = seek;

            if decoded.no_speech_prob > NO_SPEECH_THRESHOLD && decoded.avg_logprob < LOGPROB_THRESHOLD
            {
                tracing::debug!(
                    seek = window_seek,
                    no_speech_prob = decoded.no_speech_prob,
                    "No speech detected, skipping window"
                );
                seek += window_size;
                continue;
            }

            let Some(timestamp_begin) = self.tokens.timestamp_begin else {
                seek += window_size;
                if !decoded.text.trim().is_empty() {
                    segments.push(Segment {
                        id: segments.len(),
                        seek: window_seek,
                        start: window_start,
                        end: window_start + window_secs,
                        compression_ratio: compression_ratio(&decoded.text),
                        text: decoded.text,
                        tokens: decoded.tokens,
                        temperature: 0.0,
                        avg_logprob: decoded.avg_logprob,
                        no_speech_prob: decoded.no_speech_prob,
                    });
                }
                continue;
            };

            let split = split_at_timestamps(&decoded.tokens, timestamp_begin, window_secs);
            let advance = split
                .consumed
                .map(secs_to_frames)
                .filter(|&frames| frames > 0)
                .map_or(window_size, |frames| frames.min(window_size));
            seek += advance;

            for span in split.spans {
                let text = self
                    .tokenizer
                    .decode(&span.text_tokens(timestamp_begin), true)
                    .map_err(candle_core::Error::msg)?;
                if text.trim().is_empty() {
                    continue;
                }
                segments.push(Segment {
                    id: segments.len(),
                    seek: window_seek,
                    start: window_start + span.start,
                    end: window_start + span.end,
                    compression_ratio: compression_ratio(&text),
                    text,
                    tokens: span.tokens,
                    temperature: 0.0,
                    avg_logprob: decoded.avg_logprob,
                    no_speech_prob: decoded.no_speech_prob,
                });
            }
        }

        Ok((language, segments))
    }

    fn log_mel(&self, samples: &[f32]) -> candle_core::Result<Tensor> {
        let mel = m::audio::pcm_to_mel(&self.config, samples, &self.mel_filters);
        let n_mel = self.config.num_mel_bins;
        let n_frames = mel.len() / n_mel;
        Tensor::from_vec(mel, (1, n_mel, n_frames), &self.device)?.to_dtype(self.dtype)
    }

    /// Uses the hinted language when the vocabulary has a token for it, and
    /// otherwise asks the model which language token is most likely.
    fn resolve_language(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
        hint: Option<&str>,
    ) -> candle_core::Result<(Option<String>, Option<u32>)> {
        if let Some(hint) = hint.map(|h| h.trim().to_lowercase()) {
            if let Some(token) = self.tokenizer.token_to_id(&language_token(&hint)) {
                return Ok((Some(hint), Some(token)));
            }
            tracing::warn!(language = %hint, "Language hint not in model vocabulary, detecting");
        }

        match self.detect_language(model, mel)? {
            Some((code, token)) => Ok((Some(code.to_string()), Some(token))),
            None => Ok((None, None)),
        }
    }

    fn detect_language(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
    ) -> candle_core::Result<Option<(&'static str, u32)>> {
        let candidates: Vec<(&'static str, u32)> = WHISPER_LANGUAGES
            .iter()
            .filter_map(|code| {
                self.tokenizer
                    .token_to_id(&language_token(code))
                    .map(|id| (*code, id))
            })
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let (_, _, frames) = mel.dims3()?;
        let window = mel.narrow(2, 0, usize::min(frames, m::N_FRAMES))?;
        let audio_features = model.encoder.forward(&window, true)?;

        let sot = Tensor::new(&[self.tokens.sot], &self.device)?.unsqueeze(0)?;
        let ys = model.decoder.forward(&sot, &audio_features, true)?;
        let logits = model
            .decoder
            .final_linear(&ys.i(..1)?)?
            .i(0)?
            .i(0)?
            .to_dtype(DType::F32)?;

        let ids: Vec<u32> = candidates.iter().map(|(_, id)| *id).collect();
        let ids = Tensor::new(ids.as_slice(), &self.device)?;
        let probs = softmax(&logits.index_select(&ids, 0)?, D::Minus1)?.to_vec1::<f32>()?;

        let best = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, p)| (candidates[i], *p));

        if let Some(((code, _), prob)) = best {
            tracing::debug!(language = code, probability = prob, "Detected language");
        }
        Ok(best.map(|(candidate, _)| candidate))
    }

    fn prompt_tokens(&self, prompt: Option<&str>) -> candle_core::Result<Vec<u32>> {
        let Some(prompt) = prompt.map(str::trim).filter(|p| !p.is_empty()) else {
            return Ok(Vec::new());
        };
        if self.tokens.start_of_prev.is_none() {
            return Ok(Vec::new());
        }

        let encoding = self
            .tokenizer
            .encode(format!(" {}", prompt), false)
            .map_err(candle_core::Error::msg)?;
        let ids = encoding.get_ids();
        let limit = self.config.max_target_positions / 2 - 1;
        Ok(ids[ids.len().saturating_sub(limit)..].to_vec())
    }

    fn decode_window(
        &self,
        model: &mut m::model::Whisper,
        mel: &Tensor,
        language_token: Option<u32>,
        prompt_tokens: &[u32],
    ) -> candle_core::Result<DecodedWindow> {
        let audio_features = model.encoder.forward(mel, true)?;

        let mut tokens = Vec::with_capacity(prompt_tokens.len() + self.max_new_tokens + 4);
        if let (Some(start_of_prev), false) = (self.tokens.start_of_prev, prompt_tokens.is_empty()) {
            tokens.push(start_of_prev);
            tokens.extend_from_slice(prompt_tokens);
        }
        let sot_index = tokens.len();
        tokens.push(self.tokens.sot);
        if let Some(language_token) = language_token {
            tokens.push(language_token);
        }
        tokens.push(self.tokens.transcribe);
        if self.tokens.timestamp_begin.is_none() {
            tokens.push(self.tokens.no_timestamps);
        }
        let sample_begin = tokens.len();

        let mut sum_logprob = 0f64;
        let mut no_speech_prob = 0f64;

        for i in 0..self.max_new_tokens {
            if tokens.len() >= self.config.max_target_positions {
                break;
            }

            let tokens_t = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
            let ys = model.decoder.forward(&tokens_t, &audio_features, i == 0)?;

            if i == 0 {
                if let Some(no_speech) = self.tokens.no_speech {
                    let logits = model
                        .decoder
                        .final_linear(&ys.i((..1, sot_index..sot_index + 1))?)?
                        .i(0)?
                        .i(0)?
                        .to_dtype(DType::F32)?;
                    no_speech_prob = softmax(&logits, 0)?
                        .i(no_speech as usize)?
                        .to_scalar::<f32>()? as f64;
                }
            }

            let (_, seq_len, _) = ys.dims3()?;
            let mut logits = model
                .decoder
                .final_linear(&ys.i((..1, seq_len - 1..))?)?
                .i(0)?
                .i(0)?
                .to_dtype(DType::F32)?
                .broadcast_add(&self.suppress_mask)?
                .to_vec1::<f32>()?;

            if let Some(timestamp_begin) = self.tokens.timestamp_begin {
                apply_timestamp_rules(
                    &mut logits,
                    &tokens[sample_begin..],
                    timestamp_begin,
                    self.tokens.no_timestamps,
                    self.tokens.eot,
                );
            }

            let Some(next_token) = argmax(&logits) else {
                break;
            };
            if next_token == self.tokens.eot {
                break;
            }

            sum_logprob += log_softmax(&logits)[next_token as usize];
            tokens.push(next_token);
        }

        let generated = tokens[sample_begin..].to_vec();
        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(candle_core::Error::msg)?;
        let avg_logprob = if generated.is_empty() {
            0.0
        } else {
            sum_logprob / generated.len() as f64
        };

        Ok(DecodedWindow {
            text,
            tokens: generated,
            avg_logprob,
            no_speech_prob,
        })
    }
}

impl SpecialTokens {
    fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self, TranscriptionError> {
        Ok(Self {
            sot: token_id(tokenizer, m::SOT_TOKEN)?,
            transcribe: token_id(tokenizer, m::TRANSCRIBE_TOKEN)?,
            no_timestamps: token_id(tokenizer, m::NO_TIMESTAMPS_TOKEN)?,
            eot: token_id(tokenizer, m::EOT_TOKEN)?,
            no_speech: m::NO_SPEECH_TOKENS
                .iter()
                .find_map(|token| tokenizer.token_to_id(token)),
            start_of_prev: tokenizer.token_to_id(START_OF_PREV_TOKEN),
            timestamp_begin: tokenizer.token_to_id(TIMESTAMP_BEGIN_TOKEN),
        })
    }
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32, TranscriptionError> {
    tokenizer.token_to_id(token).ok_or_else(|| {
        TranscriptionError::ModelLoadFailed(format!("token not found: {}", token))
    })
}

fn locate_model_files(options: &CandleWhisperOptions) -> Result<ModelFiles, TranscriptionError> {
    let local = Path::new(&options.model_id);
    if local.is_dir() {
        tracing::info!(path = %local.display(), "Loading Whisper model from local directory");
        return Ok(ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights: local.join("model.safetensors"),
        });
    }

    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(cache_dir) = &options.cache_dir {
        builder = builder.with_cache_dir(cache_dir.clone());
    }
    let api = builder
        .build()
        .map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;

    let repo = match &options.revision {
        Some(revision) => api.repo(Repo::with_revision(
            options.model_id.clone(),
            RepoType::Model,
            revision.clone(),
        )),
        None => api.repo(Repo::new(options.model_id.clone(), RepoType::Model)),
    };

    let fetch = |name: &str| {
        repo.get(name)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", name, e)))
    };

    Ok(ModelFiles {
        config: fetch("config.json")?,
        tokenizer: fetch("tokenizer.json")?,
        weights: fetch("model.safetensors")?,
    })
}

/// Ratio of raw to zlib-compressed text size; high values flag repetition loops.
pub fn compression_ratio(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    if encoder.write_all(text.as_bytes()).is_err() {
        return 0.0;
    }
    match encoder.finish() {
        Ok(compressed) if !compressed.is_empty() => text.len() as f64 / compressed.len() as f64,
        _ => 0.0,
    }
}

pub fn precision_name(dtype: DType) -> &'static str {
    match dtype {
        DType::F16 => "float16",
        DType::BF16 => "bfloat16",
        DType::F64 => "float64",
        _ => "float32",
    }
}

fn argmax(logits: &[f32]) -> Option<u32> {
    logits
        .iter()
        .enumerate()
        .filter(|(_, l)| l.is_finite())
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i as u32)
}

fn frames_to_secs(frames: usize) -> f64 {
    (frames * m::HOP_LENGTH) as f64 / m::SAMPLE_RATE as f64
}

fn secs_to_frames(secs: f64) -> usize {
    (secs * m::SAMPLE_RATE as f64 / m::HOP_LENGTH as f64).round() as usize
}

fn inference_error(e: candle_core::Error) -> TranscriptionError {
    TranscriptionError::InferenceFailed(e.to_string())
}
