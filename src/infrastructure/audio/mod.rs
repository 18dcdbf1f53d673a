mod audio_decoder;
mod audio_normalizer;
mod azure_whisper_engine;
mod candle_whisper_engine;
mod mel_filters;
mod reazonspeech_engine;
mod resampler;
mod transcription_engine_factory;
mod wav_encoder;
mod whisper_languages;
mod whisper_timestamps;

pub use audio_decoder::{FFMPEG_BINARY, FfmpegAudioDecoder, SymphoniaAudioDecoder, check_ffmpeg_binary};
pub use audio_normalizer::AudioNormalizer;
pub use azure_whisper_engine::AzureWhisperEngine;
pub use candle_whisper_engine::{
    CandleWhisperEngine, CandleWhisperOptions, DEFAULT_WHISPER_MODEL, compression_ratio,
    precision_name,
};
pub use mel_filters::mel_filters;
pub use reazonspeech_engine::{DEFAULT_REAZONSPEECH_MODEL, ReazonSpeechEngine};
pub use resampler::{downmix, expected_len, resample};
pub use transcription_engine_factory::TranscriptionEngineFactory;
pub use wav_encoder::encode_wav_pcm16;
pub use whisper_languages::{WHISPER_LANGUAGES, language_token};
pub use whisper_timestamps::{
    SECONDS_PER_TIMESTAMP, TimedTokens, WindowSplit, apply_timestamp_rules, split_at_timestamps,
};
