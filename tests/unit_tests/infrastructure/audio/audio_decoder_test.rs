use std::io::Write;

use speech_gateway::application::ports::{AudioDecoder, AudioDecoderError};
use speech_gateway::infrastructure::audio::{
    FfmpegAudioDecoder, SymphoniaAudioDecoder, check_ffmpeg_binary,
};

use crate::fixtures::{build_wav, ffmpeg_available, sine};

fn write_temp(bytes: &[u8], suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn given_stereo_wav_when_decoding_with_symphonia_then_keeps_native_layout() {
    let samples: Vec<i16> = sine(44_100, 440.0, 4410)
        .into_iter()
        .flat_map(|s| [s, s])
        .collect();
    let file = write_temp(&build_wav(44_100, 2, &samples), ".wav");

    let decoded = SymphoniaAudioDecoder.decode(file.path()).unwrap();

    assert_eq!(decoded.sample_rate, 44_100);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.samples.len(), 8820);
}

#[test]
fn given_wav_without_samples_when_decoding_with_symphonia_then_returns_empty_audio() {
    let file = write_temp(&build_wav(16_000, 1, &[]), ".wav");

    let decoded = SymphoniaAudioDecoder.decode(file.path()).unwrap();

    assert!(decoded.samples.is_empty());
    assert_eq!(decoded.sample_rate, 16_000);
}

#[test]
fn given_garbage_bytes_when_decoding_with_symphonia_then_returns_decoding_error() {
    let file = write_temp(&[0xFFu8; 128], ".bin");

    let result = SymphoniaAudioDecoder.decode(file.path());

    assert!(matches!(result, Err(AudioDecoderError::DecodingFailed(_))));
}

#[test]
fn given_missing_file_when_decoding_with_symphonia_then_returns_io_error() {
    let result = SymphoniaAudioDecoder.decode(std::path::Path::new("/nonexistent/clip.wav"));

    assert!(matches!(result, Err(AudioDecoderError::Io(_))));
}

#[test]
fn given_wav_at_44100hz_when_decoding_via_ffmpeg_then_outputs_16khz_mono() {
    if !ffmpeg_available() {
        return;
    }

    let file = write_temp(&build_wav(44_100, 2, &vec![0i16; 8820]), ".wav");

    let decoded = FfmpegAudioDecoder.decode(file.path()).unwrap();

    assert_eq!(decoded.sample_rate, 16_000);
    assert_eq!(decoded.channels, 1);
    // 0.1s at 16 kHz
    assert!((1500..=1700).contains(&decoded.samples.len()));
}

#[test]
fn given_corrupted_bytes_when_decoding_via_ffmpeg_then_returns_decoding_error() {
    if !ffmpeg_available() {
        return;
    }

    let file = write_temp(&[0xFFu8; 128], ".bin");

    let result = FfmpegAudioDecoder.decode(file.path());

    assert!(matches!(result, Err(AudioDecoderError::DecodingFailed(_))));
}

#[test]
fn given_ffmpeg_in_path_when_checking_binary_then_returns_ok() {
    if !ffmpeg_available() {
        return;
    }

    assert!(check_ffmpeg_binary().is_ok());
}
