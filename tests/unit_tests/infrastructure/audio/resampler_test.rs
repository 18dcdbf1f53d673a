use speech_gateway::application::ports::DecodeError;
use speech_gateway::infrastructure::audio::{downmix, expected_len, resample};

#[test]
fn given_rates_when_computing_expected_len_then_rounds_to_nearest() {
    assert_eq!(expected_len(44_100, 44_100, 16_000), 16_000);
    assert_eq!(expected_len(7, 22_050, 16_000), 5);
    assert_eq!(expected_len(3, 48_000, 16_000), 1);
}

#[test]
fn given_downsampling_when_resampling_then_output_has_exact_length() {
    let input: Vec<f32> = (0..10_001).map(|i| (i as f32 * 0.01).sin()).collect();

    let output = resample(&input, 44_100, 16_000).unwrap();

    assert_eq!(output.len(), expected_len(10_001, 44_100, 16_000));
}

#[test]
fn given_upsampling_when_resampling_then_output_has_exact_length() {
    let input = vec![0.2f32; 1234];

    let output = resample(&input, 8_000, 16_000).unwrap();

    assert_eq!(output.len(), 2468);
}

#[test]
fn given_constant_signal_when_resampling_then_level_is_preserved_mid_stream() {
    let input = vec![0.5f32; 48_000];

    let output = resample(&input, 48_000, 16_000).unwrap();

    let middle = output[output.len() / 2];
    assert!((middle - 0.5).abs() < 0.02, "middle sample was {}", middle);
}

#[test]
fn given_empty_input_when_resampling_then_returns_empty() {
    assert!(resample(&[], 44_100, 16_000).unwrap().is_empty());
}

#[test]
fn given_zero_rate_when_resampling_then_returns_error() {
    assert!(matches!(
        resample(&[0.1], 0, 16_000),
        Err(DecodeError::Resample(_))
    ));
}

#[test]
fn given_interleaved_channels_when_downmixing_then_averages_frames() {
    assert_eq!(downmix(&[0.25, 0.75, 1.0, 0.0], 2), vec![0.5, 0.5]);
    assert_eq!(downmix(&[0.1, 0.2], 1), vec![0.1, 0.2]);
}
