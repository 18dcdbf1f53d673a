use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::application::ports::DecodeError;

const CHUNK_SIZE: usize = 1024;

/// Number of samples a signal of `len` samples has after resampling.
pub fn expected_len(len: usize, from_rate: u32, to_rate: u32) -> usize {
    (len as f64 * to_rate as f64 / from_rate as f64).round() as usize
}

/// Averages interleaved frames into a single channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Sinc resampling of a mono signal.
///
/// The output always has exactly [`expected_len`] samples: the resampler's
/// delay line is flushed and trimmed so the signal stays aligned.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(DecodeError::Resample(format!(
            "invalid sample rate conversion {} -> {}",
            from_rate, to_rate
        )));
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let target_len = expected_len(samples.len(), from_rate, to_rate);

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1)
        .map_err(|e| DecodeError::Resample(format!("resampler init: {}", e)))?;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(target_len + delay + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        let mut input = chunk.to_vec();
        input.resize(CHUNK_SIZE, 0.0);
        process_chunk(&mut resampler, input, &mut output)?;
    }

    while output.len() < target_len + delay {
        process_chunk(&mut resampler, vec![0.0; CHUNK_SIZE], &mut output)?;
    }

    output.drain(..delay);
    output.truncate(target_len);

    Ok(output)
}

fn process_chunk(
    resampler: &mut SincFixedIn<f32>,
    input: Vec<f32>,
    output: &mut Vec<f32>,
) -> Result<(), DecodeError> {
    let result = resampler
        .process(&[input], None)
        .map_err(|e| DecodeError::Resample(format!("resample: {}", e)))?;

    if let Some(channel) = result.first() {
        output.extend_from_slice(channel);
    }
    Ok(())
}
