use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::domain::NormalizedAudio;

/// Encodes normalized audio as a 16-bit PCM mono WAV file in memory.
pub fn encode_wav_pcm16(audio: &NormalizedAudio) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: audio.channels(),
        sample_rate: audio.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + audio.samples().len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in audio.samples() {
            let scaled = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(scaled)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
