mod audio_decoder;
mod transcription_engine;

pub use audio_decoder::{AudioDecoder, AudioDecoderError, DecodeError, DecodedAudio};
pub use transcription_engine::{TranscriptionEngine, TranscriptionError};
