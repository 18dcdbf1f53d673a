mod backend_descriptor;
mod normalized_audio;
mod response_format;
mod segment;
mod transcription_request;
mod transcription_result;

pub use backend_descriptor::{BackendDescriptor, ComputeDevice};
pub use normalized_audio::{NormalizedAudio, TARGET_SAMPLE_RATE};
pub use response_format::ResponseFormat;
pub use segment::Segment;
pub use transcription_request::{AudioInput, TranscriptionRequest};
pub use transcription_result::{TranscriptionResult, UNKNOWN_LANGUAGE};
