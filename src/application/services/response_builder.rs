use serde::Serialize;

use crate::domain::{ResponseFormat, Segment, TranscriptionResult};

pub const TRANSCRIBE_TASK: &str = "transcribe";

/// Envelope returned to the caller, shaped by the requested format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TranscriptionResponse {
    Terse {
        text: String,
    },
    Verbose {
        task: &'static str,
        language: String,
        duration: f64,
        text: String,
        segments: Vec<Segment>,
    },
}

impl TranscriptionResponse {
    pub fn text(&self) -> &str {
        match self {
            TranscriptionResponse::Terse { text } => text,
            TranscriptionResponse::Verbose { text, .. } => text,
        }
    }
}

pub fn build_response(result: &TranscriptionResult, format: ResponseFormat) -> TranscriptionResponse {
    let text = result.text.trim().to_string();

    match format {
        ResponseFormat::Json => TranscriptionResponse::Terse { text },
        ResponseFormat::VerboseJson => TranscriptionResponse::Verbose {
            task: TRANSCRIBE_TASK,
            language: result.language.clone(),
            duration: result.duration_seconds,
            text,
            segments: result
                .segments
                .iter()
                .map(|segment| Segment {
                    text: segment.text.trim().to_string(),
                    ..segment.clone()
                })
                .collect(),
        },
    }
}
