use super::segment::Segment;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Backend-independent outcome of one transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub duration_seconds: f64,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl TranscriptionResult {
    pub fn new(text: &str, duration_seconds: f64, language: Option<&str>) -> Self {
        Self {
            text: text.trim().to_string(),
            duration_seconds,
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or(UNKNOWN_LANGUAGE)
                .to_string(),
            segments: Vec::new(),
        }
    }

    /// Attaches segments in the given order, renumbering their ids from zero.
    pub fn with_segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = segments
            .into_iter()
            .enumerate()
            .map(|(id, segment)| Segment { id, ..segment })
            .collect();
        self
    }
}
