use serde::Serialize;

/// One timed span of recognized speech.
///
/// Every field is always present on the wire. Backends that do not expose
/// tokens or decoder statistics leave them at their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Segment {
    pub id: usize,
    pub seek: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<u32>,
    pub temperature: f64,
    pub avg_logprob: f64,
    pub compression_ratio: f64,
    pub no_speech_prob: f64,
}

impl Segment {
    /// A coarse segment carrying only timing and text.
    pub fn span(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end: end.max(start),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}
