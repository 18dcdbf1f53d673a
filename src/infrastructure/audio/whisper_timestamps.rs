//! Timestamp-token handling for Whisper decoding.
//!
//! In timestamp mode the decoder interleaves text with `<|t.tt|>` tokens in
//! 20 ms steps. A window's output reads like
//! `<|0.00|> a b <|1.20|><|1.20|> c d <|2.50|>`, where a pair of adjacent
//! timestamps closes one phrase and opens the next.

pub const TIMESTAMP_BEGIN_TOKEN: &str = "<|0.00|>";
pub const SECONDS_PER_TIMESTAMP: f64 = 0.02;

/// Latest timestamp allowed as the first generated token, in steps.
const MAX_INITIAL_TIMESTAMP: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct TimedTokens {
    /// Offsets in seconds from the start of the window.
    pub start: f64,
    pub end: f64,
    /// Text and timestamp tokens of the phrase, in decode order.
    pub tokens: Vec<u32>,
}

impl TimedTokens {
    pub fn text_tokens(&self, timestamp_begin: u32) -> Vec<u32> {
        self.tokens
            .iter()
            .copied()
            .filter(|&t| t < timestamp_begin)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSplit {
    pub spans: Vec<TimedTokens>,
    /// Seconds of the window covered by completed phrases. `None` when the
    /// whole window was consumed and the next one starts at its end.
    pub consumed: Option<f64>,
}

pub fn timestamp_offset(token: u32, timestamp_begin: u32) -> f64 {
    token.saturating_sub(timestamp_begin) as f64 * SECONDS_PER_TIMESTAMP
}

/// Splits one window's generated tokens into phrases at timestamp pairs.
///
/// Text after the last completed phrase is dropped and reported through
/// `consumed`, so the caller can decode it again from the next window.
pub fn split_at_timestamps(tokens: &[u32], timestamp_begin: u32, window_secs: f64) -> WindowSplit {
    let is_timestamp = |t: u32| t >= timestamp_begin;
    let len = tokens.len();

    let single_timestamp_ending =
        len >= 2 && !is_timestamp(tokens[len - 2]) && is_timestamp(tokens[len - 1]);

    let mut cuts: Vec<usize> = (1..len)
        .filter(|&i| is_timestamp(tokens[i - 1]) && is_timestamp(tokens[i]))
        .collect();

    if cuts.is_empty() {
        let span = timed_span(tokens, timestamp_begin, window_secs);
        return WindowSplit {
            spans: span.into_iter().collect(),
            consumed: None,
        };
    }

    if single_timestamp_ending {
        cuts.push(len);
    }

    let mut spans = Vec::with_capacity(cuts.len());
    let mut from = 0;
    for &cut in &cuts {
        if let Some(span) = timed_span(&tokens[from..cut], timestamp_begin, window_secs) {
            spans.push(span);
        }
        from = cut;
    }

    let consumed = if single_timestamp_ending {
        None
    } else {
        Some(timestamp_offset(tokens[from - 1], timestamp_begin).min(window_secs))
    };

    WindowSplit { spans, consumed }
}

fn timed_span(slice: &[u32], timestamp_begin: u32, window_secs: f64) -> Option<TimedTokens> {
    if !slice.iter().any(|&t| t < timestamp_begin) {
        return None;
    }

    let start = match slice.first() {
        Some(&t) if t >= timestamp_begin => timestamp_offset(t, timestamp_begin),
        _ => 0.0,
    };
    let end = match slice.last() {
        Some(&t) if t >= timestamp_begin => timestamp_offset(t, timestamp_begin),
        _ => window_secs,
    };

    let start = start.min(window_secs);
    Some(TimedTokens {
        start,
        end: end.clamp(start, window_secs),
        tokens: slice.to_vec(),
    })
}

/// Masks `logits` so greedy decoding produces well-formed timestamp output.
///
/// `generated` holds the tokens sampled so far in this window, without the
/// prompt prefix. Text tokens are those below `eot`.
pub fn apply_timestamp_rules(
    logits: &mut [f32],
    generated: &[u32],
    timestamp_begin: u32,
    no_timestamps: u32,
    eot: u32,
) {
    let ts = (timestamp_begin as usize).min(logits.len());
    let is_timestamp = |t: u32| t >= timestamp_begin;

    if let Some(slot) = logits.get_mut(no_timestamps as usize) {
        *slot = f32::NEG_INFINITY;
    }

    if generated.is_empty() {
        logits[..ts].fill(f32::NEG_INFINITY);
        let last_allowed = (timestamp_begin + MAX_INITIAL_TIMESTAMP + 1) as usize;
        if last_allowed < logits.len() {
            logits[last_allowed..].fill(f32::NEG_INFINITY);
        }
        return;
    }

    let len = generated.len();
    let last_was_timestamp = is_timestamp(generated[len - 1]);
    let penultimate_was_timestamp = len < 2 || is_timestamp(generated[len - 2]);

    if last_was_timestamp {
        if penultimate_was_timestamp {
            logits[ts..].fill(f32::NEG_INFINITY);
        } else {
            logits[..(eot as usize).min(ts)].fill(f32::NEG_INFINITY);
        }
    }

    if let Some(&last_timestamp) = generated.iter().rev().find(|&&t| is_timestamp(t)) {
        let floor = if last_was_timestamp && !penultimate_was_timestamp {
            last_timestamp
        } else {
            last_timestamp + 1
        };
        let floor = (floor as usize).min(logits.len());
        logits[ts..floor].fill(f32::NEG_INFINITY);
    }

    let log_probs = log_softmax(logits);
    let timestamp_mass = log_sum_exp(&log_probs[ts..]);
    let best_text = log_probs[..ts]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if timestamp_mass > best_text {
        logits[..ts].fill(f32::NEG_INFINITY);
    }
}

pub fn log_softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .map(|&l| l as f64)
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![f64::NEG_INFINITY; logits.len()];
    }
    let sum: f64 = logits.iter().map(|&l| (l as f64 - max).exp()).sum();
    let log_sum = sum.ln() + max;
    logits.iter().map(|&l| l as f64 - log_sum).collect()
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
