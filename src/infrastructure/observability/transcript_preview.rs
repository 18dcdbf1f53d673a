const PREVIEW_CHARS: usize = 100;

const SECRET_MARKERS: [&str; 4] = ["Bearer ", "api-key=", "api_key=", "token="];

/// Short, log-safe rendition of a transcript or prompt.
///
/// Truncates on character boundaries so multi-byte scripts such as Japanese
/// never split mid-codepoint, and masks anything that looks like a credential.
pub fn transcript_preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total = trimmed.chars().count();
    let preview = if total > PREVIEW_CHARS {
        let head: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        format!("{}... ({} chars total)", head, total)
    } else {
        trimmed.to_string()
    };

    mask_secrets(preview)
}

fn mask_secrets(mut text: String) -> String {
    for marker in SECRET_MARKERS {
        let Some(start) = text.find(marker) else {
            continue;
        };
        let value_start = start + marker.len();
        let value_end = text[value_start..]
            .find(|c: char| c.is_whitespace() || matches!(c, '&' | '"' | '\''))
            .map_or(text.len(), |offset| value_start + offset);
        text.replace_range(value_start..value_end, "[REDACTED]");
    }
    text
}
