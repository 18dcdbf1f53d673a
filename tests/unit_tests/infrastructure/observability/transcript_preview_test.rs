use speech_gateway::infrastructure::observability::transcript_preview;

#[test]
fn given_empty_text_when_previewing_then_returns_empty_marker() {
    assert_eq!(transcript_preview(""), "[EMPTY]");
    assert_eq!(transcript_preview("   "), "[EMPTY]");
}

#[test]
fn given_short_text_when_previewing_then_returns_trimmed_text() {
    assert_eq!(transcript_preview("  こんにちは  "), "こんにちは");
}

#[test]
fn given_long_japanese_text_when_previewing_then_truncates_on_char_boundary() {
    let text = "あ".repeat(150);

    let preview = transcript_preview(&text);

    assert!(preview.starts_with(&"あ".repeat(100)));
    assert!(preview.ends_with("... (150 chars total)"));
    assert!(!preview.starts_with(&"あ".repeat(101)));
}

#[test]
fn given_embedded_credentials_when_previewing_then_they_are_masked() {
    let preview = transcript_preview("use Bearer sk-abc123 and api-key=hunter2 please");

    assert!(preview.contains("Bearer [REDACTED]"));
    assert!(preview.contains("api-key=[REDACTED]"));
    assert!(!preview.contains("sk-abc123"));
    assert!(!preview.contains("hunter2"));
}
