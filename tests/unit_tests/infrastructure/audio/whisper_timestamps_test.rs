use speech_gateway::infrastructure::audio::{apply_timestamp_rules, split_at_timestamps};

const TS: u32 = 50364;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn given_timestamp_pairs_when_splitting_then_each_phrase_gets_its_own_span() {
    let tokens = [TS, 100, 101, TS + 60, TS + 60, 102, TS + 125];

    let split = split_at_timestamps(&tokens, TS, 30.0);

    assert_eq!(split.spans.len(), 2);
    assert!(close(split.spans[0].start, 0.0));
    assert!(close(split.spans[0].end, 1.2));
    assert_eq!(split.spans[0].tokens, vec![TS, 100, 101, TS + 60]);
    assert!(close(split.spans[1].start, 1.2));
    assert!(close(split.spans[1].end, 2.5));
    assert_eq!(split.spans[1].text_tokens(TS), vec![102]);
    assert_eq!(split.consumed, None);
}

#[test]
fn given_unfinished_trailing_phrase_when_splitting_then_seeks_to_last_completed_timestamp() {
    let tokens = [TS, 100, TS + 50, TS + 50, 101, 102];

    let split = split_at_timestamps(&tokens, TS, 30.0);

    assert_eq!(split.spans.len(), 1);
    assert_eq!(split.spans[0].text_tokens(TS), vec![100]);
    assert!(close(split.consumed.unwrap(), 1.0));
}

#[test]
fn given_single_phrase_when_splitting_then_uses_its_timestamps() {
    let split = split_at_timestamps(&[TS + 10, 100, 101, TS + 75], TS, 30.0);

    assert_eq!(split.spans.len(), 1);
    assert!(close(split.spans[0].start, 0.2));
    assert!(close(split.spans[0].end, 1.5));
    assert_eq!(split.consumed, None);
}

#[test]
fn given_text_without_timestamps_when_splitting_then_spans_whole_window() {
    let split = split_at_timestamps(&[100, 101], TS, 12.5);

    assert_eq!(split.spans.len(), 1);
    assert!(close(split.spans[0].start, 0.0));
    assert!(close(split.spans[0].end, 12.5));
}

#[test]
fn given_only_timestamps_when_splitting_then_has_no_spans() {
    assert!(split_at_timestamps(&[TS, TS + 5], TS, 30.0).spans.is_empty());
    assert!(split_at_timestamps(&[], TS, 30.0).spans.is_empty());
}

#[test]
fn given_timestamp_beyond_window_when_splitting_then_end_is_clamped() {
    let split = split_at_timestamps(&[TS, 100, TS + 1000], TS, 4.0);

    assert!(close(split.spans[0].end, 4.0));
}

mod rules {
    use super::apply_timestamp_rules;

    const TS: u32 = 10;
    const EOT: u32 = 5;
    const NO_TIMESTAMPS: u32 = 9;
    const VOCAB: usize = 80;

    fn flat() -> Vec<f32> {
        vec![0.0; VOCAB]
    }

    #[test]
    fn given_first_step_when_masking_then_only_early_timestamps_remain() {
        let mut logits = flat();

        apply_timestamp_rules(&mut logits, &[], TS, NO_TIMESTAMPS, EOT);

        assert!(logits[..TS as usize].iter().all(|l| l.is_infinite()));
        assert!(logits[TS as usize..=60].iter().all(|l| l.is_finite()));
        assert!(logits[61..].iter().all(|l| l.is_infinite()));
    }

    #[test]
    fn given_closing_timestamp_when_masking_then_next_must_be_timestamp_not_earlier() {
        let mut logits = flat();

        apply_timestamp_rules(&mut logits, &[TS, 3, 20], TS, NO_TIMESTAMPS, EOT);

        assert!(logits[3].is_infinite());
        assert!(logits[19].is_infinite());
        assert!(logits[20].is_finite());
        assert!(logits[NO_TIMESTAMPS as usize].is_infinite());
    }

    #[test]
    fn given_timestamp_pair_when_masking_then_next_must_be_text() {
        let mut logits = flat();

        apply_timestamp_rules(&mut logits, &[TS, 3, 20, 20], TS, NO_TIMESTAMPS, EOT);

        assert!(logits[TS as usize..].iter().all(|l| l.is_infinite()));
        assert!(logits[3].is_finite());
    }

    #[test]
    fn given_dominant_timestamp_mass_when_masking_then_text_is_suppressed() {
        let mut logits = flat();
        logits[30] = 10.0;

        apply_timestamp_rules(&mut logits, &[TS, 3], TS, NO_TIMESTAMPS, EOT);

        assert!(logits[3].is_infinite());
        assert!(logits[TS as usize].is_infinite());
        assert!(logits[30].is_finite());
    }
}
