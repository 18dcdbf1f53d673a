use speech_gateway::infrastructure::audio::mel_filters;

#[test]
fn given_whisper_parameters_when_building_filters_then_has_expected_shape() {
    let filters = mel_filters(80, 400, 16_000);

    assert_eq!(filters.len(), 80 * 201);
    assert!(filters.iter().all(|w| *w >= 0.0 && w.is_finite()));
}

#[test]
fn given_filterbank_when_inspecting_rows_then_every_band_has_weight() {
    let n_freqs = 201;
    let filters = mel_filters(80, 400, 16_000);

    for band in filters.chunks(n_freqs) {
        assert!(band.iter().any(|w| *w > 0.0));
    }
}

#[test]
fn given_filterbank_when_inspecting_bands_then_peaks_move_up_in_frequency() {
    let n_freqs = 201;
    let filters = mel_filters(80, 400, 16_000);

    let peaks: Vec<usize> = filters
        .chunks(n_freqs)
        .map(|band| {
            band.iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap()
        })
        .collect();

    assert!(peaks.windows(2).all(|w| w[0] <= w[1]));
    assert!(peaks[0] < peaks[79]);
}
