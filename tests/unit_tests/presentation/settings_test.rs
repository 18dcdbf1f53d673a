use std::path::PathBuf;

use speech_gateway::presentation::config::{CliOverrides, Environment, Settings};

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn given_no_sources_when_loading_then_defaults_apply() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_from(dir.path(), Environment::Test, Vec::new()).unwrap();

    assert_eq!(settings.server.port, 8000);
    assert_eq!(settings.server.max_upload_mb, 25);
    assert_eq!(settings.transcription.default_language.as_deref(), Some("ja"));
    assert_eq!(settings.transcription.max_concurrent_inferences, 1);
    assert!(!settings.backends.reazonspeech.enabled);
}

#[test]
fn given_environment_file_when_loading_then_it_overrides_base() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("base.toml"), "[server]\nport = 9000\nhost = \"0.0.0.0\"\n")
        .unwrap();
    std::fs::write(dir.path().join("test.toml"), "[server]\nport = 9100\n").unwrap();

    let settings = Settings::load_from(dir.path(), Environment::Test, Vec::new()).unwrap();

    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.server.host, "0.0.0.0");
}

#[test]
fn given_prefixed_variables_when_loading_then_nested_keys_are_set() {
    let dir = tempfile::tempdir().unwrap();
    let env = vars(&[
        ("APP_SERVER__PORT", "7000"),
        ("APP_BACKENDS__REAZONSPEECH__ENABLED", "true"),
        ("UNRELATED", "x"),
    ]);

    let settings = Settings::load_from(dir.path(), Environment::Test, env).unwrap();

    assert_eq!(settings.server.port, 7000);
    assert!(settings.backends.reazonspeech.enabled);
}

#[test]
fn given_legacy_variables_when_loading_then_they_win_over_prefixed_ones() {
    let dir = tempfile::tempdir().unwrap();
    let env = vars(&[
        ("APP_SERVER__PORT", "7000"),
        ("SERVER_PORT", "7100"),
        ("WHISPER_MODEL", "/models/kotoba"),
        ("USE_GPU", "1"),
        ("MODEL_CACHE_DIR", "/cache"),
    ]);

    let settings = Settings::load_from(dir.path(), Environment::Test, env).unwrap();

    assert_eq!(settings.server.port, 7100);
    assert_eq!(settings.backends.kotoba_whisper.model_id, "/models/kotoba");
    assert!(settings.backends.kotoba_whisper.use_gpu);
    assert_eq!(
        settings.backends.kotoba_whisper.cache_dir,
        Some(PathBuf::from("/cache"))
    );
}

#[test]
fn given_cli_overrides_when_applied_then_they_replace_loaded_values() {
    let mut settings = Settings::default();

    settings.apply_overrides(CliOverrides {
        host: Some("0.0.0.0".to_string()),
        port: Some(8080),
        model: Some("openai/whisper-small".to_string()),
        gpu: true,
    });

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.backends.kotoba_whisper.model_id, "openai/whisper-small");
    assert!(settings.backends.kotoba_whisper.use_gpu);
}
