use speech_gateway::presentation::config::Environment;

#[test]
fn given_known_names_when_parsing_environment_then_case_is_ignored() {
    assert_eq!(Environment::try_from("LOCAL".to_string()), Ok(Environment::Local));
    assert_eq!(Environment::try_from("production".to_string()), Ok(Environment::Prod));
    assert_eq!(Environment::try_from("test".to_string()), Ok(Environment::Test));
}

#[test]
fn given_unknown_name_when_parsing_environment_then_returns_error() {
    assert!(Environment::try_from("staging".to_string()).is_err());
}
