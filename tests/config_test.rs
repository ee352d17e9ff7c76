use lilyrose::config::{LilyConfig, validate};

#[test]
fn defaults_are_valid_and_zero_config() {
    let config = LilyConfig::default();

    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.completion.models.len(), 3);
    assert_eq!(config.completion.timeout_secs, 10);
    assert_eq!(config.classifier.timeout_secs, 5);
    assert_eq!(config.memory.data_path, "data/memory.json");
    assert_eq!(config.memory.remote_timeout_secs, 10);
    assert_eq!(config.persona.assistant_name, "Lily Rose");
    assert_eq!(config.persona.default_user_name, "friend");
    assert_eq!(config.sessions.ttl_secs, 3600);
    assert!(config.completion.api_key.is_none());
    assert!(config.completion.secondary.is_none());

    validate(&config).expect("defaults validate");
}

#[test]
fn partial_toml_overlays_defaults() {
    let config: LilyConfig = toml::from_str(
        r#"
        [gateway]
        port = 9999

        [persona]
        default_user_name = "captain"

        [completion]
        models = ["only/model"]
        "#,
    )
    .expect("parse config");

    assert_eq!(config.gateway.port, 9999);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.persona.default_user_name, "captain");
    assert_eq!(config.persona.assistant_name, "Lily Rose");
    assert_eq!(config.completion.models, vec!["only/model".to_string()]);
    assert_eq!(config.completion.timeout_secs, 10);
}

#[test]
fn secondary_provider_section_parses() {
    let config: LilyConfig = toml::from_str(
        r#"
        [completion.secondary]
        model = "backup/model"
        "#,
    )
    .expect("parse config");

    let secondary = config.completion.secondary.expect("secondary present");
    assert_eq!(secondary.model, "backup/model");
    assert_eq!(secondary.endpoint, "https://api.together.xyz/v1/chat/completions");
    assert!(secondary.api_key.is_none());
}

#[test]
fn validate_rejects_empty_model_list() {
    let mut config = LilyConfig::default();
    config.completion.models.clear();
    let err = validate(&config).expect_err("must fail");
    assert!(err.to_string().contains("completion.models"));
}

#[test]
fn validate_rejects_zero_timeouts() {
    let mut config = LilyConfig::default();
    config.completion.timeout_secs = 0;
    assert!(validate(&config).is_err());

    let mut config = LilyConfig::default();
    config.classifier.timeout_secs = 0;
    assert!(validate(&config).is_err());

    let mut config = LilyConfig::default();
    config.sessions.ttl_secs = 0;
    assert!(validate(&config).is_err());

    let mut config = LilyConfig::default();
    config.memory.remote_timeout_secs = 0;
    assert!(validate(&config).is_err());
}

#[test]
fn validate_rejects_bad_endpoint_urls() {
    let mut config = LilyConfig::default();
    config.completion.endpoint = "not a url".into();
    assert!(validate(&config).is_err());

    let mut config = LilyConfig::default();
    config.memory.remote_url = Some("::nope::".into());
    let err = validate(&config).expect_err("must fail");
    assert!(err.to_string().contains("memory.remote_url"));
}
