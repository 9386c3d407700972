// Logging configuration unit tests

use markit::config::Config;
use markit::logging::{LogFormat, LoggingConfig};

#[test]
fn test_logging_section_is_optional() {
    let config = Config::from_yaml_with_env("font_path: /tmp/font.ttf").unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn test_invalid_level_fails_config_validation() {
    let config = Config::from_yaml_with_env("logging:\n  level: chatty\n").unwrap();
    assert!(config.validate().unwrap_err().contains("chatty"));
}

#[test]
fn test_unknown_format_rejected() {
    let result: Result<LoggingConfig, _> = serde_yaml::from_str("format: xml");
    assert!(result.is_err());
}
