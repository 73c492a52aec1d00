//! Integration tests for the logging setup
//!
//! - Config builder chaining and defaults
//! - Format selection per build profile
//! - Custom filter strings
//! - Double initialization is rejected

use core_runtime::logging::{init_logging, LogFormat, LoggingConfig, LogLevel};

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}

#[test]
fn test_format_selection() {
    // Debug builds default to Pretty, release builds to JSON
    #[cfg(debug_assertions)]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[cfg(not(debug_assertions))]
    {
        let config = LoggingConfig::default();
        assert_eq!(config.format, LogFormat::Json);
    }
}

#[test]
fn test_filter_configuration() {
    let config = LoggingConfig::default().with_filter("core_resolver=debug,sqlx=warn");

    assert_eq!(
        config.filter,
        Some("core_resolver=debug,sqlx=warn".to_string())
    );
}

#[test]
fn test_level_ordering() {
    assert!(LogLevel::Trace < LogLevel::Debug);
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Warn);
    assert!(LogLevel::Warn < LogLevel::Error);
}

#[test]
fn test_second_initialization_rejected() {
    // Only one test in this binary may install the global subscriber
    let first = init_logging(LoggingConfig::default().with_format(LogFormat::Compact));
    assert!(first.is_ok());

    let second = init_logging(LoggingConfig::default());
    assert!(second.is_err());
}

#[test]
fn test_invalid_filter_rejected() {
    let config = LoggingConfig::default().with_filter("core_resolver=not_a_level");
    // Filter parsing fails before any subscriber is installed
    let result = init_logging(config);
    assert!(result.is_err());
}
