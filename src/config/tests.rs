//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, serialization/deserialization,
//! and edge cases in configuration handling.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = ClientConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.window.title, "Waysnitch");
    assert_eq!(config.window.default_width, 800);
    assert_eq!(config.window.default_height, 600);
    assert!(!config.window.resize_buffer_on_configure);
    assert_eq!(config.log.capacity, 30);
    assert!(!config.general.debug);
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let original_config = ClientConfig::default();

    let toml_string = toml::to_string(&original_config)?;
    let deserialized_config: ClientConfig = toml::from_str(&toml_string)?;

    assert_eq!(original_config, deserialized_config);

    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("waysnitch.toml");

    let test_config = r#"
[window]
title = "Input Probe"
app_id = "probe"
default_width = 640
default_height = 480
resize_buffer_on_configure = true

[log]
capacity = 12
timestamp_format = "%H:%M:%S"

[general]
debug = true
"#;

    fs::write(&file_path, test_config)?;

    let config = ClientConfig::load(&file_path)?;

    assert_eq!(config.window.title, "Input Probe");
    assert_eq!(config.window.app_id, "probe");
    assert_eq!(config.window.default_width, 640);
    assert_eq!(config.window.default_height, 480);
    assert!(config.window.resize_buffer_on_configure);
    assert_eq!(config.log.capacity, 12);
    assert_eq!(config.log.timestamp_format, "%H:%M:%S");
    assert!(config.general.debug);

    Ok(())
}

#[test]
fn test_partial_file_uses_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("partial.toml");

    fs::write(&file_path, "[window]\ntitle = \"Only Title\"\n")?;

    let config = ClientConfig::load(&file_path)?;

    assert_eq!(config.window.title, "Only Title");
    assert_eq!(config.window.default_width, 800);
    assert_eq!(config.log, EventLogConfig::default());

    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let result = ClientConfig::load(dir.path().join("does-not-exist.toml"));
    assert!(result.is_err());
}

#[test]
fn test_malformed_file_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("broken.toml");
    fs::write(&file_path, "[window\ntitle = ")?;

    assert!(ClientConfig::load(&file_path).is_err());

    Ok(())
}

#[test]
fn test_validation_rejects_zero_size() {
    let mut config = ClientConfig::default();
    config.window.default_width = 0;
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.window.default_height = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_oversized_window() {
    let mut config = ClientConfig::default();
    config.window.default_width = MAX_DIMENSION + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_empty_log_and_title() {
    let mut config = ClientConfig::default();
    config.log.capacity = 0;
    assert!(config.validate().is_err());

    let mut config = ClientConfig::default();
    config.window.title = "   ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validation_rejects_bad_timestamp_format() {
    let mut config = ClientConfig::default();
    config.log.timestamp_format = "%Q".to_string();
    assert!(config.validate().is_err());

    config.log.timestamp_format = "%H:%M:%S".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = ClientConfig::default();
    config.window.title = "Saved".to_string();
    config.log.capacity = 5;
    config.save(&file_path)?;

    let reloaded = ClientConfig::load(&file_path)?;
    assert_eq!(reloaded, config);

    Ok(())
}

#[test]
fn test_merge_partial_overrides_changed_sections() {
    let base = ClientConfig::default();

    let mut partial = ClientConfig::default();
    partial.log.capacity = 10;

    let merged = base.merge_partial(partial);
    assert_eq!(merged.log.capacity, 10);
    assert_eq!(merged.window, WindowConfig::default());
    assert_eq!(merged.general, GeneralConfig::default());
}
