//! Unit tests for configuration loading and saving.

use ridebridge::sensors::types::DataSourceKind;
use ridebridge::storage::config::{load_config_from, save_config_to, BridgeConfig, ConfigError};
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, BridgeConfig::default());
}

#[test]
fn test_save_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = BridgeConfig::default();
    config.source.kind = DataSourceKind::KeiserBle;
    config.source.target_address = "C1:02:03:04:05:06".parse().unwrap();
    config.timing.inactivity_timeout_ms = 45000;
    config.device.name = "Garage Bike".to_string();

    save_config_to(&path, &config).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("keiser_ble"));
    assert!(text.contains("C1:02:03:04:05:06"));

    assert_eq!(load_config_from(&path).unwrap(), config);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[source\nkind = 3").unwrap();

    assert!(matches!(
        load_config_from(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[timing]\ncheck_ms = 0\n").unwrap();

    assert!(matches!(load_config_from(&path), Err(ConfigError::Invalid(_))));
}
