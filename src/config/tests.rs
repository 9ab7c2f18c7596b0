use std::fs;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

use super::{DeliveryMode, Settings, load_config_from};
use crate::broker::{DeliveryPolicy, ReregisterPolicy, ShutdownPolicy};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.broker.input_capacity, 100);
    assert_eq!(settings.broker.delivery_capacity, 100);
    assert_eq!(settings.broker.delivery_policy, DeliveryMode::Block);
    assert_eq!(settings.broker.reregister, ReregisterPolicy::Ignore);
    assert_eq!(settings.broker.shutdown, ShutdownPolicy::Discard);
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn test_default_broker_config() {
    let config = Settings::default().broker.broker_config();
    assert_eq!(config, crate::broker::BrokerConfig::default());
}

#[test]
fn test_timeout_mode_uses_timeout_ms() {
    let mut settings = Settings::default();
    settings.broker.delivery_policy = DeliveryMode::Timeout;
    settings.broker.delivery_timeout_ms = 40;
    assert_eq!(
        settings.broker.delivery_policy(),
        DeliveryPolicy::Timeout(Duration::from_millis(40))
    );

    settings.broker.delivery_policy = DeliveryMode::DropNewest;
    assert_eq!(settings.broker.delivery_policy(), DeliveryPolicy::DropNewest);
}

#[test]
#[serial]
fn load_config_without_sources_returns_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let missing = tmp.path().join("nope");

    let cfg = load_config_from(missing.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg, Settings::default());
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("chatcore.toml");
    let toml = r#"
        [broker]
        input_capacity = 10
        delivery_policy = "timeout"
        delivery_timeout_ms = 75
        reregister = "replace"
        shutdown = "drain"

        [logging]
        level = "debug"
    "#;
    fs::write(&path, toml).expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.broker.input_capacity, 10);
    // not in the file
    assert_eq!(cfg.broker.delivery_capacity, 100);
    assert_eq!(cfg.broker.delivery_policy, DeliveryMode::Timeout);
    assert_eq!(cfg.broker.delivery_timeout_ms, 75);
    assert_eq!(cfg.broker.reregister, ReregisterPolicy::Replace);
    assert_eq!(cfg.broker.shutdown, ShutdownPolicy::Drain);
    assert_eq!(cfg.logging.level, "debug");
}

#[test]
#[serial]
fn load_config_env_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("chatcore.toml");
    fs::write(&path, "[broker]\ninput_capacity = 10\n").expect("write config file");

    temp_env::with_vars(
        [
            ("CHATCORE__BROKER__INPUT_CAPACITY", Some("7")),
            ("CHATCORE__BROKER__REREGISTER", Some("reject")),
        ],
        || {
            let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.broker.input_capacity, 7);
            assert_eq!(cfg.broker.reregister, ReregisterPolicy::Reject);
        },
    );
}

#[test]
#[serial]
fn load_config_rejects_unknown_policy() {
    temp_env::with_var("CHATCORE__BROKER__SHUTDOWN", Some("flush"), || {
        assert!(load_config_from("does/not/exist").is_err());
    });
}
