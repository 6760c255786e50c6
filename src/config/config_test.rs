use serial_test::serial;
use temp_env::with_vars;

use super::*;

#[test]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = HandoffNodeConfig::default();

    assert_eq!(config.handoff.max_hint_threads, 2);
    assert_eq!(config.handoff.max_hint_ttl_in_secs, u32::MAX);
    assert_eq!(config.handoff.throttle_in_kb, 1024);
    assert_eq!(config.handoff.tombstone_warn_threshold, 1000);
    assert_eq!(config.handoff.sweep_interval_in_secs, 600);
    assert_eq!(config.cluster.ring_delay_in_ms, 30_000);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    with_vars(
        vec![
            ("HANDOFF__HANDOFF__MAX_HINT_THREADS", Some("8")),
            ("HANDOFF__HANDOFF__THROTTLE_IN_KB", Some("0")),
            ("HANDOFF__CLUSTER__RING_DELAY_IN_MS", Some("5000")),
        ],
        || {
            let config = HandoffNodeConfig::new().unwrap();

            assert_eq!(config.handoff.max_hint_threads, 8);
            assert_eq!(config.handoff.throttle_in_kb, 0);
            assert_eq!(config.cluster.ring_delay_in_ms, 5000);
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("handoff_override.toml");

    std::fs::write(
        &config_path,
        r#"
        [cluster]
        db_root_dir = "/tmp/xx/hints"

        [handoff]
        tombstone_warn_threshold = 50
        sweep_interval_in_secs = 30
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = HandoffNodeConfig::new().expect("success");
        let result = base_config.with_override_config(config_path.to_str().unwrap());

        assert!(result.is_ok());
        let config = result.unwrap();

        assert_eq!(config.cluster.db_root_dir.as_os_str().to_str(), Some("/tmp/xx/hints"));
        assert_eq!(config.handoff.tombstone_warn_threshold, 50);
        assert_eq!(config.handoff.sweep_interval_in_secs, 30);
    });
}

#[test]
fn validate_should_reject_zero_hint_threads() {
    let mut config = HandoffNodeConfig::default();
    config.handoff.max_hint_threads = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_should_reject_zero_ring_delay() {
    let mut config = HandoffNodeConfig::default();
    config.cluster.ring_delay_in_ms = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validate_should_reject_zero_ttl_cap() {
    let mut config = HandoffNodeConfig::default();
    config.handoff.max_hint_ttl_in_secs = 0;
    assert!(config.validate().is_err());
}
