use serial_test::serial;
use temp_env::with_vars;

use super::*;

fn cleanup_all_confwatch_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("CONFWATCH__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = ConfWatchConfig::default();

    assert_eq!(config.client.endpoints, vec!["http://127.0.0.1:2379".to_string()]);
    assert_eq!(config.client.dial_timeout_ms, 5000);
    assert_eq!(config.client.request_timeout_ms, 5000);
    assert_eq!(config.client.reconcile_interval_ms, 5000);
    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.attempts(), 6);
    assert_eq!(config.watcher.hook_queue_size, 64);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_confwatch_env_vars();
    with_vars(
        vec![
            ("CONFWATCH__CLIENT__REQUEST_TIMEOUT_MS", Some("1500")),
            ("CONFWATCH__WATCHER__HOOK_QUEUE_SIZE", Some("8")),
        ],
        || {
            let config = ConfWatchConfig::new().unwrap();

            assert_eq!(config.client.request_timeout_ms, 1500);
            assert_eq!(config.watcher.hook_queue_size, 8);
        },
    );
}

#[test]
#[serial]
fn new_should_parse_endpoint_list_from_environment() {
    cleanup_all_confwatch_env_vars();
    with_vars(
        vec![(
            "CONFWATCH__CLIENT__ENDPOINTS",
            Some("http://10.0.0.1:2379,http://10.0.0.2:2379"),
        )],
        || {
            let config = ConfWatchConfig::new().unwrap();

            assert_eq!(
                config.client.endpoints,
                vec!["http://10.0.0.1:2379".to_string(), "http://10.0.0.2:2379".to_string()]
            );
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_confwatch_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");

    std::fs::write(
        &config_path,
        r#"
        [client]
        endpoints = ["http://node1:2379", "http://node2:2379"]
        reconcile_interval_ms = 250

        [retry]
        max_retries = 2
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = ConfWatchConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should load");

        assert_eq!(config.client.endpoints.len(), 2);
        assert_eq!(config.client.reconcile_interval_ms, 250);
        // untouched fields keep their defaults
        assert_eq!(config.client.request_timeout_ms, 5000);
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.validate().is_ok());
    });
}

#[test]
#[serial]
fn config_path_should_be_loaded_by_new() {
    cleanup_all_confwatch_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("confwatch.toml");
    std::fs::write(&config_path, "[watcher]\nhook_queue_size = 3\n").unwrap();

    with_vars(vec![("CONFIG_PATH", Some(config_path.to_str().unwrap()))], || {
        let config = ConfWatchConfig::new().unwrap();
        assert_eq!(config.watcher.hook_queue_size, 3);
    });
}

#[test]
fn validation_should_fail_without_endpoints() {
    let mut config = ConfWatchConfig::default();
    config.client.endpoints.clear();

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_fail_with_blank_endpoint() {
    let mut config = ConfWatchConfig::default();
    config.client.endpoints.push("  ".to_string());

    assert!(config.validate().is_err());
}

#[test]
fn validation_should_fail_with_zero_timeouts() {
    let mut config = ConfWatchConfig::default();
    config.client.request_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = ConfWatchConfig::default();
    config.client.reconcile_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = ConfWatchConfig::default();
    config.watcher.hook_queue_size = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validation_should_fail_when_base_delay_exceeds_max_delay() {
    let mut config = ConfWatchConfig::default();
    config.retry.base_delay_ms = 5000;
    config.retry.max_delay_ms = 100;

    assert!(config.validate().is_err());
}

#[test]
fn backoff_delay_should_double_and_cap() {
    let policy = BackoffPolicy {
        max_retries: 5,
        timeout_ms: 100,
        base_delay_ms: 100,
        max_delay_ms: 500,
    };

    assert_eq!(policy.delay_for(0).as_millis(), 100);
    assert_eq!(policy.delay_for(1).as_millis(), 200);
    assert_eq!(policy.delay_for(2).as_millis(), 400);
    assert_eq!(policy.delay_for(3).as_millis(), 500);
    assert_eq!(policy.delay_for(64).as_millis(), 500);
}

#[test]
fn credentials_require_both_fields() {
    let mut config = ClientConfig::default();
    assert!(config.credentials().is_none());

    config.username = Some("root".to_string());
    assert!(config.credentials().is_none());

    config.password = Some("secret".to_string());
    assert_eq!(config.credentials(), Some(("root", "secret")));
}
