use serial_test::serial;
use temp_env::with_vars;

use super::*;
use crate::SharingMode;

fn cleanup_all_renderpool_env_vars() {
    for (key, _) in std::env::vars() {
        if key.starts_with("RENDERPOOL__") || key == "CONFIG_PATH" {
            std::env::remove_var(&key);
        }
    }
}

fn valid_config() -> RenderPoolConfig {
    let mut config = RenderPoolConfig::default();
    config.source.mapfile = "/etc/maps/osm.xml".to_string();
    config
}

#[test]
#[serial]
fn default_config_should_initialize_with_hardcoded_values() {
    let config = RenderPoolConfig::default();

    assert_eq!(config.pool.max_unused_handles, 10);
    assert_eq!(config.pool.reclaim_slack, 5);
    assert!(config.watcher.enabled);
    assert_eq!(config.watcher.backend, WatchBackend::Poll);
    assert_eq!(config.watcher.poll_interval_ms, 1000);
    assert!(!config.source.reuse_map_objects);
    assert_eq!(config.source.sharing_mode(), SharingMode::Exclusive);
}

#[test]
#[serial]
fn new_should_merge_environment_overrides() {
    cleanup_all_renderpool_env_vars();
    with_vars(
        vec![
            ("RENDERPOOL__POOL__RECLAIM_SLACK", Some("8")),
            ("RENDERPOOL__SOURCE__MAPFILE", Some("/srv/map.xml")),
            ("RENDERPOOL__SOURCE__LAYERS", Some("roads,water")),
        ],
        || {
            let config = RenderPoolConfig::new().unwrap();

            assert_eq!(config.pool.reclaim_slack, 8);
            assert_eq!(config.source.mapfile, "/srv/map.xml");
            assert_eq!(config.source.layers, vec!["roads", "water"]);
        },
    );
}

#[test]
#[serial]
fn with_override_config_should_merge_file_settings() {
    cleanup_all_renderpool_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("override.toml");

    std::fs::write(
        &config_path,
        r#"
        [pool]
        max_unused_handles = 3

        [watcher]
        backend = "native"

        [source]
        mapfile = "/srv/maps/%(webmercator_level)s/style.xml"
        reuse_map_objects = true
        scale_factor = 2.0
        "#,
    )
    .unwrap();

    let empty_vars: Vec<(&str, Option<&str>)> = vec![];
    with_vars(empty_vars, || {
        let base_config = RenderPoolConfig::new().expect("success");
        let config = base_config
            .with_override_config(config_path.to_str().unwrap())
            .expect("override should apply")
            .validate()
            .expect("override should be valid");

        assert_eq!(config.pool.max_unused_handles, 3);
        assert_eq!(config.pool.reclaim_slack, 5);
        assert_eq!(config.watcher.backend, WatchBackend::Native);
        assert_eq!(config.source.sharing_mode(), SharingMode::Shared);
        assert_eq!(config.source.scale_factor, Some(2.0));
    });
}

#[test]
#[serial]
fn environment_variables_should_have_highest_priority() {
    cleanup_all_renderpool_env_vars();
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("renderpool.toml");
    std::fs::write(
        &config_path,
        r#"
        [pool]
        max_unused_handles = 4
        "#,
    )
    .unwrap();

    with_vars(
        vec![
            ("CONFIG_PATH", Some(config_path.to_str().unwrap())),
            ("RENDERPOOL__POOL__MAX_UNUSED_HANDLES", Some("7")),
        ],
        || {
            let config = RenderPoolConfig::new().unwrap();
            assert_eq!(config.pool.max_unused_handles, 7);
        },
    );
}

#[test]
fn validation_should_fail_without_mapfile() {
    let config = RenderPoolConfig::default();
    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_empty_idle_queue() {
    let mut config = valid_config();
    config.pool.max_unused_handles = 0;
    assert!(config.validate().is_err());
}

#[test]
fn validation_should_reject_zero_poll_interval() {
    let mut config = valid_config();
    config.watcher.poll_interval_ms = 0;
    assert!(config.clone().validate().is_err());

    config.watcher.backend = WatchBackend::Native;
    assert!(config.validate().is_ok());
}

#[test]
fn validation_should_check_scale_factor_and_opacity() {
    let mut config = valid_config();
    config.source.scale_factor = Some(0.0);
    assert!(config.clone().validate().is_err());

    config.source.scale_factor = Some(1.5);
    config.source.opacity = Some(1.2);
    assert!(config.clone().validate().is_err());

    config.source.opacity = Some(0.4);
    assert!(config.validate().is_ok());
}
