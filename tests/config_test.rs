// ABOUTME: Tests for layered configuration loading
// ABOUTME: Covers YAML files, environment overrides, and per-platform credential checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;
use wod_sync::config::AppConfig;
use wod_sync::errors::ErrorCode;

const FULL_CONFIG: &str = r"
aimharder:
  email: athlete@example.com
  password: hunter2
  box_name: crossfitnorte
  box_id: '4112'
strava:
  client_id: '12345'
  client_secret: shh
storage:
  data_dir: /srv/wod-sync
  tcx_dir: /tmp/tcx
sync:
  default_days: 7
  default_duration_minutes: 45
  platforms: [strava, garmin]
  poll_interval_secs: 5
webhook:
  bind: 127.0.0.1:9090
  token: secret
";

fn complete() -> AppConfig {
    AppConfig::from_yaml(FULL_CONFIG).unwrap()
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

#[test]
fn test_full_yaml() {
    let config = complete();
    assert_eq!(config.aimharder.box_id.as_deref(), Some("4112"));
    assert_eq!(config.sync.platforms, targets(&["strava", "garmin"]));
    assert_eq!(config.sync.default_duration(), Duration::from_secs(45 * 60));
    assert_eq!(config.sync.poll_policy().interval, Duration::from_secs(5));
    assert_eq!(config.sync.poll_policy().max_wait, Duration::from_secs(120));
    assert_eq!(config.webhook.default_days, 1);
    assert_eq!(config.webhook.token.as_deref(), Some("secret"));
    assert_eq!(
        config.storage.history_file(),
        PathBuf::from("/srv/wod-sync/sync_history.json")
    );
    assert_eq!(config.storage.tcx_dir(), PathBuf::from("/tmp/tcx"));
}

#[test]
fn test_empty_yaml_is_default() {
    assert_eq!(AppConfig::from_yaml("  \n").unwrap(), AppConfig::default());
}

#[test]
fn test_malformed_yaml() {
    let error = AppConfig::from_yaml("sync: [not, a, map]").unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigInvalid);
}

#[test]
fn test_validate_for_targets() {
    let config = complete();
    config.validate_for(&targets(&["strava", "garmin"])).unwrap();

    let mut no_box = complete();
    no_box.aimharder.box_name = Some("   ".to_owned());
    let error = no_box.validate_for(&[]).unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigMissing);
    assert!(error.message.contains("AIMHARDER_BOX_NAME"));

    let mut no_strava = complete();
    no_strava.strava.client_secret = None;
    no_strava.validate_for(&targets(&["garmin"])).unwrap();
    let error = no_strava.validate_for(&targets(&["strava"])).unwrap_err();
    assert!(error.message.contains("STRAVA_CLIENT_SECRET"));

    let error = config.validate_for(&targets(&["polar"])).unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigInvalid);
    assert!(error.message.contains("polar"));
}

#[test]
fn test_source_settings_carry_account() {
    let source = complete().aimharder_config().unwrap();
    assert_eq!(source.box_name, "crossfitnorte");
    assert_eq!(source.login_url, "https://login.aimharder.com");
    assert!(source.user_id.is_none());

    let error = AppConfig::default().aimharder_config().unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigMissing);
}

#[test]
#[serial]
fn test_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let error = AppConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
    assert_eq!(error.code, ErrorCode::ConfigInvalid);
    assert!(error.message.contains("not found"));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, FULL_CONFIG).unwrap();

    env::set_var("AIMHARDER_PASSWORD", "from-env");
    env::set_var("WOD_SYNC_DATA_DIR", dir.path());
    env::set_var("GARMIN_EMAIL", "");
    let config = AppConfig::load(Some(&path));
    env::remove_var("AIMHARDER_PASSWORD");
    env::remove_var("WOD_SYNC_DATA_DIR");
    env::remove_var("GARMIN_EMAIL");

    let config = config.unwrap();
    assert_eq!(config.aimharder.password.as_deref(), Some("from-env"));
    assert_eq!(config.aimharder.email.as_deref(), Some("athlete@example.com"));
    assert_eq!(
        config.storage.history_file(),
        dir.path().join("sync_history.json")
    );
    assert!(config.garmin.email.is_none());
}
