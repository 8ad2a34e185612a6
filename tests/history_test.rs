// ABOUTME: Tests for the persisted sync history
// ABOUTME: Validates the sync predicate, statistics, and load/save behavior on disk
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use tempfile::TempDir;
use wod_sync::constants::{platforms, sync_reasons};
use wod_sync::errors::ErrorCode;
use wod_sync::history::{HistoryStore, PlatformStats};
use wod_sync::models::SyncStatus;

use common::instant;

#[test]
fn test_needs_sync_per_platform() {
    let now = instant(2024, 1, 15, 19, 0);
    let mut history = HistoryStore::new("unused.json");
    assert!(history.needs_sync("101", platforms::STRAVA, false));

    history.record(SyncStatus::failed("101", platforms::STRAVA, "timeout", now));
    assert!(history.needs_sync("101", platforms::STRAVA, false));

    history.record(SyncStatus::uploaded(
        "101",
        platforms::STRAVA,
        Some("9001".to_owned()),
        now,
    ));
    assert!(!history.needs_sync("101", platforms::STRAVA, false));
    assert!(history.needs_sync("101", platforms::GARMIN, false));
    assert!(history.needs_sync("101", platforms::STRAVA, true));
}

#[test]
fn test_skips_count_as_success() {
    let now = instant(2024, 1, 15, 19, 0);
    let mut history = HistoryStore::new("unused.json");
    history.record(SyncStatus::skipped(
        "101",
        platforms::GARMIN,
        Some("555".to_owned()),
        sync_reasons::ALREADY_EXISTS,
        now,
    ));
    history.record(SyncStatus::skipped(
        "102",
        platforms::STRAVA,
        None,
        sync_reasons::DUPLICATE,
        now,
    ));
    assert!(history.has_success("101", platforms::GARMIN));
    assert!(history.has_success("102", platforms::STRAVA));
}

#[test]
fn test_attempts_are_kept_in_order() {
    let mut history = HistoryStore::new("unused.json");
    history.record(SyncStatus::failed(
        "101",
        platforms::STRAVA,
        "first",
        instant(2024, 1, 15, 19, 0),
    ));
    history.record(SyncStatus::uploaded(
        "101",
        platforms::STRAVA,
        None,
        instant(2024, 1, 16, 19, 0),
    ));

    let attempts = history.attempts("101");
    assert_eq!(attempts.len(), 2);
    assert!(!attempts[0].success);
    assert!(attempts[1].success);
    assert!(history.attempts("missing").is_empty());
    assert_eq!(history.len(), 1);
}

#[test]
fn test_stats_per_platform() {
    let now = instant(2024, 1, 15, 19, 0);
    let mut history = HistoryStore::new("unused.json");
    history.record(SyncStatus::failed("1", platforms::STRAVA, "boom", now));
    history.record(SyncStatus::uploaded("1", platforms::STRAVA, None, now));
    history.record(SyncStatus::uploaded("2", platforms::STRAVA, None, now));
    history.record(SyncStatus::skipped(
        "2",
        platforms::GARMIN,
        None,
        sync_reasons::DUPLICATE,
        now,
    ));
    history.record(SyncStatus::failed("3", platforms::GARMIN, "boom", now));

    assert_eq!(
        history.stats(),
        vec![
            PlatformStats {
                platform: platforms::GARMIN.to_owned(),
                synced: 1,
                skipped: 1,
                failed: 1,
            },
            PlatformStats {
                platform: platforms::STRAVA.to_owned(),
                synced: 2,
                skipped: 0,
                failed: 1,
            },
        ]
    );
}

#[tokio::test]
async fn test_missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let history = HistoryStore::load(dir.path().join("sync_history.json"))
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("sync_history.json");
    let now = instant(2024, 1, 15, 19, 0);

    let mut history = HistoryStore::new(&path);
    history.record(SyncStatus::uploaded(
        "101",
        platforms::STRAVA,
        Some("9001".to_owned()),
        now,
    ));
    history.record(SyncStatus::failed("102", platforms::GARMIN, "timeout", now));
    history.save().await.unwrap();

    let reloaded = HistoryStore::load(&path).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.attempts("101"), history.attempts("101"));
    assert_eq!(reloaded.attempts("102"), history.attempts("102"));
    assert!(!path.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn test_history_file_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_history.json");
    tokio::fs::write(
        &path,
        r#"{
  "101": [
    {
      "workout_id": "101",
      "platform": "strava",
      "external_id": "",
      "synced_at": "2024-01-15T19:00:00Z",
      "success": true
    }
  ]
}"#,
    )
    .await
    .unwrap();

    let history = HistoryStore::load(&path).await.unwrap();
    let attempt = &history.attempts("101")[0];
    assert_eq!(attempt.external_id, None);
    assert_eq!(attempt.error_message, None);
    assert!(!history.needs_sync("101", platforms::STRAVA, false));
}

#[tokio::test]
async fn test_corrupt_file_is_a_storage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_history.json");
    tokio::fs::write(&path, "not json").await.unwrap();

    let error = HistoryStore::load(&path).await.unwrap_err();
    assert_eq!(error.code, ErrorCode::StorageError);
}

#[tokio::test]
async fn test_empty_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sync_history.json");
    tokio::fs::write(&path, "  \n").await.unwrap();
    assert!(HistoryStore::load(&path).await.unwrap().is_empty());
}
