// ABOUTME: End-to-end tests of one sync batch from raw source pages to saved history
// ABOUTME: Wires the pipeline to scripted source and destination clients in a temporary data dir
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use tempfile::TempDir;
use wod_sync::config::AppConfig;
use wod_sync::constants::platforms;
use wod_sync::errors::ErrorCode;
use wod_sync::models::DateWindow;
use wod_sync::pagination::{ActivityPage, Watermark};
use wod_sync::pipeline::SyncPipeline;
use wod_sync::providers::DestinationClient;
use wod_sync::sync::CancellationToken;

use common::{
    date, fran_record, init_test_logging, instant, plain_record, FakeDestination, FakeSource,
    ManualClock, UploadBehavior,
};

fn pipeline(dir: &TempDir) -> SyncPipeline {
    init_test_logging();
    let mut config = AppConfig::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config.sync.source_page_delay_ms = 0;
    config.aimharder.box_name = Some("Configured Box".to_owned());
    SyncPipeline::new(config).with_clock(Arc::new(ManualClock::new(instant(2024, 1, 20, 8, 0))))
}

fn window() -> DateWindow {
    DateWindow::new(date(2024, 1, 10), date(2024, 1, 20))
}

fn source() -> FakeSource {
    FakeSource::single_page(vec![
        fran_record("101", "20240115183000"),
        plain_record("102", "20240116"),
        plain_record("999", "20231201"),
    ])
}

#[tokio::test]
async fn test_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let strava = Arc::new(FakeDestination::strava(UploadBehavior::Create));
    let destinations: Vec<Arc<dyn DestinationClient>> = vec![strava.clone()];

    let run = pipeline
        .run_with(
            &source(),
            destinations,
            window(),
            pipeline.default_options(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(run.workouts.len(), 2);
    assert_eq!(run.files.len(), 2);
    assert_eq!(run.summary.uploaded, 2);
    assert_eq!(strava.uploads(), ["101", "102"]);
    assert!(run.files[0]
        .path
        .starts_with(dir.path().join("tcx")));
    assert_eq!(run.workouts[1].venue_name, "Configured Box");

    let history = pipeline.load_history().await.unwrap();
    assert!(history.has_success("101", platforms::STRAVA));
    assert!(history.has_success("102", platforms::STRAVA));
    assert_eq!(history.path(), dir.path().join("sync_history.json"));
}

#[tokio::test]
async fn test_rerun_skips_synced_workouts() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let first: Vec<Arc<dyn DestinationClient>> =
        vec![Arc::new(FakeDestination::strava(UploadBehavior::Create))];
    pipeline
        .run_with(&source(), first, window(), pipeline.default_options(), CancellationToken::new())
        .await
        .unwrap();

    let strava = Arc::new(FakeDestination::strava(UploadBehavior::Create));
    let second: Vec<Arc<dyn DestinationClient>> = vec![strava.clone()];
    let run = pipeline
        .run_with(&source(), second, window(), pipeline.default_options(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.summary.uploaded, 0);
    assert_eq!(run.summary.skipped, 2);
    assert!(strava.uploads().is_empty());
}

#[tokio::test]
async fn test_empty_window_does_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let strava = Arc::new(FakeDestination::strava(UploadBehavior::Create));
    let destinations: Vec<Arc<dyn DestinationClient>> = vec![strava.clone()];

    let empty = DateWindow::new(date(2023, 6, 1), date(2023, 6, 30));
    let run = pipeline
        .run_with(&source(), destinations, empty, pipeline.default_options(), CancellationToken::new())
        .await
        .unwrap();

    assert!(run.workouts.is_empty());
    assert_eq!(run.summary.outcomes.len(), 0);
    assert_eq!(strava.auth_calls(), 0);
    assert!(!dir.path().join("sync_history.json").exists());
}

#[tokio::test]
async fn test_source_login_failure() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let source = source().failing_login();

    let error = pipeline
        .fetch_workouts(&source, window(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ExternalAuthFailed);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_cancelled_batch_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let source = source();
    let strava = Arc::new(FakeDestination::strava(UploadBehavior::Create));
    let destinations: Vec<Arc<dyn DestinationClient>> = vec![strava.clone()];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = pipeline
        .run_with(&source, destinations, window(), pipeline.default_options(), cancel)
        .await
        .unwrap();

    assert!(run.summary.cancelled);
    assert!(run.workouts.is_empty());
    assert!(run.files.is_empty());
    assert_eq!(source.calls(), 0);
    assert!(!dir.path().join("tcx").exists());
    assert!(strava.uploads().is_empty());
    assert_eq!(strava.auth_calls(), 0);
    assert!(!dir.path().join("sync_history.json").exists());
}

#[tokio::test]
async fn test_cancel_during_fetch_stops_paging() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);
    let cancel = CancellationToken::new();
    let source = FakeSource::new(vec![
        ActivityPage::new(vec![fran_record("101", "20240115183000")], Watermark::new(300)),
        ActivityPage::new(vec![plain_record("102", "20240116")], Watermark::new(200)),
    ])
    .cancelling_after_first_page(cancel.clone());
    let strava = Arc::new(FakeDestination::strava(UploadBehavior::Create));
    let destinations: Vec<Arc<dyn DestinationClient>> = vec![strava.clone()];

    let run = pipeline
        .run_with(&source, destinations, window(), pipeline.default_options(), cancel)
        .await
        .unwrap();

    assert_eq!(source.calls(), 1);
    assert!(run.summary.cancelled);
    assert_eq!(run.workouts.len(), 1);
    assert!(run.files.is_empty());
    assert!(!dir.path().join("tcx").exists());
    assert!(strava.uploads().is_empty());
}

#[test]
fn test_window_for_days_uses_pipeline_clock() {
    let dir = TempDir::new().unwrap();
    let window = pipeline(&dir).window_for_days(7);
    assert_eq!(window.end, date(2024, 1, 20));
    assert!(window.contains(date(2024, 1, 14)));
}
