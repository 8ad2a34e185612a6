// ABOUTME: Tests for streaming the paginated source activity feed
// ABOUTME: Validates StreamConfig and every way the page loop terminates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};
use wod_sync::pagination::{ActivityPage, Watermark};
use wod_sync::providers::{collect_activities, ActivityStreamExt, StreamConfig};

use common::FakeSource;

fn records(ids: &[u32]) -> Vec<Value> {
    ids.iter().map(|id| json!({ "id": id })).collect()
}

fn page(ids: &[u32], watermark: i64) -> ActivityPage {
    ActivityPage::new(records(ids), Watermark::new(watermark))
}

fn no_delay() -> StreamConfig {
    StreamConfig::with_page_delay(Duration::ZERO)
}

#[test]
fn test_stream_config_default() {
    let config = StreamConfig::default();
    assert_eq!(config.page_delay, Duration::from_millis(500));
    assert!(config.max_pages.is_none());
}

#[test]
fn test_stream_config_builder_chain() {
    let config = StreamConfig::with_page_delay(Duration::from_millis(50)).with_max_pages(3);
    assert_eq!(config.page_delay, Duration::from_millis(50));
    assert_eq!(config.max_pages, Some(3));
}

#[test]
fn test_watermark_progress() {
    let start = Watermark::default();
    assert!(start.is_exhausted());
    assert!(start.advances_to(Watermark::new(1_700_000_000)));
    assert!(!start.advances_to(Watermark::new(0)));
    assert!(!Watermark::new(42).advances_to(Watermark::new(42)));
}

#[tokio::test]
async fn test_exhausted_watermark_fetches_once() {
    let source = FakeSource::new(vec![page(&[1, 2, 3], 0)]).repeating_last_page();
    let all = collect_activities(&source, no_delay()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_walks_advancing_watermarks() {
    let source = FakeSource::new(vec![
        page(&[1, 2], 300),
        page(&[3, 4], 200),
        page(&[5], 0),
    ]);
    let all = collect_activities(&source, no_delay()).await.unwrap();

    let ids: Vec<u64> = all.iter().filter_map(|record| record["id"].as_u64()).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);
    assert_eq!(
        source.cursors(),
        [None, Some(Watermark::new(300)), Some(Watermark::new(200))]
    );
}

#[tokio::test]
async fn test_repeated_watermark_stops() {
    let source = FakeSource::new(vec![page(&[1], 300), page(&[2], 300)]).repeating_last_page();
    let all = collect_activities(&source, no_delay()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_empty_page_stops() {
    let source = FakeSource::new(vec![page(&[1, 2], 300), page(&[], 200), page(&[3], 0)]);
    let all = collect_activities(&source, no_delay()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_empty_feed() {
    let source = FakeSource::new(Vec::new());
    let all = collect_activities(&source, no_delay()).await.unwrap();
    assert!(all.is_empty());
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_max_pages_caps_requests() {
    let source = FakeSource::new(vec![page(&[1], 300), page(&[2], 200), page(&[3], 100)]);
    let all = collect_activities(&source, no_delay().with_max_pages(2))
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let source = FakeSource::new(vec![page(&[1, 2], 300), page(&[3], 0)]);
    let mut stream = source.activities_stream(no_delay());

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first["id"], 1);
    drop(stream);
    assert_eq!(source.calls(), 1);
}
