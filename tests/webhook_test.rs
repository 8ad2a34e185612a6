// ABOUTME: Tests for the webhook HTTP routes that trigger syncs and report their results
// ABOUTME: Drives the router in-process with oneshot requests against scripted sync jobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;
use wod_sync::errors::{AppError, AppResult};
use wod_sync::routes::{self, SyncJob, WebhookContext, AUTH_TOKEN_HEADER};
use wod_sync::sync::SyncSummary;

use common::init_test_logging;

/// Job returning a fixed summary and recording the requested days
struct RecordingJob {
    fail: bool,
    days: Mutex<Vec<u32>>,
}

impl RecordingJob {
    fn new() -> Self {
        Self {
            fail: false,
            days: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn days(&self) -> Vec<u32> {
        self.days.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncJob for RecordingJob {
    async fn run(&self, days: u32) -> AppResult<SyncSummary> {
        self.days.lock().unwrap().push(days);
        if self.fail {
            return Err(AppError::external_auth("strava", "refresh token revoked"));
        }
        Ok(SyncSummary {
            uploaded: 2,
            skipped: 1,
            ..SyncSummary::default()
        })
    }
}

/// Job that holds the sync lock until released
struct BlockingJob {
    started: Notify,
    release: Notify,
}

impl BlockingJob {
    fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl SyncJob for BlockingJob {
    async fn run(&self, _days: u32) -> AppResult<SyncSummary> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(SyncSummary::default())
    }
}

fn app(job: Arc<dyn SyncJob>, token: Option<&str>) -> Router {
    init_test_logging();
    routes::router(WebhookContext::new(job, token.map(str::to_owned)).with_default_days(3))
}

fn request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTH_TOKEN_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let app = app(Arc::new(RecordingJob::new()), Some("secret"));
    let (status, body) = send(&app, request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "wod-sync");
    assert!(body["time"].is_string());
}

#[tokio::test]
async fn test_sync_requires_token() {
    let job = Arc::new(RecordingJob::new());
    let app = app(job.clone(), Some("secret"));

    let (status, body) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(&app, request(Method::POST, "/sync", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(job.days().is_empty());
}

#[tokio::test]
async fn test_sync_with_header_token() {
    let job = Arc::new(RecordingJob::new());
    let app = app(job.clone(), Some("secret"));

    let (status, body) = send(&app, request(Method::POST, "/sync", Some("secret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["uploaded"], 2);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["errors"], 0);
    assert_eq!(body["message"], "Uploaded 2, skipped 1, errors 0");
    assert!(body["duration"].as_str().unwrap().ends_with('s'));
    assert_eq!(job.days(), [3]);
}

#[tokio::test]
async fn test_sync_with_query_token_and_days() {
    let job = Arc::new(RecordingJob::new());
    let app = app(job.clone(), Some("secret"));

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/sync?token=secret&days=14", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job.days(), [14]);
}

#[tokio::test]
async fn test_open_webhook_without_token() {
    let job = Arc::new(RecordingJob::new());
    let app = app(job.clone(), Some(""));
    let (status, _) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_sync_reports_error() {
    let app = app(Arc::new(RecordingJob::failing()), None);
    let (status, body) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"], 1);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("refresh token revoked"));
}

#[tokio::test]
async fn test_concurrent_trigger_conflicts() {
    let job = Arc::new(BlockingJob::new());
    let app = app(job.clone(), None);

    let first = tokio::spawn({
        let app = app.clone();
        async move { send(&app, request(Method::POST, "/sync", None)).await }
    });
    job.started.notified().await;

    let (status, body) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "sync already in progress");

    job.release.notify_one();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_reports_last_sync() {
    let app = app(Arc::new(RecordingJob::new()), None);

    let (status, body) = send(&app, request(Method::GET, "/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "no_sync_yet");

    send(&app, request(Method::POST, "/sync", None)).await;

    let (_, body) = send(&app, request(Method::GET, "/api/status", None)).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["last_sync"]["uploaded"], 2);
    assert!(body["last_sync"]["completed_at"].is_string());
}

#[tokio::test]
async fn test_disconnected_trigger_still_records_result() {
    let job = Arc::new(BlockingJob::new());
    let app = app(job.clone(), None);

    let trigger = tokio::spawn({
        let app = app.clone();
        async move { send(&app, request(Method::POST, "/sync", None)).await }
    });
    job.started.notified().await;
    trigger.abort();
    assert!(trigger.await.unwrap_err().is_cancelled());

    let (status, _) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    job.release.notify_one();
    let mut body = Value::Null;
    for _ in 0..100 {
        body = send(&app, request(Method::GET, "/status", None)).await.1;
        if body["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(body["status"], "completed");
    assert_eq!(body["last_sync"]["success"], true);

    job.release.notify_one();
    let (status, _) = send(&app, request(Method::POST, "/sync", None)).await;
    assert_eq!(status, StatusCode::OK);
}
