// ABOUTME: Shared test utilities and fakes for integration tests
// ABOUTME: Manual clock, scripted source and destination clients, and raw record builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `wod_sync`
//!
//! The fakes record every call so tests can assert on what the sync engine
//! asked of its collaborators without touching the network.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use serde_json::{json, Value};
use wod_sync::constants::platforms;
use wod_sync::models::{Workout, WorkoutResult, WorkoutType};
use wod_sync::pagination::{ActivityPage, Watermark};
use wod_sync::providers::{
    DestinationClient, ProviderError, ProviderResult, RemoteActivity, SourceClient, UploadHandle,
    UploadMetadata, UploadStatus,
};
use wod_sync::sync::{CancellationToken, Clock};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        // TEST_LOG controls the level, WARN keeps test output quiet by default
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when something sleeps on it
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::from_std(duration).unwrap();
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

// ============================================================================
// Source
// ============================================================================

/// Source serving scripted pages in order
pub struct FakeSource {
    pages: Vec<ActivityPage>,
    repeat_last: bool,
    login_fails: bool,
    cancel_after_first_page: Option<CancellationToken>,
    calls: AtomicUsize,
    cursors: Mutex<Vec<Option<Watermark>>>,
}

impl FakeSource {
    pub fn new(pages: Vec<ActivityPage>) -> Self {
        Self {
            pages,
            repeat_last: false,
            login_fails: false,
            cancel_after_first_page: None,
            calls: AtomicUsize::new(0),
            cursors: Mutex::new(Vec::new()),
        }
    }

    /// One page with `records` and an exhausted watermark
    pub fn single_page(records: Vec<Value>) -> Self {
        Self::new(vec![ActivityPage::new(records, Watermark::default())])
    }

    /// Keep serving the last page forever instead of running dry
    pub fn repeating_last_page(mut self) -> Self {
        self.repeat_last = true;
        self
    }

    pub fn failing_login(mut self) -> Self {
        self.login_fails = true;
        self
    }

    /// Cancel `token` once the first page has been served
    pub fn cancelling_after_first_page(mut self, token: CancellationToken) -> Self {
        self.cancel_after_first_page = Some(token);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cursors(&self) -> Vec<Option<Watermark>> {
        self.cursors.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceClient for FakeSource {
    fn name(&self) -> &'static str {
        platforms::AIMHARDER
    }

    async fn login(&self) -> ProviderResult<()> {
        if self.login_fails {
            return Err(ProviderError::auth(platforms::AIMHARDER, "bad credentials"));
        }
        Ok(())
    }

    async fn fetch_activities_page(
        &self,
        cursor: Option<Watermark>,
    ) -> ProviderResult<ActivityPage> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.cursors.lock().unwrap().push(cursor);
        if index == 0 {
            if let Some(token) = &self.cancel_after_first_page {
                token.cancel();
            }
        }
        let page = self.pages.get(index).or_else(|| {
            if self.repeat_last {
                self.pages.last()
            } else {
                None
            }
        });
        Ok(page.cloned().unwrap_or_default())
    }
}

// ============================================================================
// Destination
// ============================================================================

/// How a fake destination answers uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadBehavior {
    /// Accept, then report a created activity on the first poll
    Create,
    /// Reject synchronously as a duplicate
    Duplicate,
    /// Fail the upload request
    Fail,
    /// Accept, then never finish processing
    NeverFinish,
}

/// Destination that records every call
pub struct FakeDestination {
    platform: &'static str,
    pacing: Duration,
    behavior: UploadBehavior,
    remote: Vec<RemoteActivity>,
    list_fails: bool,
    auth_fails: bool,
    cancel_on_upload: Option<CancellationToken>,
    uploads: Mutex<Vec<String>>,
    list_ranges: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    auth_calls: AtomicUsize,
    polls: AtomicUsize,
}

impl FakeDestination {
    pub fn new(platform: &'static str, behavior: UploadBehavior) -> Self {
        Self {
            platform,
            pacing: Duration::from_millis(500),
            behavior,
            remote: Vec::new(),
            list_fails: false,
            auth_fails: false,
            cancel_on_upload: None,
            uploads: Mutex::new(Vec::new()),
            list_ranges: Mutex::new(Vec::new()),
            auth_calls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn strava(behavior: UploadBehavior) -> Self {
        Self::new(platforms::STRAVA, behavior)
    }

    pub fn garmin(behavior: UploadBehavior) -> Self {
        Self::new(platforms::GARMIN, behavior).with_pacing(Duration::from_secs(1))
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Existing activity carrying `external_id`
    pub fn with_remote(mut self, external_id: &str, remote_id: &str) -> Self {
        self.remote.push(RemoteActivity {
            external_id: Some(external_id.to_owned()),
            remote_id: remote_id.to_owned(),
            start_time: instant(2024, 1, 15, 18, 0),
        });
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn with_failing_auth(mut self) -> Self {
        self.auth_fails = true;
        self
    }

    /// Request cancellation as soon as the first file is submitted
    pub fn cancelling_on_upload(mut self, token: CancellationToken) -> Self {
        self.cancel_on_upload = Some(token);
        self
    }

    /// External IDs submitted, in order
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn list_ranges(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.list_ranges.lock().unwrap().clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DestinationClient for FakeDestination {
    fn platform(&self) -> &'static str {
        self.platform
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    fn activity_type(&self, workout_type: WorkoutType) -> &'static str {
        match workout_type {
            WorkoutType::Strength => "WeightTraining",
            _ => "Crossfit",
        }
    }

    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fails {
            return Err(ProviderError::auth(self.platform, "refresh token revoked"));
        }
        Ok(())
    }

    async fn list_activities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RemoteActivity>> {
        self.list_ranges.lock().unwrap().push((start, end));
        if self.list_fails {
            return Err(ProviderError::NetworkError("connection reset".to_owned()));
        }
        Ok(self.remote.clone())
    }

    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> ProviderResult<UploadHandle> {
        assert!(path.exists(), "uploaded file must exist: {}", path.display());
        self.uploads
            .lock()
            .unwrap()
            .push(metadata.external_id.clone());
        if let Some(token) = &self.cancel_on_upload {
            token.cancel();
        }

        let id = format!("upload-{}", metadata.external_id);
        match self.behavior {
            UploadBehavior::Create | UploadBehavior::NeverFinish => Ok(UploadHandle::pending(id)),
            UploadBehavior::Duplicate => Ok(UploadHandle::settled(
                id,
                UploadStatus::duplicate(Some(format!(
                    "{} duplicate of activity 777",
                    metadata.external_id
                ))),
            )),
            UploadBehavior::Fail => Err(ProviderError::ApiError {
                provider: self.platform.to_owned(),
                status_code: 500,
                message: "internal error".to_owned(),
                retryable: false,
            }),
        }
    }

    async fn poll_status(&self, handle: &UploadHandle) -> ProviderResult<UploadStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            UploadBehavior::NeverFinish => Ok(UploadStatus::default()),
            _ => Ok(UploadStatus::created(format!(
                "remote-{}",
                handle.id.trim_start_matches("upload-")
            ))),
        }
    }
}

// ============================================================================
// Records and workouts
// ============================================================================

/// Raw record with one For Time section and a thruster/pull-up couplet
pub fn fran_record(id: &str, when: &str) -> Value {
    json!({
        "id": id,
        "when": when,
        "box": "CrossFit Norte",
        "TIPOWODs": [
            {"id": "s1", "type": 1, "title": "Fran", "timecap": "10", "time": "4:12", "rx": "1",
             "notes": "21-15-9<br />Thrusters &amp; Pull-ups"}
        ],
        "ejerRate": [
            {"ejerId": "e1", "ejerName": "Thruster", "formaReg": 4, "tipoWOD": 0,
             "valor1": ["45"], "valor2": "42.5"},
            {"ejerId": "e2", "ejerName": "Pull-up", "formaReg": 3, "tipoWOD": 0,
             "valor1": [45]}
        ]
    })
}

/// Minimal record that only carries what the parser needs to keep it
pub fn plain_record(id: &str, when: &str) -> Value {
    json!({"id": id, "when": when})
}

/// Workout ready for encoding and syncing
pub fn workout(id: &str, day: u32) -> Workout {
    let mut workout = Workout::new(id, date(2024, 1, day));
    workout.name = format!("WOD {id}");
    workout.workout_type = WorkoutType::ForTime;
    workout.description = format!("Workout {id}");
    workout.duration_secs = Some(20 * 60);
    workout.result = Some(WorkoutResult::default());
    workout
}
