// ABOUTME: Webhook routes triggering a sync batch over HTTP and reporting the last result
// ABOUTME: Optional shared-token check and single-flight execution via a non-blocking lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Webhook routes
//!
//! A trigger runs one batch while the request waits. The batch runs on its
//! own task, so a client that disconnects early does not abort it and the
//! result is still recorded. At most one batch runs at a time; a trigger
//! arriving during a run is answered with `409` instead of being queued.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::sync::SyncSummary;

/// Header carrying the shared webhook token
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// One sync batch covering the last `days` days
#[async_trait]
pub trait SyncJob: Send + Sync {
    /// Run the batch
    ///
    /// # Errors
    ///
    /// Returns the batch's fatal error; per-item failures are counted in the
    /// summary instead.
    async fn run(&self, days: u32) -> AppResult<SyncSummary>;
}

/// Result of one triggered batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// No item failed and the batch finished
    pub success: bool,
    /// Summary line or fatal error text
    pub message: String,
    /// New activities created
    pub uploaded: usize,
    /// Items skipped
    pub skipped: usize,
    /// Items that failed
    pub errors: usize,
    /// Trigger time
    pub started_at: DateTime<Utc>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
    /// Elapsed time, e.g. `4.2s`
    pub duration: String,
}

impl SyncReport {
    /// Report for a finished batch
    #[must_use]
    pub fn new(
        result: &AppResult<SyncSummary>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let elapsed = (completed_at - started_at).num_milliseconds().max(0);
        let duration = format!("{:.1}s", elapsed as f64 / 1000.0);
        match result {
            Ok(summary) => Self {
                success: summary.is_success(),
                message: summary.message(),
                uploaded: summary.uploaded,
                skipped: summary.skipped,
                errors: summary.errors,
                started_at,
                completed_at,
                duration,
            },
            Err(error) => Self {
                success: false,
                message: error.to_string(),
                uploaded: 0,
                skipped: 0,
                errors: 1,
                started_at,
                completed_at,
                duration,
            },
        }
    }
}

/// Shared state of the webhook routes
pub struct WebhookContext {
    job: Arc<dyn SyncJob>,
    auth_token: Option<String>,
    default_days: u32,
    running: Arc<Mutex<()>>,
    last_report: RwLock<Option<SyncReport>>,
}

impl WebhookContext {
    /// Context running `job`, requiring `auth_token` when set
    #[must_use]
    pub fn new(job: Arc<dyn SyncJob>, auth_token: Option<String>) -> Self {
        Self {
            job,
            auth_token: auth_token.filter(|token| !token.is_empty()),
            default_days: 1,
            running: Arc::new(Mutex::new(())),
            last_report: RwLock::new(None),
        }
    }

    /// Days synced when a trigger passes no `days` parameter
    #[must_use]
    pub const fn with_default_days(mut self, days: u32) -> Self {
        self.default_days = days;
        self
    }

    fn is_authorized(&self, headers: &HeaderMap, query_token: Option<&str>) -> bool {
        let Some(expected) = self.auth_token.as_deref() else {
            return true;
        };
        let presented = headers
            .get(AUTH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .or(query_token);
        presented == Some(expected)
    }
}

#[derive(Debug, Deserialize)]
struct SyncQuery {
    #[serde(default)]
    days: Option<u32>,
    #[serde(default)]
    token: Option<String>,
}

/// Webhook routes implementation
pub struct WebhookRoutes;

impl WebhookRoutes {
    /// Create the trigger and status routes
    pub fn routes(context: WebhookContext) -> Router {
        let context = Arc::new(context);
        Router::new()
            .route("/sync", post(Self::handle_sync))
            .route("/api/sync", post(Self::handle_sync))
            .route("/status", get(Self::handle_status))
            .route("/api/status", get(Self::handle_status))
            .with_state(context)
    }

    async fn handle_sync(
        State(context): State<Arc<WebhookContext>>,
        headers: HeaderMap,
        Query(params): Query<SyncQuery>,
    ) -> Response {
        if !context.is_authorized(&headers, params.token.as_deref()) {
            warn!("Rejected sync trigger with a missing or wrong token");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response();
        }

        let Ok(running) = Arc::clone(&context.running).try_lock_owned() else {
            info!("Sync trigger rejected, a batch is already running");
            return (
                StatusCode::CONFLICT,
                Json(json!({ "error": "sync already in progress" })),
            )
                .into_response();
        };

        let days = params.days.unwrap_or(context.default_days);
        info!(days, "Sync triggered via webhook");
        let started_at = Utc::now();
        let batch = tokio::spawn(Self::run_batch(Arc::clone(&context), days, running));
        let report = match batch.await {
            Ok(report) => report,
            Err(error) => {
                warn!(%error, "Sync task ended abnormally");
                let failed = Err(AppError::internal(format!("sync task failed: {error}")));
                let report = SyncReport::new(&failed, started_at, Utc::now());
                *context.last_report.write().await = Some(report.clone());
                report
            }
        };

        let status = if report.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(report)).into_response()
    }

    /// Run the job and record its report; the lock is held until both are done
    async fn run_batch(
        context: Arc<WebhookContext>,
        days: u32,
        running: OwnedMutexGuard<()>,
    ) -> SyncReport {
        let started_at = Utc::now();
        let result = context.job.run(days).await;
        let report = SyncReport::new(&result, started_at, Utc::now());
        if let Err(error) = &result {
            warn!(%error, "Triggered sync failed");
        }
        *context.last_report.write().await = Some(report.clone());
        drop(running);
        report
    }

    async fn handle_status(State(context): State<Arc<WebhookContext>>) -> Response {
        let last = context.last_report.read().await.clone();
        let body = last.map_or_else(
            || json!({ "status": "no_sync_yet" }),
            |report| json!({ "status": "completed", "last_sync": report }),
        );
        (StatusCode::OK, Json(body)).into_response()
    }
}
