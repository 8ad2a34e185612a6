// ABOUTME: Collaborator traits consumed by the sync engine
// ABOUTME: SourceClient pages raw activities, DestinationClient lists, uploads, and polls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Platform collaborator traits
//!
//! The engine never constructs HTTP requests itself. It drives these traits,
//! which keeps it testable with in-memory fakes.
//!
//! ## Upload protocol
//!
//! 1. `upload` submits the file and returns an [`UploadHandle`].
//! 2. If the platform answered synchronously the handle is already
//!    `settled`; otherwise the caller polls `poll_status` until
//!    [`UploadStatus::is_terminal`] holds or its wait budget runs out.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::provider::ProviderResult;
use crate::models::WorkoutType;
use crate::pagination::{ActivityPage, Watermark};

/// Gym platform the workouts are read from
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Platform name for logs
    fn name(&self) -> &'static str;

    /// Establish an authenticated session
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::AuthenticationFailed` when the platform rejects
    /// the credentials.
    async fn login(&self) -> ProviderResult<()>;

    /// Fetch one page of raw activity records after `cursor`
    ///
    /// `None` requests the first page.
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` on transport failures or unparseable bodies.
    async fn fetch_activities_page(&self, cursor: Option<Watermark>)
        -> ProviderResult<ActivityPage>;
}

/// Activity that already exists on a destination platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteActivity {
    /// External ID embedded at upload time, when the platform exposes it
    pub external_id: Option<String>,
    /// Platform-assigned identifier
    pub remote_id: String,
    /// Start of the activity
    pub start_time: DateTime<Utc>,
}

/// Metadata sent alongside an encoded workout file
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    /// Source workout ID, sent as the external ID
    pub external_id: String,
    /// Activity name
    pub name: String,
    /// Activity description
    pub description: String,
    /// Workout style, mapped to the platform's activity type
    pub workout_type: WorkoutType,
    /// Start of the activity
    pub start_time: DateTime<Utc>,
}

/// Opaque processing handle returned by an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    /// Platform upload identifier
    pub id: String,
    /// Final status when the platform processed the upload synchronously
    pub settled: Option<UploadStatus>,
}

impl UploadHandle {
    /// Handle that still needs polling
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            settled: None,
        }
    }

    /// Handle whose outcome is already known
    pub fn settled(id: impl Into<String>, status: UploadStatus) -> Self {
        Self {
            id: id.into(),
            settled: Some(status),
        }
    }
}

/// Processing status of an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadStatus {
    /// Created activity ID, once known
    pub remote_id: Option<String>,
    /// Platform rejected the upload as a duplicate
    pub duplicate: bool,
    /// Platform-reported failure other than a duplicate
    pub error: Option<String>,
    /// Platform finished processing
    pub done: bool,
}

impl UploadStatus {
    /// Processing finished and produced an activity
    pub fn created(remote_id: impl Into<String>) -> Self {
        Self {
            remote_id: Some(remote_id.into()),
            done: true,
            ..Self::default()
        }
    }

    /// Platform recognised the file as an existing activity
    #[must_use]
    pub fn duplicate(message: Option<String>) -> Self {
        Self {
            duplicate: true,
            error: message,
            done: true,
            ..Self::default()
        }
    }

    /// Platform rejected the upload
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            done: true,
            ..Self::default()
        }
    }

    /// Whether polling can stop
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.done || self.duplicate || self.remote_id.is_some() || self.error.is_some()
    }
}

/// Fitness platform the workouts are published to
#[async_trait]
pub trait DestinationClient: Send + Sync {
    /// Platform name as stored in sync history
    fn platform(&self) -> &'static str;

    /// Delay inserted between consecutive uploads
    fn pacing(&self) -> Duration;

    /// Platform activity type for a workout style
    fn activity_type(&self, workout_type: WorkoutType) -> &'static str;

    /// Make sure credentials are present and fresh
    ///
    /// # Errors
    ///
    /// Returns an authentication or configuration error that invalidates the
    /// whole run against this platform.
    async fn ensure_authenticated(&self) -> ProviderResult<()>;

    /// Activities whose start falls inside `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` when the listing cannot be fetched.
    async fn list_activities_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RemoteActivity>>;

    /// Submit an encoded workout file
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` when the file cannot be read or the platform
    /// refuses the request.
    async fn upload(&self, path: &Path, metadata: &UploadMetadata) -> ProviderResult<UploadHandle>;

    /// Current processing status of an upload
    ///
    /// # Errors
    ///
    /// Returns a `ProviderError` when the status request fails.
    async fn poll_status(&self, handle: &UploadHandle) -> ProviderResult<UploadStatus>;
}
