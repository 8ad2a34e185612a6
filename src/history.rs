// ABOUTME: HistoryStore persisting every sync attempt per workout as one JSON document
// ABOUTME: Append-only log per workout with the need-sync predicate and per-platform statistics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Sync history
//!
//! The history file maps workout IDs to the ordered list of attempts made
//! against each platform:
//!
//! ```json
//! {
//!   "12345": [
//!     {"workout_id": "12345", "platform": "strava", "external_id": "987",
//!      "synced_at": "2024-01-15T10:00:00Z", "success": true}
//!   ]
//! }
//! ```
//!
//! The document is read whole at the start of a run and written whole at the
//! end. Entries are never edited or removed.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::SyncStatus;

/// Attempt counts for one platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformStats {
    /// Platform name
    pub platform: String,
    /// Workouts with at least one successful attempt
    pub synced: usize,
    /// Successful attempts that were duplicates or pre-existing activities
    pub skipped: usize,
    /// Failed attempts
    pub failed: usize,
}

/// Persistent map of workout ID to sync attempts
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    entries: BTreeMap<String, Vec<SyncStatus>>,
}

impl HistoryStore {
    /// Empty store that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the store from `path`, starting empty when the file does not exist
    ///
    /// # Errors
    ///
    /// Returns a storage error when the file exists but cannot be read or
    /// does not hold a history document.
    pub async fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No sync history yet");
                return Ok(Self::new(path));
            }
            Err(error) => {
                return Err(AppError::storage(format!(
                    "failed to read sync history {}",
                    path.display()
                ))
                .with_source(error));
            }
        };

        let entries = if contents.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&contents).map_err(|error| {
                AppError::storage(format!("corrupt sync history {}", path.display()))
                    .with_source(error)
            })?
        };
        Ok(Self { path, entries })
    }

    /// Write the whole store back, creating the parent directory when needed
    ///
    /// The document is written to a sibling temporary file and renamed into
    /// place.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the directory or file cannot be written.
    pub async fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|error| {
                AppError::storage(format!("failed to create {}", parent.display()))
                    .with_source(error)
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).await.map_err(|error| {
            AppError::storage(format!("failed to write {}", temp.display())).with_source(error)
        })?;
        fs::rename(&temp, &self.path).await.map_err(|error| {
            AppError::storage(format!("failed to replace {}", self.path.display()))
                .with_source(error)
        })?;

        info!(path = %self.path.display(), workouts = self.entries.len(), "Saved sync history");
        Ok(())
    }

    /// File backing the store
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an attempt
    pub fn record(&mut self, status: SyncStatus) {
        self.entries
            .entry(status.workout_id.clone())
            .or_default()
            .push(status);
    }

    /// Attempts recorded for a workout, oldest first
    #[must_use]
    pub fn attempts(&self, workout_id: &str) -> &[SyncStatus] {
        self.entries.get(workout_id).map_or(&[], Vec::as_slice)
    }

    /// Whether a successful attempt exists for this workout on this platform
    #[must_use]
    pub fn has_success(&self, workout_id: &str, platform: &str) -> bool {
        self.attempts(workout_id)
            .iter()
            .any(|status| status.success && status.platform == platform)
    }

    /// Whether the workout still has to be uploaded to `platform`
    ///
    /// Only a success on the same platform counts; `force` always answers yes.
    #[must_use]
    pub fn needs_sync(&self, workout_id: &str, platform: &str, force: bool) -> bool {
        force || !self.has_success(workout_id, platform)
    }

    /// Attempt counts per platform, sorted by platform name
    #[must_use]
    pub fn stats(&self) -> Vec<PlatformStats> {
        let mut by_platform: BTreeMap<&str, PlatformStats> = BTreeMap::new();
        for attempts in self.entries.values() {
            let mut succeeded: Vec<&str> = Vec::new();
            for status in attempts {
                let stats = by_platform
                    .entry(status.platform.as_str())
                    .or_insert_with(|| PlatformStats {
                        platform: status.platform.clone(),
                        ..PlatformStats::default()
                    });
                if !status.success {
                    stats.failed += 1;
                    continue;
                }
                if status.is_skip() {
                    stats.skipped += 1;
                }
                if !succeeded.contains(&status.platform.as_str()) {
                    succeeded.push(status.platform.as_str());
                    stats.synced += 1;
                }
            }
        }
        by_platform.into_values().collect()
    }

    /// Number of workouts with at least one attempt
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attempt has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
