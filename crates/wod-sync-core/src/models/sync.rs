// ABOUTME: Sync history record describing one upload attempt of a workout to a platform
// ABOUTME: Serialized as an element of the persisted history JSON array
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::sync_reasons;

/// Outcome of one attempt to publish a workout to a destination platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStatus {
    /// Workout identifier from the source
    pub workout_id: String,
    /// Destination platform name
    pub platform: String,
    /// Remote activity identifier, when the platform returned one
    #[serde(default, deserialize_with = "empty_as_none")]
    pub external_id: Option<String>,
    /// When the attempt finished
    pub synced_at: DateTime<Utc>,
    /// Whether the workout now exists on the platform
    pub success: bool,
    /// Failure reason, or the skip reason for successful short-circuits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SyncStatus {
    /// Upload completed and the platform assigned `external_id`
    pub fn uploaded(
        workout_id: impl Into<String>,
        platform: impl Into<String>,
        external_id: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workout_id: workout_id.into(),
            platform: platform.into(),
            external_id,
            synced_at,
            success: true,
            error_message: None,
        }
    }

    /// Successful outcome that did not create a new activity
    pub fn skipped(
        workout_id: impl Into<String>,
        platform: impl Into<String>,
        external_id: Option<String>,
        reason: &str,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            error_message: Some(reason.to_owned()),
            ..Self::uploaded(workout_id, platform, external_id, synced_at)
        }
    }

    /// Attempt failed with `reason`
    pub fn failed(
        workout_id: impl Into<String>,
        platform: impl Into<String>,
        reason: impl Into<String>,
        synced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workout_id: workout_id.into(),
            platform: platform.into(),
            external_id: None,
            synced_at,
            success: false,
            error_message: Some(reason.into()),
        }
    }

    /// Success that was a short-circuit rather than a fresh upload
    #[must_use]
    pub fn is_skip(&self) -> bool {
        self.success
            && matches!(
                self.error_message.as_deref(),
                Some(sync_reasons::ALREADY_EXISTS | sync_reasons::DUPLICATE)
            )
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|id| !id.is_empty()))
}
