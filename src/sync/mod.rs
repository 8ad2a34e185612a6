// ABOUTME: Sync engine deciding what to upload, driving uploads, and summarizing the batch
// ABOUTME: Options, per-item outcomes, and the aggregated summary returned to callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Sync engine
//!
//! Processing is sequential: for each requested platform in order, each
//! workout in source order. See [`SyncOrchestrator`] for the decision steps
//! and [`upload`] for the per-item protocol.

mod cancel;
mod clock;
mod orchestrator;
/// Upload state machine
pub mod upload;

use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::constants::platforms;

pub use cancel::CancellationToken;
pub use clock::{Clock, SystemClock};
pub use orchestrator::{upload_metadata, SyncOrchestrator};
pub use upload::{PollPolicy, UploadDriver, UploadOutcome, UploadState};

/// Flags for one sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Destination platforms, processed in this order
    pub platforms: Vec<String>,
    /// Upload even when history already holds a success
    pub force: bool,
    /// Decide and report without uploading or recording anything
    pub dry_run: bool,
    /// Upload status polling
    pub poll: PollPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            platforms: vec![platforms::STRAVA.to_owned()],
            force: false,
            dry_run: false,
            poll: PollPolicy::default(),
        }
    }
}

/// What happened to one workout on one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// History already holds a success for this platform
    AlreadySynced,
    /// Platform already lists an activity with this workout's external ID
    AlreadyExists {
        /// Existing activity ID
        remote_id: String,
    },
    /// New activity created
    Uploaded {
        /// Created activity ID, when reported
        remote_id: Option<String>,
    },
    /// Platform rejected the upload as a duplicate
    Duplicate {
        /// Existing activity ID, when reported
        remote_id: Option<String>,
    },
    /// Upload failed
    Failed {
        /// Error text
        reason: String,
    },
    /// Dry run: would have been uploaded
    WouldUpload,
    /// Cancelled before completion
    Cancelled,
}

impl ItemOutcome {
    /// Marker shown next to the item in terminal output
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::AlreadySynced | Self::AlreadyExists { .. } | Self::Duplicate { .. } => "⏭️",
            Self::Uploaded { .. } => "✅",
            Self::Failed { .. } => "❌",
            Self::WouldUpload => "🔍",
            Self::Cancelled => "⏹️",
        }
    }
}

impl Display for ItemOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadySynced => f.write_str("already synced"),
            Self::AlreadyExists { remote_id } => write!(f, "already exists ({remote_id})"),
            Self::Uploaded { remote_id: Some(id) } => write!(f, "uploaded ({id})"),
            Self::Uploaded { remote_id: None } => f.write_str("uploaded"),
            Self::Duplicate { remote_id: Some(id) } => write!(f, "duplicate ({id})"),
            Self::Duplicate { remote_id: None } => f.write_str("duplicate"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            Self::WouldUpload => f.write_str("would upload"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of one workout on one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Source workout ID
    pub workout_id: String,
    /// Workout display name
    pub workout_name: String,
    /// Destination platform
    pub platform: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Aggregated counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// New activities created
    pub uploaded: usize,
    /// Items skipped via history, remote match, or duplicate rejection
    pub skipped: usize,
    /// Items that failed
    pub errors: usize,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
    /// Per-item outcomes in processing order
    pub outcomes: Vec<ItemReport>,
}

impl SyncSummary {
    /// `"Uploaded N, skipped N, errors N"`
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Uploaded {}, skipped {}, errors {}",
            self.uploaded, self.skipped, self.errors
        )
    }

    /// No item failed
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.errors == 0
    }

    pub(crate) fn push(&mut self, report: ItemReport) {
        match report.outcome {
            ItemOutcome::Uploaded { .. } => self.uploaded += 1,
            ItemOutcome::AlreadySynced
            | ItemOutcome::AlreadyExists { .. }
            | ItemOutcome::Duplicate { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.errors += 1,
            ItemOutcome::Cancelled => self.cancelled = true,
            ItemOutcome::WouldUpload => {}
        }
        self.outcomes.push(report);
    }
}
