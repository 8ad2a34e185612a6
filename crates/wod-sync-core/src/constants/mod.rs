// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Platform names, sync outcome reasons, and timing defaults for the sync engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Constants module
//!
//! Constants are grouped by domain rather than kept in one flat list.

/// Platform identifiers as stored in sync history
pub mod platforms {
    /// Gym platform the workouts are read from
    pub const AIMHARDER: &str = "aimharder";
    /// Strava destination
    pub const STRAVA: &str = "strava";
    /// Garmin Connect destination
    pub const GARMIN: &str = "garmin";
    /// Destinations accepted on the command line
    pub const DESTINATIONS: [&str; 2] = [STRAVA, GARMIN];
}

/// Reason strings stored in `SyncStatus::error_message` for successful-but-skipped attempts
pub mod sync_reasons {
    /// Remote platform already had an activity with our external ID
    pub const ALREADY_EXISTS: &str = "already_exists";
    /// Platform rejected the upload as a duplicate of an existing activity
    pub const DUPLICATE: &str = "duplicate";
    /// Upload never finished processing within the wait budget
    pub const TIMED_OUT: &str = "timed out waiting for upload processing";
}

/// Pacing and polling defaults
pub mod timing {
    /// Delay between consecutive source pages
    pub const SOURCE_PAGE_DELAY_MS: u64 = 500;
    /// Delay between consecutive Strava uploads
    pub const STRAVA_PACING_MS: u64 = 500;
    /// Delay between consecutive Garmin uploads
    pub const GARMIN_PACING_MS: u64 = 1_000;
    /// Interval between upload status polls
    pub const POLL_INTERVAL_SECS: u64 = 2;
    /// Maximum time to wait for an upload to finish processing
    pub const MAX_UPLOAD_WAIT_SECS: u64 = 120;
    /// Refresh OAuth tokens that expire within this window
    pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;
}

/// Workout defaults used when the source omits a value
pub mod workout_defaults {
    /// Duration assumed when neither the workout nor the result carries one
    pub const DURATION_MINUTES: u64 = 60;
    /// Lap calories when the result has none
    pub const CALORIES: u32 = 400;
    /// Lap average heart rate when the result has none
    pub const AVERAGE_HEART_RATE: u32 = 150;
    /// Lap maximum heart rate when the result has none
    pub const MAX_HEART_RATE: u32 = 175;
}

/// Service identity
pub mod service_names {
    /// Name used in logs, file metadata, and health responses
    pub const WOD_SYNC: &str = "wod-sync";
}
