// ABOUTME: Status command for wod-sync
// ABOUTME: Shows history statistics per platform and whether platform credentials are stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use chrono::Utc;
use wod_sync::constants::platforms;
use wod_sync::errors::AppResult;
use wod_sync::pipeline::SyncPipeline;

use crate::helpers::display::{display_stats, display_token_state};

type Result<T> = AppResult<T>;

/// Print history statistics and token state
pub async fn run(pipeline: &SyncPipeline) -> Result<()> {
    let history = pipeline.load_history().await?;
    display_stats(&history.stats(), history.len(), history.path());

    let tokens = pipeline.token_store().load().await?;
    let now = Utc::now();
    println!("\n🔑 Credentials ({})", pipeline.token_store().path().display());

    let strava = tokens.strava.map_or_else(
        || "not authorized, run `wod-sync auth strava`".to_owned(),
        |tokens| {
            if tokens.expires_at > now {
                format!("authorized, access token valid until {}", tokens.expires_at)
            } else {
                "authorized, access token will be refreshed on next use".to_owned()
            }
        },
    );
    display_token_state(platforms::STRAVA, &strava);

    let garmin = tokens.garmin.map_or_else(
        || "no session, run `wod-sync auth garmin`".to_owned(),
        |session| {
            if session.is_valid_at(now) {
                format!("session valid until {}", session.expires_at)
            } else {
                "session expired".to_owned()
            }
        },
    );
    display_token_state(platforms::GARMIN, &garmin);
    Ok(())
}
