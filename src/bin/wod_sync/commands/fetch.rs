// ABOUTME: Fetch command for wod-sync
// ABOUTME: Logs in to Aimharder, parses the workouts in range, and prints or saves them as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::path::PathBuf;

use tokio::fs;
use tracing::info;
use wod_sync::errors::{AppError, AppResult};
use wod_sync::models::DateWindow;
use wod_sync::pipeline::SyncPipeline;
use wod_sync::sync::CancellationToken;

use crate::helpers::display::display_workouts;

type Result<T> = AppResult<T>;

/// Fetch and parse the workouts in `window`
pub async fn run(pipeline: &SyncPipeline, window: DateWindow, output: Option<PathBuf>) -> Result<()> {
    let source = pipeline.source()?;
    let workouts = pipeline.fetch_workouts(&source, window, &CancellationToken::new()).await?;

    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&workouts)?;
            fs::write(&path, json).await.map_err(|err| {
                AppError::storage(format!("cannot write {}", path.display())).with_source(err)
            })?;
            info!(path = %path.display(), count = workouts.len(), "Wrote workouts");
            println!("✅ Saved {} workout(s) to {}", workouts.len(), path.display());
        }
        None => display_workouts(&workouts),
    }
    Ok(())
}
