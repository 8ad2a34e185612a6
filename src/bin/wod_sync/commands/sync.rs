// ABOUTME: Sync command for wod-sync
// ABOUTME: Runs one batch with Ctrl-C cancellation and prints per-item results or dry-run previews
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use tokio::signal;
use tracing::{info, warn};
use wod_sync::errors::AppResult;
use wod_sync::formatters::{render_preview, PreviewContext};
use wod_sync::models::DateWindow;
use wod_sync::pipeline::{SyncPipeline, SyncRun};
use wod_sync::sync::{CancellationToken, ItemOutcome};

use crate::helpers::display::{display_item, display_summary, display_sync_header};

type Result<T> = AppResult<T>;

/// Fetch, encode, and upload the workouts in `window`
pub async fn run(
    pipeline: &SyncPipeline,
    window: DateWindow,
    platforms: Vec<String>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let mut options = pipeline.default_options();
    if !platforms.is_empty() {
        options.platforms = platforms;
    }
    options.force = force;
    options.dry_run = dry_run;

    display_sync_header(&window, &options);
    let cancel = cancel_on_ctrl_c();
    let run = pipeline.run(window, options, cancel).await?;

    display_items(&run);
    if dry_run {
        display_previews(pipeline, &run);
    }
    display_summary(&run.summary);
    Ok(())
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            handle.cancel();
        }
    });
    cancel
}

fn display_items(run: &SyncRun) {
    if run.workouts.is_empty() {
        println!("No workouts found in range");
        return;
    }
    for report in &run.summary.outcomes {
        let workout = run
            .workouts
            .iter()
            .find(|workout| workout.id == report.workout_id);
        display_item(report, workout);
    }
}

fn display_previews(pipeline: &SyncPipeline, run: &SyncRun) {
    for report in &run.summary.outcomes {
        if report.outcome != ItemOutcome::WouldUpload {
            continue;
        }
        let Some(workout) = run
            .workouts
            .iter()
            .find(|workout| workout.id == report.workout_id)
        else {
            continue;
        };
        let activity_type = match pipeline.destination(&report.platform) {
            Ok(destination) => destination.activity_type(workout.workout_type),
            Err(error) => {
                info!(platform = %report.platform, %error, "No client for preview");
                continue;
            }
        };
        let file = run
            .files
            .iter()
            .find(|file| file.workout_id == workout.id)
            .map(|file| file.path.display().to_string());
        let preview = render_preview(
            workout,
            &PreviewContext {
                platform: &report.platform,
                activity_type,
                file: file.as_deref(),
            },
        );
        println!("\n{preview}");
    }
}
