// ABOUTME: Export command for wod-sync
// ABOUTME: Writes one TCX file per workout in range without uploading anything
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::path::PathBuf;

use wod_sync::errors::AppResult;
use wod_sync::models::DateWindow;
use wod_sync::pipeline::SyncPipeline;
use wod_sync::sync::CancellationToken;
use wod_sync::tcx::FileEncoder;

use crate::helpers::display::display_exported;

type Result<T> = AppResult<T>;

/// Encode the workouts in `window` into `output` or the configured directory
pub async fn run(pipeline: &SyncPipeline, window: DateWindow, output: Option<PathBuf>) -> Result<()> {
    let source = pipeline.source()?;
    let workouts = pipeline.fetch_workouts(&source, window, &CancellationToken::new()).await?;

    let encoder = match output {
        Some(dir) => FileEncoder::new(dir, pipeline.config().sync.default_duration()),
        None => pipeline.encoder(),
    };
    println!("\n📤 Exporting to {}", encoder.output_dir().display());
    let files = encoder.generate_all(&workouts).await;
    display_exported(&files, workouts.len());
    Ok(())
}
