// ABOUTME: Terminal output helpers for the wod-sync CLI
// ABOUTME: Per-item sync lines, run summaries, workout listings, and history statistics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::path::Path;

use wod_sync::formatters::format_duration;
use wod_sync::history::PlatformStats;
use wod_sync::models::{DateWindow, Workout};
use wod_sync::sync::{ItemReport, SyncOptions, SyncSummary};
use wod_sync::tcx::EncodedWorkout;

/// Width of the separator lines
const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Announce the range and targets of a sync run
pub fn display_sync_header(window: &DateWindow, options: &SyncOptions) {
    println!("\n🔄 Syncing workouts {} → {}", window.start, window.end);
    println!("   Platforms: {}", options.platforms.join(", "));
    if options.force {
        println!("   Force: history is ignored");
    }
    if options.dry_run {
        println!("   🔍 Dry run: nothing will be uploaded or recorded");
    }
    println!("{}", rule());
}

/// One line per item: symbol, platform, date, name, and outcome
pub fn display_item(report: &ItemReport, workout: Option<&Workout>) {
    let date = workout.map_or_else(String::new, |workout| workout.date.to_string());
    println!(
        "  {} [{}] {} {}: {}",
        report.outcome.symbol(),
        report.platform,
        date,
        report.workout_name,
        report.outcome
    );
}

/// Counters at the end of a run
pub fn display_summary(summary: &SyncSummary) {
    println!("{}", rule());
    if summary.cancelled {
        println!("⏹️  Sync cancelled, remaining workouts were not processed");
    }
    let marker = if summary.is_success() { "✅" } else { "⚠️" };
    println!("{marker} {}", summary.message());
}

/// Compact listing of parsed workouts
pub fn display_workouts(workouts: &[Workout]) {
    if workouts.is_empty() {
        println!("No workouts found in range");
        return;
    }
    println!("\n📋 {} workout(s)", workouts.len());
    println!("{}", rule());
    for workout in workouts {
        let duration = workout
            .effective_duration()
            .map(|duration| format!(" ({})", format_duration(duration)))
            .unwrap_or_default();
        println!(
            "  {} {} [{}]{duration}",
            workout.date, workout.name, workout.workout_type
        );
    }
}

/// Files written by an export
pub fn display_exported(files: &[EncodedWorkout], total: usize) {
    for file in files {
        println!("  📁 {} → {}", file.workout_id, file.path.display());
    }
    println!("{}", rule());
    println!("✅ Exported {} of {total} workout(s)", files.len());
}

/// History statistics per platform
pub fn display_stats(stats: &[PlatformStats], workouts: usize, history_path: &Path) {
    println!("\n📊 Sync history ({})", history_path.display());
    println!("{}", rule());
    println!("   Workouts tracked: {workouts}");
    if stats.is_empty() {
        println!("   No sync attempts recorded yet");
        return;
    }
    for stat in stats {
        println!(
            "   {:<8} synced {:>4}  skipped {:>4}  failed {:>4}",
            stat.platform, stat.synced, stat.skipped, stat.failed
        );
    }
}

/// One token line in the status output
pub fn display_token_state(platform: &str, state: &str) {
    println!("   {platform:<8} {state}");
}
