// ABOUTME: Deterministic heart-rate signal synthesized for workouts recorded without a monitor
// ABOUTME: Warm-up ramp, oscillating steady phase, cool-down ramp, bounded jitter, clamped output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Synthetic heart-rate series.
//!
//! Destination platforms estimate calories from heart rate. A workout logged
//! on the gym platform has none, so the encoder attaches a plausible,
//! deterministic profile:
//!
//! | Phase | Elapsed | Value |
//! |-------|---------|-------|
//! | warm-up | first 5 min | 110 → 140 |
//! | steady | middle | 148 + 12·(½ + ½·sin(t/30)) |
//! | cool-down | last 5 min | 160 → 120 |
//!
//! A jitter of `(t mod 7) − 3` is added and the result clamped to
//! [`MIN_BPM`, `MAX_BPM`].

use std::time::Duration;

/// Spacing between trackpoints
pub const SAMPLE_INTERVAL_SECS: u64 = 30;
/// Fewest trackpoints in a series
pub const MIN_POINTS: u64 = 4;
/// Most trackpoints in a series
pub const MAX_POINTS: u64 = 120;
/// Lowest value ever emitted
pub const MIN_BPM: i64 = 100;
/// Highest value ever emitted
pub const MAX_BPM: i64 = 185;

const WARM_UP_SECS: u64 = 300;
const COOL_DOWN_SECS: u64 = 300;

/// One point of the synthesized series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateSample {
    /// Seconds since the lap started
    pub offset_secs: u64,
    /// Beats per minute
    pub bpm: u32,
}

/// Number of trackpoints for a workout lasting `duration`
#[must_use]
pub fn point_count(duration: Duration) -> u64 {
    (duration.as_secs() / SAMPLE_INTERVAL_SECS).clamp(MIN_POINTS, MAX_POINTS)
}

/// Heart rate `elapsed_secs` into a workout lasting `total_secs`
#[must_use]
pub fn heart_rate_at(elapsed_secs: u64, total_secs: u64) -> u32 {
    let elapsed = elapsed_secs as f64;
    let cool_down_start = total_secs.saturating_sub(COOL_DOWN_SECS);

    let base = if elapsed_secs < WARM_UP_SECS {
        let progress = elapsed / WARM_UP_SECS as f64;
        110 + (progress * 30.0) as i64
    } else if elapsed_secs > cool_down_start {
        let progress = (elapsed_secs - cool_down_start) as f64 / COOL_DOWN_SECS as f64;
        160 - (progress * 40.0) as i64
    } else {
        let oscillation = 12.0 * 0.5f64.mul_add((elapsed / 30.0).sin(), 0.5);
        148 + oscillation as i64
    };

    let jitter = i64::from((elapsed_secs % 7) as u32) - 3;
    (base + jitter).clamp(MIN_BPM, MAX_BPM) as u32
}

/// Full series for a workout lasting `duration`
#[must_use]
pub fn synthesize(duration: Duration) -> Vec<HeartRateSample> {
    let total_secs = duration.as_secs();
    (0..point_count(duration))
        .map(|index| {
            let offset_secs = index * SAMPLE_INTERVAL_SECS;
            HeartRateSample {
                offset_secs,
                bpm: heart_rate_at(offset_secs, total_secs),
            }
        })
        .collect()
}
