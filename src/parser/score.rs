// ABOUTME: Score and elapsed-time parsing for workout results
// ABOUTME: Ordered, mutually exclusive patterns: time, rounds plus reps, rounds, weight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};

use crate::models::WorkoutResult;

static TIME_SCORE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").ok());
static ROUNDS_PLUS_REPS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*\+\s*(\d+)").ok());
static ROUNDS_ONLY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*(?:rounds?|rondas?)?$").ok());
static WEIGHT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(?:kg|lbs?)?$").ok());

/// Structured reading of a free-text score
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreValue {
    /// `MM:SS` or `H:MM:SS`
    Time(Duration),
    /// `rounds + reps`
    RoundsReps {
        /// Full rounds
        rounds: u32,
        /// Reps into the next round
        reps: u32,
    },
    /// Bare round count
    Rounds(u32),
    /// Load, unit suffix dropped
    Weight(f64),
}

/// Parse a score, trying time, rounds+reps, rounds, then weight
///
/// The first pattern that matches wins. Text matching none of them yields
/// `None` and should be kept only as raw text.
#[must_use]
pub fn parse_score(score: &str) -> Option<ScoreValue> {
    let score = score.trim();
    if let Some(caps) = captures(&TIME_SCORE, score) {
        let first: u64 = capture(&caps, 1);
        let second: u64 = capture(&caps, 2);
        let secs = if caps.get(3).is_some() {
            first * 3600 + second * 60 + capture::<u64>(&caps, 3)
        } else {
            first * 60 + second
        };
        return Some(ScoreValue::Time(Duration::from_secs(secs)));
    }

    if let Some(caps) = captures(&ROUNDS_PLUS_REPS, score) {
        return Some(ScoreValue::RoundsReps {
            rounds: capture(&caps, 1),
            reps: capture(&caps, 2),
        });
    }

    let lowered = score.to_lowercase();
    if let Some(caps) = captures(&ROUNDS_ONLY, &lowered) {
        return Some(ScoreValue::Rounds(capture(&caps, 1)));
    }

    captures(&WEIGHT, &lowered)
        .and_then(|caps| caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .map(ScoreValue::Weight)
}

/// Store `score` on the result and fill the structured fields it implies
///
/// A parsed time only fills the elapsed time when none is known yet.
pub fn apply_score(result: &mut WorkoutResult, score: &str) {
    let trimmed = score.trim();
    if trimmed.is_empty() {
        return;
    }
    result.score = Some(trimmed.to_owned());
    match parse_score(trimmed) {
        Some(ScoreValue::Time(elapsed)) => {
            result.elapsed_secs.get_or_insert(elapsed.as_secs());
        }
        Some(ScoreValue::RoundsReps { rounds, reps }) => {
            result.rounds = rounds;
            result.reps = reps;
        }
        Some(ScoreValue::Rounds(rounds)) => result.rounds = rounds,
        Some(ScoreValue::Weight(weight)) => result.weight = weight,
        None => {}
    }
}

/// Parse a section time, either `MM:SS` or a plain number of seconds
#[must_use]
pub fn parse_time_string(time: &str) -> Option<Duration> {
    let time = time.trim();
    if let Some((minutes, seconds)) = time.split_once(':') {
        if seconds.contains(':') {
            return None;
        }
        let minutes = minutes.trim().parse::<u64>().ok()?;
        let seconds = seconds.trim().parse::<u64>().ok()?;
        let total = minutes.checked_mul(60)?.checked_add(seconds)?;
        return Some(Duration::from_secs(total));
    }
    time.parse::<u64>().ok().map(Duration::from_secs)
}

fn captures<'t>(pattern: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    pattern.as_ref().and_then(|re| re.captures(text))
}

fn capture<T: FromStr + Default>(caps: &Captures<'_>, index: usize) -> T {
    caps.get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or_default()
}
