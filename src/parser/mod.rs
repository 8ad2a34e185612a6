// ABOUTME: ActivityParser turning raw gym platform activity records into canonical workouts
// ABOUTME: Drops records without an ID, a usable date, or a date inside the requested window
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! # Activity parser
//!
//! Pure transformation from one raw, loosely-typed activity record to a
//! [`Workout`]. Nothing here performs I/O.
//!
//! Records that cannot be turned into a workout are a data-quality matter,
//! not an error: [`ActivityParser::parse`] returns `None` and logs the reason
//! at `debug`.

/// Typed extraction chains for raw fields
pub mod fields;

mod exercises;
mod score;
mod sections;

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::formatters::render_breakdown;
use crate::models::{DateWindow, Scaling, Workout, WorkoutResult};

pub use exercises::{parse_exercise, ParsedExercise};
pub use score::{apply_score, parse_score, parse_time_string, ScoreValue};
pub use sections::{
    detect_type_from_name, emom_label, infer_title, parse_section, time_cap_from_notes,
};

/// Maximum number of exercise names used to name an otherwise unnamed workout
const NAME_FROM_EXERCISES: usize = 3;

/// Why a raw record was not turned into a workout
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// Record has no `id`
    #[error("record has no id")]
    MissingId,
    /// Neither `when` nor `day` holds a date
    #[error("record {0} has no usable date")]
    MissingDate(String),
    /// Date falls outside the requested window
    #[error("record {id} dated {date} is outside the requested window")]
    OutsideWindow {
        /// Record identifier
        id: String,
        /// Parsed date
        date: NaiveDate,
    },
}

/// Values the parser cannot find in the record itself
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    /// Only keep workouts dated inside this window
    pub window: Option<DateWindow>,
    /// Venue name used when the record carries none
    pub venue_name: String,
    /// Venue identifier from configuration
    pub venue_id: Option<String>,
}

/// Converts raw activity records into workouts
#[derive(Debug, Clone, Default)]
pub struct ActivityParser {
    context: ParseContext,
}

impl ActivityParser {
    /// Parser using `context` for window filtering and venue defaults
    #[must_use]
    pub const fn new(context: ParseContext) -> Self {
        Self { context }
    }

    /// Parse one record, or `None` when it has to be dropped
    #[must_use]
    pub fn parse(&self, raw: &Value) -> Option<Workout> {
        match self.try_parse(raw) {
            Ok(workout) => Some(workout),
            Err(reason) => {
                debug!(%reason, "Dropping activity record");
                None
            }
        }
    }

    /// Parse every record, keeping the ones that yield a workout
    #[must_use]
    pub fn parse_all(&self, records: &[Value]) -> Vec<Workout> {
        let workouts: Vec<Workout> = records.iter().filter_map(|raw| self.parse(raw)).collect();
        debug!(
            records = records.len(),
            workouts = workouts.len(),
            "Parsed activity records"
        );
        workouts
    }

    /// Parse one record, reporting why it was dropped
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] for records without an ID, without a date,
    /// or dated outside the window.
    pub fn try_parse(&self, raw: &Value) -> Result<Workout, SkipReason> {
        let id = fields::text(raw, "id").ok_or(SkipReason::MissingId)?;
        let (date, time_of_day) =
            record_date(raw).ok_or_else(|| SkipReason::MissingDate(id.clone()))?;
        if let Some(window) = &self.context.window {
            if !window.contains(date) {
                return Err(SkipReason::OutsideWindow { id, date });
            }
        }

        let mut workout = Workout::new(id, date);
        workout.time_of_day = time_of_day;
        workout.venue_name =
            fields::text(raw, "box").unwrap_or_else(|| self.context.venue_name.clone());
        workout.venue_id.clone_from(&self.context.venue_id);

        let mut rx = false;
        let mut elapsed = None;
        for section in fields::array(raw, "TIPOWODs").iter().filter_map(parse_section) {
            rx |= section.rx;
            if elapsed.is_none() {
                elapsed = section.time.as_deref().and_then(parse_time_string);
            }
            workout.push_section(section);
        }

        let mut name = workout
            .sections()
            .iter()
            .map(|section| section.title.as_str())
            .collect::<Vec<_>>()
            .join(" + ");

        for parsed in fields::array(raw, "ejerRate").iter().filter_map(parse_exercise) {
            if let Some(wod_name) = parsed.wod_name {
                if name.is_empty() || name == parsed.exercise.name {
                    name = wod_name;
                }
            }
            workout.push_exercise(parsed.exercise);
        }

        if name.is_empty() {
            name = name_from_exercises(&workout);
        }
        workout.name = name;
        workout.workout_type = workout
            .sections()
            .iter()
            .map(|section| section.section_type)
            .find(|kind| !kind.is_generic())
            .unwrap_or_else(|| detect_type_from_name(&workout.name));

        let mut result = WorkoutResult {
            elapsed_secs: elapsed.map(|duration| duration.as_secs()),
            scaling: scaling(raw, rx),
            notes: fields::text(raw, "notes"),
            ..WorkoutResult::default()
        };
        if let Some(score) = fields::first_text(raw, &["score", "result"]) {
            apply_score(&mut result, &score);
        }
        workout.result = Some(result);
        workout.description = render_breakdown(&workout);

        Ok(workout)
    }
}

/// Date and optional time-of-day from `when`, falling back to `day`
///
/// `when` is `YYYYMMDD` optionally followed by `HHMMSS`. `day` is read as
/// month-first `MM-DD-YYYY`.
fn record_date(raw: &Value) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let from_when = fields::text(raw, "when").and_then(|when| {
        if when.len() < 8 || !when.is_ascii() {
            return None;
        }
        let date = NaiveDate::parse_from_str(&when[..8], "%Y%m%d").ok()?;
        let time = when
            .get(8..14)
            .and_then(|hms| NaiveTime::parse_from_str(hms, "%H%M%S").ok());
        Some((date, time))
    });

    from_when.or_else(|| {
        fields::text(raw, "day")
            .filter(|day| day.len() == 10)
            .and_then(|day| NaiveDate::parse_from_str(&day, "%m-%d-%Y").ok())
            .map(|date| (date, None))
    })
}

fn scaling(raw: &Value, rx: bool) -> Scaling {
    let rx_plus = ["rxplus", "rx_plus"]
        .iter()
        .any(|key| fields::flag(raw, key).unwrap_or(false));
    if rx_plus {
        Scaling::RxPlus
    } else if rx {
        Scaling::Rx
    } else {
        Scaling::Scaled
    }
}

fn name_from_exercises(workout: &Workout) -> String {
    let mut seen = HashSet::new();
    workout
        .exercises()
        .iter()
        .map(|exercise| exercise.name.as_str())
        .filter(|name| seen.insert(*name))
        .take(NAME_FROM_EXERCISES)
        .collect::<Vec<_>>()
        .join(", ")
}
