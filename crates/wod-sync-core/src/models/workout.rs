// ABOUTME: Canonical workout model normalized from gym platform activity records
// ABOUTME: Workout, WorkoutSection, Exercise, WorkoutResult, WorkoutType, and DateWindow types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Workout style tag shared by workouts and their sections
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum WorkoutType {
    /// Complete the work as fast as possible
    ForTime,
    /// As many rounds/reps as possible within a cap
    #[serde(rename = "AMRAP")]
    Amrap,
    /// Every minute on the minute
    #[serde(rename = "EMOM")]
    Emom,
    /// 20s on / 10s off intervals
    Tabata,
    /// Heavy lifting
    Strength,
    /// Technique work
    Skill,
    /// Named hero workout (Murph, DT, ...)
    Hero,
    /// Named benchmark workout (Fran, Grace, ...)
    Benchmark,
    /// `CrossFit` Open workout
    Open,
    /// Anything we could not classify
    #[default]
    Generic,
}

impl WorkoutType {
    /// Map the gym platform's numeric section type code
    ///
    /// Codes outside the table return `None` so callers can fall back to
    /// keyword detection on the section title.
    #[must_use]
    pub const fn from_section_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::ForTime),
            2 => Some(Self::Amrap),
            3 => Some(Self::Emom),
            4 => Some(Self::Tabata),
            5 => Some(Self::Strength),
            6 => Some(Self::Skill),
            _ => None,
        }
    }

    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ForTime => "For Time",
            Self::Amrap => "AMRAP",
            Self::Emom => "EMOM",
            Self::Tabata => "Tabata",
            Self::Strength => "Strength",
            Self::Skill => "Skill",
            Self::Hero => "Hero",
            Self::Benchmark => "Benchmark",
            Self::Open => "Open",
            Self::Generic => "WOD",
        }
    }

    /// Whether this is the unclassified fallback
    #[must_use]
    pub const fn is_generic(self) -> bool {
        matches!(self, Self::Generic)
    }
}

impl Display for WorkoutType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One phase of a workout, such as an EMOM block followed by a For Time piece
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSection {
    /// Source identifier of the section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display title, inferred when the source leaves it empty
    pub title: String,
    /// Style tag
    #[serde(rename = "type")]
    pub section_type: WorkoutType,
    /// Time cap in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_cap_minutes: Option<u32>,
    /// Rounds prescribed
    #[serde(default)]
    pub rounds: u32,
    /// Rounds (or sets) completed
    #[serde(default)]
    pub rounds_completed: u32,
    /// Reps achieved beyond the completed rounds
    #[serde(default)]
    pub extra_reps: u32,
    /// Completed as prescribed
    #[serde(default)]
    pub rx: bool,
    /// Time recorded for the section as entered on the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Free-text instructions, possibly containing HTML fragments
    #[serde(default)]
    pub notes: String,
}

/// How the primary quantity of an exercise was recorded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseFormat {
    /// Primary value is a distance
    Distance,
    /// Primary value is a repetition count
    Count,
    /// Primary value is reps, secondary value is a load
    WeightAndReps,
    /// Source did not say
    #[default]
    Unspecified,
}

impl ExerciseFormat {
    /// Map the source's `formaReg` code
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            2 => Self::Distance,
            3 => Self::Count,
            4 => Self::WeightAndReps,
            _ => Self::Unspecified,
        }
    }
}

/// The single quantity that describes how much of an exercise was done
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryQuantity<'a> {
    /// Distance with its unit
    Distance(f64, &'a str),
    /// Reps performed each round
    RepsPerRound(u32),
    /// Total reps
    Reps(u32),
}

/// One movement inside a workout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    /// Source identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Movement name
    pub name: String,
    /// Index of the owning section, `None` when unassigned
    #[serde(default)]
    pub section_index: Option<usize>,
    /// Round this entry belongs to
    #[serde(default)]
    pub round: u32,
    /// Reps prescribed per round
    #[serde(default)]
    pub reps_per_round: u32,
    /// Total reps
    #[serde(default)]
    pub reps: u32,
    /// Load
    #[serde(default)]
    pub weight: f64,
    /// Load unit, usually `kg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<String>,
    /// Distance covered
    #[serde(default)]
    pub distance: f64,
    /// Distance unit, usually `m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_unit: Option<String>,
    /// Calories recorded by the athlete
    #[serde(default)]
    pub calories: u32,
    /// Time recorded for this movement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Personal record flag
    #[serde(default)]
    pub personal_record: bool,
    /// Source format code, selects the primary quantity
    #[serde(default)]
    pub format: ExerciseFormat,
}

impl Exercise {
    /// Quantity to show for this exercise
    ///
    /// Distance wins for distance-formatted entries and for entries that only
    /// carry a distance. Otherwise reps-per-round beats total reps.
    #[must_use]
    pub fn primary_quantity(&self) -> Option<PrimaryQuantity<'_>> {
        let distance_only = self.reps == 0 && self.reps_per_round == 0;
        if self.distance > 0.0 && (self.format == ExerciseFormat::Distance || distance_only) {
            let unit = self.distance_unit.as_deref().unwrap_or("m");
            return Some(PrimaryQuantity::Distance(self.distance, unit));
        }
        if self.reps_per_round > 0 {
            return Some(PrimaryQuantity::RepsPerRound(self.reps_per_round));
        }
        (self.reps > 0).then_some(PrimaryQuantity::Reps(self.reps))
    }
}

/// How the athlete scaled the workout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// As prescribed
    #[default]
    Rx,
    /// Reduced difficulty
    Scaled,
    /// Harder than prescribed
    RxPlus,
}

/// Athlete's overall outcome for a workout
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkoutResult {
    /// Elapsed time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<u64>,
    /// Rounds completed
    #[serde(default)]
    pub rounds: u32,
    /// Reps beyond the completed rounds
    #[serde(default)]
    pub reps: u32,
    /// Load lifted in kilograms
    #[serde(default)]
    pub weight: f64,
    /// Score as entered on the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    /// Rx, scaled, or Rx+
    #[serde(default)]
    pub scaling: Scaling,
    /// Athlete notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Average heart rate, when a monitor was worn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<u32>,
    /// Maximum heart rate, when a monitor was worn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<u32>,
    /// Calories burned, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

impl WorkoutResult {
    /// Elapsed time as a `Duration`
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_secs.map(Duration::from_secs)
    }
}

/// One logged training session
///
/// Sections and exercises can only be appended. An exercise whose section
/// index does not point at an existing section is stored as unassigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    /// Stable source identifier, used as the dedup key and as the external ID
    pub id: String,
    /// Calendar day of the session
    pub date: NaiveDate,
    /// Time the session was logged, when the source provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<NaiveTime>,
    /// Class start time as `HH:MM` or `HHMM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_time: Option<String>,
    /// Display name
    pub name: String,
    /// Human-readable breakdown of the sections and exercises
    #[serde(default)]
    pub description: String,
    /// Style tag
    #[serde(rename = "type", default)]
    pub workout_type: WorkoutType,
    /// Explicit duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    /// Athlete outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<WorkoutResult>,
    /// Gym name
    #[serde(default)]
    pub venue_name: String,
    /// Gym identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    #[serde(default)]
    sections: Vec<WorkoutSection>,
    #[serde(default)]
    exercises: Vec<Exercise>,
}

impl Workout {
    /// Start a workout with its identity; everything else defaults to empty
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            time_of_day: None,
            class_time: None,
            name: String::new(),
            description: String::new(),
            workout_type: WorkoutType::Generic,
            duration_secs: None,
            result: None,
            venue_name: String::new(),
            venue_id: None,
            sections: Vec::new(),
            exercises: Vec::new(),
        }
    }

    /// Sections in source order
    #[must_use]
    pub fn sections(&self) -> &[WorkoutSection] {
        &self.sections
    }

    /// Exercises in source order
    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Append a section
    pub fn push_section(&mut self, section: WorkoutSection) {
        self.sections.push(section);
    }

    /// Append an exercise, unassigning it if its section index is out of range
    pub fn push_exercise(&mut self, mut exercise: Exercise) {
        if exercise
            .section_index
            .is_some_and(|index| index >= self.sections.len())
        {
            exercise.section_index = None;
        }
        self.exercises.push(exercise);
    }

    /// Exercises belonging to the section at `index`
    pub fn exercises_in_section(&self, index: usize) -> impl Iterator<Item = &Exercise> {
        self.exercises
            .iter()
            .filter(move |exercise| exercise.section_index == Some(index))
    }

    /// Exercises that are not attached to any section
    pub fn unassigned_exercises(&self) -> impl Iterator<Item = &Exercise> {
        self.exercises
            .iter()
            .filter(|exercise| exercise.section_index.is_none())
    }

    /// Explicit duration, falling back to the result's elapsed time
    #[must_use]
    pub fn effective_duration(&self) -> Option<Duration> {
        self.duration_secs
            .map(Duration::from_secs)
            .or_else(|| self.result.as_ref().and_then(WorkoutResult::elapsed))
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day included
    pub start: NaiveDate,
    /// Last day included
    pub end: NaiveDate,
}

impl DateWindow {
    /// Window covering `start..=end`
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window ending on `today` and reaching back `days` days
    #[must_use]
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Whether `date` falls inside the window
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
