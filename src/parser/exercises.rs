// ABOUTME: Exercise extraction from raw ejerRate entries
// ABOUTME: The format code selects whether the first value is a distance or a rep count
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use serde_json::Value;

use super::fields;
use crate::models::{Exercise, ExerciseFormat};

/// One parsed exercise plus the workout name it may carry
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExercise {
    /// The exercise itself
    pub exercise: Exercise,
    /// Workout name attached to the entry by the source
    pub wod_name: Option<String>,
}

/// Build an exercise from one raw `ejerRate` entry
///
/// Entries without a name are skipped. Values missing from the positional
/// `valor1`/`valor2` slots fall back to the named `reps`, `weight`, `unit`,
/// `distance` and `distanceUnit` fields.
#[must_use]
pub fn parse_exercise(raw: &Value) -> Option<ParsedExercise> {
    let name = fields::text(raw, "ejerName")?;
    let format = ExerciseFormat::from_code(fields::integer(raw, "formaReg").unwrap_or_default());

    let mut exercise = Exercise {
        id: fields::text(raw, "ejerId"),
        name,
        section_index: fields::integer(raw, "tipoWOD").and_then(|index| usize::try_from(index).ok()),
        round: fields::count(raw, "round"),
        reps_per_round: fields::count(raw, "roundrepeat"),
        format,
        ..Exercise::default()
    };

    if let Some(primary) = fields::array(raw, "valor1").first().and_then(fields::float_value) {
        if format == ExerciseFormat::Distance {
            exercise.distance = primary;
            exercise.distance_unit = Some("m".to_owned());
        } else {
            exercise.reps = non_negative(primary);
        }
    }

    if format == ExerciseFormat::WeightAndReps {
        if let Some(weight) = fields::float(raw, "valor2") {
            exercise.weight = weight;
            exercise.weight_unit = Some("kg".to_owned());
        }
    }

    if exercise.reps == 0 {
        exercise.reps = fields::count(raw, "reps");
    }
    if exercise.weight <= 0.0 {
        exercise.weight = fields::float(raw, "weight").unwrap_or_default();
    }
    if exercise.weight_unit.is_none() {
        exercise.weight_unit = fields::text(raw, "unit");
    }
    if exercise.distance <= 0.0 {
        exercise.distance = fields::float(raw, "distance").unwrap_or_default();
    }
    if exercise.distance_unit.is_none() {
        exercise.distance_unit = fields::text(raw, "distanceUnit");
    }

    exercise.calories = fields::count(raw, "cals");
    exercise.time = fields::text(raw, "time");
    exercise.personal_record = fields::flag(raw, "pr").unwrap_or(false);

    if exercise.reps == 0 && exercise.reps_per_round > 0 {
        exercise.reps = exercise.reps_per_round;
    }

    Some(ParsedExercise {
        exercise,
        wod_name: fields::text(raw, "wodName"),
    })
}

fn non_negative(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_weight_and_reps_format() {
        let raw = json!({
            "ejerId": "17", "ejerName": "Deadlift", "tipoWOD": 0,
            "formaReg": "4", "valor1": ["5"], "valor2": "100"
        });
        let parsed = parse_exercise(&raw).unwrap();
        assert_eq!(parsed.exercise.reps, 5);
        assert!((parsed.exercise.weight - 100.0).abs() < f64::EPSILON);
        assert_eq!(parsed.exercise.weight_unit.as_deref(), Some("kg"));
        assert_eq!(parsed.exercise.section_index, Some(0));
    }

    #[test]
    fn test_distance_format() {
        let raw = json!({"ejerName": "Row", "formaReg": 2, "valor1": [500]});
        let parsed = parse_exercise(&raw).unwrap();
        assert_eq!(parsed.exercise.reps, 0);
        assert!((parsed.exercise.distance - 500.0).abs() < f64::EPSILON);
        assert_eq!(parsed.exercise.distance_unit.as_deref(), Some("m"));
        assert_eq!(parsed.exercise.section_index, None);
    }

    #[test]
    fn test_named_fallbacks_and_round_reps() {
        let raw = json!({
            "ejerName": "Wall Ball", "roundrepeat": "20", "weight": 9, "unit": "kg",
            "pr": 1, "cals": 12, "wodName": "Karen"
        });
        let parsed = parse_exercise(&raw).unwrap();
        assert_eq!(parsed.exercise.reps, 20);
        assert_eq!(parsed.exercise.reps_per_round, 20);
        assert!(parsed.exercise.personal_record);
        assert_eq!(parsed.exercise.calories, 12);
        assert_eq!(parsed.wod_name.as_deref(), Some("Karen"));
    }

    #[test]
    fn test_unnamed_exercise_skipped() {
        assert!(parse_exercise(&json!({"valor1": ["10"]})).is_none());
    }
}
