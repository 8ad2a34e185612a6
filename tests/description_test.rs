// ABOUTME: Tests for workout text rendering used in descriptions, file notes, and previews
// ABOUTME: Validates section breakdowns, result lines, placeholders, and HTML cleanup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::time::Duration;

use wod_sync::formatters::{
    clean_html_entities, format_duration, render_activity_notes, render_breakdown, render_preview,
    PreviewContext,
};
use wod_sync::models::{Exercise, Scaling, Workout, WorkoutResult, WorkoutSection, WorkoutType};
use wod_sync::parser::ActivityParser;

use common::{date, fran_record};

fn amrap_workout() -> Workout {
    let mut workout = Workout::new("42", date(2024, 2, 3));
    workout.name = "20' AMRAP".to_owned();
    workout.workout_type = WorkoutType::Amrap;
    workout.venue_name = "CrossFit Norte".to_owned();
    workout.push_section(WorkoutSection {
        title: "20' AMRAP".to_owned(),
        section_type: WorkoutType::Amrap,
        time_cap_minutes: Some(20),
        rounds_completed: 7,
        extra_reps: 12,
        notes: "Chipper&nbsp;style".to_owned(),
        ..WorkoutSection::default()
    });
    workout.push_exercise(Exercise {
        name: "Wall Ball".to_owned(),
        section_index: Some(0),
        reps: 20,
        weight: 9.0,
        weight_unit: Some("kg".to_owned()),
        personal_record: true,
        ..Exercise::default()
    });
    workout.push_exercise(Exercise {
        name: "Rest".to_owned(),
        section_index: Some(0),
        ..Exercise::default()
    });
    workout.push_exercise(Exercise {
        name: "Run".to_owned(),
        distance: 400.0,
        distance_unit: Some("m".to_owned()),
        ..Exercise::default()
    });
    workout.result = Some(WorkoutResult {
        rounds: 7,
        reps: 12,
        score: Some("7+12".to_owned()),
        scaling: Scaling::Scaled,
        ..WorkoutResult::default()
    });
    workout.description = render_breakdown(&workout);
    workout
}

#[test]
fn test_breakdown_sections_and_exercises() {
    let text = render_breakdown(&amrap_workout());

    assert!(text.starts_with("🏋️ 20' AMRAP\nChipper style"));
    assert!(text.contains("→ 20 Wall Ball @ 9kg 🏆"));
    assert!(text.contains("✅ 7R + 12 reps"));
    assert!(text.contains("→ 400m Run"));
    assert!(text.contains("🔄 7 rounds + 12 reps"));
    assert!(text.ends_with("📉 Scaled"));
}

#[test]
fn test_breakdown_skips_rest_placeholders() {
    let text = render_breakdown(&amrap_workout());
    assert!(!text.contains("Rest"));
}

#[test]
fn test_breakdown_without_sections_uses_workout_name() {
    let mut workout = Workout::new("1", date(2024, 2, 3));
    workout.name = "Deadlift, Box Jump".to_owned();
    workout.push_exercise(Exercise {
        name: "Deadlift".to_owned(),
        reps: 5,
        ..Exercise::default()
    });
    let text = render_breakdown(&workout);
    assert_eq!(text, "🏋️ Deadlift, Box Jump\n\n→ 5 Deadlift");
}

#[test]
fn test_activity_notes_summary() {
    let notes = render_activity_notes(&amrap_workout());

    assert!(notes.starts_with("📋 20' AMRAP\n🏋️ Type: AMRAP"));
    assert!(notes.contains("📝 Workout:\n🏋️ 20' AMRAP"));
    assert!(notes.contains("  🔄 Rounds: 7 + 12 reps"));
    assert!(notes.contains("  📉 Scaled"));
    assert!(!notes.contains("📊 Score"));
    assert!(notes.contains("🏠 Box: CrossFit Norte"));
    assert!(notes.ends_with("📤 Synced via wod-sync"));
}

#[test]
fn test_activity_notes_time_and_raw_score() {
    let mut workout = ActivityParser::default()
        .parse(&fran_record("101", "20240115"))
        .unwrap();
    let notes = render_activity_notes(&workout);
    assert!(notes.contains("  ⏱️ Time: 4:12"));
    assert!(notes.contains("  ✅ Rx"));

    workout.result = Some(WorkoutResult {
        score: Some("DNF".to_owned()),
        ..WorkoutResult::default()
    });
    let notes = render_activity_notes(&workout);
    assert!(notes.contains("  📊 Score: DNF"));
}

#[test]
fn test_generic_type_is_not_shown() {
    let mut workout = Workout::new("1", date(2024, 2, 3));
    workout.name = "Open gym".to_owned();
    let notes = render_activity_notes(&workout);
    assert!(!notes.contains("Type:"));
}

#[test]
fn test_preview_lists_platform_fields() {
    let workout = amrap_workout();
    let preview = render_preview(
        &workout,
        &PreviewContext {
            platform: "strava",
            activity_type: "Crossfit",
            file: Some("2024-02-03_0000_20-amrap.tcx"),
        },
    );

    assert!(preview.starts_with("│ 🔶 STRAVA ACTIVITY PREVIEW"));
    assert!(preview.contains("│ 🏃 type:           Crossfit"));
    assert!(preview.contains("│ 🆔 external_id:    42"));
    assert!(preview.contains("│ 📁 file:           2024-02-03_0000_20-amrap.tcx"));
    assert!(preview.contains("│    • 20' AMRAP (20 min) → 7R + 12 reps"));
    assert!(preview.lines().last().unwrap().starts_with('└'));
}

#[test]
fn test_preview_unnamed_workout() {
    let workout = Workout::new("7", date(2024, 2, 3));
    let preview = render_preview(
        &workout,
        &PreviewContext {
            platform: "garmin",
            activity_type: "indoor_cardio",
            file: None,
        },
    );
    assert!(preview.contains("📛 name:           CrossFit WOD - 2024-02-03"));
    assert!(preview.contains("(no description)"));
    assert!(!preview.contains("📁 file"));
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_secs(252)), "4:12");
    assert_eq!(format_duration(Duration::from_secs(3723)), "1:02:03");
    assert_eq!(format_duration(Duration::ZERO), "0:00");
}

#[test]
fn test_clean_html_entities() {
    assert_eq!(
        clean_html_entities("21-15-9<br />Thrusters&nbsp;&amp; Pull-ups"),
        "21-15-9\nThrusters & Pull-ups"
    );
    assert_eq!(clean_html_entities("a<br><br><br><br>b"), "a\n\nb");
    assert_eq!(clean_html_entities("\u{201c}go\u{201d} \u{2019}n"), "\"go\" 'n");
}
