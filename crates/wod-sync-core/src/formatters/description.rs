// ABOUTME: Renders workouts as multi-line text for descriptions, file notes, and dry-run previews
// ABOUTME: Cleans HTML fragments from section notes and skips rest placeholders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::time::Duration;

use crate::constants::service_names::WOD_SYNC;
use crate::models::{Exercise, PrimaryQuantity, Scaling, Workout, WorkoutResult, WorkoutSection};

const SECTION_RULE: &str = "─────────────────────────";
const PREVIEW_WIDTH: usize = 50;
const PLACEHOLDER_EXERCISES: [&str; 3] = ["descanso rest", "rest", "descanso"];

/// Platform-specific fields shown in a dry-run preview
#[derive(Debug, Clone)]
pub struct PreviewContext<'a> {
    /// Destination name shown in the header
    pub platform: &'a str,
    /// Activity type the destination would assign
    pub activity_type: &'a str,
    /// Encoded file that would be uploaded
    pub file: Option<&'a str>,
}

/// Render the section-by-section breakdown of a workout
///
/// Sections are separated by a rule line. Exercises without a section are
/// listed after the sections; when the workout has no sections at all they
/// are listed under the workout name instead.
#[must_use]
pub fn render_breakdown(workout: &Workout) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (index, section) in workout.sections().iter().enumerate() {
        if index > 0 {
            push_rule(&mut lines);
        }
        lines.push(format!("🏋️ {}", section.title));
        if !section.notes.is_empty() {
            lines.push(clean_html_entities(&section.notes));
        }

        lines.push(String::new());
        lines.extend(
            workout
                .exercises_in_section(index)
                .filter(|exercise| !is_placeholder(&exercise.name))
                .map(exercise_line),
        );

        lines.push(String::new());
        lines.extend(section_result_lines(section));
    }

    let unassigned: Vec<String> = workout
        .unassigned_exercises()
        .filter(|exercise| !is_placeholder(&exercise.name))
        .map(exercise_line)
        .collect();
    if !unassigned.is_empty() {
        if workout.sections().is_empty() {
            lines.push(format!("🏋️ {}", workout.name));
        } else {
            push_rule(&mut lines);
        }
        lines.push(String::new());
        lines.extend(unassigned);
    }

    if let Some(result) = &workout.result {
        push_rule(&mut lines);
        lines.extend(overall_result_lines(result));
    }

    lines.join("\n")
}

/// Render the summary embedded in the encoded file's notes
#[must_use]
pub fn render_activity_notes(workout: &Workout) -> String {
    let mut parts: Vec<String> = Vec::new();

    if !workout.name.is_empty() {
        parts.push(format!("📋 {}", workout.name));
    }
    if !workout.workout_type.is_generic() {
        parts.push(format!("🏋️ Type: {}", workout.workout_type));
    }
    if !workout.description.is_empty() {
        parts.push(format!("\n📝 Workout:\n{}", workout.description));
    }

    if let Some(result) = &workout.result {
        parts.push("\n🎯 Result:".to_owned());
        if let Some(elapsed) = result.elapsed() {
            parts.push(format!("  ⏱️ Time: {}", format_duration(elapsed)));
        }
        if result.rounds > 0 {
            if result.reps > 0 {
                parts.push(format!(
                    "  🔄 Rounds: {} + {} reps",
                    result.rounds, result.reps
                ));
            } else {
                parts.push(format!("  🔄 Rounds: {}", result.rounds));
            }
        }
        if result.weight > 0.0 {
            parts.push(format!("  🏋️ Weight: {:.1} kg", result.weight));
        }
        if let Some(score) = result.score.as_deref().filter(|score| !score.is_empty()) {
            if result.elapsed_secs.is_none() && result.rounds == 0 {
                parts.push(format!("  📊 Score: {score}"));
            }
        }
        parts.push(
            match result.scaling {
                Scaling::RxPlus => "  ⭐ Rx+",
                Scaling::Scaled => "  📉 Scaled",
                Scaling::Rx => "  ✅ Rx",
            }
            .to_owned(),
        );
        if let Some(notes) = result.notes.as_deref().filter(|notes| !notes.is_empty()) {
            parts.push(format!("  💬 Notes: {notes}"));
        }
    }

    if !workout.venue_name.is_empty() {
        parts.push(format!("\n🏠 Box: {}", workout.venue_name));
    }
    parts.push(format!("\n📤 Synced via {WOD_SYNC}"));

    parts.join("\n")
}

/// Boxed dry-run preview of the activity a destination would receive
#[must_use]
pub fn render_preview(workout: &Workout, context: &PreviewContext<'_>) -> String {
    let rule = "─".repeat(PREVIEW_WIDTH);
    let name = if workout.name.is_empty() {
        format!("CrossFit WOD - {}", workout.date.format("%Y-%m-%d"))
    } else {
        workout.name.clone()
    };

    let mut lines = vec![
        format!("│ 🔶 {} ACTIVITY PREVIEW", context.platform.to_uppercase()),
        format!("│ {rule}"),
        format!("│ 📛 name:           {name}"),
        format!("│ 🏃 type:           {}", context.activity_type),
        format!("│ 📅 date:           {}", workout.date.format("%Y-%m-%d")),
        format!("│ 🆔 external_id:    {}", workout.id),
    ];
    if let Some(file) = context.file {
        lines.push(format!("│ 📁 file:           {file}"));
    }
    if let Some(elapsed) = workout.effective_duration() {
        lines.push(format!("│ ⏱️  elapsed_time:   {}", format_duration(elapsed)));
    }

    lines.push("│".to_owned());
    lines.push("│ 📝 description:".to_owned());
    lines.push(format!("│ {rule}"));
    if workout.description.is_empty() {
        lines.push("│    (no description)".to_owned());
    } else {
        lines.extend(
            workout
                .description
                .lines()
                .filter(|line| !line.is_empty())
                .map(|line| format!("│    {line}")),
        );
    }

    lines.push("│".to_owned());
    lines.push(format!("│ 🏠 Box:            {}", workout.venue_name));
    lines.push(format!("│ 🏋️  Workout Type:   {}", workout.workout_type));
    if !workout.sections().is_empty() {
        lines.push("│ 📋 Sections:".to_owned());
        lines.extend(workout.sections().iter().map(preview_section_line));
    }
    lines.push(format!("└{}", "─".repeat(PREVIEW_WIDTH + 19)));

    lines.join("\n")
}

/// Format an elapsed time as `H:MM:SS`, or `M:SS` below one hour
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Strip the HTML fragments the gym platform leaves in section notes
#[must_use]
pub fn clean_html_entities(text: &str) -> String {
    let with_breaks = text
        .replace("<br />", "\n")
        .replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("&nbsp;", " ");
    let mut cleaned = html_escape::decode_html_entities(&with_breaks)
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201c}', '\u{201d}'], "\"");
    while cleaned.contains("\n\n\n") {
        cleaned = cleaned.replace("\n\n\n", "\n\n");
    }
    cleaned.trim().to_owned()
}

fn push_rule(lines: &mut Vec<String>) {
    lines.push(String::new());
    lines.push(SECTION_RULE.to_owned());
    lines.push(String::new());
}

fn is_placeholder(name: &str) -> bool {
    let lowered = name.to_lowercase();
    PLACEHOLDER_EXERCISES.contains(&lowered.as_str())
}

fn exercise_line(exercise: &Exercise) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);
    match exercise.primary_quantity() {
        Some(PrimaryQuantity::Distance(distance, unit)) => {
            parts.push(format!("{distance:.0}{unit}"));
        }
        Some(PrimaryQuantity::RepsPerRound(reps) | PrimaryQuantity::Reps(reps)) => {
            parts.push(reps.to_string());
        }
        None => {}
    }
    if !exercise.name.is_empty() {
        parts.push(exercise.name.clone());
    }
    if exercise.weight > 0.0 {
        let unit = exercise.weight_unit.as_deref().unwrap_or("kg");
        parts.push(format!("@ {:.0}{unit}", exercise.weight));
    }
    if exercise.calories > 0 {
        parts.push(format!("{} cal", exercise.calories));
    }

    let mut line = format!("→ {}", parts.join(" "));
    if exercise.personal_record {
        line.push_str(" 🏆");
    }
    line
}

fn section_result_lines(section: &WorkoutSection) -> Vec<String> {
    let mut lines = Vec::with_capacity(2);
    match (section.rounds_completed, section.extra_reps) {
        (0, 0) => {}
        (0, reps) => lines.push(format!("✅ {reps} reps")),
        (rounds, 0) => lines.push(format!("✅ {rounds}/{rounds} sets")),
        (rounds, reps) => lines.push(format!("✅ {rounds}R + {reps} reps")),
    }
    if section.rx {
        lines.push("💪 RX".to_owned());
    }
    lines
}

fn overall_result_lines(result: &WorkoutResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(4);
    if let Some(elapsed) = result.elapsed() {
        lines.push(format!("⏱️ {}", format_short_duration(elapsed)));
    }
    if result.rounds > 0 {
        if result.reps > 0 {
            lines.push(format!("🔄 {} rounds + {} reps", result.rounds, result.reps));
        } else {
            lines.push(format!("🔄 {} rounds", result.rounds));
        }
    }
    if result.weight > 0.0 {
        lines.push(format!("🏋️ {:.0} kg", result.weight));
    }
    lines.push(
        match result.scaling {
            Scaling::RxPlus => "⭐ Rx+",
            Scaling::Rx => "💪 RX",
            Scaling::Scaled => "📉 Scaled",
        }
        .to_owned(),
    );
    lines
}

/// `M:SS` with minutes unbounded, or `Ns` below one minute
fn format_short_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}:{seconds:02}")
    } else {
        format!("{seconds}s")
    }
}

fn preview_section_line(section: &WorkoutSection) -> String {
    let mut line = format!("│    • {}", section.title);
    if let Some(cap) = section.time_cap_minutes.filter(|cap| *cap > 0) {
        line.push_str(&format!(" ({cap} min)"));
    }
    match (section.rounds_completed, section.extra_reps) {
        (0, _) => {}
        (rounds, 0) => line.push_str(&format!(" → {rounds} rounds")),
        (rounds, reps) => line.push_str(&format!(" → {rounds}R + {reps} reps")),
    }
    if section.rx {
        line.push_str(" ✅RX");
    }
    line
}
