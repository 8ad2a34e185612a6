// ABOUTME: Deterministic TCX file names built from the workout date, start time, and name
// ABOUTME: Slugs replace path-unsafe characters, collapse hyphens, and are length-capped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use crate::models::Workout;

/// Longest slug kept in a file name
pub const MAX_SLUG_CHARS: usize = 50;
/// Extension of encoded files
pub const EXTENSION: &str = "tcx";

const UNSAFE_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// File-name-safe slug of `name`, `"workout"` when nothing survives
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        let ch = if UNSAFE_CHARS.contains(&ch) { '-' } else { ch };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.extend(ch.to_lowercase());
    }

    let capped: String = slug
        .trim_matches('-')
        .chars()
        .take(MAX_SLUG_CHARS)
        .collect();
    let capped = capped.trim_end_matches('-');
    if capped.is_empty() {
        "workout".to_owned()
    } else {
        capped.to_owned()
    }
}

/// `HHMM` of the class start, else of the logged time, else `0000`
#[must_use]
pub fn start_hhmm(workout: &Workout) -> String {
    workout
        .class_time
        .as_deref()
        .map(|class_time| class_time.replace(':', ""))
        .filter(|digits| digits.len() >= 4 && digits.is_ascii())
        .map(|digits| digits[..4].to_owned())
        .or_else(|| workout.time_of_day.map(|time| time.format("%H%M").to_string()))
        .unwrap_or_else(|| "0000".to_owned())
}

/// `<date>_<HHMM>_<slug>.tcx`
#[must_use]
pub fn file_name(workout: &Workout) -> String {
    format!(
        "{}_{}_{}.{EXTENSION}",
        workout.date.format("%Y-%m-%d"),
        start_hhmm(workout),
        slugify(&workout.name)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn workout(name: &str) -> Workout {
        let mut workout = Workout::new("1", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        workout.name = name.to_owned();
        workout
    }

    #[test]
    fn test_file_name_without_time() {
        assert_eq!(
            file_name(&workout("20' AMRAP + Strength")),
            "2024-01-15_0000_20'-amrap-+-strength.tcx"
        );
    }

    #[test]
    fn test_class_time_wins_over_logged_time() {
        let mut w = workout("Fran");
        w.time_of_day = NaiveTime::from_hms_opt(19, 45, 10);
        assert_eq!(file_name(&w), "2024-01-15_1945_fran.tcx");
        w.class_time = Some("07:30".to_owned());
        assert_eq!(file_name(&w), "2024-01-15_0730_fran.tcx");
    }

    #[test]
    fn test_empty_slug_falls_back() {
        assert_eq!(slugify(" / : "), "workout");
        assert_eq!(slugify(""), "workout");
    }
}
