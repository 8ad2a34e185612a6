// ABOUTME: Section extraction from raw TIPOWODs entries with time cap, title, and type inference
// ABOUTME: Holds the benchmark, hero, and EMOM interval pattern tables used by the parser
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::fields;
use crate::formatters::clean_html_entities;
use crate::models::{WorkoutSection, WorkoutType};

/// Section type code for EMOM blocks
const EMOM_CODE: i64 = 3;
/// Largest time cap that still reads as an EMOM interval
const MAX_EMOM_INTERVAL_MINUTES: i64 = 5;

/// Named workouts searched for in section notes, in priority order
const BENCHMARK_TITLES: [&str; 14] = [
    r"12\s+DAYS?\s+OF\s+CHRISTMAS",
    "MURPH",
    "FRAN",
    "HELEN",
    "GRACE",
    "CINDY",
    "ANNIE",
    "DIANE",
    "ELIZABETH",
    "JACKIE",
    "KAREN",
    "MARY",
    "ISABEL",
    "NANCY",
];

const HERO_NAMES: [&str; 15] = [
    "MURPH", "DT", "MICHAEL", "RYAN", "RANDY", "JOSH", "CHAD", "TOMMY V", "NICK", "NATE", "JARED",
    "BADGER", "JASON", "WHITTEN", "JT",
];

const GIRL_NAMES: [&str; 16] = [
    "FRAN", "GRACE", "HELEN", "DIANE", "ELIZABETH", "ANNIE", "ISABEL", "KAREN", "NANCY", "CINDY",
    "JACKIE", "MARY", "EVA", "KELLY", "LINDA", "AMANDA",
];

static TIME_CAP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)TC\s*[:=]?\s*(\d+)['’′]?",
        r"(?i)Time\s*Cap\s*[:=]?\s*(\d+)",
        r"(?i)(\d+)\s*min(?:utes?)?\s*cap",
        r"(?i)cap\s*[:=]?\s*(\d+)\s*min",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static BENCHMARK_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BENCHMARK_TITLES
        .iter()
        .filter_map(|name| Regex::new(&format!(r"(?i)\b{name}\b")).ok())
        .collect()
});

static HERO_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| word_list(&HERO_NAMES));
static GIRL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| word_list(&GIRL_NAMES));
static OPEN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bOPEN\s*'?(?:20)?\d{2}(?:\.\d+)?\b").ok());

enum EmomPattern {
    MinutesSeconds,
    MinutesTick,
    MinutesWord,
    Canonical,
}

static EMOM_PATTERNS: LazyLock<Vec<(EmomPattern, Regex)>> = LazyLock::new(|| {
    [
        (EmomPattern::MinutesSeconds, r#"(?i)EVERY\s+(\d+)['’′](\d+)["”″]?"#),
        (EmomPattern::MinutesTick, r"(?i)EVERY\s+(\d+)['’′]\s"),
        (EmomPattern::MinutesWord, r"(?i)EVERY\s+(\d+)\s*min"),
        (EmomPattern::Canonical, r"(?i)E(\d+)MO(\d+)M"),
    ]
    .into_iter()
    .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (kind, re)))
    .collect()
});

fn word_list(words: &[&str]) -> Option<Regex> {
    Regex::new(&format!(r"\b(?:{})\b", words.join("|"))).ok()
}

/// Build a section from one raw `TIPOWODs` entry
///
/// Returns `None` when no title could be established.
#[must_use]
pub fn parse_section(raw: &Value) -> Option<WorkoutSection> {
    let code = fields::integer(raw, "type").unwrap_or_default();
    let notes = fields::text(raw, "notes").unwrap_or_default();
    let mut title = fields::text(raw, "title").unwrap_or_default();

    let mut cap = fields::integer(raw, "timecap").unwrap_or_default();
    if cap <= 1 && !notes.is_empty() {
        if let Some(from_notes) = time_cap_from_notes(&notes) {
            cap = from_notes;
        }
    }

    if code == EMOM_CODE && title == "EMOM" && !notes.is_empty() {
        if let Some(label) = emom_label(&notes, cap) {
            title = label;
        }
    }

    if title.is_empty() {
        title = infer_title(&notes, code, cap);
    } else if let Some(benchmark) = canonical_benchmark(&title) {
        title = benchmark;
    }
    if title.is_empty() {
        return None;
    }

    let section_type =
        WorkoutType::from_section_code(code).unwrap_or_else(|| detect_type_from_name(&title));

    Some(WorkoutSection {
        id: fields::text(raw, "id"),
        title,
        section_type,
        time_cap_minutes: u32::try_from(cap).ok().filter(|minutes| *minutes > 0),
        rounds: fields::count(raw, "rondas"),
        rounds_completed: fields::count(raw, "res"),
        extra_reps: fields::count(raw, "reps"),
        rx: fields::flag(raw, "rx").unwrap_or(false),
        time: section_time(raw),
        notes,
    })
}

/// Recorded section time, ignoring the `"0"` placeholder
fn section_time(raw: &Value) -> Option<String> {
    fields::text(raw, "time").filter(|time| time != "0")
}

/// Time cap in minutes recovered from free-text notes, first pattern wins
#[must_use]
pub fn time_cap_from_notes(notes: &str) -> Option<i64> {
    TIME_CAP_PATTERNS.iter().find_map(|re| {
        re.captures(notes)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .filter(|minutes| *minutes > 0)
    })
}

/// Title for a section that arrived without one
///
/// Named workouts found in the notes win, then the type label (prefixed
/// with the cap for AMRAP and For Time codes), then `"<cap> min WOD"`, then
/// `"WOD"`.
#[must_use]
pub fn infer_title(notes: &str, code: i64, cap: i64) -> String {
    if !notes.is_empty() {
        if let Some(name) = benchmark_in_notes(&clean_html_entities(notes)) {
            return name;
        }
    }

    if let Some(label) = type_label(code) {
        if cap > 0 && matches!(code, 2 | 5 | 11) {
            return format!("{cap}' {label}");
        }
        return label.to_owned();
    }

    if cap > 0 {
        return format!("{cap} min WOD");
    }
    "WOD".to_owned()
}

const fn type_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Strength"),
        2 => Some("AMRAP"),
        3 => Some("EMOM"),
        4 => Some("Tabata"),
        5 | 11 => Some("For Time"),
        6 => Some("Max Reps"),
        7 => Some("Max Weight"),
        8 => Some("Chipper"),
        9 => Some("RFT"),
        10 => Some("Ladder"),
        12 => Some("YGIG"),
        _ => None,
    }
}

fn benchmark_in_notes(notes: &str) -> Option<String> {
    BENCHMARK_PATTERNS
        .iter()
        .find_map(|re| re.find(notes))
        .map(|m| m.as_str().to_uppercase())
}

/// Upper-cased benchmark name when `title` is exactly one
fn canonical_benchmark(title: &str) -> Option<String> {
    benchmark_in_notes(title).filter(|name| name.eq_ignore_ascii_case(title.trim()))
}

/// Canonical interval label such as `E2MO2M` parsed from EMOM notes
///
/// Falls back to the time cap when it is a plausible interval.
#[must_use]
pub fn emom_label(notes: &str, cap: i64) -> Option<String> {
    let from_notes = EMOM_PATTERNS.iter().find_map(|(kind, re)| {
        let caps = re.captures(notes)?;
        let minutes = caps.get(1)?.as_str();
        Some(match kind {
            EmomPattern::MinutesSeconds => {
                let seconds = caps.get(2)?.as_str();
                if seconds == "30" {
                    format!("E{minutes}MO{minutes}M")
                } else {
                    format!("E{minutes}:{seconds}MO{minutes}:{seconds}M")
                }
            }
            EmomPattern::MinutesTick | EmomPattern::MinutesWord => {
                format!("E{minutes}MO{minutes}M")
            }
            EmomPattern::Canonical => caps.get(0)?.as_str().to_owned(),
        })
    });

    from_notes.or_else(|| {
        (1..=MAX_EMOM_INTERVAL_MINUTES)
            .contains(&cap)
            .then(|| format!("E{cap}MO{cap}M"))
    })
}

/// Workout style guessed from a display name
#[must_use]
pub fn detect_type_from_name(name: &str) -> WorkoutType {
    let upper = name.to_uppercase();
    let matches = |pattern: &LazyLock<Option<Regex>>| {
        pattern.as_ref().is_some_and(|re| re.is_match(&upper))
    };

    if upper.contains("AMRAP") {
        WorkoutType::Amrap
    } else if upper.contains("FOR TIME") || upper.contains("FORTIME") {
        WorkoutType::ForTime
    } else if upper.contains("EMOM") {
        WorkoutType::Emom
    } else if upper.contains("TABATA") {
        WorkoutType::Tabata
    } else if upper.contains("STRENGTH") || upper.contains("FUERZA") {
        WorkoutType::Strength
    } else if upper.contains("SKILL") || upper.contains("TECNICA") {
        WorkoutType::Skill
    } else if matches(&OPEN_PATTERN) {
        WorkoutType::Open
    } else if matches(&HERO_PATTERN) {
        WorkoutType::Hero
    } else if matches(&GIRL_PATTERN) {
        WorkoutType::Benchmark
    } else {
        WorkoutType::Generic
    }
}
