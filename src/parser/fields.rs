// ABOUTME: Typed extraction chains for loosely-typed source record fields
// ABOUTME: Each reader tries an explicit ordered list of representations before giving up
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

//! Field readers for raw activity records.
//!
//! The source sends the same logical field sometimes as a JSON string and
//! sometimes as a JSON number. Every reader below documents the order in
//! which it tries the representations; the first one that yields a usable
//! value wins.

use serde_json::{Number, Value};

/// One representation a raw field can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// JSON string
    Text,
    /// JSON number
    Number,
    /// JSON boolean
    Boolean,
}

/// Order used by [`text`]
pub const TEXT_CHAIN: [Representation; 2] = [Representation::Text, Representation::Number];
/// Order used by [`integer`] and [`float`]
pub const NUMERIC_CHAIN: [Representation; 2] = [Representation::Number, Representation::Text];
/// Order used by [`flag`]
pub const FLAG_CHAIN: [Representation; 3] = [
    Representation::Text,
    Representation::Number,
    Representation::Boolean,
];

/// Non-empty trimmed text: string form first, then number form
#[must_use]
pub fn text(record: &Value, key: &str) -> Option<String> {
    let value = record.get(key)?;
    TEXT_CHAIN.iter().find_map(|repr| match (repr, value) {
        (Representation::Text, Value::String(raw)) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        (Representation::Number, Value::Number(number)) => Some(number_text(number)),
        _ => None,
    })
}

/// First key in `keys` that yields [`text`]
#[must_use]
pub fn first_text(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(record, key))
}

/// Integer: number form first (truncating fractions), then parsed string form
#[must_use]
pub fn integer(record: &Value, key: &str) -> Option<i64> {
    record.get(key).and_then(integer_value)
}

/// Integer reading of a bare value, with the same chain as [`integer`]
#[must_use]
pub fn integer_value(value: &Value) -> Option<i64> {
    NUMERIC_CHAIN.iter().find_map(|repr| match (repr, value) {
        (Representation::Number, Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        (Representation::Text, Value::String(raw)) => {
            let trimmed = raw.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|float| float.trunc() as i64))
        }
        _ => None,
    })
}

/// Non-negative integer narrowed to `u32`, zero when absent or negative
#[must_use]
pub fn count(record: &Value, key: &str) -> u32 {
    integer(record, key)
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or_default()
}

/// Float: number form first, then parsed string form
#[must_use]
pub fn float(record: &Value, key: &str) -> Option<f64> {
    record.get(key).and_then(float_value)
}

/// Float reading of a bare value, with the same chain as [`float`]
#[must_use]
pub fn float_value(value: &Value) -> Option<f64> {
    NUMERIC_CHAIN.iter().find_map(|repr| match (repr, value) {
        (Representation::Number, Value::Number(number)) => number.as_f64(),
        (Representation::Text, Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Boolean flag: `"1"`/`"true"` string, then `1` number, then JSON `true`
///
/// Returns `None` only when the key is missing or holds an unrelated type,
/// so callers can tell "explicitly off" from "absent".
#[must_use]
pub fn flag(record: &Value, key: &str) -> Option<bool> {
    let value = record.get(key)?;
    FLAG_CHAIN.iter().find_map(|repr| match (repr, value) {
        (Representation::Text, Value::String(raw)) => {
            let raw = raw.trim();
            Some(raw == "1" || raw.eq_ignore_ascii_case("true"))
        }
        (Representation::Number, Value::Number(number)) => {
            Some(number.as_f64().is_some_and(|float| (float - 1.0).abs() < f64::EPSILON))
        }
        (Representation::Boolean, Value::Bool(flag)) => Some(*flag),
        _ => None,
    })
}

/// Array elements under `key`, empty when absent or not an array
#[must_use]
pub fn array<'a>(record: &'a Value, key: &str) -> &'a [Value] {
    record
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn number_text(number: &Number) -> String {
    if let Some(int) = number.as_i64() {
        return int.to_string();
    }
    match number.as_f64() {
        Some(float) if float.fract() == 0.0 => format!("{float:.0}"),
        _ => number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_text_accepts_string_then_number() {
        let record = json!({"a": " 42 ", "b": 42, "c": 4.2e1, "d": "", "e": null});
        assert_eq!(text(&record, "a").as_deref(), Some("42"));
        assert_eq!(text(&record, "b").as_deref(), Some("42"));
        assert_eq!(text(&record, "c").as_deref(), Some("42"));
        assert_eq!(text(&record, "d"), None);
        assert_eq!(text(&record, "e"), None);
        assert_eq!(text(&record, "missing"), None);
    }

    #[test]
    fn test_integer_chain() {
        let record = json!({"n": 7, "f": 7.9, "s": "12", "sf": "3.0", "bad": "x"});
        assert_eq!(integer(&record, "n"), Some(7));
        assert_eq!(integer(&record, "f"), Some(7));
        assert_eq!(integer(&record, "s"), Some(12));
        assert_eq!(integer(&record, "sf"), Some(3));
        assert_eq!(integer(&record, "bad"), None);
    }

    #[test]
    fn test_flag_chain() {
        let record = json!({"s": "1", "z": "0", "n": 1, "b": true, "o": {}});
        assert_eq!(flag(&record, "s"), Some(true));
        assert_eq!(flag(&record, "z"), Some(false));
        assert_eq!(flag(&record, "n"), Some(true));
        assert_eq!(flag(&record, "b"), Some(true));
        assert_eq!(flag(&record, "o"), None);
    }

    #[test]
    fn test_count_rejects_negative() {
        let record = json!({"neg": -3, "pos": "5"});
        assert_eq!(count(&record, "neg"), 0);
        assert_eq!(count(&record, "pos"), 5);
    }
}
