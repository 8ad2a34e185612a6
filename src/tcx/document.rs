// ABOUTME: Training Center Database (TCX v2) document rendering for one workout
// ABOUTME: Single lap, synthesized heart-rate track, notes, creator and author blocks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 wod-sync contributors

use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};
use html_escape::encode_text;

use super::heart_rate::synthesize;
use crate::constants::{service_names::WOD_SYNC, workout_defaults};
use crate::formatters::render_activity_notes;
use crate::models::Workout;

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const TCD_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const USER_PROFILE_NS: &str = "http://www.garmin.com/xmlschemas/UserProfile/v2";
const ACTIVITY_EXTENSION_NS: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";
const PROFILE_EXTENSION_NS: &str = "http://www.garmin.com/xmlschemas/ProfileExtension/v1";
const ACTIVITY_GOALS_NS: &str = "http://www.garmin.com/xmlschemas/ActivityGoals/v1";
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";

/// The format has no CrossFit sport, every workout is `Other`
pub const SPORT: &str = "Other";

/// Start of the workout, interpreted as UTC
///
/// Uses the class time (`HH:MM` or `HHMM`) when present, then the time the
/// workout was logged, then midnight.
#[must_use]
pub fn start_time(workout: &Workout) -> DateTime<Utc> {
    let time = workout
        .class_time
        .as_deref()
        .and_then(parse_class_time)
        .or(workout.time_of_day)
        .unwrap_or(NaiveTime::MIN);
    workout.date.and_time(time).and_utc()
}

fn parse_class_time(class_time: &str) -> Option<NaiveTime> {
    let digits = class_time.replace(':', "");
    if digits.len() < 4 || !digits.is_ascii() {
        return None;
    }
    let hour = digits[..2].parse().ok()?;
    let minute = digits[2..4].parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render the complete TCX document
#[must_use]
pub fn render_tcx(workout: &Workout, start: DateTime<Utc>, duration: Duration) -> String {
    let notes = encode_text(&render_activity_notes(workout)).into_owned();
    let id = timestamp(start);
    let result = workout.result.as_ref();
    let calories = result
        .and_then(|result| result.calories)
        .filter(|calories| *calories > 0)
        .unwrap_or(workout_defaults::CALORIES);
    let average_bpm = result
        .and_then(|result| result.avg_heart_rate)
        .filter(|bpm| *bpm > 0)
        .unwrap_or(workout_defaults::AVERAGE_HEART_RATE);
    let max_bpm = result
        .and_then(|result| result.max_heart_rate)
        .filter(|bpm| *bpm > 0)
        .unwrap_or(workout_defaults::MAX_HEART_RATE);

    let mut xml = String::with_capacity(8 * 1024);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<TrainingCenterDatabase xmlns=\"{TCD_NS}\" xmlns:xsi=\"{XSI_NS}\" \
         xmlns:ns2=\"{USER_PROFILE_NS}\" xmlns:ns3=\"{ACTIVITY_EXTENSION_NS}\" \
         xmlns:ns4=\"{PROFILE_EXTENSION_NS}\" xmlns:ns5=\"{ACTIVITY_GOALS_NS}\" \
         xsi:schemaLocation=\"{SCHEMA_LOCATION}\">"
    );
    xml.push_str("  <Activities>\n");
    let _ = writeln!(xml, "    <Activity Sport=\"{SPORT}\">");
    let _ = writeln!(xml, "      <Id>{id}</Id>");
    let _ = writeln!(xml, "      <Lap StartTime=\"{id}\">");
    let _ = writeln!(
        xml,
        "        <TotalTimeSeconds>{}</TotalTimeSeconds>",
        duration.as_secs()
    );
    xml.push_str("        <DistanceMeters>0</DistanceMeters>\n");
    let _ = writeln!(xml, "        <Calories>{calories}</Calories>");
    let _ = writeln!(
        xml,
        "        <AverageHeartRateBpm>\n          <Value>{average_bpm}</Value>\n        </AverageHeartRateBpm>"
    );
    let _ = writeln!(
        xml,
        "        <MaximumHeartRateBpm>\n          <Value>{max_bpm}</Value>\n        </MaximumHeartRateBpm>"
    );
    xml.push_str("        <Intensity>Active</Intensity>\n");
    xml.push_str("        <TriggerMethod>Manual</TriggerMethod>\n");
    xml.push_str("        <Track>\n");
    for sample in synthesize(duration) {
        let offset = TimeDelta::seconds(i64::from(sample.offset_secs as u32));
        let _ = writeln!(
            xml,
            "          <Trackpoint>\n            <Time>{}</Time>\n            <HeartRateBpm>\n              <Value>{}</Value>\n            </HeartRateBpm>\n          </Trackpoint>",
            timestamp(start + offset),
            sample.bpm
        );
    }
    xml.push_str("        </Track>\n");
    let _ = writeln!(xml, "        <Notes>{notes}</Notes>");
    xml.push_str("      </Lap>\n");
    let _ = writeln!(xml, "      <Notes>{notes}</Notes>");
    let _ = writeln!(
        xml,
        "      <Creator xsi:type=\"Device_t\">\n        <Name>{WOD_SYNC}</Name>\n        <UnitId>0</UnitId>\n        <ProductID>0</ProductID>\n        <Version>\n          <VersionMajor>1</VersionMajor>\n          <VersionMinor>0</VersionMinor>\n        </Version>\n      </Creator>"
    );
    xml.push_str("    </Activity>\n");
    xml.push_str("  </Activities>\n");
    let _ = writeln!(
        xml,
        "  <Author xsi:type=\"Application_t\">\n    <Name>{WOD_SYNC}</Name>\n    <Build>\n      <Version>\n        <VersionMajor>1</VersionMajor>\n        <VersionMinor>0</VersionMinor>\n      </Version>\n    </Build>\n    <LangID>en</LangID>\n    <PartNumber>000-00000-00</PartNumber>\n  </Author>"
    );
    xml.push_str("</TrainingCenterDatabase>\n");
    xml
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_start_time_prefers_class_time() {
        let mut workout = Workout::new("1", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(timestamp(start_time(&workout)), "2024-01-15T00:00:00Z");
        workout.time_of_day = NaiveTime::from_hms_opt(18, 5, 0);
        assert_eq!(timestamp(start_time(&workout)), "2024-01-15T18:05:00Z");
        workout.class_time = Some("0730".to_owned());
        assert_eq!(timestamp(start_time(&workout)), "2024-01-15T07:30:00Z");
        workout.class_time = Some("bad".to_owned());
        assert_eq!(timestamp(start_time(&workout)), "2024-01-15T18:05:00Z");
    }

    #[test]
    fn test_notes_are_escaped() {
        let mut workout = Workout::new("1", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        workout.name = "Row <500m> & run".to_owned();
        let xml = render_tcx(&workout, start_time(&workout), Duration::from_secs(600));
        assert!(xml.contains("Row &lt;500m&gt; &amp; run"));
        assert!(!xml.contains("<500m>"));
    }
}
