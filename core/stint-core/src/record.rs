//! Completed-session records and their on-disk shape.
//!
//! # File Format
//!
//! Records are stored as camelCase JSON objects. Durations use the time-span
//! notation `[d.]hh:mm:ss[.fffffff]` (100 ns ticks), and optional fields that
//! are `None` are omitted:
//!
//! ```json
//! {
//!   "id": "01HQ8Z4T6V3J9W2K5M7N0P1R2S",
//!   "name": "Countdown 2",
//!   "isCountdown": true,
//!   "startTime": "2024-03-01T09:00:00Z",
//!   "endTime": "2024-03-01T09:00:30Z",
//!   "duration": "00:00:30",
//!   "countdownTarget": "00:00:30",
//!   "notes": "",
//!   "createdAt": "2024-03-01T09:00:30Z",
//!   "tags": ["focus"],
//!   "category": ""
//! }
//! ```
//!
//! Unknown fields are ignored on read.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StintError};

pub const NAME_MAX_CHARS: usize = 100;
pub const NOTES_MAX_CHARS: usize = 500;
pub const CATEGORY_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Assigned at creation; the store fills it in when empty.
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub is_countdown: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(with = "timespan")]
    pub duration: Duration,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timespan::option"
    )]
    pub countdown_target: Option<Duration>,
    #[serde(default)]
    pub notes: String,
    /// Set once, by the store, on first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
}

impl SessionRecord {
    pub fn stopwatch(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            is_countdown: false,
            start_time,
            end_time,
            duration: truncate_to_tick(duration),
            countdown_target: None,
            notes: String::new(),
            created_at: None,
            tags: Vec::new(),
            category: String::new(),
        }
    }

    pub fn countdown(
        name: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration: Duration,
        target: Duration,
    ) -> Self {
        Self {
            is_countdown: true,
            countdown_target: Some(truncate_to_tick(target)),
            ..Self::stopwatch(name, start_time, end_time, duration)
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<()> {
        let notes = notes.into();
        check_max("notes", &notes, NOTES_MAX_CHARS)?;
        self.notes = notes;
        Ok(())
    }

    /// Adds a tag unless an equal one (ignoring case) is already present.
    /// Returns whether the tag set changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Removes every tag equal to `tag` ignoring case. Returns whether any was removed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        let before = self.tags.len();
        self.tags.retain(|t| t.trim().to_lowercase() != wanted);
        self.tags.len() != before
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.trim().to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }

    /// Drops blank tags and case-insensitive duplicates, keeping first occurrences.
    pub fn normalize_tags(&mut self) {
        let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
        self.tags.retain(|tag| {
            let key = tag.trim().to_lowercase();
            if key.is_empty() || seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        });
        for tag in &mut self.tags {
            *tag = tag.trim().to_string();
        }
    }

    /// Drops precision the file format cannot hold, so a record compares equal
    /// to what is read back after saving.
    pub fn truncate_to_ticks(&mut self) {
        self.duration = truncate_to_tick(self.duration);
        self.countdown_target = self.countdown_target.map(truncate_to_tick);
    }

    /// Checks every data-model invariant. Runs before any I/O in the store.
    pub fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        check_max("notes", &self.notes, NOTES_MAX_CHARS)?;
        check_max("category", &self.category, CATEGORY_MAX_CHARS)?;
        if self.end_time < self.start_time {
            return Err(StintError::invalid(
                "endTime",
                "must not be earlier than startTime",
            ));
        }
        if self.countdown_target.is_some() && !self.is_countdown {
            return Err(StintError::invalid(
                "countdownTarget",
                "only allowed on countdown sessions",
            ));
        }
        Ok(())
    }
}

pub fn new_record_id() -> String {
    ulid::Ulid::new().to_string()
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StintError::invalid("name", "must not be empty"));
    }
    check_max("name", name, NAME_MAX_CHARS)
}

fn check_max(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(StintError::invalid(
            field,
            format!("{} characters exceeds limit of {}", len, max),
        ));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Time-span notation
// ─────────────────────────────────────────────────────────────────────────────

const NANOS_PER_TICK: u32 = 100;
const SECS_PER_DAY: u64 = 86_400;

/// Rounds down to the 100 ns resolution of the time-span notation.
pub fn truncate_to_tick(duration: Duration) -> Duration {
    let nanos = duration.subsec_nanos();
    Duration::new(duration.as_secs(), nanos - nanos % NANOS_PER_TICK)
}

/// Renders `[d.]hh:mm:ss[.fffffff]`. Sub-tick precision is truncated.
pub fn format_timespan(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    let ticks = duration.subsec_nanos() / NANOS_PER_TICK;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        out.push_str(&format!(".{:07}", ticks));
    }
    out
}

/// Parses the notation written by [`format_timespan`]. Negative spans are rejected.
pub fn parse_timespan(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() || s.starts_with('-') {
        return None;
    }

    // A trailing ".fffffff" follows the last ':'; a leading "d." precedes the first.
    let (clock, fraction) = match s.rfind('.') {
        Some(dot) if s[..dot].contains(':') => (&s[..dot], Some(&s[dot + 1..])),
        _ => (s, None),
    };

    let mut parts = clock.split(':');
    let head = parts.next()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    let (days, hours): (u64, u64) = match head.split_once('.') {
        Some((d, h)) => {
            let hours: u64 = h.parse().ok()?;
            if hours >= 24 {
                return None;
            }
            (d.parse().ok()?, hours)
        }
        None => (0, head.parse().ok()?),
    };

    let nanos = match fraction {
        Some(f) => {
            if f.is_empty() || f.len() > 7 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let ticks: u32 = format!("{:0<7}", f).parse().ok()?;
            ticks * NANOS_PER_TICK
        }
        None => 0,
    };

    let secs = days
        .checked_mul(SECS_PER_DAY)?
        .checked_add(hours.checked_mul(3600)?)?
        .checked_add(minutes * 60 + seconds)?;
    Some(Duration::new(secs, nanos))
}

pub(crate) mod timespan {
    use super::{format_timespan, parse_timespan};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timespan(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timespan(&raw).ok_or_else(|| de::Error::custom(format!("invalid time span: {}", raw)))
    }

    pub mod option {
        use crate::record::{format_timespan, parse_timespan};
        use serde::{de, Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S: Serializer>(
            value: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(d) => serializer.serialize_some(&format_timespan(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => parse_timespan(&raw)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid time span: {}", raw))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_timespan_plain() {
        assert_eq!(format_timespan(Duration::from_secs(8)), "00:00:08");
        assert_eq!(parse_timespan("00:00:08"), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_timespan_days_and_ticks() {
        let d = Duration::new(SECS_PER_DAY + 2 * 3600 + 3 * 60 + 4, 500_000_000);
        assert_eq!(format_timespan(d), "1.02:03:04.5000000");
        assert_eq!(parse_timespan("1.02:03:04.5000000"), Some(d));
        assert_eq!(parse_timespan("1.02:03:04.5"), Some(d));
    }

    #[test]
    fn test_timespan_truncates_below_one_tick() {
        assert_eq!(format_timespan(Duration::new(1, 150)), "00:00:01.0000001");
    }

    #[test]
    fn test_timespan_rejects_garbage() {
        for bad in ["", "-00:00:01", "12", "00:61:00", "00:00:00.12345678", "a:b:c", "1.25:00:00"] {
            assert_eq!(parse_timespan(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_json_omits_absent_countdown_target_and_created_at() {
        let record = SessionRecord::stopwatch("Timer 1", at(0), at(8), Duration::from_secs(8));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("countdownTarget").is_none());
        assert!(json.get("createdAt").is_none());
        assert_eq!(json["isCountdown"], false);
        assert_eq!(json["duration"], "00:00:08");
    }

    #[test]
    fn test_json_ignores_unknown_fields() {
        let json = r#"{
            "id": "abc",
            "name": "Countdown 1",
            "isCountdown": true,
            "startTime": "2024-03-01T09:00:00Z",
            "endTime": "2024-03-01T09:00:30Z",
            "duration": "00:00:30",
            "countdownTarget": "00:00:30",
            "efficiency": 100,
            "futureField": {"nested": true}
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.countdown_target, Some(Duration::from_secs(30)));
        assert!(record.tags.is_empty());
        assert_eq!(record.notes, "");
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let mut record = SessionRecord::stopwatch("Timer 1", at(0), at(1), Duration::from_secs(1));
        assert!(record.add_tag("Focus"));
        assert!(!record.add_tag("focus"));
        assert!(!record.add_tag("  FOCUS "));
        assert!(!record.add_tag("   "));
        assert!(record.add_tag("deep work"));
        assert_eq!(record.tags, vec!["Focus", "deep work"]);

        assert!(record.remove_tag("fOcUs"));
        assert!(!record.remove_tag("focus"));
        assert_eq!(record.tags, vec!["deep work"]);
    }

    #[test]
    fn test_normalize_tags_dedups_loaded_data() {
        let mut record = SessionRecord::stopwatch("Timer 1", at(0), at(1), Duration::from_secs(1));
        record.tags = vec![
            "Alpha".into(),
            " alpha".into(),
            "".into(),
            "Beta ".into(),
        ];
        record.normalize_tags();
        assert_eq!(record.tags, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_validate_limits() {
        let mut record = SessionRecord::stopwatch("Timer 1", at(0), at(1), Duration::from_secs(1));
        assert!(record.validate().is_ok());

        assert!(record.set_name("").is_err());
        assert!(record.set_name("x".repeat(NAME_MAX_CHARS + 1)).is_err());
        assert!(record.set_name("x".repeat(NAME_MAX_CHARS)).is_ok());
        assert!(record.set_notes("n".repeat(NOTES_MAX_CHARS + 1)).is_err());
        assert_eq!(record.notes, "");

        record.category = "c".repeat(CATEGORY_MAX_CHARS + 1);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_end_before_start() {
        let record = SessionRecord::stopwatch("Timer 1", at(5), at(0), Duration::ZERO);
        assert!(matches!(
            record.validate(),
            Err(StintError::InvalidInput { ref field, .. }) if field == "endTime"
        ));
    }

    #[test]
    fn test_validate_rejects_target_on_stopwatch() {
        let mut record = SessionRecord::stopwatch("Timer 1", at(0), at(1), Duration::from_secs(1));
        record.countdown_target = Some(Duration::from_secs(1));
        assert!(record.validate().is_err());
    }
}
