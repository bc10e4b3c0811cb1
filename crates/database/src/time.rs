//! Millisecond timestamps and calendar-day strings.
//!
//! All days are UTC calendar days rendered as `YYYY-MM-DD`, which sort the
//! same lexicographically and chronologically.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeDelta, Utc};

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's UTC calendar day.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The `YYYY-MM-DD` day a millisecond timestamp falls on.
pub fn date_of(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| format_day(dt.date_naive()))
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Parse a strict `YYYY-MM-DD` day.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// The day `days` calendar days before `day`.
///
/// Saturates at the calendar bounds, so an oversized window covers every day.
pub fn days_before(day: NaiveDate, days: i64) -> NaiveDate {
    TimeDelta::try_days(days)
        .and_then(|delta| day.checked_sub_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MAX } else { NaiveDate::MIN })
}

/// Render a millisecond timestamp as RFC 3339 with millisecond precision.
pub fn to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Parse an ISO 8601 timestamp or bare date into milliseconds.
///
/// Accepts RFC 3339 (`2024-01-05T10:00:00Z`, with or without fractional
/// seconds or offset), a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC, and a bare
/// `YYYY-MM-DD` taken as UTC midnight.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Serde adapter for millisecond timestamps: written as RFC 3339, read back
/// from either RFC 3339 text or raw milliseconds.
pub mod rfc3339_millis {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Millis(i64),
        Text(String),
    }

    impl Wire {
        fn into_millis<E: de::Error>(self) -> Result<i64, E> {
            match self {
                Wire::Millis(millis) => Ok(millis),
                Wire::Text(text) => super::parse_timestamp(&text)
                    .ok_or_else(|| E::custom(format!("invalid timestamp '{text}'"))),
            }
        }
    }

    pub fn serialize<S: Serializer>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        match super::to_rfc3339(*millis) {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_i64(*millis),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Wire::deserialize(deserializer)?.into_millis()
    }

    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::Wire;

        pub fn serialize<S: Serializer>(
            millis: &Option<i64>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match millis {
                Some(millis) => super::serialize(millis, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<i64>, D::Error> {
            Option::<Wire>::deserialize(deserializer)?
                .map(Wire::into_millis)
                .transpose()
        }
    }
}
