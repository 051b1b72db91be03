//! Lenient ISO-8601 parsing for wire timestamps.
//!
//! Offsets are honored; a timestamp without offset is taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{Deserialize, Deserializer, Error};

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 timestamp into UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| naive.and_utc())
    })
}

/// `deserialize_with` helper for required timestamp fields.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .ok_or_else(|| D::Error::custom(format!("expected an ISO-8601 timestamp, got `{text}`")))
}

/// `deserialize_with` helper for optional patch fields. Only called when the
/// key is present, so an explicit `null` is an error rather than "unset".
pub fn deserialize_some<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_accept_offsets_and_naive_values() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 26, 13, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-26T13:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26T15:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26T13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
