//! Timestamps and durations
//!
//! - `Timestamp`: a parsed instant that remembers the exact string it came from,
//!   so serialization reproduces the source format
//! - `IsoDuration`: an ISO-8601 duration, accepting numeric seconds on input

use super::error::{StatementError, StatementResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::sync::OnceLock;

/// Parse an xAPI timestamp string into a UTC instant.
///
/// Accepts RFC 3339, ISO-8601 with a `+hhmm` offset, offset-less date-times
/// (read as UTC) and bare dates.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A statement timestamp (`timestamp` or `stored`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    instant: DateTime<Utc>,
}

impl Timestamp {
    /// Parse a timestamp, keeping the original representation
    pub fn parse(raw: impl Into<String>) -> StatementResult<Self> {
        let raw = raw.into();
        match parse_instant(&raw) {
            Some(instant) => Ok(Self { raw, instant }),
            None => Err(StatementError::InvalidTimestamp(raw)),
        }
    }

    /// The string this timestamp was read from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed instant in UTC
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            raw: instant.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            instant,
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(raw).map_err(de::Error::custom)
    }
}

/// An ISO-8601 duration such as `PT1M30.5S`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IsoDuration(String);

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^P(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("duration pattern is valid")
    })
}

impl IsoDuration {
    /// Wrap an ISO-8601 duration string as-is
    pub fn new(iso: impl Into<String>) -> Self {
        Self(iso.into())
    }

    /// Convert a number of seconds into `PT[nH][nM][nS]` form
    pub fn from_seconds(seconds: f64) -> StatementResult<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(StatementError::InvalidDuration(seconds.to_string()));
        }

        let total_millis = (seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let millis = total_millis % 60_000;

        let mut iso = String::from("PT");
        if hours > 0 {
            iso.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            iso.push_str(&format!("{}M", minutes));
        }
        if millis > 0 || (hours == 0 && minutes == 0) {
            iso.push_str(&format!("{}S", millis as f64 / 1000.0));
        }

        Ok(Self(iso))
    }

    /// The ISO-8601 text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Total length in seconds.
    ///
    /// Only week/day/hour/minute/second designators are understood; durations
    /// using years or months have no fixed length and return `None`.
    pub fn as_seconds(&self) -> Option<f64> {
        let captures = duration_pattern().captures(&self.0)?;
        let factors = [604_800.0, 86_400.0, 3_600.0, 60.0, 1.0];

        let mut total = 0.0;
        let mut any = false;
        for (i, factor) in factors.iter().enumerate() {
            if let Some(m) = captures.get(i + 1) {
                total += m.as_str().parse::<f64>().ok()? * factor;
                any = true;
            }
        }
        any.then_some(total)
    }
}

impl std::fmt::Display for IsoDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for IsoDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for IsoDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(iso) => Ok(Self(iso)),
            Value::Number(n) => {
                let seconds = n
                    .as_f64()
                    .ok_or_else(|| de::Error::custom(format!("invalid duration: {}", n)))?;
                IsoDuration::from_seconds(seconds).map_err(de::Error::custom)
            }
            other => Err(de::Error::custom(StatementError::InvalidDuration(
                other.to_string(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_instant_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();

        assert_eq!(parse_instant("2025-01-01T08:00:00Z"), Some(expected));
        assert_eq!(parse_instant("2025-01-01T08:00:00.000+00:00"), Some(expected));
        assert_eq!(parse_instant("2025-01-01T09:00:00+0100"), Some(expected));
        assert_eq!(parse_instant("2025-01-01T08:00:00"), Some(expected));
        assert_eq!(
            parse_instant("2025-01-01"),
            Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_instant("last tuesday"), None);
    }

    #[test]
    fn test_timestamp_keeps_original_string() {
        let ts = Timestamp::parse("2025-01-01T09:00:00.000+01:00").unwrap();
        assert_eq!(ts.as_str(), "2025-01-01T09:00:00.000+01:00");
        assert_eq!(ts.instant(), Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap());

        let json = serde_json::to_value(&ts).unwrap();
        assert_eq!(json, Value::String("2025-01-01T09:00:00.000+01:00".into()));
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(matches!(
            Timestamp::parse("not a time"),
            Err(StatementError::InvalidTimestamp(_))
        ));
        assert!(serde_json::from_value::<Timestamp>(Value::String("soon".into())).is_err());
    }

    #[test]
    fn test_duration_from_seconds() {
        assert_eq!(IsoDuration::from_seconds(0.0).unwrap().as_str(), "PT0S");
        assert_eq!(IsoDuration::from_seconds(45.0).unwrap().as_str(), "PT45S");
        assert_eq!(IsoDuration::from_seconds(90.5).unwrap().as_str(), "PT1M30.5S");
        assert_eq!(IsoDuration::from_seconds(3600.0).unwrap().as_str(), "PT1H");
        assert_eq!(IsoDuration::from_seconds(3725.0).unwrap().as_str(), "PT1H2M5S");
        assert!(IsoDuration::from_seconds(-1.0).is_err());
    }

    #[test]
    fn test_duration_deserialize() {
        let iso: IsoDuration = serde_json::from_value(serde_json::json!("PT2H")).unwrap();
        assert_eq!(iso.as_str(), "PT2H");

        let from_number: IsoDuration = serde_json::from_value(serde_json::json!(75)).unwrap();
        assert_eq!(from_number.as_str(), "PT1M15S");

        assert!(serde_json::from_value::<IsoDuration>(serde_json::json!(true)).is_err());
        assert!(serde_json::from_value::<IsoDuration>(serde_json::json!(["PT1S"])).is_err());
    }

    #[test]
    fn test_duration_as_seconds() {
        assert_eq!(IsoDuration::new("PT1M30.5S").as_seconds(), Some(90.5));
        assert_eq!(IsoDuration::new("P1DT1H").as_seconds(), Some(90_000.0));
        assert_eq!(IsoDuration::new("P2W").as_seconds(), Some(1_209_600.0));
        assert_eq!(IsoDuration::new("P1Y").as_seconds(), None);
        assert_eq!(IsoDuration::new("P").as_seconds(), None);
    }
}
