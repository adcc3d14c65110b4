//! Stored timestamp representations.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A timestamp exactly as a store handed it back.
///
/// Stores written by different clients disagree on how a point in time is
/// encoded, so every shape seen in practice gets its own variant and its own
/// coercion. Anything unrecognised lands in `Raw` and fails coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// A real date, e.g. a store-assigned write time.
    Native(DateTime<Utc>),
    /// `{ "seconds": .., "nanoseconds": .. }` as written by hosted SDKs.
    SecondsNanos { seconds: i64, nanoseconds: u32 },
    /// Milliseconds since the epoch, a date string, or something unusable.
    Raw(Value),
}

impl RawTimestamp {
    /// Classify an arbitrary JSON value.
    pub fn from_value(value: Value) -> Self {
        if let Value::Object(map) = &value {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"));
            if let Some(seconds) = seconds.and_then(Value::as_i64) {
                let nanoseconds = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0);
                return RawTimestamp::SecondsNanos {
                    seconds,
                    nanoseconds,
                };
            }
        }
        RawTimestamp::Raw(value)
    }

    /// Coerce to a date; `None` when the value does not denote a valid one.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Native(at) => Some(*at),
            RawTimestamp::SecondsNanos {
                seconds,
                nanoseconds,
            } => coerce_seconds_nanos(*seconds, *nanoseconds),
            RawTimestamp::Raw(value) => coerce_raw(value),
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        RawTimestamp::Native(at)
    }
}

fn coerce_seconds_nanos(seconds: i64, nanoseconds: u32) -> Option<DateTime<Utc>> {
    if nanoseconds >= 1_000_000_000 {
        return None;
    }
    let millis = seconds
        .checked_mul(1000)?
        .checked_add(i64::from(nanoseconds / 1_000_000))?;
    DateTime::from_timestamp_millis(millis)
}

fn coerce_raw(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => ms,
                None => {
                    let ms = n.as_f64().filter(|f| f.is_finite())?;
                    if ms.abs() > i64::MAX as f64 {
                        return None;
                    }
                    ms as i64
                }
            };
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => parse_date_string(s.trim()),
        _ => None,
    }
}

fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl Serialize for RawTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawTimestamp::Native(at) => {
                serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            RawTimestamp::SecondsNanos {
                seconds,
                nanoseconds,
            } => {
                let mut st = serializer.serialize_struct("Timestamp", 2)?;
                st.serialize_field("seconds", seconds)?;
                st.serialize_field("nanoseconds", nanoseconds)?;
                st.end()
            }
            RawTimestamp::Raw(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RawTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RawTimestamp::from_value)
    }
}
