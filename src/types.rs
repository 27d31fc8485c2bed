//! Core types for the table store.

use crate::codec::{TIMESTAMP_TYPE, TYPE_TAG, VALUE_TAG};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identity of a record within its table.
///
/// `-1` marks a transient record; persisted records carry a non-negative id
/// that doubles as their storage key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Identity of a record that was never put into a table.
    pub const TRANSIENT: RecordId = RecordId(-1);

    pub fn is_transient(self) -> bool {
        self.0 < 0
    }

    /// Storage key inside a table (`"3"`).
    pub fn to_key(self) -> String {
        self.0.to_string()
    }

    /// Parse a storage key. Negative or non-numeric keys are rejected.
    pub fn from_key(key: &str) -> Option<Self> {
        key.parse::<i64>().ok().filter(|id| *id >= 0).map(RecordId)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        RecordId::TRANSIENT
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UTC point in time with microsecond precision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Timestamp(Utc::now().trunc_subsecs(6))
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.trunc_subsecs(6))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// RFC 3339 form, e.g. `2024-03-01T12:00:00.000000Z`.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse an ISO-8601 string.
    ///
    /// Offset-less strings (`2024-03-01T12:00:00.123456`) are read as UTC.
    pub fn parse_iso8601(s: &str) -> Result<Self, chrono::ParseError> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Ok(Self::from_datetime(dt.with_timezone(&Utc))),
            Err(rfc_err) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Self::from_datetime(naive.and_utc()))
                .map_err(|_| rfc_err),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::now()
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso8601())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Serialized as the tagged `datetime` node, the same form the codec
/// registry produces, so timestamps nested in records stay typed.
impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_map(Some(2))?;
        node.serialize_entry(TYPE_TAG, TIMESTAMP_TYPE)?;
        node.serialize_entry(VALUE_TAG, &self.to_iso8601())?;
        node.end()
    }
}

/// Accepted encodings: the tagged `{"__type__": "datetime", "value": ...}`
/// node, or a bare ISO-8601 string.
#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Iso(String),
    Tagged {
        #[serde(rename = "__type__")]
        tag: String,
        value: String,
    },
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = match TimestampRepr::deserialize(deserializer)? {
            TimestampRepr::Iso(s) => s,
            TimestampRepr::Tagged { tag, value } if tag == TIMESTAMP_TYPE => value,
            TimestampRepr::Tagged { tag, .. } => {
                return Err(serde::de::Error::custom(format!(
                    "expected a {} node, found {}",
                    TIMESTAMP_TYPE, tag
                )))
            }
        };
        Timestamp::parse_iso8601(&s).map_err(serde::de::Error::custom)
    }
}
