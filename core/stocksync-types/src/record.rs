//! The replicated record.
//!
//! A record is any domain entity eligible for sync. The engine reads exactly
//! four fields (`id`, `updatedAt`, `deviceId`, `deleted`) and carries every
//! other field verbatim in [`Record::fields`].

use crate::timestamp::Millis;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a record within its collection.
pub type RecordId = String;

/// A single replicated record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique id within the collection. Numeric ids are accepted on input and
    /// normalized to strings.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: RecordId,
    /// Last modification time in milliseconds since the Unix epoch.
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Millis>,
    /// Identity of the device that last wrote the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Tombstone flag.
    #[serde(
        default,
        deserialize_with = "deserialize_flag",
        skip_serializing_if = "is_false"
    )]
    pub deleted: bool,
    /// Domain fields, opaque to the engine.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record with the given id.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            updated_at: None,
            device_id: None,
            deleted: false,
            fields: Map::new(),
        }
    }

    /// Sets the modification timestamp.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: Millis) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Sets the writer identity.
    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Sets a domain field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Marks the record as deleted.
    #[must_use]
    pub fn into_tombstone(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// The timestamp used for last-write-wins comparison. Missing counts as 0.
    #[must_use]
    pub fn updated_at_or_zero(&self) -> Millis {
        self.updated_at.unwrap_or(0)
    }

    /// Returns true if the record is a tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    /// Returns a domain field by name.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Fills in a missing timestamp and records the writing device.
    pub fn stamp(&mut self, now: Millis, device_id: &str) {
        if self.updated_at.is_none() {
            self.updated_at = Some(now);
        }
        self.device_id = Some(device_id.to_string());
    }

    /// Overwrites both timestamp and writer identity.
    pub fn restamp(&mut self, now: Millis, device_id: &str) {
        self.updated_at = Some(now);
        self.device_id = Some(device_id.to_string());
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    struct IdVisitor;

    impl Visitor<'_> for IdVisitor {
        type Value = RecordId;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or numeric record id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15 {
                Ok(format!("{}", v as i64))
            } else {
                Ok(v.to_string())
            }
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<Millis>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = Option<Millis>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a millisecond timestamp, an RFC 3339 string, or null")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(i64::try_from(v).unwrap_or(i64::MAX)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            if v.is_finite() {
                Ok(Some(v as i64))
            } else {
                Ok(None)
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if let Ok(millis) = v.trim().parse::<i64>() {
                return Ok(Some(millis));
            }
            Ok(chrono::DateTime::parse_from_rfc3339(v.trim())
                .ok()
                .map(|dt| dt.timestamp_millis()))
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean flag")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(false)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(false)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v != 0)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v != 0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.eq_ignore_ascii_case("true"))
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}
