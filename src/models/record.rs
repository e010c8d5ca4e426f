use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the store on insert. Ids grow with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical identity of an observation: one record should exist per key.
///
/// Timestamps are normalized to UTC at whole-second precision so that the same
/// instant reported with different offsets maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub timestamp: DateTime<Utc>,
    pub station_id: String,
}

impl RecordKey {
    pub fn new<Tz: TimeZone>(timestamp: DateTime<Tz>, station_id: &str) -> Self {
        Self {
            timestamp: timestamp.with_timezone(&Utc).trunc_subsecs(0),
            station_id: station_id.to_string(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.station_id, self.timestamp.to_rfc3339())
    }
}

/// A record about to be inserted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub key: RecordKey,
    pub temperature: f64,
}

impl NewRecord {
    pub fn new(key: RecordKey, temperature: f64) -> Self {
        Self { key, temperature }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub timestamp: DateTime<Utc>,
    pub station_id: String,
    pub temperature: f64,
}

impl StoredRecord {
    pub fn from_new(id: RecordId, record: &NewRecord) -> Self {
        Self {
            id,
            timestamp: record.key.timestamp,
            station_id: record.key.station_id.clone(),
            temperature: record.temperature,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.timestamp, &self.station_id)
    }

    pub fn matches(&self, key: &RecordKey) -> bool {
        self.timestamp == key.timestamp && self.station_id == key.station_id
    }
}
