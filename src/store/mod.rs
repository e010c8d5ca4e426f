pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::{HistoryError, Result};
use crate::models::{NewRecord, RecordId, RecordKey, StoredRecord};
use crate::utils::constants::{META_FIELD, TIME_FIELD};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Seconds,
    Minutes,
    Hours,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Seconds => "seconds",
            Granularity::Minutes => "minutes",
            Granularity::Hours => "hours",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-series layout of a collection: which field is the time dimension,
/// which is the meta (station) dimension, and the bucketing granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesOptions {
    pub time_field: String,
    pub meta_field: String,
    pub granularity: Granularity,
}

impl Default for TimeSeriesOptions {
    fn default() -> Self {
        Self {
            time_field: TIME_FIELD.to_string(),
            meta_field: META_FIELD.to_string(),
            granularity: Granularity::Minutes,
        }
    }
}

impl TimeSeriesOptions {
    /// Stores lay records out with fixed time and meta columns; a layout
    /// naming other fields cannot be honoured.
    pub fn check_layout(&self) -> Result<()> {
        if self.time_field != TIME_FIELD || self.meta_field != META_FIELD {
            return Err(HistoryError::Config(format!(
                "Unsupported time-series layout: time field '{}', meta field '{}' (expected '{}', '{}')",
                self.time_field, self.meta_field, TIME_FIELD, META_FIELD
            )));
        }
        Ok(())
    }
}

/// A time-series collection of temperature observations.
///
/// The store does not enforce uniqueness of `(timestamp, station_id)`; callers
/// that need one record per key must check with [`ObservationStore::find`]
/// before inserting. Ids returned by [`ObservationStore::insert`] grow with
/// insertion order.
pub trait ObservationStore {
    /// Round-trip to the backend to prove the connection is usable.
    fn ping(&self) -> Result<()>;

    fn collection_exists(&self) -> Result<bool>;

    /// Create the collection with the given layout if it is missing.
    /// Returns `true` when the collection was created by this call.
    fn ensure_collection(&mut self, options: &TimeSeriesOptions) -> Result<bool>;

    /// All records matching the key exactly. The order is unspecified.
    fn find(&self, key: &RecordKey) -> Result<Vec<StoredRecord>>;

    fn insert(&mut self, record: &NewRecord) -> Result<RecordId>;

    /// Delete a single record. Deleting an id that is not present is an error.
    fn delete(&mut self, id: RecordId) -> Result<()>;

    /// Records for a station, newest first, optionally limited.
    fn records(&self, station_id: &str, limit: Option<usize>) -> Result<Vec<StoredRecord>>;
}
