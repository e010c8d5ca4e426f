//! SQLite-backed time-series collection.
//!
//! Each collection is a table with an autoincrement id, an indexed time
//! column and an indexed station column. The time-series layout of every
//! collection is recorded in a catalog table so that the collection can be
//! recognised on later runs. Nothing in the schema enforces one row per
//! `(timestamp, station_id)`.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{HistoryError, Result};
use crate::models::{NewRecord, RecordId, RecordKey, StoredRecord};
use crate::store::{Granularity, ObservationStore, TimeSeriesOptions};
use crate::utils::constants::{COLLECTION_CATALOG, META_FIELD, TEMPERATURE_FIELD, TIME_FIELD};

pub struct SqliteStore {
    conn: Connection,
    collection: String,
}

impl SqliteStore {
    /// Open (or create) the database file backing the store.
    pub fn open(path: &Path, collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!("Opened store at {}", path.display());

        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    pub fn open_in_memory(collection: &str) -> Result<Self> {
        validate_collection_name(collection)?;
        Ok(Self {
            conn: Connection::open_in_memory()?,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Layout recorded for this collection when it was created.
    pub fn time_series_options(&self) -> Result<Option<TimeSeriesOptions>> {
        if !self.catalog_exists()? {
            return Ok(None);
        }

        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT time_field, meta_field, granularity FROM {} WHERE name = ?1",
                    COLLECTION_CATALOG
                ),
                params![self.collection],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(time_field, meta_field, granularity)| -> Result<TimeSeriesOptions> {
            Ok(TimeSeriesOptions {
                time_field,
                meta_field,
                granularity: parse_granularity(&granularity)?,
            })
        })
        .transpose()
    }

    /// Release the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| HistoryError::Store(e))
    }

    fn catalog_exists(&self) -> Result<bool> {
        self.table_exists(COLLECTION_CATALOG)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl ObservationStore for SqliteStore {
    fn ping(&self) -> Result<()> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(HistoryError::StoreUnavailable(format!(
                "unexpected ping response {}",
                one
            )));
        }
        Ok(())
    }

    fn collection_exists(&self) -> Result<bool> {
        self.table_exists(&self.collection)
    }

    fn ensure_collection(&mut self, options: &TimeSeriesOptions) -> Result<bool> {
        options.check_layout()?;
        if self.collection_exists()? {
            return Ok(false);
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {catalog} (
                name        TEXT PRIMARY KEY,
                time_field  TEXT NOT NULL,
                meta_field  TEXT NOT NULL,
                granularity TEXT NOT NULL
            );
            CREATE TABLE {table} (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                {time}      TEXT NOT NULL,
                {meta}      TEXT NOT NULL,
                {temp}      REAL NOT NULL
            );
            CREATE INDEX idx_{table}_{meta}_{time} ON {table}({meta}, {time});",
            catalog = COLLECTION_CATALOG,
            table = self.collection,
            time = TIME_FIELD,
            meta = META_FIELD,
            temp = TEMPERATURE_FIELD,
        ))?;
        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO {} (name, time_field, meta_field, granularity) \
                 VALUES (?1, ?2, ?3, ?4)",
                COLLECTION_CATALOG
            ),
            params![
                self.collection,
                options.time_field,
                options.meta_field,
                options.granularity.as_str()
            ],
        )?;
        tx.commit()?;

        info!(
            "Created time-series collection '{}' (granularity: {})",
            self.collection, options.granularity
        );
        Ok(true)
    }

    fn find(&self, key: &RecordKey) -> Result<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT id, {time}, {meta}, {temp} FROM {table} \
             WHERE {time} = ?1 AND {meta} = ?2",
            table = self.collection,
            time = TIME_FIELD,
            meta = META_FIELD,
            temp = TEMPERATURE_FIELD,
        ))?;
        let rows = stmt.query_map(
            params![encode_timestamp(&key.timestamp), key.station_id],
            row_to_record,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(HistoryError::from)
    }

    fn insert(&mut self, record: &NewRecord) -> Result<RecordId> {
        self.conn.execute(
            &format!(
                "INSERT INTO {table} ({time}, {meta}, {temp}) VALUES (?1, ?2, ?3)",
                table = self.collection,
                time = TIME_FIELD,
                meta = META_FIELD,
                temp = TEMPERATURE_FIELD,
            ),
            params![
                encode_timestamp(&record.key.timestamp),
                record.key.station_id,
                record.temperature
            ],
        )?;
        Ok(RecordId(self.conn.last_insert_rowid()))
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.collection),
            params![id.0],
        )?;
        if changed == 0 {
            return Err(HistoryError::RecordNotFound(id));
        }
        Ok(())
    }

    fn records(&self, station_id: &str, limit: Option<usize>) -> Result<Vec<StoredRecord>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, {time}, {meta}, {temp} FROM {table} \
             WHERE {meta} = ?1 ORDER BY {time} DESC, id DESC LIMIT ?2",
            table = self.collection,
            time = TIME_FIELD,
            meta = META_FIELD,
            temp = TEMPERATURE_FIELD,
        ))?;
        let rows = stmt.query_map(params![station_id, limit], row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(HistoryError::from)
    }
}

fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let raw: String = row.get(1)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(StoredRecord {
        id: RecordId(row.get(0)?),
        timestamp,
        station_id: row.get(2)?,
        temperature: row.get(3)?,
    })
}

fn parse_granularity(value: &str) -> Result<Granularity> {
    match value {
        "seconds" => Ok(Granularity::Seconds),
        "minutes" => Ok(Granularity::Minutes),
        "hours" => Ok(Granularity::Hours),
        other => Err(HistoryError::InvalidFormat(format!(
            "Unknown collection granularity '{}'",
            other
        ))),
    }
}

/// Collection names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if !valid || name == COLLECTION_CATALOG || name.starts_with("sqlite_") {
        return Err(HistoryError::Config(format!(
            "Invalid collection name '{}'",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn new_record(hour: u32, minute: u32, temperature: f64) -> NewRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap();
        NewRecord::new(RecordKey::new(ts, "KBOS"), temperature)
    }

    fn test_store() -> SqliteStore {
        let mut store = SqliteStore::open_in_memory("observations").unwrap();
        store.ensure_collection(&TimeSeriesOptions::default()).unwrap();
        store
    }

    #[test]
    fn test_ensure_collection_is_idempotent() {
        let mut store = SqliteStore::open_in_memory("observations").unwrap();
        assert!(!store.collection_exists().unwrap());
        assert_eq!(store.time_series_options().unwrap(), None);

        assert!(store.ensure_collection(&TimeSeriesOptions::default()).unwrap());
        assert!(!store.ensure_collection(&TimeSeriesOptions::default()).unwrap());
        assert!(store.collection_exists().unwrap());
        assert_eq!(
            store.time_series_options().unwrap(),
            Some(TimeSeriesOptions::default())
        );
    }

    #[test]
    fn test_rejects_foreign_layout() {
        let mut store = SqliteStore::open_in_memory("observations").unwrap();
        let options = TimeSeriesOptions {
            time_field: "observed_at".to_string(),
            ..TimeSeriesOptions::default()
        };
        assert!(matches!(
            store.ensure_collection(&options),
            Err(HistoryError::Config(_))
        ));
        assert!(!store.collection_exists().unwrap());
    }

    #[test]
    fn test_insert_find_delete() {
        let mut store = test_store();
        store.ping().unwrap();

        let first = store.insert(&new_record(10, 51, 33.98)).unwrap();
        let second = store.insert(&new_record(10, 51, 33.98)).unwrap();
        store.insert(&new_record(11, 51, 35.06)).unwrap();
        assert!(second > first);

        let key = new_record(10, 51, 0.0).key;
        let mut ids: Vec<RecordId> = store.find(&key).unwrap().iter().map(|r| r.id).collect();
        ids.sort();
        assert_eq!(ids, vec![first, second]);

        store.delete(first).unwrap();
        let remaining = store.find(&key).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second);
        assert_eq!(remaining[0].temperature, 33.98);

        assert!(matches!(
            store.delete(first),
            Err(HistoryError::RecordNotFound(id)) if id == first
        ));
    }

    #[test]
    fn test_find_matches_same_instant_across_offsets() {
        let mut store = test_store();
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = eastern.with_ymd_and_hms(2024, 1, 15, 5, 51, 0).unwrap();
        store
            .insert(&NewRecord::new(RecordKey::new(local, "KBOS"), 33.98))
            .unwrap();

        let key = new_record(10, 51, 0.0).key;
        assert_eq!(store.find(&key).unwrap().len(), 1);
    }

    #[test]
    fn test_records_are_newest_first_per_station() {
        let mut store = test_store();
        store.insert(&new_record(8, 0, 30.0)).unwrap();
        store.insert(&new_record(10, 0, 32.0)).unwrap();
        store.insert(&new_record(9, 0, 31.0)).unwrap();
        let other = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        store
            .insert(&NewRecord::new(RecordKey::new(other, "KJFK"), 40.0))
            .unwrap();

        let temps: Vec<f64> = store
            .records("KBOS", None)
            .unwrap()
            .iter()
            .map(|r| r.temperature)
            .collect();
        assert_eq!(temps, vec![32.0, 31.0, 30.0]);
        assert_eq!(store.records("KBOS", Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        let mut store = SqliteStore::open(&path, "observations").unwrap();
        assert!(store.ensure_collection(&TimeSeriesOptions::default()).unwrap());
        store.insert(&new_record(10, 51, 33.98)).unwrap();
        store.close().unwrap();

        let mut store = SqliteStore::open(&path, "observations").unwrap();
        assert!(!store.ensure_collection(&TimeSeriesOptions::default()).unwrap());
        assert_eq!(store.records("KBOS", None).unwrap().len(), 1);
    }

    #[test]
    fn test_collection_name_validation() {
        assert!(validate_collection_name("observations").is_ok());
        assert!(validate_collection_name("pi_temp2").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("2temps").is_err());
        assert!(validate_collection_name("temps; DROP TABLE x").is_err());
        assert!(validate_collection_name(COLLECTION_CATALOG).is_err());
        assert!(SqliteStore::open_in_memory("bad-name").is_err());
    }
}
