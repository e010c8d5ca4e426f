use crate::error::{HistoryError, Result};
use crate::models::{NewRecord, RecordId, RecordKey, StoredRecord};
use crate::store::{ObservationStore, TimeSeriesOptions};

/// In-process store with the same semantics as the SQLite collection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    options: Option<TimeSeriesOptions>,
    records: Vec<StoredRecord>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every stored record in insertion order.
    pub fn all(&self) -> &[StoredRecord] {
        &self.records
    }
}

impl ObservationStore for MemoryStore {
    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn collection_exists(&self) -> Result<bool> {
        Ok(self.options.is_some())
    }

    fn ensure_collection(&mut self, options: &TimeSeriesOptions) -> Result<bool> {
        options.check_layout()?;
        if self.options.is_some() {
            return Ok(false);
        }
        self.options = Some(options.clone());
        Ok(true)
    }

    fn find(&self, key: &RecordKey) -> Result<Vec<StoredRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.matches(key))
            .cloned()
            .collect())
    }

    fn insert(&mut self, record: &NewRecord) -> Result<RecordId> {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.records.push(StoredRecord::from_new(id, record));
        Ok(id)
    }

    fn delete(&mut self, id: RecordId) -> Result<()> {
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(HistoryError::RecordNotFound(id))?;
        self.records.remove(position);
        Ok(())
    }

    fn records(&self, station_id: &str, limit: Option<usize>) -> Result<Vec<StoredRecord>> {
        let mut records: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|r| r.station_id == station_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}
