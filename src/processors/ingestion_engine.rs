use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{NewRecord, Reading, RecordId, RecordKey, StoredRecord};
use crate::store::ObservationStore;
use crate::utils::progress::ProgressReporter;

/// A duplicate that could not be deleted during repair.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletionFailure {
    pub id: RecordId,
    pub reason: String,
}

/// Result of collapsing the records that share one key.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub kept: RecordId,
    pub deleted: Vec<RecordId>,
    pub failures: Vec<DeletionFailure>,
}

/// What happened to a single reading during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// No record existed for the key; one was inserted.
    Inserted { key: RecordKey, id: RecordId },
    /// Exactly one record already existed; nothing was written.
    Skipped { key: RecordKey, existing: RecordId },
    /// Several records existed; all but the canonical one were deleted.
    Repaired { key: RecordKey, repair: RepairOutcome },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub outcomes: Vec<IngestOutcome>,
}

impl IngestReport {
    pub fn inserted(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Inserted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Skipped { .. }))
    }

    pub fn repaired(&self) -> usize {
        self.count(|o| matches!(o, IngestOutcome::Repaired { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.repairs().map(|r| r.deleted.len()).sum()
    }

    pub fn deletion_failures(&self) -> Vec<&DeletionFailure> {
        self.repairs().flat_map(|r| r.failures.iter()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Readings: {}, inserted: {}, already stored: {}, repaired keys: {} (deleted {}, failed {})",
            self.outcomes.len(),
            self.inserted(),
            self.skipped(),
            self.repaired(),
            self.deleted(),
            self.deletion_failures().len()
        )
    }

    fn count(&self, predicate: impl Fn(&IngestOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    fn repairs(&self) -> impl Iterator<Item = &RepairOutcome> {
        self.outcomes.iter().filter_map(|o| match o {
            IngestOutcome::Repaired { repair, .. } => Some(repair),
            _ => None,
        })
    }
}

/// Merges fetched readings into a store so that each `(timestamp, station)`
/// key ends up with exactly one record.
///
/// Every reading is its own unit of work: a query, then either an insert, a
/// skip, or a repair. Query and insert failures abort the pass; a failed
/// deletion during repair is recorded and the pass continues.
pub struct IngestionEngine {
    station_id: String,
}

impl IngestionEngine {
    pub fn new(station_id: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
        }
    }

    /// Ingest readings in order.
    pub fn ingest<S: ObservationStore + ?Sized>(
        &self,
        store: &mut S,
        readings: &[Reading],
        progress: Option<&ProgressReporter>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for reading in readings {
            let outcome = self.ingest_reading(store, reading)?;
            report.outcomes.push(outcome);

            if let Some(p) = progress {
                p.increment(1);
            }
        }

        info!("Ingestion finished for station {}: {}", self.station_id, report.summary());
        Ok(report)
    }

    pub fn ingest_reading<S: ObservationStore + ?Sized>(
        &self,
        store: &mut S,
        reading: &Reading,
    ) -> Result<IngestOutcome> {
        let key = reading.key(&self.station_id);
        let matches = store.find(&key)?;

        if matches.is_empty() {
            let id = store.insert(&NewRecord::new(key.clone(), reading.temperature()))?;
            debug!("Inserted record {} for {} ({}°F)", id, key, reading.temperature());
            return Ok(IngestOutcome::Inserted { key, id });
        }

        match collapse_duplicates(store, &matches) {
            Some(repair) => {
                info!(
                    "Repaired {} duplicate records for {}, kept {}",
                    matches.len(),
                    key,
                    repair.kept
                );
                Ok(IngestOutcome::Repaired { key, repair })
            }
            None => {
                debug!("Skipping {}: already stored as {}", key, matches[0].id);
                Ok(IngestOutcome::Skipped {
                    key,
                    existing: matches[0].id,
                })
            }
        }
    }
}

/// The record that survives a repair: the most recently inserted one.
pub fn canonical_record(records: &[StoredRecord]) -> Option<&StoredRecord> {
    records.iter().max_by_key(|r| r.id)
}

/// Delete every record in `records` except the canonical one.
///
/// Returns `None` when there is nothing to collapse (fewer than two records).
/// Deletion failures are logged and collected; they never stop the remaining
/// deletions.
pub fn collapse_duplicates<S: ObservationStore + ?Sized>(
    store: &mut S,
    records: &[StoredRecord],
) -> Option<RepairOutcome> {
    if records.len() < 2 {
        return None;
    }
    let kept = canonical_record(records)?.id;

    let mut doomed: Vec<RecordId> = records
        .iter()
        .map(|r| r.id)
        .filter(|id| *id != kept)
        .collect();
    doomed.sort();

    let mut deleted = Vec::new();
    let mut failures = Vec::new();
    for id in doomed {
        match store.delete(id) {
            Ok(()) => deleted.push(id),
            Err(e) => {
                warn!("Could not delete duplicate record {}: {}", id, e);
                failures.push(DeletionFailure {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Some(RepairOutcome {
        kept,
        deleted,
        failures,
    })
}
