use std::collections::BTreeMap;

use crate::models::{RecordId, RecordKey, StoredRecord};

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub total_records: usize,
    pub duplicate_keys: Vec<DuplicateKey>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_keys.is_empty()
    }

    /// Number of records that would be deleted by collapsing every duplicate.
    pub fn surplus_records(&self) -> usize {
        self.duplicate_keys.iter().map(|d| d.records.len() - 1).sum()
    }
}

/// Several stored records sharing one `(timestamp, station)` key.
#[derive(Debug, Clone)]
pub struct DuplicateKey {
    pub key: RecordKey,
    pub records: Vec<StoredRecord>,
}

impl DuplicateKey {
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

#[derive(Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Find every key held by more than one stored record
    pub fn check_records(&self, records: &[StoredRecord]) -> IntegrityReport {
        // BTreeMap keeps the report in time order
        let mut by_key: BTreeMap<RecordKey, Vec<StoredRecord>> = BTreeMap::new();
        for record in records {
            by_key.entry(record.key()).or_default().push(record.clone());
        }

        let duplicate_keys = by_key
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|(key, mut group)| {
                group.sort_by_key(|r| r.id);
                DuplicateKey { key, records: group }
            })
            .collect();

        IntegrityReport {
            total_records: records.len(),
            duplicate_keys,
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Total Records: {}\n", report.total_records));
        summary.push_str(&format!(
            "Duplicate Keys: {} ({} surplus records)\n",
            report.duplicate_keys.len(),
            report.surplus_records()
        ));
        for duplicate in report.duplicate_keys.iter().take(10) {
            let ids: Vec<String> = duplicate.ids().iter().map(|id| id.to_string()).collect();
            summary.push_str(&format!("  {}: ids {}\n", duplicate.key, ids.join(", ")));
        }
        if report.duplicate_keys.len() > 10 {
            summary.push_str(&format!(
                "  ... and {} more\n",
                report.duplicate_keys.len() - 10
            ));
        }

        summary
    }
}
