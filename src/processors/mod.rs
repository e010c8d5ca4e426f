pub mod ingestion_engine;
pub mod integrity_checker;

pub use ingestion_engine::{
    canonical_record, collapse_duplicates, DeletionFailure, IngestOutcome, IngestReport,
    IngestionEngine, RepairOutcome,
};
pub use integrity_checker::{DuplicateKey, IntegrityChecker, IntegrityReport};
