use tracing::info;

use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::{HistoryError, Result};
use crate::processors::{
    collapse_duplicates, IngestReport, IngestionEngine, IntegrityChecker, IntegrityReport,
};
use crate::readers::ObservationFetcher;
use crate::reporters::HealthcheckReporter;
use crate::store::{ObservationStore, SqliteStore, TimeSeriesOptions};
use crate::utils::http::build_client;
use crate::utils::logging::init_logging;
use crate::utils::progress::ProgressReporter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let settings = Settings::load(&cli.config)?;

    match cli.command {
        Commands::Run => {
            run_pass(&settings, cli.quiet).await?;
        }

        Commands::Check { repair } => {
            check_store(&settings, repair)?;
        }

        Commands::Recent { limit } => {
            show_recent(&settings, limit)?;
        }
    }

    Ok(())
}

/// Open the configured store and prove it answers. Any failure here is
/// reported as the store being unavailable.
pub fn open_store(settings: &Settings) -> Result<SqliteStore> {
    let store = SqliteStore::open(&settings.store.path(), &settings.store.collection)
        .map_err(|e| HistoryError::StoreUnavailable(e.to_string()))?;
    store
        .ping()
        .map_err(|e| HistoryError::StoreUnavailable(e.to_string()))?;

    info!("Connected to store at {}", settings.store.path);
    Ok(store)
}

/// One fetch, ingest and healthcheck pass.
pub async fn run_pass(settings: &Settings, quiet: bool) -> Result<IngestReport> {
    let mut store = open_store(settings)?;
    if store.ensure_collection(&TimeSeriesOptions::default())? {
        println!("Created collection '{}'", store.collection());
    }

    let client = build_client(settings.api.timeout())?;
    let fetcher = ObservationFetcher::new(
        client.clone(),
        &settings.api.base_url,
        settings.api.observation_limit,
    );

    let spinner = ProgressReporter::new_spinner("Fetching observations...", quiet);
    let batch = fetcher.fetch(&settings.station_id).await?;
    spinner.finish_with_message(&format!(
        "Fetched {} readings ({} rejected)",
        batch.readings.len(),
        batch.rejected.len()
    ));

    let progress = ProgressReporter::new(
        batch.readings.len() as u64,
        "Ingesting readings...",
        quiet,
    );
    let engine = IngestionEngine::new(&settings.station_id);
    let report = engine.ingest(&mut store, &batch.readings, Some(&progress))?;
    progress.finish_with_message("Ingestion complete");
    store.close()?;

    println!("{}", report.summary());

    HealthcheckReporter::new(client)
        .report_alive(&settings.healthcheck_url)
        .await?;

    Ok(report)
}

pub fn check_store(settings: &Settings, repair: bool) -> Result<IntegrityReport> {
    let mut store = open_store(settings)?;
    let checker = IntegrityChecker::new();

    if !store.collection_exists()? {
        println!("Collection '{}' does not exist yet", store.collection());
        return Ok(checker.check_records(&[]));
    }

    let records = store.records(&settings.station_id, None)?;
    let report = checker.check_records(&records);
    println!("\n{}", checker.generate_summary(&report));

    if repair && !report.duplicate_keys.is_empty() {
        let mut deleted = 0;
        let mut failed = 0;
        for duplicate in &report.duplicate_keys {
            if let Some(outcome) = collapse_duplicates(&mut store, &duplicate.records) {
                deleted += outcome.deleted.len();
                failed += outcome.failures.len();
            }
        }
        println!(
            "Repaired {} keys: deleted {} records, {} deletions failed",
            report.duplicate_keys.len(),
            deleted,
            failed
        );
    } else if report.is_clean() {
        println!("✅ No duplicate keys found");
    } else {
        println!(
            "⚠️  Found {} duplicate keys, run with --repair to collapse them",
            report.duplicate_keys.len()
        );
    }

    store.close()?;
    Ok(report)
}

pub fn show_recent(settings: &Settings, limit: usize) -> Result<()> {
    let tz = settings.tz()?;
    let store = open_store(settings)?;

    if !store.collection_exists()? {
        println!("No readings stored yet");
        return store.close();
    }

    let records = store.records(&settings.station_id, Some(limit))?;
    println!(
        "Most recent {} readings for {}:",
        records.len(),
        settings.station_id
    );
    for (i, record) in records.iter().enumerate() {
        println!(
            "{}. {} {:.1}°F (id {})",
            i + 1,
            record.timestamp.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            record.temperature,
            record.id
        );
    }

    store.close()
}
