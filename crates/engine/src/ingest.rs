use crate::error::EngineError;
use crate::store::LedgerStore;
use importer::{ImportBatch, SchwabCsvImporter};
use std::path::Path;
use tracing::info;

/// What happened to one import batch on its way into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub source_file: String,
    pub rows_read: usize,
    pub executions_parsed: usize,
    pub inserted: u64,
    /// Parsed rows whose fingerprint the scope already held.
    pub already_present: u64,
    pub blank_fingerprints: usize,
    pub warnings: Vec<String>,
}

/// Inserts an import batch. Rows without a fingerprint are never stored.
pub async fn ingest<S>(store: &S, batch: ImportBatch) -> Result<IngestSummary, EngineError>
where
    S: LedgerStore + ?Sized,
{
    let ImportBatch { executions, summary } = batch;
    let parsed = executions.len();
    let executions: Vec<_> = executions
        .into_iter()
        .filter(|e| !e.fingerprint.trim().is_empty())
        .collect();
    let blank_fingerprints = parsed - executions.len();

    let inserted = store.insert_executions(&executions).await?;
    let result = IngestSummary {
        source_file: summary.source_file,
        rows_read: summary.rows_read,
        executions_parsed: summary.executions_parsed,
        inserted,
        already_present: executions.len() as u64 - inserted,
        blank_fingerprints,
        warnings: summary.warnings,
    };

    info!(
        file = %result.source_file,
        inserted = result.inserted,
        already_present = result.already_present,
        "Ingested executions"
    );
    Ok(result)
}

/// Reads a Schwab export from disk and ingests it for `account`.
pub async fn import_file<S>(
    store: &S,
    importer: &SchwabCsvImporter,
    account: &str,
    path: &Path,
) -> Result<IngestSummary, EngineError>
where
    S: LedgerStore + ?Sized,
{
    let batch = importer.import_path(account, path)?;
    ingest(store, batch).await
}
