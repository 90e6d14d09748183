use thiserror::Error;

/// Failures surfaced through the `LedgerStore` seam.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("Trade group {0} does not exist.")]
    GroupNotFound(i64),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Import error: {0}")]
    Import(#[from] importer::ImportError),
}
