//! # TradeLedger Engine
//!
//! Orchestrates the ledger: imported executions go into the store, matchers
//! run over one (broker, account) scope at a time, and every new group is
//! written together with its links and derived metrics.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** Wires the pure `grouping` and `analytics` crates to
//!   persistence. Matching and metric formulas live in those crates.
//! - **Store seam:** All persistence goes through the `LedgerStore` trait.
//!   `database::DbRepository` implements it for PostgreSQL; tests use an
//!   in-memory store.
//! - **Idempotent passes:** Re-running a pass, or re-importing a file, writes
//!   nothing new. A pass interrupted by an error is recovered by running it
//!   again.
//!
//! ## Public API
//!
//! - `GroupingPass`: Runs the spread or butterfly matcher and applies its candidates.
//! - `refresh_metrics`: Recomputes every group of a scope from its links.
//! - `ingest` / `import_file`: Stores an import batch.

pub mod error;
pub mod ingest;
pub mod pass;
pub mod store;

#[cfg(test)]
pub(crate) mod memory;

pub use error::{EngineError, StoreError};
pub use ingest::{import_file, ingest, IngestSummary};
pub use pass::{refresh_metrics, GroupingPass, PassSummary};
pub use store::LedgerStore;
