//! # TradeLedger Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database. It is the ledger's permanent archive: imported
//! executions, reconstructed trade groups, their legs, and the links between
//! groups and executions.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** This crate encapsulates all database-specific logic. The
//!   rest of the application sees `DbRepository` methods and core-types values,
//!   never SQL.
//! - **Idempotent Writes:** Executions and links are inserted with
//!   `ON CONFLICT DO NOTHING`, so re-running an import or a matching pass never
//!   duplicates rows. Insert methods report how many rows were actually new.
//! - **Asynchronous & Pooled:** All operations are asynchronous and share one `PgPool`.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies the embedded migrations.
//! - `DbRepository`: Holds the pool and provides every data access method.
//! - `GroupFilter`, `ClearedRows`: Parameters and results of the listing and clearing methods.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::{ClearedRows, DbRepository, GroupFilter};
