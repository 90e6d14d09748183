//! # TradeLedger Importer
//!
//! Turns a broker's CSV export into `NewExecution`s ready for the store.
//!
//! Only the Schwab transaction export is understood. Column positions are
//! found by header name, money and date columns are parsed leniently, and
//! every row gets a content fingerprint so re-importing the same file (or an
//! overlapping one) inserts nothing new.

pub mod error;
pub mod fingerprint;
pub mod headers;
pub mod parse;
pub mod schwab;

pub use error::ImportError;
pub use fingerprint::fingerprint;
pub use schwab::{ImportBatch, ImportSummary, SchwabCsvImporter};
