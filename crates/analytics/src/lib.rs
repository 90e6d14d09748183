//! # TradeLedger Analytics
//!
//! This crate turns linked executions and trade groups into numbers: the
//! persisted per-group metrics (NetPL, GrossReturn, CloseDate), the
//! reporting-only risk profile of a credit spread, and the closed-trade
//! aggregates behind the dashboard and the stats commands.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every function takes raw rows and returns a value.
//!   Nothing here reads the store, so the engine decides which executions count.
//!
//! ## Public API
//!
//! - `metrics`: `compute` and the named GrossReturn formulas.
//! - `risk`: `RiskProfile::evaluate` and `Outcome`.
//! - `stats`: `summarize`, the bucket functions and `build_dashboard`.

pub mod metrics;
pub mod risk;
pub mod stats;

pub use metrics::compute;
pub use risk::{Outcome, RiskProfile, SpreadRisk};
pub use stats::{
    build_dashboard, by_close_month, by_close_weekday, by_close_year, by_dte_bucket, summarize, BucketRow,
    Dashboard, DteBucket, DteBucketStats, PerformanceSummary, TradeRow, WeekdayStats,
};
