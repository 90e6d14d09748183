//! # TradeLedger Grouping Library
//!
//! This crate reconstructs multi-leg option strategies from individual fills.
//! It defines a universal `Matcher` trait and provides the two concrete
//! matchers the ledger knows about: two-leg credit spreads and three-leg
//! broken-wing butterflies.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of the
//!   database or the CLI. It depends only on `core-types`.
//! - **Candidates, not writes:** A matcher reads an in-memory snapshot of one
//!   scope plus the natural keys of groups that already exist, and returns
//!   `GroupCandidate`s carrying the ids of their constituent executions. The
//!   `engine` crate decides how to persist them.
//! - **Extensibility:** Adding a strategy means a new module implementing
//!   `Matcher`, a new `StrategyKind` variant and an arm in the `factory`.
//!
//! ## Public API
//!
//! - `Matcher`: The trait both matchers implement.
//! - `create_matcher`: The factory function keyed by `StrategyKind`.
//! - `annotate`: Turns stored executions into parsed, classified `OptionFill`s.
//! - `GroupCandidate` and `MatchOutcome`: What a matcher hands back.

pub mod butterfly;
pub mod candidate;
pub mod factory;
pub mod snapshot;
pub mod spread;

pub use butterfly::ButterflyMatcher;
pub use candidate::{ButterflyCandidate, GroupCandidate, MatchOutcome, SpreadCandidate};
pub use factory::create_matcher;
pub use snapshot::{annotate, ExistingGroups, OptionFill};
pub use spread::SpreadMatcher;

use core_types::StrategyKind;

/// The core trait that all strategy matchers implement.
///
/// Matchers are stateless. Everything a pass needs, including the keys of
/// groups persisted by earlier passes, is passed in, so running the same
/// matcher twice over the same inputs yields the same candidates.
pub trait Matcher: Send + Sync {
    /// The strategy kind this matcher produces.
    fn kind(&self) -> StrategyKind;

    /// Finds every new group in `fills`.
    ///
    /// # Arguments
    ///
    /// * `fills` - Parsed option executions of a single (broker, account) scope,
    ///   ordered by execution time.
    /// * `existing` - Natural keys of groups already persisted for that scope.
    ///
    /// # Returns
    ///
    /// The candidates to persist, in emission order, and how many qualifying
    /// candidates were dropped as duplicates.
    fn find_candidates(&self, fills: &[OptionFill<'_>], existing: &ExistingGroups) -> MatchOutcome;
}
