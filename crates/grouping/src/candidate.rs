use chrono::NaiveDate;
use core_types::{ContractFamily, GroupLeg, GroupShape, StrategyKind};
use rust_decimal::Decimal;

/// A two-leg credit spread found by the spread matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadCandidate {
    pub family: ContractFamily,
    pub short_strike: Decimal,
    pub long_strike: Decimal,
    pub open_date: NaiveDate,
    pub sell_execution_id: i64,
    pub buy_execution_id: i64,
    pub closing_execution_ids: Vec<i64>,
}

/// A broken-wing butterfly found by the butterfly matcher.
///
/// `legs` is ordered low wing, body, high wing.
#[derive(Debug, Clone, PartialEq)]
pub struct ButterflyCandidate {
    pub family: ContractFamily,
    pub open_date: NaiveDate,
    pub legs: [GroupLeg; 3],
    pub opening_execution_ids: Vec<i64>,
    pub closing_execution_ids: Vec<i64>,
}

/// A group that a matcher wants created.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupCandidate {
    CreditSpread(SpreadCandidate),
    Butterfly(ButterflyCandidate),
}

impl GroupCandidate {
    pub fn kind(&self) -> StrategyKind {
        match self {
            GroupCandidate::CreditSpread(_) => StrategyKind::CreditSpread,
            GroupCandidate::Butterfly(_) => StrategyKind::Bwb,
        }
    }

    pub fn family(&self) -> &ContractFamily {
        match self {
            GroupCandidate::CreditSpread(c) => &c.family,
            GroupCandidate::Butterfly(c) => &c.family,
        }
    }

    pub fn open_date(&self) -> NaiveDate {
        match self {
            GroupCandidate::CreditSpread(c) => c.open_date,
            GroupCandidate::Butterfly(c) => c.open_date,
        }
    }

    pub fn shape(&self) -> GroupShape {
        match self {
            GroupCandidate::CreditSpread(c) => GroupShape::CreditSpread {
                short_strike: c.short_strike,
                long_strike: c.long_strike,
            },
            GroupCandidate::Butterfly(c) => GroupShape::Butterfly {
                legs: c.legs.to_vec(),
            },
        }
    }

    /// Every execution to link, opening fills first. Ids are unique.
    pub fn execution_ids(&self) -> Vec<i64> {
        let (opening, closing) = match self {
            GroupCandidate::CreditSpread(c) => (
                vec![c.sell_execution_id, c.buy_execution_id],
                &c.closing_execution_ids,
            ),
            GroupCandidate::Butterfly(c) => {
                (c.opening_execution_ids.clone(), &c.closing_execution_ids)
            }
        };

        let mut ids: Vec<i64> = Vec::with_capacity(opening.len() + closing.len());
        for id in opening.into_iter().chain(closing.iter().copied()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

/// Result of one matcher run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    /// New groups, in the order they were found.
    pub candidates: Vec<GroupCandidate>,
    /// Qualifying groups found, duplicates included.
    pub qualifying: usize,
    /// Qualifying groups dropped because an equivalent group already exists.
    pub duplicates_skipped: usize,
}
