use crate::action::ActionFlags;
use crate::contract::{parse_option_symbol, ContractFamily, OptionContract};
use crate::enums::{LegRole, StrategyKind};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The (broker, account) pair every import and matching pass is confined to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountScope {
    pub broker: String,
    pub account: String,
}

impl AccountScope {
    pub fn new(broker: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            account: account.into(),
        }
    }
}

impl fmt::Display for AccountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.broker, self.account)
    }
}

/// One stored brokerage fill. Rows are append-only and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Execution {
    pub id: i64,
    pub fingerprint: String,
    pub broker: String,
    pub account: String,
    pub executed_at: NaiveDateTime,
    pub symbol: String,
    pub description: String,
    pub action: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub fees: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub source_file: String,
    pub source_row: i32,
}

impl Execution {
    pub fn action_flags(&self) -> ActionFlags {
        ActionFlags::classify(&self.action)
    }

    pub fn contract(&self) -> Option<OptionContract> {
        parse_option_symbol(&self.symbol)
    }

    /// Calendar day of the fill, time of day dropped.
    pub fn executed_on(&self) -> NaiveDate {
        self.executed_at.date()
    }

    /// `|quantity|`, with a missing quantity read as zero.
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.unwrap_or(Decimal::ZERO).abs()
    }
}

/// An execution as produced by an importer, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExecution {
    pub fingerprint: String,
    pub broker: String,
    pub account: String,
    pub executed_at: NaiveDateTime,
    pub symbol: String,
    pub description: String,
    pub action: String,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub fees: Decimal,
    pub net_amount: Decimal,
    pub currency: String,
    pub source_file: String,
    pub source_row: i32,
    pub raw_row: serde_json::Value,
}

impl NewExecution {
    /// Materializes the stored form once the store has assigned an id.
    pub fn into_execution(self, id: i64) -> Execution {
        Execution {
            id,
            fingerprint: self.fingerprint,
            broker: self.broker,
            account: self.account,
            executed_at: self.executed_at,
            symbol: self.symbol,
            description: self.description,
            action: self.action,
            quantity: self.quantity,
            price: self.price,
            fees: self.fees,
            net_amount: self.net_amount,
            currency: self.currency,
            source_file: self.source_file,
            source_row: self.source_row,
        }
    }
}

/// One strike of a broken-wing butterfly.
///
/// `quantity` is signed: positive is net long, negative is net short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLeg {
    pub strike: Decimal,
    pub quantity: Decimal,
    pub role: LegRole,
}

/// Strategy-specific part of a trade group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy")]
pub enum GroupShape {
    CreditSpread {
        short_strike: Decimal,
        long_strike: Decimal,
    },
    #[serde(rename = "BWB")]
    Butterfly { legs: Vec<GroupLeg> },
}

impl GroupShape {
    pub fn kind(&self) -> StrategyKind {
        match self {
            GroupShape::CreditSpread { .. } => StrategyKind::CreditSpread,
            GroupShape::Butterfly { .. } => StrategyKind::Bwb,
        }
    }

    /// Every strike the group owns, ascending for butterflies and
    /// short-then-long for spreads.
    pub fn strikes(&self) -> Vec<Decimal> {
        match self {
            GroupShape::CreditSpread {
                short_strike,
                long_strike,
            } => vec![*short_strike, *long_strike],
            GroupShape::Butterfly { legs } => legs.iter().map(|l| l.strike).collect(),
        }
    }
}

/// A reconstructed strategy instance together with its derived summary fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeGroup {
    pub id: i64,
    pub broker: String,
    pub account: String,
    pub family: ContractFamily,
    pub open_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub net_pl: Decimal,
    pub gross_return: Decimal,
    pub shape: GroupShape,
}

impl TradeGroup {
    pub fn kind(&self) -> StrategyKind {
        self.shape.kind()
    }

    pub fn is_closed(&self) -> bool {
        self.close_date.is_some()
    }

    /// Days from the open date to contract expiration.
    pub fn dte(&self) -> i64 {
        (self.family.expiration - self.open_date).num_days()
    }

    /// Days between open and close, `None` while the group is open.
    pub fn days_held(&self) -> Option<i64> {
        self.close_date.map(|c| (c - self.open_date).num_days())
    }

    pub fn strikes_label(&self) -> String {
        self.shape
            .strikes()
            .iter()
            .map(|s| s.normalize().to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Identity of a credit spread for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpreadKey {
    pub family: ContractFamily,
    pub short_strike: Decimal,
    pub long_strike: Decimal,
}

/// Leg strikes of a butterfly already persisted for one family and open date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButterflyStrikes {
    pub family: ContractFamily,
    pub open_date: NaiveDate,
    pub strikes: BTreeSet<Decimal>,
}

impl ButterflyStrikes {
    /// True when every strike in `strikes` is already a leg of this group.
    pub fn covers(&self, strikes: &[Decimal]) -> bool {
        strikes.iter().all(|s| self.strikes.contains(s))
    }
}

/// Derived fields recomputed from a group's linked executions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetrics {
    pub net_pl: Decimal,
    pub gross_return: Decimal,
    pub close_date: Option<NaiveDate>,
}
