use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The right carried by an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// The label persisted in the `right` columns.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionRight::Call => "Call",
            OptionRight::Put => "Put",
        }
    }

    /// Single-letter form used in broker symbols and compact tables.
    pub fn code(&self) -> char {
        match self {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        }
    }
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionRight {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionRight::Call),
            "put" | "p" => Ok(OptionRight::Put),
            other => Err(CoreError::InvalidInput("option right".to_string(), other.to_string())),
        }
    }
}

/// The kind of strategy a trade group was reconstructed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    CreditSpread,
    #[serde(rename = "BWB")]
    Bwb,
}

impl StrategyKind {
    /// The tag persisted in `trade_groups.strategy_kind`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CreditSpread => "CreditSpread",
            StrategyKind::Bwb => "BWB",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creditspread" | "credit-spread" | "spread" => Ok(StrategyKind::CreditSpread),
            "bwb" | "butterfly" => Ok(StrategyKind::Bwb),
            other => Err(CoreError::InvalidInput("strategy kind".to_string(), other.to_string())),
        }
    }
}

/// Role of a butterfly leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegRole {
    Wing,
    Body,
}

impl LegRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegRole::Wing => "Wing",
            LegRole::Body => "Body",
        }
    }
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wing" => Ok(LegRole::Wing),
            "body" => Ok(LegRole::Body),
            other => Err(CoreError::InvalidInput("leg role".to_string(), other.to_string())),
        }
    }
}

/// Which formula fills `trade_groups.gross_return`.
///
/// `EntryExit` is the normal matching path (entry credit minus exit debit from
/// fill prices). `NetPlusFees` is used when a scope is rebuilt from empty and
/// reports NetPL with the fees added back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrossReturnMode {
    #[default]
    EntryExit,
    NetPlusFees,
}

impl FromStr for GrossReturnMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry-exit" => Ok(GrossReturnMode::EntryExit),
            "net-plus-fees" => Ok(GrossReturnMode::NetPlusFees),
            other => Err(CoreError::InvalidInput("gross return mode".to_string(), other.to_string())),
        }
    }
}
