use crate::metrics::CONTRACT_MULTIPLIER;
use core_types::{Execution, GroupShape, OptionRight, TradeGroup};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

/// A loss within this many dollars of the maximum risk is reported as a max loss.
const MAX_LOSS_TOLERANCE: Decimal = dec!(1.00);

/// How a group finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Open,
    Win,
    #[serde(rename = "MAXL")]
    MaxLoss,
    Loss,
    Flat,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Open => "OPEN",
            Outcome::Win => "WIN",
            Outcome::MaxLoss => "MAXL",
            Outcome::Loss => "LOSS",
            Outcome::Flat => "FLAT",
        }
    }

    /// Classifies a group from its NetPL. `max_risk` is only known for credit spreads.
    pub fn classify(group: &TradeGroup, max_risk: Option<Decimal>) -> Self {
        if !group.is_closed() {
            return Outcome::Open;
        }
        if group.net_pl > Decimal::ZERO {
            return Outcome::Win;
        }
        if group.net_pl < Decimal::ZERO {
            return match max_risk {
                Some(risk) if (group.net_pl + risk).abs() <= MAX_LOSS_TOLERANCE => Outcome::MaxLoss,
                _ => Outcome::Loss,
            };
        }
        Outcome::Flat
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and risk of a credit spread, known once both opening legs are linked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadRisk {
    pub contracts: Decimal,
    pub width: Decimal,
    pub gross_risk: Decimal,
    pub max_risk: Decimal,
    /// Entry credit per share. `None` for a zero-contract spread.
    pub entry_price: Option<Decimal>,
    /// Exit debit per share, closed groups only.
    pub exit_price: Option<Decimal>,
}

/// Reporting-only view of a group's cash flows and risk. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskProfile {
    /// Net credit taken in on opening fills, from net amounts, floored at zero.
    pub entry_credit: Decimal,
    /// Net debit paid on closing fills, from net amounts, floored at zero.
    pub exit_debit: Decimal,
    pub spread: Option<SpreadRisk>,
    pub return_pct: Option<Decimal>,
    pub breakeven: Option<Decimal>,
    pub roc_per_day: Option<Decimal>,
    pub outcome: Outcome,
}

impl RiskProfile {
    pub fn evaluate(group: &TradeGroup, executions: &[Execution]) -> Self {
        let (entry_credit, exit_debit) = net_cash_flows(executions);
        let spread = match group.shape {
            GroupShape::CreditSpread {
                short_strike,
                long_strike,
            } => spread_risk(group, executions, short_strike, long_strike, entry_credit, exit_debit),
            GroupShape::Butterfly { .. } => None,
        };

        let return_pct = spread
            .as_ref()
            .filter(|s| !s.max_risk.is_zero())
            .map(|s| group.net_pl / s.max_risk * dec!(100));

        let breakeven = match (&group.shape, spread.as_ref().and_then(|s| s.entry_price)) {
            (GroupShape::CreditSpread { short_strike, .. }, Some(entry_price)) => Some(match group.family.right {
                OptionRight::Put => *short_strike - entry_price,
                OptionRight::Call => *short_strike + entry_price,
            }),
            _ => None,
        };

        let roc_per_day = match (return_pct, group.days_held()) {
            (Some(pct), Some(days)) if days > 0 => Some(pct / Decimal::from(days)),
            _ => None,
        };

        let outcome = Outcome::classify(group, spread.as_ref().map(|s| s.max_risk));

        Self {
            entry_credit,
            exit_debit,
            spread,
            return_pct,
            breakeven,
            roc_per_day,
            outcome,
        }
    }

    /// A closed group that paid to exit without ever collecting a credit
    /// usually points at a sign problem in the imported data.
    pub fn has_suspect_credit(&self, group: &TradeGroup) -> bool {
        group.is_closed() && self.entry_credit.is_zero() && self.exit_debit > Decimal::ZERO
    }
}

fn net_cash_flows(executions: &[Execution]) -> (Decimal, Decimal) {
    let mut credit = Decimal::ZERO;
    let mut debit = Decimal::ZERO;

    for execution in executions {
        let flags = execution.action_flags();
        let amount = execution.net_amount.abs();
        if flags.is_open {
            if flags.is_sell {
                credit += amount;
            } else if flags.is_buy {
                credit -= amount;
            }
        } else if flags.is_close {
            if flags.is_buy {
                debit += amount;
            } else if flags.is_sell {
                debit -= amount;
            }
        }
    }

    (credit.max(Decimal::ZERO), debit.max(Decimal::ZERO))
}

fn spread_risk(
    group: &TradeGroup,
    executions: &[Execution],
    short_strike: Decimal,
    long_strike: Decimal,
    entry_credit: Decimal,
    exit_debit: Decimal,
) -> Option<SpreadRisk> {
    let mut short_quantity = None;
    let mut long_quantity = None;
    for execution in executions.iter().filter(|e| e.action_flags().is_open) {
        let Some(contract) = execution.contract() else {
            continue;
        };
        if contract.strike == short_strike {
            short_quantity = Some(execution.abs_quantity());
        }
        if contract.strike == long_strike {
            long_quantity = Some(execution.abs_quantity());
        }
    }

    let contracts = short_quantity?.min(long_quantity?);
    let width = (short_strike - long_strike).abs();
    let gross_risk = width * CONTRACT_MULTIPLIER * contracts;
    let max_risk = gross_risk - entry_credit;

    let (entry_price, exit_price) = if contracts > Decimal::ZERO {
        let shares = contracts * CONTRACT_MULTIPLIER;
        let exit = group.is_closed().then(|| exit_debit / shares);
        (Some(entry_credit / shares), exit)
    } else {
        (None, None)
    };

    Some(SpreadRisk {
        contracts,
        width,
        gross_risk,
        max_risk,
        entry_price,
        exit_price,
    })
}
