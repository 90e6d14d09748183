use chrono::NaiveDate;
use core_types::{Execution, GroupMetrics, GrossReturnMode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: Decimal = dec!(100);

/// Sum of `net_amount` over the group's executions.
pub fn net_pl(executions: &[Execution]) -> Decimal {
    executions.iter().map(|e| e.net_amount).sum()
}

pub fn total_fees(executions: &[Execution]) -> Decimal {
    executions.iter().map(|e| e.fees).sum()
}

fn premium(execution: &Execution) -> Decimal {
    execution.price.unwrap_or(Decimal::ZERO) * execution.abs_quantity() * CONTRACT_MULTIPLIER
}

/// Premium received on sell-to-open fills, from fill prices.
pub fn entry_credit(executions: &[Execution]) -> Decimal {
    executions
        .iter()
        .filter(|e| e.action_flags().is_sell_to_open())
        .map(premium)
        .sum()
}

/// Premium paid on buy-to-close fills, from fill prices.
pub fn exit_debit(executions: &[Execution]) -> Decimal {
    executions
        .iter()
        .filter(|e| e.action_flags().is_buy_to_close())
        .map(premium)
        .sum()
}

/// Entry credit minus exit debit. The normal matching path.
pub fn gross_return_entry_exit(executions: &[Execution]) -> Decimal {
    entry_credit(executions) - exit_debit(executions)
}

/// NetPL with the fees added back. Used when a scope is rebuilt from empty.
pub fn gross_return_net_plus_fees(executions: &[Execution]) -> Decimal {
    net_pl(executions) + total_fees(executions)
}

/// Latest execution date among closing fills, `None` while nothing has closed.
pub fn close_date(executions: &[Execution]) -> Option<NaiveDate> {
    executions
        .iter()
        .filter(|e| e.action_flags().is_close)
        .map(Execution::executed_on)
        .max()
}

/// Derives every persisted summary field of a group from its linked executions.
pub fn compute(executions: &[Execution], mode: GrossReturnMode) -> GroupMetrics {
    let gross_return = match mode {
        GrossReturnMode::EntryExit => gross_return_entry_exit(executions),
        GrossReturnMode::NetPlusFees => gross_return_net_plus_fees(executions),
    };

    GroupMetrics {
        net_pl: net_pl(executions),
        gross_return,
        close_date: close_date(executions),
    }
}
