use core_types::{ActionFlags, ButterflyStrikes, ContractFamily, Execution, OptionContract, SpreadKey};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// A stored execution whose symbol parsed as an option contract.
#[derive(Debug, Clone)]
pub struct OptionFill<'a> {
    pub execution: &'a Execution,
    pub contract: OptionContract,
    pub flags: ActionFlags,
}

impl OptionFill<'_> {
    pub fn id(&self) -> i64 {
        self.execution.id
    }
}

/// Parses and classifies every execution, dropping the ones that are not options.
///
/// The result is ordered by execution time, then id, whatever order the input
/// arrived in.
pub fn annotate(executions: &[Execution]) -> Vec<OptionFill<'_>> {
    let mut fills: Vec<OptionFill<'_>> = executions
        .iter()
        .filter_map(|execution| {
            let contract = execution.contract()?;
            Some(OptionFill {
                execution,
                contract,
                flags: execution.action_flags(),
            })
        })
        .collect();
    fills.sort_by_key(|f| (f.execution.executed_at, f.execution.id));
    fills
}

/// Natural keys of the groups a scope already holds.
#[derive(Debug, Clone, Default)]
pub struct ExistingGroups {
    pub spreads: BTreeSet<SpreadKey>,
    pub butterflies: Vec<ButterflyStrikes>,
}

/// Ids of closing fills in `family` at any of `strikes`, skipping `already_linked`.
///
/// Closing fills are searched across the whole snapshot, not just the opening
/// day. Order follows the snapshot and every id appears once.
pub(crate) fn closing_execution_ids(
    fills: &[OptionFill<'_>],
    family: &ContractFamily,
    strikes: &[Decimal],
    already_linked: &[i64],
) -> Vec<i64> {
    let mut ids = Vec::new();
    for fill in fills {
        if !fill.flags.is_close || !fill.contract.is_in(family) {
            continue;
        }
        if !strikes.contains(&fill.contract.strike) {
            continue;
        }
        let id = fill.id();
        if already_linked.contains(&id) || ids.contains(&id) {
            continue;
        }
        ids.push(id);
    }
    ids
}
