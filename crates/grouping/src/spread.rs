use crate::candidate::{GroupCandidate, MatchOutcome, SpreadCandidate};
use crate::snapshot::{closing_execution_ids, ExistingGroups, OptionFill};
use crate::Matcher;
use core_types::{ContractFamily, SpreadKey, StrategyKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Pairs sell-to-open and buy-to-open fills of one family into credit spreads.
///
/// Pairing is greedy: sells are visited in execution order and each takes the
/// remaining buy with the same absolute quantity and the nearest strike. The
/// execution date is not part of the bucket, so legs opened on different days
/// can still pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadMatcher;

impl Matcher for SpreadMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CreditSpread
    }

    fn find_candidates(&self, fills: &[OptionFill<'_>], existing: &ExistingGroups) -> MatchOutcome {
        let mut known = existing.spreads.clone();
        let mut outcome = MatchOutcome::default();

        let mut buckets: BTreeMap<ContractFamily, Vec<&OptionFill<'_>>> = BTreeMap::new();
        for fill in fills.iter().filter(|f| f.flags.is_open) {
            buckets.entry(fill.contract.family()).or_default().push(fill);
        }

        for (family, opens) in buckets {
            let sells: Vec<&OptionFill<'_>> = opens.iter().copied().filter(|f| f.flags.is_sell).collect();
            let mut buys: Vec<&OptionFill<'_>> = opens.iter().copied().filter(|f| f.flags.is_buy).collect();

            for sell in sells {
                let quantity = sell.execution.abs_quantity();
                if quantity.is_zero() {
                    continue;
                }

                // min_by_key keeps the first of equally distant strikes.
                let nearest = buys
                    .iter()
                    .enumerate()
                    .filter(|(_, buy)| buy.execution.abs_quantity() == quantity)
                    .min_by_key(|(_, buy)| (buy.contract.strike - sell.contract.strike).abs())
                    .map(|(index, _)| index);
                let Some(index) = nearest else {
                    continue;
                };
                let buy = buys.remove(index);
                outcome.qualifying += 1;

                let key = SpreadKey {
                    family: family.clone(),
                    short_strike: sell.contract.strike,
                    long_strike: buy.contract.strike,
                };
                if known.contains(&key) {
                    debug!(
                        family = %family,
                        short = %key.short_strike,
                        long = %key.long_strike,
                        "Credit spread already exists, skipping"
                    );
                    outcome.duplicates_skipped += 1;
                    continue;
                }

                let closing = closing_execution_ids(
                    fills,
                    &family,
                    &[key.short_strike, key.long_strike],
                    &[sell.id(), buy.id()],
                );
                debug!(
                    family = %family,
                    short = %key.short_strike,
                    long = %key.long_strike,
                    closes = closing.len(),
                    "Credit spread candidate"
                );

                outcome.candidates.push(GroupCandidate::CreditSpread(SpreadCandidate {
                    family: family.clone(),
                    short_strike: key.short_strike,
                    long_strike: key.long_strike,
                    open_date: sell.execution.executed_on(),
                    sell_execution_id: sell.id(),
                    buy_execution_id: buy.id(),
                    closing_execution_ids: closing,
                }));
                known.insert(key);
            }
        }

        outcome
    }
}
