use crate::candidate::{ButterflyCandidate, GroupCandidate, MatchOutcome};
use crate::snapshot::{closing_execution_ids, ExistingGroups, OptionFill};
use crate::Matcher;
use chrono::NaiveDate;
use core_types::{ButterflyStrikes, ContractFamily, GroupLeg, LegRole, StrategyKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::debug;

/// Finds broken-wing butterflies among the fills opened on the same day.
///
/// Opening fills are netted per strike (buys positive, sells negative). Any
/// three strikes whose nets read `+w / -2w / +w` from low to high form a
/// butterfly. Every qualifying triple is reported, so overlapping butterflies
/// sharing a strike are separate candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButterflyMatcher;

#[derive(Debug, Default)]
struct StrikeNet {
    net: Decimal,
    execution_ids: Vec<i64>,
}

impl Matcher for ButterflyMatcher {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bwb
    }

    fn find_candidates(&self, fills: &[OptionFill<'_>], existing: &ExistingGroups) -> MatchOutcome {
        let mut known = existing.butterflies.clone();
        let mut outcome = MatchOutcome::default();

        let mut buckets: BTreeMap<(NaiveDate, ContractFamily), Vec<&OptionFill<'_>>> = BTreeMap::new();
        for fill in fills.iter().filter(|f| f.flags.is_open) {
            buckets
                .entry((fill.execution.executed_on(), fill.contract.family()))
                .or_default()
                .push(fill);
        }

        for ((open_date, family), opens) in buckets {
            let strikes = net_by_strike(&opens);
            if strikes.len() < 3 {
                continue;
            }

            for i in 0..strikes.len() - 2 {
                for j in i + 1..strikes.len() - 1 {
                    for k in j + 1..strikes.len() {
                        let (low, mid, high) = (&strikes[i], &strikes[j], &strikes[k]);
                        let Some(wing) = butterfly_wing(low.1.net, mid.1.net, high.1.net) else {
                            continue;
                        };
                        outcome.qualifying += 1;

                        let triple = [low.0, mid.0, high.0];
                        let duplicate = known
                            .iter()
                            .any(|b| b.family == family && b.open_date == open_date && b.covers(&triple));
                        if duplicate {
                            debug!(family = %family, %open_date, ?triple, "Butterfly already exists, skipping");
                            outcome.duplicates_skipped += 1;
                            continue;
                        }

                        let mut opening: Vec<i64> = Vec::new();
                        for id in [low, mid, high].iter().flat_map(|(_, n)| n.execution_ids.iter()) {
                            if !opening.contains(id) {
                                opening.push(*id);
                            }
                        }
                        let closing = closing_execution_ids(fills, &family, &triple, &opening);
                        debug!(family = %family, %open_date, ?triple, %wing, "Butterfly candidate");

                        outcome.candidates.push(GroupCandidate::Butterfly(ButterflyCandidate {
                            family: family.clone(),
                            open_date,
                            legs: [
                                GroupLeg { strike: low.0, quantity: low.1.net, role: LegRole::Wing },
                                GroupLeg { strike: mid.0, quantity: mid.1.net, role: LegRole::Body },
                                GroupLeg { strike: high.0, quantity: high.1.net, role: LegRole::Wing },
                            ],
                            opening_execution_ids: opening,
                            closing_execution_ids: closing,
                        }));
                        known.push(ButterflyStrikes {
                            family: family.clone(),
                            open_date,
                            strikes: triple.into_iter().collect(),
                        });
                    }
                }
            }
        }

        outcome
    }
}

/// Net signed quantity per strike, ascending, with zero-net strikes dropped.
fn net_by_strike(opens: &[&OptionFill<'_>]) -> Vec<(Decimal, StrikeNet)> {
    let mut by_strike: BTreeMap<Decimal, StrikeNet> = BTreeMap::new();
    for fill in opens {
        let entry = by_strike.entry(fill.contract.strike).or_default();
        entry.execution_ids.push(fill.id());

        let quantity = fill.execution.abs_quantity();
        if fill.flags.is_buy {
            entry.net += quantity;
        } else if fill.flags.is_sell {
            entry.net -= quantity;
        }
    }
    by_strike.into_iter().filter(|(_, n)| !n.net.is_zero()).collect()
}

/// The wing size when `low / mid / high` read `+w / -2w / +w`, else `None`.
fn butterfly_wing(low: Decimal, mid: Decimal, high: Decimal) -> Option<Decimal> {
    let wing = low.abs().min(high.abs());
    if wing.is_zero() {
        return None;
    }
    (low == wing && high == wing && mid == -wing * dec!(2)).then_some(wing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::annotate;
    use crate::snapshot::testing::exec;
    use core_types::Execution;

    fn butterflies(outcome: &MatchOutcome) -> Vec<&ButterflyCandidate> {
        outcome
            .candidates
            .iter()
            .map(|c| match c {
                GroupCandidate::Butterfly(b) => b,
                other => panic!("unexpected candidate {other:?}"),
            })
            .collect()
    }

    fn strikes(candidate: &ButterflyCandidate) -> Vec<Decimal> {
        candidate.legs.iter().map(|l| l.strike).collect()
    }

    fn put(strike: u32) -> String {
        format!("SPX 03/20/2026 {strike} P")
    }

    // ==========================================================================
    // Quantity law
    // ==========================================================================

    #[test]
    fn wing_law_accepts_only_plus_w_minus_two_w_plus_w() {
        assert_eq!(butterfly_wing(dec!(1), dec!(-2), dec!(1)), Some(dec!(1)));
        assert_eq!(butterfly_wing(dec!(3), dec!(-6), dec!(3)), Some(dec!(3)));
        assert_eq!(butterfly_wing(dec!(1), dec!(-2), dec!(2)), None);
        assert_eq!(butterfly_wing(dec!(-1), dec!(2), dec!(-1)), None);
        assert_eq!(butterfly_wing(dec!(1), dec!(-1), dec!(1)), None);
        assert_eq!(butterfly_wing(dec!(0), dec!(0), dec!(0)), None);
    }

    #[test]
    fn accepts_butterfly_and_ignores_zero_net_strike() {
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(85), dec!(1)),
            exec(2, 13, 0, "Sell to Open", &put(90), dec!(-2)),
            exec(3, 13, 0, "Buy to Open", &put(100), dec!(1)),
            exec(4, 13, 1, "Buy to Open", &put(95), dec!(1)),
            exec(5, 13, 2, "Sell to Open", &put(95), dec!(-1)),
        ];
        let fills = annotate(&executions);
        let outcome = ButterflyMatcher.find_candidates(&fills, &ExistingGroups::default());

        let found = butterflies(&outcome);
        assert_eq!(found.len(), 1);
        let bwb = found[0];
        assert_eq!(strikes(bwb), vec![dec!(85), dec!(90), dec!(100)]);
        let quantities: Vec<Decimal> = bwb.legs.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![dec!(1), dec!(-2), dec!(1)]);
        let roles: Vec<LegRole> = bwb.legs.iter().map(|l| l.role).collect();
        assert_eq!(roles, vec![LegRole::Wing, LegRole::Body, LegRole::Wing]);
        assert_eq!(bwb.opening_execution_ids, vec![1, 2, 3]);
    }

    #[test]
    fn every_emitted_butterfly_obeys_the_quantity_law() {
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(80), dec!(2)),
            exec(2, 13, 0, "Sell to Open", &put(85), dec!(4)),
            exec(3, 13, 0, "Buy to Open", &put(90), dec!(2)),
            exec(4, 13, 0, "Sell to Open", &put(95), dec!(3)),
            exec(5, 13, 0, "Buy to Open", &put(100), dec!(2)),
        ];
        let fills = annotate(&executions);
        let outcome = ButterflyMatcher.find_candidates(&fills, &ExistingGroups::default());

        assert!(!outcome.candidates.is_empty());
        for bwb in butterflies(&outcome) {
            let [low, mid, high] = &bwb.legs;
            let w = low.quantity;
            assert!(w > Decimal::ZERO);
            assert_eq!(high.quantity, w);
            assert_eq!(mid.quantity, -w * dec!(2));
        }
    }

    #[test]
    fn overlapping_triples_are_separate_candidates() {
        // 80 / 90 / 100 and 80 / 90 / 110 both read +1 / -2 / +1.
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(80), dec!(1)),
            exec(2, 13, 0, "Sell to Open", &put(90), dec!(2)),
            exec(3, 13, 0, "Buy to Open", &put(100), dec!(1)),
            exec(4, 13, 0, "Buy to Open", &put(110), dec!(1)),
        ];
        let fills = annotate(&executions);
        let outcome = ButterflyMatcher.find_candidates(&fills, &ExistingGroups::default());

        let found: Vec<Vec<Decimal>> = butterflies(&outcome).into_iter().map(strikes).collect();
        assert_eq!(
            found,
            vec![
                vec![dec!(80), dec!(90), dec!(100)],
                vec![dec!(80), dec!(90), dec!(110)],
            ]
        );
    }

    #[test]
    fn legs_must_open_on_the_same_day() {
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(85), dec!(1)),
            exec(2, 13, 0, "Sell to Open", &put(90), dec!(2)),
            exec(3, 14, 0, "Buy to Open", &put(100), dec!(1)),
        ];
        let fills = annotate(&executions);
        let outcome = ButterflyMatcher.find_candidates(&fills, &ExistingGroups::default());
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn closes_link_across_later_days() {
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(85), dec!(1)),
            exec(2, 13, 0, "Sell to Open", &put(90), dec!(2)),
            exec(3, 13, 0, "Buy to Open", &put(100), dec!(1)),
            exec(4, 17, 0, "Sell to Close", &put(100), dec!(1)),
            exec(5, 17, 0, "Buy to Close", &put(95), dec!(1)),
            exec(6, 20, 0, "Expired", &put(85), dec!(1)),
        ];
        let fills = annotate(&executions);
        let outcome = ButterflyMatcher.find_candidates(&fills, &ExistingGroups::default());
        let found = butterflies(&outcome);
        assert_eq!(found[0].closing_execution_ids, vec![4, 6]);
    }

    // ==========================================================================
    // Deduplication
    // ==========================================================================

    #[test]
    fn existing_group_covering_all_three_strikes_is_skipped() {
        let executions: Vec<Execution> = vec![
            exec(1, 13, 0, "Buy to Open", &put(85), dec!(1)),
            exec(2, 13, 0, "Sell to Open", &put(90), dec!(2)),
            exec(3, 13, 0, "Buy to Open", &put(100), dec!(1)),
        ];
        let fills = annotate(&executions);
        let family = fills[0].contract.family();
        let open_date = NaiveDate::from_ymd_opt(2026, 3, 13).unwrap();

        let mut existing = ExistingGroups::default();
        existing.butterflies.push(ButterflyStrikes {
            family: family.clone(),
            open_date,
            strikes: [dec!(85), dec!(90), dec!(100)].into_iter().collect(),
        });
        let outcome = ButterflyMatcher.find_candidates(&fills, &existing);
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.duplicates_skipped, 1);

        // A different open date does not count.
        existing.butterflies[0].open_date = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let outcome = ButterflyMatcher.find_candidates(&fills, &existing);
        assert_eq!(outcome.candidates.len(), 1);
    }
}
