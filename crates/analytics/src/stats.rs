use crate::metrics::total_fees;
use chrono::{Datelike, NaiveDate, Weekday};
use core_types::{Execution, StrategyKind, TradeGroup};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

// ==============================================================================
// Win/loss tally
// ==============================================================================

/// Running win/loss figures over a set of closed groups.
#[derive(Debug, Default)]
struct Tally {
    trades: usize,
    wins: usize,
    losses: usize,
    total: Decimal,
    gross_win: Decimal,
    gross_loss: Decimal,
}

impl Tally {
    fn from_pls(pls: impl IntoIterator<Item = Decimal>) -> Self {
        let mut tally = Self::default();
        for pl in pls {
            tally.push(pl);
        }
        tally
    }

    fn push(&mut self, pl: Decimal) {
        self.trades += 1;
        self.total += pl;
        if pl > Decimal::ZERO {
            self.wins += 1;
            self.gross_win += pl;
        } else if pl < Decimal::ZERO {
            self.losses += 1;
            self.gross_loss += pl.abs();
        }
    }

    fn win_rate_pct(&self) -> Decimal {
        ratio(Decimal::from(self.wins), Decimal::from(self.trades)) * dec!(100)
    }

    /// Gross win over gross loss, zero when nothing lost.
    fn profit_factor(&self) -> Decimal {
        ratio(self.gross_win, self.gross_loss)
    }

    fn average(&self) -> Decimal {
        ratio(self.total, Decimal::from(self.trades))
    }

    fn average_win(&self) -> Decimal {
        ratio(self.gross_win, Decimal::from(self.wins))
    }

    /// Average losing trade, as a negative number.
    fn average_loss(&self) -> Decimal {
        -ratio(self.gross_loss, Decimal::from(self.losses))
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Largest peak-to-trough fall of the cumulative NetPL curve, starting flat.
fn max_drawdown(pls: impl IntoIterator<Item = Decimal>) -> Decimal {
    let mut equity = Decimal::ZERO;
    let mut peak = Decimal::ZERO;
    let mut max_drawdown = Decimal::ZERO;

    for pl in pls {
        equity += pl;
        if equity > peak {
            peak = equity;
        }
        let drawdown = peak - equity;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }
    max_drawdown
}

/// Closed groups only, in (close date, id) order.
fn closed_in_order<'a, T>(rows: &'a [T], group: impl Fn(&T) -> &TradeGroup) -> Vec<&'a T> {
    let mut closed: Vec<&T> = rows.iter().filter(|r| group(*r).is_closed()).collect();
    closed.sort_by_key(|r| (group(*r).close_date, group(*r).id));
    closed
}

// ==============================================================================
// Per-group rows
// ==============================================================================

/// One dashboard row: a group plus the fee-derived figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRow {
    #[serde(flatten)]
    pub group: TradeGroup,
    pub total_fees: Decimal,
    /// NetPL with fees added back.
    pub return_gross: Decimal,
    /// NetPL over the entry credit before fees. Closed credit spreads only.
    pub net_return_pct: Option<Decimal>,
}

impl TradeRow {
    pub fn build(group: TradeGroup, executions: &[Execution]) -> Self {
        let fees = total_fees(executions);
        let return_gross = group.net_pl + fees;

        let net_return_pct = if group.is_closed() && group.kind() == StrategyKind::CreditSpread {
            let opening = executions.iter().filter(|e| e.action_flags().is_open);
            let credit_before_fees: Decimal = opening.map(|e| e.net_amount + e.fees).sum();
            (credit_before_fees > Decimal::ZERO).then(|| group.net_pl / credit_before_fees * dec!(100))
        } else {
            None
        };

        Self {
            group,
            total_fees: fees,
            return_gross,
            net_return_pct,
        }
    }
}

// ==============================================================================
// Aggregates
// ==============================================================================

/// Headline figures over closed groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_net_pl: Decimal,
    pub total_gross_return: Decimal,
    pub win_rate_pct: Decimal,
    pub profit_factor: Decimal,
    pub average_pl: Decimal,
    pub max_drawdown: Decimal,
}

/// Summarizes the closed rows. Open rows are ignored.
pub fn summarize(rows: &[TradeRow]) -> PerformanceSummary {
    let closed = closed_in_order(rows, |r| &r.group);
    let tally = Tally::from_pls(closed.iter().map(|r| r.group.net_pl));

    PerformanceSummary {
        trades: tally.trades,
        wins: tally.wins,
        losses: tally.losses,
        total_net_pl: tally.total,
        total_gross_return: closed.iter().map(|r| r.return_gross).sum(),
        win_rate_pct: tally.win_rate_pct(),
        profit_factor: tally.profit_factor(),
        average_pl: tally.average(),
        max_drawdown: max_drawdown(closed.iter().map(|r| r.group.net_pl)),
    }
}

/// A labelled NetPL total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketRow {
    pub label: String,
    pub net_pl: Decimal,
}

fn bucket_by<K: Ord>(
    groups: &[TradeGroup],
    key: impl Fn(NaiveDate) -> K,
    label: impl Fn(&K) -> String,
) -> Vec<BucketRow> {
    let mut buckets: BTreeMap<K, Decimal> = BTreeMap::new();
    for group in groups {
        if let Some(close_date) = group.close_date {
            *buckets.entry(key(close_date)).or_default() += group.net_pl;
        }
    }
    buckets
        .into_iter()
        .map(|(k, net_pl)| BucketRow { label: label(&k), net_pl })
        .collect()
}

pub fn by_close_year(groups: &[TradeGroup]) -> Vec<BucketRow> {
    bucket_by(groups, |d| d.year(), |y| y.to_string())
}

pub fn by_close_month(groups: &[TradeGroup]) -> Vec<BucketRow> {
    bucket_by(groups, |d| (d.year(), d.month()), |(y, m)| format!("{y}-{m:02}"))
}

/// Days-to-expiration ranges, measured from the open date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DteBucket {
    #[serde(rename = "0-1")]
    ZeroToOne,
    #[serde(rename = "2-3")]
    TwoToThree,
    #[serde(rename = "4-7")]
    FourToSeven,
    #[serde(rename = "8-14")]
    EightToFourteen,
    #[serde(rename = "15-30")]
    FifteenToThirty,
    #[serde(rename = "31+")]
    OverThirty,
}

impl DteBucket {
    pub fn from_dte(dte: i64) -> Self {
        match dte {
            i64::MIN..=1 => DteBucket::ZeroToOne,
            2..=3 => DteBucket::TwoToThree,
            4..=7 => DteBucket::FourToSeven,
            8..=14 => DteBucket::EightToFourteen,
            15..=30 => DteBucket::FifteenToThirty,
            _ => DteBucket::OverThirty,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DteBucket::ZeroToOne => "0-1",
            DteBucket::TwoToThree => "2-3",
            DteBucket::FourToSeven => "4-7",
            DteBucket::EightToFourteen => "8-14",
            DteBucket::FifteenToThirty => "15-30",
            DteBucket::OverThirty => "31+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DteBucketStats {
    pub bucket: DteBucket,
    pub trades: usize,
    pub win_rate_pct: Decimal,
    pub profit_factor: Decimal,
    pub average_pl: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub total_pl: Decimal,
    pub min_dte: i64,
    pub max_dte: i64,
}

pub fn by_dte_bucket(groups: &[TradeGroup]) -> Vec<DteBucketStats> {
    let mut buckets: BTreeMap<DteBucket, Vec<&TradeGroup>> = BTreeMap::new();
    for group in groups.iter().filter(|g| g.is_closed()) {
        buckets.entry(DteBucket::from_dte(group.dte())).or_default().push(group);
    }

    buckets
        .into_iter()
        .map(|(bucket, members)| {
            let tally = Tally::from_pls(members.iter().map(|g| g.net_pl));
            let dtes = members.iter().map(|g| g.dte());
            DteBucketStats {
                bucket,
                trades: tally.trades,
                win_rate_pct: tally.win_rate_pct(),
                profit_factor: tally.profit_factor(),
                average_pl: tally.average(),
                average_win: tally.average_win(),
                average_loss: tally.average_loss(),
                total_pl: tally.total,
                min_dte: dtes.clone().min().unwrap_or_default(),
                max_dte: dtes.max().unwrap_or_default(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayStats {
    pub weekday: Weekday,
    pub trades: usize,
    pub win_rate_pct: Decimal,
    pub profit_factor: Decimal,
    pub average_pl: Decimal,
    pub total_pl: Decimal,
}

/// Closed groups bucketed by the weekday they closed on, Sunday first.
pub fn by_close_weekday(groups: &[TradeGroup]) -> Vec<WeekdayStats> {
    let mut buckets: BTreeMap<u32, (Weekday, Tally)> = BTreeMap::new();
    for group in groups {
        let Some(close_date) = group.close_date else {
            continue;
        };
        let weekday = close_date.weekday();
        buckets
            .entry(weekday.num_days_from_sunday())
            .or_insert_with(|| (weekday, Tally::default()))
            .1
            .push(group.net_pl);
    }

    buckets
        .into_values()
        .map(|(weekday, tally)| WeekdayStats {
            weekday,
            trades: tally.trades,
            win_rate_pct: tally.win_rate_pct(),
            profit_factor: tally.profit_factor(),
            average_pl: tally.average(),
            total_pl: tally.total,
        })
        .collect()
}

// ==============================================================================
// Dashboard
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub broker: String,
    pub account: String,
    pub summary: PerformanceSummary,
    pub by_year: Vec<BucketRow>,
    pub by_month: Vec<BucketRow>,
    pub by_dte: Vec<DteBucketStats>,
    pub trades: Vec<TradeRow>,
}

/// Builds the dashboard from groups paired with their linked executions.
pub fn build_dashboard(
    broker: &str,
    account: &str,
    groups: Vec<(TradeGroup, Vec<Execution>)>,
) -> Dashboard {
    let trades: Vec<TradeRow> = groups
        .into_iter()
        .map(|(group, executions)| TradeRow::build(group, &executions))
        .collect();
    let plain: Vec<TradeGroup> = trades.iter().map(|t| t.group.clone()).collect();
    debug!(broker, account, groups = plain.len(), "Building dashboard");

    Dashboard {
        broker: broker.to_string(),
        account: account.to_string(),
        summary: summarize(&trades),
        by_year: by_close_year(&plain),
        by_month: by_close_month(&plain),
        by_dte: by_dte_bucket(&plain),
        trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{closed_put_spread, fill};
    use core_types::{ContractFamily, GroupShape, OptionRight};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn group(id: i64, open: NaiveDate, close: Option<NaiveDate>, expiration: NaiveDate, net_pl: Decimal) -> TradeGroup {
        TradeGroup {
            id,
            broker: "Schwab".to_string(),
            account: "A1".to_string(),
            family: ContractFamily {
                underlying: "SPX".to_string(),
                expiration,
                right: OptionRight::Put,
            },
            open_date: open,
            close_date: close,
            net_pl,
            gross_return: Decimal::ZERO,
            shape: GroupShape::CreditSpread {
                short_strike: dec!(5000),
                long_strike: dec!(4950),
            },
        }
    }

    fn row(group: TradeGroup) -> TradeRow {
        TradeRow {
            return_gross: group.net_pl + dec!(2),
            group,
            total_fees: dec!(2),
            net_return_pct: None,
        }
    }

    // ==========================================================================
    // Summary
    // ==========================================================================

    #[test]
    fn summary_ignores_open_groups() {
        let rows = vec![
            row(group(1, date(2026, 1, 5), Some(date(2026, 1, 6)), date(2026, 1, 9), dec!(100))),
            row(group(2, date(2026, 1, 5), None, date(2026, 1, 9), dec!(-500))),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.trades, 1);
        assert_eq!(summary.total_net_pl, dec!(100));
        assert_eq!(summary.total_gross_return, dec!(102));
        assert_eq!(summary.win_rate_pct, dec!(100));
        assert_eq!(summary.profit_factor, Decimal::ZERO);
    }

    #[test]
    fn drawdown_follows_close_date_then_id() {
        // Close order: +100 (id 3), -300 (id 1), +50 (id 2) => peak 100, trough -200.
        let rows = vec![
            row(group(1, date(2026, 1, 5), Some(date(2026, 1, 8)), date(2026, 1, 9), dec!(-300))),
            row(group(2, date(2026, 1, 5), Some(date(2026, 1, 8)), date(2026, 1, 9), dec!(50))),
            row(group(3, date(2026, 1, 5), Some(date(2026, 1, 6)), date(2026, 1, 9), dec!(100))),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.max_drawdown, dec!(300));
        assert_eq!(summary.wins, 2);
        assert_eq!(summary.losses, 1);
        assert_eq!(summary.profit_factor, dec!(0.5));
        assert_eq!(summary.average_pl, dec!(-50));
    }

    #[test]
    fn drawdown_counts_losses_from_a_flat_start() {
        assert_eq!(max_drawdown([dec!(-40), dec!(10)]), dec!(40));
        assert_eq!(max_drawdown([dec!(10), dec!(20)]), Decimal::ZERO);
    }

    // ==========================================================================
    // Buckets
    // ==========================================================================

    #[test]
    fn year_and_month_buckets_are_chronological() {
        let groups = vec![
            group(1, date(2025, 12, 1), Some(date(2026, 2, 3)), date(2026, 2, 20), dec!(10)),
            group(2, date(2025, 12, 1), Some(date(2025, 12, 3)), date(2025, 12, 19), dec!(20)),
            group(3, date(2025, 12, 1), Some(date(2026, 2, 9)), date(2026, 2, 20), dec!(-5)),
            group(4, date(2025, 12, 1), None, date(2026, 2, 20), dec!(999)),
        ];

        let years = by_close_year(&groups);
        assert_eq!(
            years,
            vec![
                BucketRow { label: "2025".to_string(), net_pl: dec!(20) },
                BucketRow { label: "2026".to_string(), net_pl: dec!(5) },
            ]
        );

        let months: Vec<String> = by_close_month(&groups).into_iter().map(|b| b.label).collect();
        assert_eq!(months, vec!["2025-12", "2026-02"]);
    }

    #[test]
    fn dte_buckets_cover_every_range() {
        assert_eq!(DteBucket::from_dte(0), DteBucket::ZeroToOne);
        assert_eq!(DteBucket::from_dte(1), DteBucket::ZeroToOne);
        assert_eq!(DteBucket::from_dte(3), DteBucket::TwoToThree);
        assert_eq!(DteBucket::from_dte(7), DteBucket::FourToSeven);
        assert_eq!(DteBucket::from_dte(14), DteBucket::EightToFourteen);
        assert_eq!(DteBucket::from_dte(30), DteBucket::FifteenToThirty);
        assert_eq!(DteBucket::from_dte(31).label(), "31+");
    }

    #[test]
    fn dte_bucket_stats() {
        let groups = vec![
            group(1, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(120)),
            group(2, date(2026, 3, 14), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(-40)),
            group(3, date(2026, 3, 19), Some(date(2026, 3, 20)), date(2026, 3, 20), dec!(30)),
        ];
        let stats = by_dte_bucket(&groups);
        assert_eq!(stats.len(), 2);

        assert_eq!(stats[0].bucket, DteBucket::ZeroToOne);
        assert_eq!(stats[0].trades, 1);

        let week = &stats[1];
        assert_eq!(week.bucket, DteBucket::FourToSeven);
        assert_eq!(week.trades, 2);
        assert_eq!(week.win_rate_pct, dec!(50));
        assert_eq!(week.profit_factor, dec!(3));
        assert_eq!(week.average_win, dec!(120));
        assert_eq!(week.average_loss, dec!(-40));
        assert_eq!(week.total_pl, dec!(80));
        assert_eq!((week.min_dte, week.max_dte), (6, 7));
    }

    #[test]
    fn weekday_stats_start_on_sunday() {
        // 2026-03-16 is a Monday, 2026-03-15 a Sunday.
        let groups = vec![
            group(1, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(10)),
            group(2, date(2026, 3, 13), Some(date(2026, 3, 15)), date(2026, 3, 20), dec!(-10)),
            group(3, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(30)),
        ];
        let stats = by_close_weekday(&groups);
        let days: Vec<Weekday> = stats.iter().map(|s| s.weekday).collect();
        assert_eq!(days, vec![Weekday::Sun, Weekday::Mon]);
        assert_eq!(stats[1].trades, 2);
        assert_eq!(stats[1].average_pl, dec!(20));
    }

    // ==========================================================================
    // Dashboard rows
    // ==========================================================================

    #[test]
    fn net_return_uses_entry_credit_before_fees() {
        let executions = closed_put_spread();
        let g = group(1, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(147.36));
        let row = TradeRow::build(g, &executions);

        assert_eq!(row.total_fees, dec!(2.64));
        assert_eq!(row.return_gross, dec!(150.00));
        // Opening credit before fees: (499.34 + 0.66) + (-300.66 + 0.66) = 200.
        assert_eq!(row.net_return_pct, Some(dec!(73.68)));
    }

    #[test]
    fn open_or_debit_groups_have_no_net_return() {
        let executions = vec![fill(1, 13, "Buy to Open", "SPX 03/20/2026 5000 P", dec!(1), dec!(1), dec!(-100), dec!(0))];
        let closed = group(1, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(-100));
        assert_eq!(TradeRow::build(closed, &executions).net_return_pct, None);

        let open = group(2, date(2026, 3, 13), None, date(2026, 3, 20), Decimal::ZERO);
        assert_eq!(TradeRow::build(open, &closed_put_spread()).net_return_pct, None);
    }

    #[test]
    fn dashboard_combines_rows_and_buckets() {
        let g = group(1, date(2026, 3, 13), Some(date(2026, 3, 16)), date(2026, 3, 20), dec!(147.36));
        let dashboard = build_dashboard("Schwab", "A1", vec![(g, closed_put_spread())]);
        assert_eq!(dashboard.summary.trades, 1);
        assert_eq!(dashboard.summary.total_gross_return, dec!(150.00));
        assert_eq!(dashboard.by_year.len(), 1);
        assert_eq!(dashboard.by_dte[0].bucket, DteBucket::FourToSeven);
        assert_eq!(dashboard.trades.len(), 1);
    }
}
