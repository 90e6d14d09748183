use analytics::{DteBucketStats, RiskProfile, WeekdayStats};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Table};
use core_types::{Execution, TradeGroup};
use rust_decimal::Decimal;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

fn num(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}

fn money(value: Decimal) -> Cell {
    num(format!("{value:.2}"))
}

fn maybe_money(value: Option<Decimal>) -> Cell {
    match value {
        Some(v) => money(v),
        None => Cell::new(""),
    }
}

fn qty(value: Option<Decimal>) -> Cell {
    num(value.map(|q| q.normalize().to_string()).unwrap_or_default())
}

fn pct(value: Decimal) -> Cell {
    num(format!("{value:.1}%"))
}

fn contract_label(execution: &Execution) -> String {
    execution
        .contract()
        .map(|c| c.to_string())
        .unwrap_or_else(|| execution.symbol.clone())
}

/// `list-exec`: raw executions, newest first.
pub fn executions(rows: &[Execution]) -> Table {
    let mut t = table(&["Time", "Action", "Symbol", "Qty", "Price", "NetAmt", "Fees"]);
    for e in rows {
        t.add_row(vec![
            Cell::new(e.executed_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&e.action),
            Cell::new(&e.symbol),
            qty(e.quantity),
            maybe_money(e.price),
            money(e.net_amount),
            money(e.fees),
        ]);
    }
    t
}

/// `scan-options`: how each symbol parses.
pub fn option_scan(rows: &[Execution]) -> Table {
    let mut t = table(&["Date", "Action", "Contract", "Qty", "Net"]);
    for e in rows {
        let contract = match e.contract() {
            Some(c) => c.to_string(),
            None => format!("(non-option) '{}'", e.symbol),
        };
        t.add_row(vec![
            Cell::new(e.executed_on()),
            Cell::new(&e.action),
            Cell::new(contract),
            qty(e.quantity),
            money(e.net_amount),
        ]);
    }
    t
}

/// `list-groups`: one row per group with its risk profile.
pub fn groups(rows: &[(TradeGroup, RiskProfile)]) -> Table {
    let mut t = table(&[
        "Id", "Open", "Close", "Outcome", "Kind", "Und", "Exp", "R", "Strikes", "Qty", "W", "DTE", "Days",
        "EntryPx", "ExitPx", "Credit", "Debit", "NetPL", "GrossRsk", "MaxRisk", "Ret%", "BE", "ROC/d",
    ]);
    for (g, risk) in rows {
        let spread = risk.spread.as_ref();
        t.add_row(vec![
            num(g.id),
            Cell::new(g.open_date),
            Cell::new(g.close_date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(risk.outcome),
            Cell::new(g.kind()),
            Cell::new(&g.family.underlying),
            Cell::new(g.family.expiration),
            Cell::new(g.family.right.code()),
            Cell::new(g.strikes_label()),
            qty(spread.map(|s| s.contracts)),
            qty(spread.map(|s| s.width)),
            num(g.dte()),
            num(g.days_held().map(|d| d.to_string()).unwrap_or_default()),
            maybe_money(spread.and_then(|s| s.entry_price)),
            maybe_money(spread.and_then(|s| s.exit_price)),
            money(risk.entry_credit),
            money(risk.exit_debit),
            money(g.net_pl),
            maybe_money(spread.map(|s| s.gross_risk)),
            maybe_money(spread.map(|s| s.max_risk)),
            maybe_money(risk.return_pct),
            maybe_money(risk.breakeven),
            maybe_money(risk.roc_per_day),
        ]);
    }
    t
}

/// `list-group-exec`: the fills linked to one group, oldest first.
pub fn group_executions(rows: &[Execution]) -> Table {
    let mut t = table(&["Time", "Action", "Qty", "Price", "NetAmt", "Fees", "Contract"]);
    for e in rows {
        t.add_row(vec![
            Cell::new(e.executed_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&e.action),
            qty(e.quantity),
            maybe_money(e.price),
            money(e.net_amount),
            money(e.fees),
            Cell::new(contract_label(e)),
        ]);
    }
    t
}

pub fn dte_buckets(rows: &[DteBucketStats]) -> Table {
    let mut t = table(&["Bucket", "Trades", "Win%", "PF", "AvgPL", "AvgWin", "AvgLoss", "TotalPL", "DTE Range"]);
    for b in rows {
        t.add_row(vec![
            Cell::new(b.bucket.label()),
            num(b.trades),
            pct(b.win_rate_pct),
            money(b.profit_factor),
            money(b.average_pl),
            money(b.average_win),
            money(b.average_loss),
            money(b.total_pl),
            Cell::new(format!("{}-{}", b.min_dte, b.max_dte)),
        ]);
    }
    t
}

pub fn weekdays(rows: &[WeekdayStats]) -> Table {
    let mut t = table(&["Day", "Trades", "Win%", "PF", "AvgPL", "TotalPL"]);
    for d in rows {
        t.add_row(vec![
            Cell::new(d.weekday),
            num(d.trades),
            pct(d.win_rate_pct),
            money(d.profit_factor),
            money(d.average_pl),
            money(d.total_pl),
        ]);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn execution(symbol: &str) -> Execution {
        Execution {
            id: 1,
            fingerprint: "FP".to_string(),
            broker: "Schwab".to_string(),
            account: "A1".to_string(),
            executed_at: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap().and_hms_opt(9, 31, 0).unwrap(),
            symbol: symbol.to_string(),
            description: String::new(),
            action: "Sell to Open".to_string(),
            quantity: Some(dec!(2)),
            price: Some(dec!(1.5)),
            fees: dec!(1.32),
            net_amount: dec!(298.68),
            currency: "USD".to_string(),
            source_file: "x.csv".to_string(),
            source_row: 2,
        }
    }

    #[test]
    fn execution_rows_use_two_decimal_money() {
        let rendered = executions(&[execution("SPX 03/20/2026 5000 P")]).to_string();
        assert!(rendered.contains("2026-03-13 09:31:00"));
        assert!(rendered.contains("298.68"));
        assert!(rendered.contains("1.50"));
    }

    #[test]
    fn scan_marks_non_options() {
        let rendered = option_scan(&[execution("MSFT"), execution("SPX 03/20/2026 5000.00 P")]).to_string();
        assert!(rendered.contains("(non-option) 'MSFT'"));
        assert!(rendered.contains("SPX 2026-03-20 5000 Put"));
    }
}
