use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;

// Two-digit years first: `%Y` would read "25" as year 25.
const DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%H:%M:%S%.f"];
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const AS_OF: &str = " as of ";

/// Stamped on rows whose date could not be read.
pub fn sentinel_timestamp() -> NaiveDateTime {
    DateTime::UNIX_EPOCH.naive_utc()
}

/// Lenient money/quantity parse: `$1,234.50`, `(12.00)` and `-3` all work.
/// Blank or unreadable cells are `None`.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '$' && *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    let (body, negative) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (cleaned.as_str(), false),
    };

    let value = Decimal::from_str(body).ok()?;
    Some(if negative { -value } else { value })
}

/// Outcome of reading the date and time cells of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutedAt {
    Parsed(NaiveDateTime),
    /// Both cells empty or absent.
    Blank,
    /// Something was there but no known format matched.
    Unparsed,
}

/// Combines a date cell and an optional time cell.
///
/// Schwab back-dated rows read `"11/17/2025 as of 11/14/2025"`; the as-of date
/// is the trade date. When date and time do not parse together the date alone
/// is tried, at midnight.
pub fn parse_executed_at(date: Option<&str>, time: Option<&str>) -> ExecutedAt {
    let date = date.map(str::trim).filter(|s| !s.is_empty());
    let time = time.map(str::trim).filter(|s| !s.is_empty());

    let Some(date) = date else {
        return if time.is_none() {
            ExecutedAt::Blank
        } else {
            ExecutedAt::Unparsed
        };
    };
    let date = as_of_date(date);

    if let Some(time) = time {
        if let (Some(d), Some(t)) = (parse_date(date), parse_time(time)) {
            return ExecutedAt::Parsed(d.and_time(t));
        }
    }

    if let Some(dt) = parse_datetime(date) {
        return ExecutedAt::Parsed(dt);
    }

    match parse_date(date) {
        Some(d) => ExecutedAt::Parsed(d.and_time(NaiveTime::MIN)),
        None => ExecutedAt::Unparsed,
    }
}

fn as_of_date(date: &str) -> &str {
    let lowered = date.to_ascii_lowercase();
    match lowered.find(AS_OF) {
        Some(idx) => {
            let after = date[idx + AS_OF.len()..].trim();
            if after.is_empty() { date[..idx].trim() } else { after }
        }
        None => date,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(s, f).ok())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn money_strips_symbols_and_reads_parentheses_as_negative() {
        assert_eq!(parse_decimal("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("($1,234.56)"), Some(dec!(-1234.56)));
        assert_eq!(parse_decimal(" -$0.66 "), Some(dec!(-0.66)));
        assert_eq!(parse_decimal("-1"), Some(dec!(-1)));
    }

    #[test]
    fn blank_or_garbage_money_is_none() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("   "), None);
        assert_eq!(parse_decimal("$"), None);
        assert_eq!(parse_decimal("n/a"), None);
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(
            parse_executed_at(Some("11/14/2025"), None),
            ExecutedAt::Parsed(at(2025, 11, 14, 0, 0, 0))
        );
    }

    #[test]
    fn date_and_time_combine() {
        assert_eq!(
            parse_executed_at(Some("11/14/2025"), Some("09:31:05")),
            ExecutedAt::Parsed(at(2025, 11, 14, 9, 31, 5))
        );
        assert_eq!(
            parse_executed_at(Some("2025-11-14"), Some("3:45 PM")),
            ExecutedAt::Parsed(at(2025, 11, 14, 15, 45, 0))
        );
    }

    #[test]
    fn as_of_keeps_the_trade_date() {
        assert_eq!(
            parse_executed_at(Some("11/17/2025 as of 11/14/2025"), None),
            ExecutedAt::Parsed(at(2025, 11, 14, 0, 0, 0))
        );
        assert_eq!(
            parse_executed_at(Some("11/17/2025 AS OF 11/14/2025"), Some("10:00")),
            ExecutedAt::Parsed(at(2025, 11, 14, 10, 0, 0))
        );
    }

    #[test]
    fn unreadable_time_falls_back_to_the_date() {
        assert_eq!(
            parse_executed_at(Some("11/14/2025"), Some("sometime")),
            ExecutedAt::Parsed(at(2025, 11, 14, 0, 0, 0))
        );
    }

    #[test]
    fn blank_and_unparsed_are_distinguished() {
        assert_eq!(parse_executed_at(None, None), ExecutedAt::Blank);
        assert_eq!(parse_executed_at(Some(" "), Some("")), ExecutedAt::Blank);
        assert_eq!(parse_executed_at(Some("yesterday"), None), ExecutedAt::Unparsed);
        assert_eq!(parse_executed_at(None, Some("09:30")), ExecutedAt::Unparsed);
    }

    #[test]
    fn sentinel_is_the_unix_epoch() {
        assert_eq!(sentinel_timestamp(), at(1970, 1, 1, 0, 0, 0));
    }
}
