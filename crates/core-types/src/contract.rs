use crate::enums::OptionRight;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Example: "SPXW 02/10/2026 6880.00 P"
static OPTION_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([A-Z0-9.]+)\s+([0-9]{2}/[0-9]{2}/[0-9]{4})\s+([0-9]+(?:\.[0-9]+)?)\s+([CP])\s*$")
        .expect("option symbol pattern compiles")
});

/// The (underlying, expiration, right) triple shared by every leg of a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractFamily {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub right: OptionRight,
}

impl fmt::Display for ContractFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.underlying, self.expiration.format("%Y-%m-%d"), self.right)
    }
}

/// A single option contract recovered from a broker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContract {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub strike: Decimal,
    pub right: OptionRight,
}

impl OptionContract {
    pub fn family(&self) -> ContractFamily {
        ContractFamily {
            underlying: self.underlying.clone(),
            expiration: self.expiration,
            right: self.right,
        }
    }

    /// True when this contract belongs to `family`, without allocating.
    pub fn is_in(&self, family: &ContractFamily) -> bool {
        self.underlying == family.underlying
            && self.expiration == family.expiration
            && self.right == family.right
    }
}

impl fmt::Display for OptionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.underlying,
            self.expiration.format("%Y-%m-%d"),
            self.strike.normalize(),
            self.right
        )
    }
}

/// Parses `<UNDERLYING> <MM/DD/YYYY> <STRIKE> <C|P>`.
///
/// Returns `None` for anything else. Equities, cash movements and malformed
/// dates or strikes are ordinary rows in an export, so there is no error case.
pub fn parse_option_symbol(symbol: &str) -> Option<OptionContract> {
    let caps = OPTION_SYMBOL.captures(symbol)?;

    let underlying = caps[1].to_ascii_uppercase();
    let expiration = NaiveDate::parse_from_str(&caps[2], "%m/%d/%Y").ok()?;
    let strike = Decimal::from_str(&caps[3]).ok()?;
    let right = if caps[4].eq_ignore_ascii_case("p") {
        OptionRight::Put
    } else {
        OptionRight::Call
    };

    Some(OptionContract {
        underlying,
        expiration,
        strike,
        right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_index_option_symbol() {
        let c = parse_option_symbol("SPXW 02/10/2026 6880.00 P").unwrap();
        assert_eq!(c.underlying, "SPXW");
        assert_eq!(c.expiration, date(2026, 2, 10));
        assert_eq!(c.strike, dec!(6880));
        assert_eq!(c.right, OptionRight::Put);
    }

    #[test]
    fn parsing_is_case_insensitive_and_upper_cases_underlying() {
        let c = parse_option_symbol("  brk.b 12/19/2025 450 c ").unwrap();
        assert_eq!(c.underlying, "BRK.B");
        assert_eq!(c.strike, dec!(450));
        assert_eq!(c.right, OptionRight::Call);
    }

    #[test]
    fn fractional_strikes_are_kept_exactly() {
        let c = parse_option_symbol("XSP 01/16/2026 587.5 P").unwrap();
        assert_eq!(c.strike, dec!(587.5));
    }

    #[test]
    fn non_option_symbols_are_not_contracts() {
        for symbol in [
            "",
            "AAPL",
            "SPY 02/10/2026 500",
            "SPY 02/10/2026 500 P extra",
            "SPY 2026-02-10 500 P",
            "SPY 02/30/2026 500 P",
            "SPY 13/01/2026 500 P",
            "SPY 02/10/2026 abc P",
            "SPY 02/10/2026 -500 P",
            "SPY 02/10/2026 500 X",
            "SPY 2/10/2026 500 P",
            "SPY 02/10/2026 500.P",
        ] {
            assert!(parse_option_symbol(symbol).is_none(), "{symbol:?} parsed");
        }
    }

    #[test]
    fn match_is_anchored_to_the_whole_string() {
        assert!(parse_option_symbol("X SPY 02/10/2026 500 P").is_none());
        assert!(parse_option_symbol("SPY 02/10/2026 500 PUT").is_none());
    }

    #[test]
    fn family_groups_by_underlying_expiration_and_right() {
        let a = parse_option_symbol("SPX 03/20/2026 5000 P").unwrap();
        let b = parse_option_symbol("spx 03/20/2026 4950.00 p").unwrap();
        assert_eq!(a.family(), b.family());
        assert!(b.is_in(&a.family()));
    }

    #[test]
    fn display_uses_iso_dates_and_normalized_strikes() {
        let c = parse_option_symbol("SPXW 02/10/2026 6880.00 P").unwrap();
        assert_eq!(c.to_string(), "SPXW 2026-02-10 6880 Put");
    }
}
