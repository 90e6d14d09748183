use crate::butterfly::ButterflyMatcher;
use crate::spread::SpreadMatcher;
use crate::Matcher;
use core_types::StrategyKind;

/// Creates the matcher for a strategy kind.
pub fn create_matcher(kind: StrategyKind) -> Box<dyn Matcher> {
    // The compiler errors here if a new StrategyKind is added but not handled.
    match kind {
        StrategyKind::CreditSpread => Box::new(SpreadMatcher),
        StrategyKind::Bwb => Box::new(ButterflyMatcher),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_returns_matcher_of_requested_kind() {
        for kind in [StrategyKind::CreditSpread, StrategyKind::Bwb] {
            assert_eq!(create_matcher(kind).kind(), kind);
        }
    }
}
