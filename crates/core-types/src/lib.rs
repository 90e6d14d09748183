pub mod action;
pub mod contract;
pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use action::ActionFlags;
pub use contract::{parse_option_symbol, ContractFamily, OptionContract};
pub use enums::{GrossReturnMode, LegRole, OptionRight, StrategyKind};
pub use error::CoreError;
pub use structs::{
    AccountScope, ButterflyStrikes, Execution, GroupLeg, GroupMetrics, GroupShape, NewExecution,
    SpreadKey, TradeGroup,
};
