/// Open/close and buy/sell semantics read from a broker's free-text action.
///
/// The four flags are independent. An action that sets none of them (dividends,
/// journal entries, "Buy" of an equity without "to open") simply never takes
/// part in a matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionFlags {
    pub is_open: bool,
    pub is_close: bool,
    pub is_sell: bool,
    pub is_buy: bool,
}

impl ActionFlags {
    pub fn classify(action: &str) -> Self {
        let lowered = action.to_lowercase();
        let head = lowered.trim_start();

        Self {
            is_open: lowered.contains("to open"),
            is_close: lowered.contains("to close") || lowered.contains("expired"),
            is_sell: head.starts_with("sell"),
            is_buy: head.starts_with("buy"),
        }
    }

    pub fn is_sell_to_open(&self) -> bool {
        self.is_open && self.is_sell
    }

    pub fn is_buy_to_open(&self) -> bool {
        self.is_open && self.is_buy
    }

    pub fn is_buy_to_close(&self) -> bool {
        self.is_close && self.is_buy
    }

    pub fn is_sell_to_close(&self) -> bool {
        self.is_close && self.is_sell
    }
}
