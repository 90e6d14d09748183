/// Header names each column is known by across Schwab export variants.
pub const DATE: &[&str] = &["Date", "Trade Date", "Transaction Date"];
pub const TIME: &[&str] = &["Time", "Trade Time", "Transaction Time"];
pub const ACTION: &[&str] = &["Action", "Type", "Transaction Type"];
pub const SYMBOL: &[&str] = &["Symbol", "Ticker"];
pub const DESCRIPTION: &[&str] = &["Description", "Security Description", "Name"];
pub const QUANTITY: &[&str] = &["Quantity", "Qty"];
pub const PRICE: &[&str] = &["Price", "Trade Price"];
pub const FEES: &[&str] = &[
    "Fees & Comm",
    "Fees & Commissions",
    "Fees and Comm",
    "Fees and Commissions",
    "Commissions & Fees",
    "Commission & Fees",
    "Fees",
    "Commission",
];
pub const AMOUNT: &[&str] = &["Amount", "Net Amount", "Value", "Proceeds"];

/// Resolved column positions of one CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub action: Option<usize>,
    pub symbol: Option<usize>,
    pub description: Option<usize>,
    pub quantity: Option<usize>,
    pub price: Option<usize>,
    pub fees: Option<usize>,
    pub amount: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Self {
        Self {
            date: find_index(headers, DATE),
            time: find_index(headers, TIME),
            action: find_index(headers, ACTION),
            symbol: find_index(headers, SYMBOL),
            description: find_index(headers, DESCRIPTION),
            quantity: find_index(headers, QUANTITY),
            price: find_index(headers, PRICE),
            fees: find_index(headers, FEES),
            amount: find_index(headers, AMOUNT),
        }
    }
}

/// Position of the first header equal to any candidate, ignoring case and
/// surrounding whitespace. Earlier headers win over earlier candidates.
pub fn find_index(headers: &[String], candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.iter().any(|c| h.trim().eq_ignore_ascii_case(c)))
}
