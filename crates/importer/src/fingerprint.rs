use chrono::{NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Identifying content of one fill, in fingerprint order.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintInput<'a> {
    pub broker: &'a str,
    pub account: &'a str,
    pub executed_at: NaiveDateTime,
    pub action: &'a str,
    pub symbol: &'a str,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub net_amount: Decimal,
    pub description: &'a str,
}

/// Upper-case hex SHA-256 of the pipe-joined fields.
///
/// Fees are deliberately not part of the key, so a broker re-stating fees
/// on an otherwise identical row does not create a second execution.
pub fn fingerprint(input: &FingerprintInput<'_>) -> String {
    let key = format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        input.broker,
        input.account,
        round_trip_timestamp(input.executed_at),
        input.action,
        input.symbol,
        optional(input.quantity),
        optional(input.price),
        input.net_amount,
        input.description,
    );
    hex::encode_upper(Sha256::digest(key.as_bytes()))
}

/// `2025-11-14T09:31:05.0000000`: seconds plus seven fractional digits.
fn round_trip_timestamp(at: NaiveDateTime) -> String {
    format!("{}.{:07}", at.format("%Y-%m-%dT%H:%M:%S"), at.nanosecond() / 100)
}

fn optional(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
