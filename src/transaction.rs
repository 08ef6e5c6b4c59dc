//! Parsed trade records and per-asset grouping.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Direction of a market order.
///
/// `Buy` sorts before `Sell`, so a sell can match a lot bought at the
/// same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Action {
    Buy,
    Sell,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "Buy"),
            Action::Sell => write!(f, "Sell"),
        }
    }
}

/// One completed market order from the trading log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub action: Action,
    pub asset: String,
    pub amount: Decimal,
    /// Unit price in the quote currency.
    pub price: Decimal,
    /// Order total as reported by the log.
    pub total: Decimal,
    /// Exchange fee. Carried through for reference, never enters the
    /// profit arithmetic.
    pub fee: Decimal,
    pub date: NaiveDateTime,
}

/// Group records by asset, preserving the order assets first appear in
/// the log so iteration over the result is deterministic.
pub fn group_by_asset(records: &[TransactionRecord]) -> Vec<(String, Vec<TransactionRecord>)> {
    let mut groups: Vec<(String, Vec<TransactionRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(asset, _)| *asset == record.asset) {
            Some((_, group)) => group.push(record.clone()),
            None => groups.push((record.asset.clone(), vec![record.clone()])),
        }
    }
    groups
}
