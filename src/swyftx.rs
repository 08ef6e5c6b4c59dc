//! Importer for the Swyftx transaction history log.
//!
//! The log is line oriented. Each completed order spans a `Market Buy`
//! or `Market Sell` line, three quantity lines (unit price, order total
//! and fee, in that order) and a closing `Completed` line carrying the
//! timestamp. Any line matching none of those patterns is skipped.

use crate::transaction::{Action, TransactionRecord};
use anyhow::Context;
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

const DATE_FORMAT: &str = "%d/%m/%y %I:%M %p";

lazy_static! {
    static ref MARKET: Regex = Regex::new(
        r"^Market (?P<action>Buy|Sell)\t(?P<amount>([0-9]*[.])?[0-9]+) (?P<asset>[A-Z]+)"
    )
    .unwrap();
    static ref QUANTITY: Regex =
        Regex::new(r"^(?P<amount>([0-9]*[.])?[0-9]+) (?P<unit>[A-Z/]+)").unwrap();
    static ref COMPLETED: Regex = Regex::new(r"^Completed\t(?P<date>[ APM:0-9/]+)").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: invalid date '{text}': {source}")]
    InvalidDate {
        line: usize,
        text: String,
        source: chrono::ParseError,
    },
    #[error("line {line}: invalid amount '{text}': {source}")]
    InvalidAmount {
        line: usize,
        text: String,
        source: rust_decimal::Error,
    },
    #[error("line {line}: order completed before all of its fields were seen")]
    IncompleteGroup { line: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fields collected so far for the order currently being assembled.
#[derive(Debug, Default)]
struct PendingOrder {
    market: Option<(Action, Decimal, String)>,
    price: Option<Decimal>,
    total: Option<Decimal>,
    fee: Option<Decimal>,
    /// Rotating slot for the next quantity line: 0 = price, 1 = total,
    /// 2 = fee.
    quantity_slot: usize,
}

impl PendingOrder {
    fn set_quantity(&mut self, amount: Decimal) {
        match self.quantity_slot {
            0 => self.price = Some(amount),
            1 => self.total = Some(amount),
            _ => self.fee = Some(amount),
        }
        self.quantity_slot = (self.quantity_slot + 1) % 3;
    }

    /// Assemble the record closed by a `Completed` line. Errors if any
    /// field is missing rather than reusing state from an earlier order.
    fn complete(&mut self, date: NaiveDateTime, line: usize) -> Result<TransactionRecord, ParseError> {
        let pending = std::mem::take(self);
        let (action, amount, asset) = pending.market.ok_or(ParseError::IncompleteGroup { line })?;
        let price = pending.price.ok_or(ParseError::IncompleteGroup { line })?;
        let total = pending.total.ok_or(ParseError::IncompleteGroup { line })?;
        let fee = pending.fee.ok_or(ParseError::IncompleteGroup { line })?;
        Ok(TransactionRecord {
            action,
            asset,
            amount,
            price,
            total,
            fee,
            date,
        })
    }
}

/// Read and parse a Swyftx log file.
pub fn parse_log_file(path: &Path) -> anyhow::Result<Vec<TransactionRecord>> {
    let file =
        File::open(path).with_context(|| format!("failed to open log file {}", path.display()))?;
    let records = parse_log(BufReader::new(file))
        .with_context(|| format!("failed to parse log file {}", path.display()))?;
    Ok(records)
}

/// Parse a Swyftx log from a line stream into transaction records, in
/// log order.
pub fn parse_log<R: BufRead>(reader: R) -> Result<Vec<TransactionRecord>, ParseError> {
    let mut records = Vec::new();
    let mut pending = PendingOrder::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if let Some(captures) = MARKET.captures(&line) {
            let action = match &captures["action"] {
                "Buy" => Action::Buy,
                _ => Action::Sell,
            };
            let amount = parse_amount(&captures["amount"], line_no)?;
            pending.market = Some((action, amount, captures["asset"].to_string()));
        } else if let Some(captures) = QUANTITY.captures(&line) {
            let amount = parse_amount(&captures["amount"], line_no)?;
            pending.set_quantity(amount);
        } else if let Some(captures) = COMPLETED.captures(&line) {
            let text = captures["date"].trim();
            let date = NaiveDateTime::parse_from_str(text, DATE_FORMAT).map_err(|source| {
                ParseError::InvalidDate {
                    line: line_no,
                    text: text.to_string(),
                    source,
                }
            })?;
            let record = pending.complete(date, line_no)?;
            log::debug!(
                "parsed {} {} {} at {} (total {}, fee {}) on {}",
                record.action,
                record.amount,
                record.asset,
                record.price,
                record.total,
                record.fee,
                record.date
            );
            records.push(record);
        }
        // Anything else is noise between order groups; skip it.
    }

    Ok(records)
}

fn parse_amount(text: &str, line: usize) -> Result<Decimal, ParseError> {
    Decimal::from_str(text).map_err(|source| ParseError::InvalidAmount {
        line,
        text: text.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(log: &str) -> Result<Vec<TransactionRecord>, ParseError> {
        parse_log(log.as_bytes())
    }

    #[test]
    fn parses_a_complete_order_group() {
        let log = "Market Buy\t0.5 BTC\n\
                   30000.0 USD\n\
                   15000.0 USD\n\
                   7.5 USD\n\
                   Completed\t01/03/21 10:30 AM\n";

        let records = parse(log).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.action, Action::Buy);
        assert_eq!(record.asset, "BTC");
        assert_eq!(record.amount, dec!(0.5));
        assert_eq!(record.price, dec!(30000.0));
        assert_eq!(record.total, dec!(15000.0));
        assert_eq!(record.fee, dec!(7.5));
        assert_eq!(
            record.date,
            NaiveDateTime::parse_from_str("01/03/21 10:30 AM", DATE_FORMAT).unwrap()
        );
    }

    #[test]
    fn quantity_lines_are_positional() {
        // Three distinct values so a slot mix-up is visible.
        let log = "Market Sell\t2 ETH\n\
                   2000.0 USD\n\
                   4000.0 USD\n\
                   1.25 USD\n\
                   Completed\t15/04/21 02:45 PM\n";

        let records = parse(log).unwrap();
        assert_eq!(records[0].price, dec!(2000.0));
        assert_eq!(records[0].total, dec!(4000.0));
        assert_eq!(records[0].fee, dec!(1.25));
    }

    #[test]
    fn unmatched_lines_are_skipped() {
        let log = "Swyftx transaction history\n\
                   \n\
                   Market Buy\t1.0 DOT\n\
                   some unrelated text\n\
                   8.0 USD\n\
                   8.0 USD\n\
                   0.1 USD\n\
                   Instantly\n\
                   Completed\t20/05/21 09:00 AM\n";

        let records = parse(log).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].asset, "DOT");
        assert_eq!(records[0].price, dec!(8.0));
    }

    #[test]
    fn multiple_groups_parse_in_log_order() {
        let log = "Market Buy\t1.0 BTC\n\
                   30000.0 USD\n\
                   30000.0 USD\n\
                   0.5 USD\n\
                   Completed\t01/03/21 10:30 AM\n\
                   Market Sell\t0.5 BTC\n\
                   40000.0 USD\n\
                   20000.0 USD\n\
                   0.5 USD\n\
                   Completed\t15/04/21 02:45 PM\n";

        let records = parse(log).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, Action::Buy);
        assert_eq!(records[1].action, Action::Sell);
        assert!(records[0].date < records[1].date);
    }

    #[test]
    fn completed_without_market_line_errors() {
        let log = "30000.0 USD\n\
                   30000.0 USD\n\
                   0.5 USD\n\
                   Completed\t01/03/21 10:30 AM\n";

        let err = parse(log).unwrap_err();
        assert!(matches!(err, ParseError::IncompleteGroup { line: 4 }));
    }

    #[test]
    fn state_does_not_leak_between_groups() {
        // The second group is missing its market line; it must not be
        // assembled from the first group's fields.
        let log = "Market Buy\t1.0 BTC\n\
                   30000.0 USD\n\
                   30000.0 USD\n\
                   0.5 USD\n\
                   Completed\t01/03/21 10:30 AM\n\
                   40000.0 USD\n\
                   20000.0 USD\n\
                   0.5 USD\n\
                   Completed\t15/04/21 02:45 PM\n";

        let err = parse(log).unwrap_err();
        assert!(matches!(err, ParseError::IncompleteGroup { line: 9 }));
    }

    #[test]
    fn unparseable_date_is_fatal() {
        let log = "Market Buy\t1.0 BTC\n\
                   30000.0 USD\n\
                   30000.0 USD\n\
                   0.5 USD\n\
                   Completed\t99/99/99 77:77 AM\n";

        let err = parse(log).unwrap_err();
        assert!(matches!(err, ParseError::InvalidDate { line: 5, .. }));
    }

    #[test]
    fn missing_file_fails_at_open() {
        let err = parse_log_file(Path::new("no/such/swyftx.log")).unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }
}
