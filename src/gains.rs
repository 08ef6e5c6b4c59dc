//! Lot-matching gains engine.
//!
//! For each asset, sells greedily consume the highest-price buy lots
//! recorded so far. Partially consumed lots are pushed back with their
//! remaining quantity, so the carry-forward survives across sells.

use crate::transaction::{group_by_asset, Action, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BinaryHeap;

/// An open buy lot: a quantity still held at the price it was paid for.
///
/// Lots at the same price are never merged. The derived ordering makes
/// `BinaryHeap` pop the highest price first; same-price ties fall back
/// to the larger amount, which is as good as any.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lot {
    pub price: Decimal,
    pub amount: Decimal,
}

/// How much of a popped lot counts toward the quantity sold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsumptionMode {
    /// The whole popped lot counts as consumed even when only part of
    /// it was needed, so the consumed counter can overshoot the sold
    /// amount. Historical behaviour of the calculator and the default.
    #[default]
    WholeLot,
    /// Only the matched quantity counts as consumed.
    Exact,
}

/// How per-sell profits combine into the asset's report entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Aggregation {
    /// Each sell overwrites the entry; only the last sell's profit
    /// survives. Historical behaviour of the calculator and the default.
    #[default]
    LastSale,
    /// Profits accumulate across all sells for the asset.
    Sum,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    pub consumption: ConsumptionMode,
    pub aggregation: Aggregation,
}

/// Realized profit for one asset.
#[derive(Debug, Clone, Serialize)]
pub struct AssetGain {
    pub asset: String,
    pub profit: Decimal,
}

/// Per-asset realized profits, in the order assets first appear in the
/// input.
#[derive(Debug, Default, Serialize)]
pub struct GainsReport {
    pub gains: Vec<AssetGain>,
}

impl GainsReport {
    pub fn total(&self) -> Decimal {
        self.gains.iter().map(|g| g.profit).sum()
    }
}

/// Compute realized profits from a sequence of transaction records.
///
/// Records are grouped by asset and each group is sorted ascending by
/// `(date, action)`; `Buy` sorts before `Sell` so a sell can match a
/// lot bought at the same timestamp. An asset with fewer than two
/// records, or with no sells, contributes no entry.
pub fn calculate_gains(records: &[TransactionRecord], options: MatchOptions) -> GainsReport {
    let mut gains = Vec::new();

    for (asset, mut group) in group_by_asset(records) {
        group.sort_by(|a, b| a.date.cmp(&b.date).then(a.action.cmp(&b.action)));

        // A lone row is not a ledger; there is nothing to match against.
        if group.len() < 2 {
            log::debug!("{}: skipped, single transaction", asset);
            continue;
        }

        if let Some(profit) = process_asset(&asset, &group, options) {
            gains.push(AssetGain { asset, profit });
        }
    }

    GainsReport { gains }
}

/// Run the lot-matching loop over one asset's sorted records. Returns
/// `None` when the asset has no sells.
fn process_asset(
    asset: &str,
    records: &[TransactionRecord],
    options: MatchOptions,
) -> Option<Decimal> {
    let mut lots: BinaryHeap<Lot> = BinaryHeap::new();
    let mut asset_profit: Option<Decimal> = None;

    for record in records {
        match record.action {
            Action::Buy => {
                log::info!("{}: bought {} at {}", asset, record.amount, record.price);
                lots.push(Lot {
                    price: record.price,
                    amount: record.amount,
                });
            }
            Action::Sell => {
                log::info!("{}: sold {} at {}", asset, record.amount, record.price);
                let outcome = match_sale(
                    asset,
                    record.amount,
                    record.price,
                    &mut lots,
                    options.consumption,
                );
                log::debug!(
                    "{}: consumed {} for cost basis {}",
                    asset,
                    outcome.consumed,
                    outcome.cost_basis
                );
                log::info!("{}: sale profit {}", asset, outcome.profit);
                asset_profit = Some(match options.aggregation {
                    Aggregation::LastSale => outcome.profit,
                    Aggregation::Sum => asset_profit.unwrap_or(Decimal::ZERO) + outcome.profit,
                });
            }
        }
    }

    asset_profit
}

/// Result of matching a single sell against the open lots.
#[derive(Debug)]
struct SaleOutcome {
    profit: Decimal,
    /// Quantity accounted as consumed, per the configured mode. Under
    /// `WholeLot` this can exceed the amount sold.
    consumed: Decimal,
    cost_basis: Decimal,
}

/// Match one sell of `amount` at `price` against the open lots,
/// highest price first. A lot only partially needed is pushed back with
/// its remaining quantity. If the lots run out early the unmatched
/// quantity carries a zero cost basis.
fn match_sale(
    asset: &str,
    amount: Decimal,
    price: Decimal,
    lots: &mut BinaryHeap<Lot>,
    consumption: ConsumptionMode,
) -> SaleOutcome {
    let mut consumed = Decimal::ZERO;
    let mut cost_basis = Decimal::ZERO;

    while consumed < amount {
        let Some(lot) = lots.pop() else {
            break;
        };
        let needed = (amount - consumed).min(lot.amount);
        cost_basis += lot.price * needed;
        consumed += match consumption {
            ConsumptionMode::WholeLot => lot.amount,
            ConsumptionMode::Exact => needed,
        };
        log::debug!(
            "{}: used {} at {}, consumed={}, cost_basis={}",
            asset,
            needed,
            lot.price,
            consumed,
            cost_basis
        );

        let remaining = lot.amount - needed;
        if remaining > Decimal::ZERO {
            log::debug!("{}: {} at {} carried forward", asset, remaining, lot.price);
            lots.push(Lot {
                price: lot.price,
                amount: remaining,
            });
        }
    }

    SaleOutcome {
        profit: amount * price - cost_basis,
        consumed,
        cost_basis,
    }
}
