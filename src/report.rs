//! Stdout rendering of the gains report.

use crate::gains::GainsReport;
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Clone, Tabled)]
struct GainRow {
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Profit")]
    profit: String,
}

/// Print the per-asset profit table followed by the grand total.
pub fn print_table(report: &GainsReport) {
    if report.gains.is_empty() {
        println!("No realized gains found");
    } else {
        let rows: Vec<GainRow> = report
            .gains
            .iter()
            .map(|g| GainRow {
                asset: g.asset.clone(),
                profit: format_signed(g.profit),
            })
            .collect();

        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    println!();
    println!("Total profit: {}", format_signed(report.total()));
}

/// Print the report as pretty JSON.
pub fn print_json(report: &GainsReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn format_signed(amount: Decimal) -> String {
    if amount < Decimal::ZERO {
        format!("-{:.2}", amount.abs())
    } else {
        format!("{:.2}", amount)
    }
}
