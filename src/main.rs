use clap::Parser;
use std::path::PathBuf;

mod gains;
mod report;
mod swyftx;
mod transaction;

/// Calculate realized gains/losses from a Swyftx trading log
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Transaction log file
    #[arg(short, long, default_value = "swyftx.usd.log")]
    file: PathBuf,

    /// Output as JSON instead of a formatted table
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn exec(&self) -> anyhow::Result<()> {
        let records = swyftx::parse_log_file(&self.file)?;
        log::info!(
            "parsed {} transactions from {}",
            records.len(),
            self.file.display()
        );

        let report = gains::calculate_gains(&records, gains::MatchOptions::default());

        if self.json {
            report::print_json(&report)
        } else {
            report::print_table(&report);
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    Cli::parse().exec()
}
