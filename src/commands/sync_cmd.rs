//! Sync CLI command for mirroring the upstream catalog.

use clap::Args;
use std::sync::Arc;

use offers::config::Config;
use offers_core::{OfferStore, SyncDriver, SyncReport};

use super::OutputFormat;

/// Mirror the upstream catalog into the local store
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Account to mirror (defaults to the configured merchant ID, then
    /// the first account the credentials can access)
    #[arg(long)]
    account: Option<u64>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl SyncCommand {
    pub async fn run(
        &self,
        store: Arc<dyn OfferStore>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let catalog = Arc::new(config.http_catalog()?);
        let driver = SyncDriver::new(catalog, store);

        let account = self.account.or(config.merchant_id.value);
        if matches!(self.format, OutputFormat::Text) {
            println!("Syncing from {}...", config.catalog_endpoint.value);
            println!();
        }

        let report = driver.run(account).await?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report),
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let elapsed = report.finished_at - report.started_at;
    let kind = if report.aggregator {
        "aggregator"
    } else {
        "merchant"
    };

    println!("  Account:   {} ({})", report.account_id, kind);
    println!(
        "  Accounts:  {} visited, {} page{}",
        report.reconcile.accounts_visited,
        report.reconcile.pages_fetched,
        if report.reconcile.pages_fetched == 1 {
            ""
        } else {
            "s"
        }
    );
    println!("  Upserted:  {}", report.reconcile.offers_upserted);
    println!("  Removed:   {}", report.reconcile.offers_swept);
    println!();
    println!(
        "Sync complete in {:.1}s.",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}
