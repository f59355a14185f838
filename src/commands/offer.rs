use clap::Args;

use offers_core::{Offer, OfferStore};

use super::OutputFormat;

/// List stored offers
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Show one offer
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Upstream offer ID
    id: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Search offer descriptions
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Text to look for, ignoring case
    text: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ListCommand {
    pub async fn run(&self, store: &dyn OfferStore) -> Result<(), Box<dyn std::error::Error>> {
        let offers = store.list().await?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&offers)?),
            OutputFormat::Text if offers.is_empty() => println!("No offers stored."),
            OutputFormat::Text => print_table(&offers),
        }
        Ok(())
    }
}

impl ShowCommand {
    pub async fn run(&self, store: &dyn OfferStore) -> Result<(), Box<dyn std::error::Error>> {
        let offer = store.get(&self.id).await?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&offer)?),
            OutputFormat::Text => print_offer(&offer),
        }
        Ok(())
    }
}

impl SearchCommand {
    pub async fn run(&self, store: &dyn OfferStore) -> Result<(), Box<dyn std::error::Error>> {
        if self.text.is_empty() {
            return Err("Search text cannot be empty".into());
        }

        let offers = store.search(&self.text).await?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&offers)?),
            OutputFormat::Text => print_table(&offers),
        }
        Ok(())
    }
}

fn print_table(offers: &[Offer]) {
    let id_width = offers.iter().map(|o| o.id.len()).max().unwrap_or(2).max(2);
    println!("{:<id_width$}  {:>12}  TITLE", "ID", "PRICE");
    for offer in offers {
        let price = format!("{} {}", offer.price, offer.currency);
        println!("{:<id_width$}  {:>12}  {}", offer.id, price.trim(), offer.title);
    }
}

fn print_offer(offer: &Offer) {
    println!("{}", offer.title);
    println!("{}", "=".repeat(offer.title.chars().count().max(1)));
    println!();
    println!("ID:          {}", offer.id);
    println!("Price:       {} {}", offer.price, offer.currency);
    if !offer.merchant_url.is_empty() {
        println!("Link:        {}", offer.merchant_url);
    }
    if !offer.image_url.is_empty() {
        println!("Image:       {}", offer.image_url);
    }
    if !offer.description.is_empty() {
        println!();
        println!("{}", offer.description);
    }
}
