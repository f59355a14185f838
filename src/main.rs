use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{ConfigCommand, ListCommand, SearchCommand, ShowCommand, SyncCommand};
use offers::config::Config;
use offers_core::{open_store, OfferStore};

#[derive(Parser)]
#[command(name = "offers")]
#[command(version)]
#[command(about = "Mirror a merchant's product catalog into a local offer store", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass against the upstream catalog
    Sync(SyncCommand),

    /// List stored offers
    List(ListCommand),

    /// Show one stored offer
    Show(ShowCommand),

    /// Search stored offer descriptions
    Search(SearchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    offers::init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let store = open_store(&config.store_backend(), config.list_limit.value).await?;
    let result = match &command {
        Commands::Sync(cmd) => cmd.run(store.clone(), &config).await,
        Commands::List(cmd) => cmd.run(store.as_ref()).await,
        Commands::Show(cmd) => cmd.run(store.as_ref()).await,
        Commands::Search(cmd) => cmd.run(store.as_ref()).await,
        Commands::Config(_) => Ok(()),
    };
    store.close().await;

    result
}
