use clap::{Args, Subcommand};

use offers::config::{BackendKind, Config};

use super::OutputFormat;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_config(config),
                }
                Ok(())
            }
        }
    }
}

fn print_config(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    match config.merchant_id.value {
        Some(id) => println!("merchant_id: {}", id),
        None => println!("merchant_id: (discover from credentials)"),
    }
    println!("  source: {}", config.merchant_id.source);
    println!();

    println!("store.backend: {}", config.store_backend.value);
    println!("  source: {}", config.store_backend.source);
    match config.store_backend.value {
        BackendKind::Sqlite => {
            println!(
                "store.sqlite_path: {}",
                config.database_path.value.display()
            );
            println!("  source: {}", config.database_path.source);
        }
        BackendKind::Mysql => println!("store.mysql: {}", config.mysql.describe()),
        BackendKind::Memory => {}
    }
    println!("store.list_limit: {}", config.list_limit.value);
    println!("  source: {}", config.list_limit.source);
    println!();

    println!("catalog.endpoint: {}", config.catalog_endpoint.value);
    println!("  source: {}", config.catalog_endpoint.source);
    println!(
        "catalog.access_token: {}",
        if config.access_token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!(
        "catalog.request_timeout_secs: {}",
        config.request_timeout_secs.value
    );
    println!();

    println!("server.port: {}", config.port.value);
    println!("  source: {}", config.port.source);
    println!(
        "server.task_token: {}",
        if config.task_token.is_some() {
            "set"
        } else {
            "not set"
        }
    );
}
