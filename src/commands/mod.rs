mod config_cmd;
mod offer;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use offer::{ListCommand, SearchCommand, ShowCommand};
pub use sync_cmd::SyncCommand;

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
