//! Offers: a local mirror of a merchant's upstream product catalog.
//!
//! The `offers` CLI runs sync passes and queries the mirror; the
//! `offers-server` binary serves it over HTTP.

pub mod config;
pub mod server;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "offers=info,offers_core=info,tower_http=info";

/// Installs the global tracing subscriber.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
