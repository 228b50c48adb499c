//! # graphdoc
//!
//! The main binary for the graphdoc serializer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │          apps/graphdoc (THE BINARY)          │
//! │                                              │
//! │  ┌─────────────┐        ┌────────────────┐   │
//! │  │    CLI      │        │    Config      │   │
//! │  │   (clap)    │        │    (toml)      │   │
//! │  └──────┬──────┘        └───────┬────────┘   │
//! │         └───────────┬───────────┘            │
//! │                     ▼                        │
//! │             ┌───────────────┐                │
//! │             │ graphdoc-core │                │
//! │             │  (THE LOGIC)  │                │
//! │             └───────────────┘                │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! graphdoc -c graphdoc.toml schema
//! graphdoc -c graphdoc.toml roundtrip -i ann.json -e Person
//! graphdoc -c graphdoc.toml import -i ann.json -e Person -s people.gds
//! graphdoc -c graphdoc.toml export -s people.gds -o 0
//! ```

use clap::Parser;
use graphdoc::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GRAPHDOC_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRAPHDOC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graphdoc=info,graphdoc_core=info".into());

    // Logs go to stderr; stdout carries documents.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
