//! # graphdoc CLI Module
//!
//! This module implements the CLI interface for graphdoc.
//!
//! ## Available Commands
//!
//! - `schema` - Show the configured schema
//! - `roundtrip` - Apply a document to a fresh object and flatten it back
//! - `import` - Apply a document to a new object in a graph snapshot
//! - `export` - Flatten an object of a graph snapshot

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use graphdoc_core::SerializationError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// graphdoc - object graph <-> JSON document tool
///
/// Flattens typed object graphs into nested JSON documents and applies such
/// documents back onto a graph, guided by a schema declared in the config.
#[derive(Parser, Debug)]
#[command(name = "graphdoc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config (schema and serializer settings)
    #[arg(short, long, global = true, default_value = "graphdoc.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the configured schema
    Schema,

    /// Apply a document to a fresh object and print it flattened back
    Roundtrip {
        /// Path to the input JSON document
        #[arg(short, long)]
        input: PathBuf,

        /// Entity of the root object
        #[arg(short, long)]
        entity: String,
    },

    /// Apply a document to a new object stored in a snapshot
    Import {
        /// Path to the input JSON document
        #[arg(short, long)]
        input: PathBuf,

        /// Entity of the root object
        #[arg(short, long)]
        entity: String,

        /// Snapshot file (created if missing)
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Flatten an object of a snapshot to JSON
    Export {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Root object id
        #[arg(short, long)]
        object: u64,

        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), SerializationError> {
    let config = AppConfig::load(&cli.config)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Schema) | None => cmd_schema(&config, json_mode),
        Some(Commands::Roundtrip { input, entity }) => cmd_roundtrip(&config, &input, &entity),
        Some(Commands::Import {
            input,
            entity,
            snapshot,
        }) => cmd_import(&config, json_mode, &input, &entity, &snapshot),
        Some(Commands::Export {
            snapshot,
            object,
            output,
        }) => cmd_export(&config, &snapshot, object, output.as_deref()),
    }
}
