//! # graphdoc
//!
//! Command-line front end for `graphdoc-core`: config loading and the CLI
//! commands. The binary in `main.rs` only sets up logging and dispatches.

pub mod cli;
pub mod config;
