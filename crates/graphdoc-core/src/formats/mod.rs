//! # Formats
//!
//! Byte-level representations of stores.

pub mod snapshot;

pub use snapshot::{SnapshotHeader, graph_from_bytes, graph_to_bytes, schema_fingerprint};
