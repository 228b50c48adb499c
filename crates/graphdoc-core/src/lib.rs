//! # graphdoc-core
//!
//! Object graph <-> document serializer - THE LOGIC.
//!
//! Converts a graph of typed objects (attributes plus to-one and to-many
//! relationships, possibly cyclic) into tree-shaped JSON documents, and
//! applies such documents back onto a graph, creating related objects as
//! needed.
//!
//! ## Pieces
//!
//! - `schema`: declared entity metadata (`SchemaInspector`, `Schema`)
//! - `graph`: object storage (`GraphStore`, `MemoryGraph`)
//! - `state`: per-pass cycle suppression (`SerializationState`)
//! - `flatten`: graph -> document (`Flattener`)
//! - `reconstruct`: document -> graph (`Reconstructor`)
//! - `codec`: document <-> JSON bytes
//! - `formats`: `MemoryGraph` snapshots
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no I/O: file handling lives in the app layer
//! - Pass state is owned by the pass, never stored on objects
//! - Missing schema information drops data with a warning, never panics

// =============================================================================
// MODULES
// =============================================================================

pub mod codec;
pub mod flatten;
pub mod formats;
pub mod graph;
pub mod primitives;
pub mod reconstruct;
pub mod schema;
pub mod serializer;
pub mod state;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Document, ObjectId, ScopeId, SerializationError, StoreError, Timestamp, Value};

// =============================================================================
// RE-EXPORTS: Serializer
// =============================================================================

pub use codec::{from_json_bytes, to_json_bytes};
pub use flatten::{FlattenOptions, Flattener};
pub use graph::{GraphSnapshot, GraphStore, MemoryGraph, StoredObject};
pub use reconstruct::{Reconstructor, UpdateMode, UpdateReport, UpdateWarning};
pub use schema::{
    AttributeKind, Cardinality, EntityDescriptor, RelationshipDescriptor, Schema, SchemaInspector,
};
pub use serializer::ObjectSerializer;
pub use state::{SerializationState, SharedReferences};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{SnapshotHeader, graph_from_bytes, graph_to_bytes, schema_fingerprint};
