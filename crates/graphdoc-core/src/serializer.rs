//! # Object Serializer
//!
//! One handle bundling a schema with flatten options, update mode and output
//! style, so callers do not wire a `Flattener`, a `Reconstructor` and the
//! codec by hand.

use crate::codec;
use crate::flatten::{FlattenOptions, Flattener};
use crate::graph::GraphStore;
use crate::reconstruct::{Reconstructor, UpdateMode, UpdateReport};
use crate::schema::SchemaInspector;
use crate::{Document, ObjectId, SerializationError};

/// Serializes objects of one schema to documents and JSON, and back.
#[derive(Debug, Clone)]
pub struct ObjectSerializer<S: SchemaInspector> {
    schema: S,
    flatten: FlattenOptions,
    mode: UpdateMode,
    pretty: bool,
}

impl<S: SchemaInspector> ObjectSerializer<S> {
    /// Create a serializer with default options (inline shared references,
    /// strict updates, compact JSON).
    #[must_use]
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            flatten: FlattenOptions::default(),
            mode: UpdateMode::Strict,
            pretty: false,
        }
    }

    #[must_use]
    pub fn with_flatten_options(mut self, options: FlattenOptions) -> Self {
        self.flatten = options;
        self
    }

    #[must_use]
    pub fn with_update_mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// The schema this serializer inspects.
    #[must_use]
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Flatten an object into a document.
    pub fn dictionary<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        object: ObjectId,
    ) -> Result<Document, SerializationError> {
        Flattener::with_options(&self.schema, self.flatten).flatten(store, object)
    }

    /// Flatten an object straight to JSON bytes.
    pub fn json_data<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        object: ObjectId,
    ) -> Result<Vec<u8>, SerializationError> {
        let doc = self.dictionary(store, object)?;
        codec::to_json_bytes(&doc, self.pretty)
    }

    /// Apply a document to an object.
    pub fn update<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        doc: &Document,
    ) -> Result<UpdateReport, SerializationError> {
        Reconstructor::with_mode(&self.schema, self.mode).update(store, object, doc)
    }

    /// Decode JSON bytes and apply them to an object.
    pub fn update_from_json<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        bytes: &[u8],
    ) -> Result<UpdateReport, SerializationError> {
        let doc = codec::from_json_bytes(bytes)?;
        self.update(store, object, &doc)
    }
}

// =============================================================================
// TESTS
// =============================================================================
