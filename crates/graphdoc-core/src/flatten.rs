//! # Flattener
//!
//! Graph -> document.
//!
//! Walks an object, emits its attributes, and recurses into its
//! relationships. To-one relationships become nested documents, to-many
//! relationships become arrays of documents. Objects that the pass state
//! reports as flattened are omitted, which is what keeps the walk finite on
//! cyclic graphs.
//!
//! Inlining a shared object at every position can still blow up on acyclic
//! graphs (a ladder of N levels has 2^N paths), so every pass also carries
//! an expansion budget. Once it is spent, further related objects are
//! omitted.

use crate::graph::GraphStore;
use crate::primitives::{MAX_FLATTEN_DEPTH, MAX_FLATTEN_OBJECTS};
use crate::schema::{Cardinality, SchemaInspector};
use crate::state::{SerializationState, SharedReferences};
use crate::{Document, ObjectId, SerializationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Knobs for a flatten pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenOptions {
    pub shared_references: SharedReferences,

    /// Relationships of objects at this depth (root = 0) are not expanded.
    pub max_depth: usize,

    /// Object expansions allowed per pass, counting every repeat of a
    /// shared object. The root always counts as one.
    pub max_objects: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            shared_references: SharedReferences::Inline,
            max_depth: MAX_FLATTEN_DEPTH,
            max_objects: MAX_FLATTEN_OBJECTS,
        }
    }
}

/// Flattens objects into documents, guided by a schema.
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'a, S: SchemaInspector + ?Sized> {
    schema: &'a S,
    options: FlattenOptions,
}

impl<'a, S: SchemaInspector + ?Sized> Flattener<'a, S> {
    #[must_use]
    pub fn new(schema: &'a S) -> Self {
        Self::with_options(schema, FlattenOptions::default())
    }

    #[must_use]
    pub fn with_options(schema: &'a S, options: FlattenOptions) -> Self {
        Self { schema, options }
    }

    /// Flatten `root` in a fresh pass.
    ///
    /// Only store failures are errors. Cycles, unset values and
    /// non-serializable related objects shrink the document instead.
    pub fn flatten<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        root: ObjectId,
    ) -> Result<Document, SerializationError> {
        let mut state = SerializationState::new(self.options.shared_references);
        self.flatten_with(store, root, &mut state)
    }

    /// Flatten `root` using caller-provided pass state.
    ///
    /// Objects marked with `SerializationState::set_flattened` beforehand are
    /// treated as opaque. The root itself is always expanded.
    pub fn flatten_with<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        root: ObjectId,
        state: &mut SerializationState,
    ) -> Result<Document, SerializationError> {
        let doc = self.flatten_object(store, root, state, 0)?;
        debug!(
            root = %root,
            policy = ?state.policy(),
            objects = state.emitted_count(),
            expansions = state.expansion_count(),
            "flattened object graph"
        );
        Ok(doc)
    }

    fn flatten_object<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        object: ObjectId,
        state: &mut SerializationState,
        depth: usize,
    ) -> Result<Document, SerializationError> {
        state.begin(object);
        let entity = store.entity_of(object)?;
        let mut doc = Document::new();

        for name in self.schema.attribute_names(entity) {
            let Some(value) = store.attribute(object, name)? else {
                continue;
            };
            match value.to_json() {
                Some(json) => {
                    doc.insert(name.to_string(), json);
                }
                None => trace!(object = %object, attribute = name, "non-finite float omitted"),
            }
        }

        if depth >= self.options.max_depth {
            debug!(object = %object, depth, "depth limit reached, relationships omitted");
            state.finish(object);
            return Ok(doc);
        }

        for name in self.schema.relationship_names(entity) {
            match self.schema.relationship_cardinality(entity, name) {
                Some(Cardinality::ToMany) => {
                    let mut items = Vec::new();
                    for member in store.to_many(object, name)? {
                        if let Some(nested) = self.flatten_related(store, member, state, depth)? {
                            items.push(serde_json::Value::Object(nested));
                        }
                    }
                    doc.insert(name.to_string(), serde_json::Value::Array(items));
                }
                Some(Cardinality::ToOne) => {
                    let Some(target) = store.to_one(object, name)? else {
                        continue;
                    };
                    if let Some(nested) = self.flatten_related(store, target, state, depth)? {
                        doc.insert(name.to_string(), serde_json::Value::Object(nested));
                    }
                }
                None => {}
            }
        }

        state.finish(object);
        Ok(doc)
    }

    /// Flatten an object reached through a relationship, or `None` if it
    /// must be omitted.
    fn flatten_related<G: GraphStore + ?Sized>(
        &self,
        store: &G,
        object: ObjectId,
        state: &mut SerializationState,
        depth: usize,
    ) -> Result<Option<Document>, SerializationError> {
        if state.is_flattened(object) {
            trace!(object = %object, "already flattened, omitted");
            return Ok(None);
        }
        if !self.schema.is_serializable(store.entity_of(object)?) {
            trace!(object = %object, "entity not serializable, omitted");
            return Ok(None);
        }
        if state.expansion_count() >= self.options.max_objects {
            debug!(
                object = %object,
                budget = self.options.max_objects,
                "expansion budget spent, omitted"
            );
            return Ok(None);
        }
        self.flatten_object(store, object, state, depth + 1).map(Some)
    }
}

// =============================================================================
// TESTS
// =============================================================================
