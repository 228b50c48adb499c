//! # Reconstructor
//!
//! Document -> graph.
//!
//! Walks a document key by key against an existing object. Nested documents
//! update (or create) the related object of a to-one relationship, arrays
//! replace the members of a to-many relationship, and scalars are written to
//! attributes. New objects always land in the scope of the object being
//! updated.
//!
//! ## Error policy
//!
//! - `UpdateMode::Strict`: the first failure at any depth aborts the update.
//! - `UpdateMode::Lenient`: a failing key is recorded in the report with its
//!   document path and skipped; the walk carries on with the next key.
//!
//! Keys whose relationship target cannot be resolved are dropped with a
//! warning in both modes.

use crate::graph::GraphStore;
use crate::schema::{AttributeKind, Cardinality, SchemaInspector};
use crate::{Document, ObjectId, SerializationError, Timestamp, Value};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

// =============================================================================
// MODE & REPORT
// =============================================================================

/// How reconstruction reacts to a failing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    #[default]
    Strict,
    Lenient,
}

/// Something that did not make it into the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateWarning {
    /// No target entity could be resolved for a relationship key; its data
    /// was dropped.
    UnresolvedTarget { path: String },

    /// A key failed in lenient mode and was skipped.
    Skipped {
        path: String,
        error: SerializationError,
    },
}

impl UpdateWarning {
    /// Document path of the offending key, e.g. `pets[0].name`.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::UnresolvedTarget { path } | Self::Skipped { path, .. } => path,
        }
    }
}

impl fmt::Display for UpdateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedTarget { path } => {
                write!(f, "{}: no target entity, data dropped", path)
            }
            Self::Skipped { path, error } => write!(f, "{}: skipped ({})", path, error),
        }
    }
}

/// Outcome of a successful update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Number of objects created in the store.
    pub created: usize,
    pub warnings: Vec<UpdateWarning>,
}

impl UpdateReport {
    /// True when every key of the document was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// =============================================================================
// RECONSTRUCTOR
// =============================================================================

/// Applies documents to objects, guided by a schema.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a, S: SchemaInspector + ?Sized> {
    schema: &'a S,
    mode: UpdateMode,
}

impl<'a, S: SchemaInspector + ?Sized> Reconstructor<'a, S> {
    #[must_use]
    pub fn new(schema: &'a S) -> Self {
        Self::with_mode(schema, UpdateMode::Strict)
    }

    #[must_use]
    pub fn with_mode(schema: &'a S, mode: UpdateMode) -> Self {
        Self { schema, mode }
    }

    /// Apply `doc` to `object`.
    ///
    /// An unknown `object` is an error in every mode.
    pub fn update<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        doc: &Document,
    ) -> Result<UpdateReport, SerializationError> {
        let mut report = UpdateReport::default();
        self.update_object(store, object, doc, "", &mut report)?;
        debug!(
            object = %object,
            created = report.created,
            warnings = report.warnings.len(),
            "document applied"
        );
        Ok(report)
    }

    fn update_object<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        doc: &Document,
        path: &str,
        report: &mut UpdateReport,
    ) -> Result<(), SerializationError> {
        let entity = store.entity_of(object)?.to_string();

        for (key, value) in doc {
            let key_path = child_path(path, key);
            let outcome = match value {
                serde_json::Value::Object(nested) => {
                    self.update_to_one(store, object, &entity, key, nested, &key_path, report)
                }
                serde_json::Value::Array(items) => {
                    self.update_to_many(store, object, &entity, key, items, &key_path, report)
                }
                scalar => self.update_attribute(store, object, &entity, key, scalar, &key_path),
            };

            if let Err(error) = outcome {
                match self.mode {
                    UpdateMode::Strict => return Err(error),
                    UpdateMode::Lenient => {
                        warn!(path = %key_path, %error, "key skipped");
                        report.warnings.push(UpdateWarning::Skipped {
                            path: key_path,
                            error,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn update_to_one<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        entity: &str,
        key: &str,
        nested: &Document,
        path: &str,
        report: &mut UpdateReport,
    ) -> Result<(), SerializationError> {
        match self.schema.relationship_cardinality(entity, key) {
            Some(Cardinality::ToOne) => {}
            Some(Cardinality::ToMany) => {
                return Err(SerializationError::invalid(
                    path,
                    "nested document under a to-many relationship",
                ));
            }
            None if self.schema.attribute_kind(entity, key).is_some() => {
                return Err(SerializationError::invalid(
                    path,
                    "nested document under an attribute",
                ));
            }
            None => {
                unresolved(path, report);
                return Ok(());
            }
        }

        if let Some(existing) = store.to_one(object, key)? {
            let existing_entity = store.entity_of(existing)?;
            if !self.schema.is_serializable(existing_entity) {
                return Err(SerializationError::NotSerializable {
                    entity: existing_entity.to_string(),
                });
            }
            self.update_object(store, existing, nested, path, report)?;
            store.set_to_one(object, key, Some(existing))?;
            return Ok(());
        }

        let Some(target) = self.schema.relationship_target(entity, key) else {
            unresolved(path, report);
            return Ok(());
        };

        let child = self.create_related(store, object, target, report)?;
        store.set_to_one(object, key, Some(child))?;
        self.update_object(store, child, nested, path, report)
    }

    fn update_to_many<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        entity: &str,
        key: &str,
        items: &[serde_json::Value],
        path: &str,
        report: &mut UpdateReport,
    ) -> Result<(), SerializationError> {
        match self.schema.relationship_cardinality(entity, key) {
            Some(Cardinality::ToMany) => {}
            Some(Cardinality::ToOne) => {
                return Err(SerializationError::invalid(
                    path,
                    "array under a to-one relationship",
                ));
            }
            None if self.schema.attribute_kind(entity, key).is_some() => {
                return Err(SerializationError::invalid(path, "array under an attribute"));
            }
            None => {
                unresolved(path, report);
                return Ok(());
            }
        }

        // Validate the whole array before the collection is touched.
        let mut documents = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                serde_json::Value::Object(nested) => documents.push(nested),
                _ => {
                    return Err(SerializationError::invalid(
                        index_path(path, index),
                        "to-many element is not a document",
                    ));
                }
            }
        }

        // Full replace: previous members are detached, not destroyed.
        store.clear_to_many(object, key)?;

        let Some(target) = self.schema.relationship_target(entity, key) else {
            unresolved(path, report);
            return Ok(());
        };

        for (index, nested) in documents.into_iter().enumerate() {
            let child = self.create_related(store, object, target, report)?;
            store.add_to_many(object, key, child)?;
            self.update_object(store, child, nested, &index_path(path, index), report)?;
        }

        Ok(())
    }

    fn update_attribute<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        object: ObjectId,
        entity: &str,
        key: &str,
        scalar: &serde_json::Value,
        path: &str,
    ) -> Result<(), SerializationError> {
        let value = match self.schema.attribute_kind(entity, key) {
            // Only numeric offsets are accepted; anything else becomes null.
            Some(AttributeKind::Timestamp) => scalar
                .as_f64()
                .map(|seconds| Value::Timestamp(Timestamp::from_reference_seconds(seconds))),
            Some(AttributeKind::Binary) => match scalar {
                serde_json::Value::String(encoded) => {
                    let bytes = BASE64.decode(encoded).map_err(|e| {
                        SerializationError::invalid(path, format!("invalid base64: {}", e))
                    })?;
                    Some(Value::Binary(bytes))
                }
                other => scalar_value(other),
            },
            _ => scalar_value(scalar),
        };

        store.set_attribute(object, key, value)?;
        Ok(())
    }

    fn create_related<G: GraphStore + ?Sized>(
        &self,
        store: &mut G,
        owner: ObjectId,
        entity: &str,
        report: &mut UpdateReport,
    ) -> Result<ObjectId, SerializationError> {
        let scope = store
            .scope_of(owner)?
            .ok_or_else(|| SerializationError::NoContext {
                object: owner,
                entity: entity.to_string(),
            })?;

        if !self.schema.is_serializable(entity) {
            return Err(SerializationError::NotSerializable {
                entity: entity.to_string(),
            });
        }

        let child = store.create_object(entity, scope)?;
        report.created += 1;
        Ok(child)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Map a JSON scalar to an attribute value verbatim. `null` unsets.
fn scalar_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        _ => None,
    }
}

fn unresolved(path: &str, report: &mut UpdateReport) {
    warn!(path, "no target entity, key dropped");
    report.warnings.push(UpdateWarning::UnresolvedTarget {
        path: path.to_string(),
    });
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

// =============================================================================
// TESTS
// =============================================================================
