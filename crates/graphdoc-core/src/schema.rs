//! # Schema Registry
//!
//! Declared metadata for every entity the serializer may meet.
//!
//! The flattener and reconstructor never reflect on objects. They ask a
//! `SchemaInspector` which attributes and relationships an entity declares,
//! how many objects a relationship holds, and which entity sits on the
//! other end. `Schema` is the explicit, declarative implementation; it
//! deserializes from any serde format (the CLI reads it from TOML).

use crate::SerializationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// Declared kind of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Seconds since the reference epoch on the wire.
    Timestamp,
    /// Base64 string on the wire.
    Binary,
}

/// How many objects a relationship holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Declared shape of one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub cardinality: Cardinality,

    /// Whether a to-many collection keeps insertion order. Unordered
    /// collections behave as sets.
    #[serde(default)]
    pub ordered: bool,

    /// Target entity. A relationship without a target can be flattened
    /// but never reconstructed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RelationshipDescriptor {
    #[must_use]
    pub fn to_one(target: Option<&str>) -> Self {
        Self {
            cardinality: Cardinality::ToOne,
            ordered: false,
            target: target.map(str::to_string),
        }
    }

    #[must_use]
    pub fn to_many(target: Option<&str>, ordered: bool) -> Self {
        Self {
            cardinality: Cardinality::ToMany,
            ordered,
            target: target.map(str::to_string),
        }
    }
}

const fn default_serializable() -> bool {
    true
}

/// Declared shape of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entities with `serializable = false` are opaque: they are never
    /// expanded as related objects and never created from a document.
    #[serde(default = "default_serializable")]
    pub serializable: bool,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeKind>,

    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipDescriptor>,
}

impl Default for EntityDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityDescriptor {
    /// Create an empty, serializable entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            serializable: true,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Declare an attribute.
    #[must_use]
    pub fn attribute(mut self, name: &str, kind: AttributeKind) -> Self {
        self.attributes.insert(name.to_string(), kind);
        self
    }

    /// Declare a to-one relationship.
    #[must_use]
    pub fn to_one(mut self, name: &str, target: Option<&str>) -> Self {
        self.relationships
            .insert(name.to_string(), RelationshipDescriptor::to_one(target));
        self
    }

    /// Declare a to-many relationship.
    #[must_use]
    pub fn to_many(mut self, name: &str, target: Option<&str>, ordered: bool) -> Self {
        self.relationships.insert(
            name.to_string(),
            RelationshipDescriptor::to_many(target, ordered),
        );
        self
    }

    /// Mark the entity as opaque to serialization.
    #[must_use]
    pub fn opaque(mut self) -> Self {
        self.serializable = false;
        self
    }
}

// =============================================================================
// SCHEMA INSPECTOR TRAIT
// =============================================================================

/// Read-only view of declared entity metadata.
///
/// Unknown entities and unknown names answer with empty lists or `None`;
/// missing metadata is never an error at this layer.
pub trait SchemaInspector {
    /// Declared attribute names of an entity, in a stable order.
    fn attribute_names<'a>(&'a self, entity: &str) -> Vec<&'a str>;

    /// Declared kind of an attribute.
    fn attribute_kind(&self, entity: &str, name: &str) -> Option<AttributeKind>;

    /// Declared relationship names of an entity, in a stable order.
    fn relationship_names<'a>(&'a self, entity: &str) -> Vec<&'a str>;

    /// Declared cardinality of a relationship.
    fn relationship_cardinality(&self, entity: &str, name: &str) -> Option<Cardinality>;

    /// Declared target entity of a relationship.
    fn relationship_target<'a>(&'a self, entity: &str, name: &str) -> Option<&'a str>;

    /// Whether objects of this entity take part in serialization.
    fn is_serializable(&self, entity: &str) -> bool;
}

impl<T: SchemaInspector + ?Sized> SchemaInspector for Arc<T> {
    fn attribute_names<'a>(&'a self, entity: &str) -> Vec<&'a str> {
        (**self).attribute_names(entity)
    }

    fn attribute_kind(&self, entity: &str, name: &str) -> Option<AttributeKind> {
        (**self).attribute_kind(entity, name)
    }

    fn relationship_names<'a>(&'a self, entity: &str) -> Vec<&'a str> {
        (**self).relationship_names(entity)
    }

    fn relationship_cardinality(&self, entity: &str, name: &str) -> Option<Cardinality> {
        (**self).relationship_cardinality(entity, name)
    }

    fn relationship_target<'a>(&'a self, entity: &str, name: &str) -> Option<&'a str> {
        (**self).relationship_target(entity, name)
    }

    fn is_serializable(&self, entity: &str) -> bool {
        (**self).is_serializable(entity)
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// A runtime entity table keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    entities: BTreeMap<String, EntityDescriptor>,
}

impl Schema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an entity.
    #[must_use]
    pub fn with_entity(mut self, name: &str, descriptor: EntityDescriptor) -> Self {
        self.entities.insert(name.to_string(), descriptor);
        self
    }

    /// Look up an entity descriptor.
    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    /// Iterate all entities in name order.
    pub fn entities(&self) -> impl Iterator<Item = (&str, &EntityDescriptor)> {
        self.entities.iter().map(|(name, e)| (name.as_str(), e))
    }

    /// Number of declared entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the schema declares no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Check internal consistency.
    ///
    /// - Every relationship target names a declared entity.
    /// - No name is declared both as attribute and relationship.
    /// - `ordered` is only set on to-many relationships.
    pub fn validate(&self) -> Result<(), SerializationError> {
        for (name, entity) in &self.entities {
            for (rel_name, rel) in &entity.relationships {
                if entity.attributes.contains_key(rel_name) {
                    return Err(SerializationError::InvalidSchema(format!(
                        "{}.{} is declared as both attribute and relationship",
                        name, rel_name
                    )));
                }
                if rel.ordered && rel.cardinality == Cardinality::ToOne {
                    return Err(SerializationError::InvalidSchema(format!(
                        "{}.{} is to-one and cannot be ordered",
                        name, rel_name
                    )));
                }
                if let Some(target) = &rel.target
                    && !self.entities.contains_key(target)
                {
                    return Err(SerializationError::InvalidSchema(format!(
                        "{}.{} targets unknown entity {}",
                        name, rel_name, target
                    )));
                }
            }
        }
        Ok(())
    }

    fn relationship(&self, entity: &str, name: &str) -> Option<&RelationshipDescriptor> {
        self.entities.get(entity)?.relationships.get(name)
    }
}

impl SchemaInspector for Schema {
    fn attribute_names<'a>(&'a self, entity: &str) -> Vec<&'a str> {
        self.entities
            .get(entity)
            .map(|e| e.attributes.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn attribute_kind(&self, entity: &str, name: &str) -> Option<AttributeKind> {
        self.entities.get(entity)?.attributes.get(name).copied()
    }

    fn relationship_names<'a>(&'a self, entity: &str) -> Vec<&'a str> {
        self.entities
            .get(entity)
            .map(|e| e.relationships.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn relationship_cardinality(&self, entity: &str, name: &str) -> Option<Cardinality> {
        self.relationship(entity, name).map(|r| r.cardinality)
    }

    fn relationship_target<'a>(&'a self, entity: &str, name: &str) -> Option<&'a str> {
        self.relationship(entity, name)?.target.as_deref()
    }

    fn is_serializable(&self, entity: &str) -> bool {
        self.entities.get(entity).is_some_and(|e| e.serializable)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Schema {
        Schema::new()
            .with_entity(
                "Person",
                EntityDescriptor::new()
                    .attribute("name", AttributeKind::String)
                    .attribute("born", AttributeKind::Timestamp)
                    .to_one("bestFriend", Some("Person"))
                    .to_many("pets", Some("Pet"), true),
            )
            .with_entity(
                "Pet",
                EntityDescriptor::new().attribute("name", AttributeKind::String),
            )
    }

    #[test]
    fn inspector_reports_declared_metadata() {
        let schema = people();

        assert_eq!(schema.attribute_names("Person"), vec!["born", "name"]);
        assert_eq!(schema.relationship_names("Person"), vec!["bestFriend", "pets"]);
        assert_eq!(
            schema.attribute_kind("Person", "born"),
            Some(AttributeKind::Timestamp)
        );
        assert_eq!(
            schema.relationship_cardinality("Person", "pets"),
            Some(Cardinality::ToMany)
        );
        assert_eq!(schema.relationship_target("Person", "pets"), Some("Pet"));
        assert!(schema.is_serializable("Pet"));
    }

    #[test]
    fn unknown_names_answer_empty() {
        let schema = people();

        assert!(schema.attribute_names("Robot").is_empty());
        assert_eq!(schema.attribute_kind("Person", "age"), None);
        assert_eq!(schema.relationship_target("Person", "name"), None);
        assert!(!schema.is_serializable("Robot"));
    }

    #[test]
    fn validate_accepts_consistent_schema() {
        assert!(people().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_target() {
        let schema = people().with_entity(
            "Owner",
            EntityDescriptor::new().to_one("car", Some("Car")),
        );
        assert!(matches!(
            schema.validate(),
            Err(SerializationError::InvalidSchema(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let schema = Schema::new().with_entity(
            "Pet",
            EntityDescriptor::new()
                .attribute("owner", AttributeKind::String)
                .to_one("owner", None),
        );
        assert!(schema.validate().is_err());
    }

    #[test]
    fn schema_deserializes_from_json() {
        let raw = serde_json::json!({
            "entities": {
                "Pet": {
                    "attributes": { "name": "string", "photo": "binary" },
                    "relationships": {
                        "owner": { "cardinality": "to-one", "target": "Pet" }
                    }
                },
                "Blob": { "serializable": false }
            }
        });
        let schema: Schema = serde_json::from_value(raw).expect("schema");

        assert_eq!(
            schema.attribute_kind("Pet", "photo"),
            Some(AttributeKind::Binary)
        );
        assert_eq!(
            schema.relationship_cardinality("Pet", "owner"),
            Some(Cardinality::ToOne)
        );
        assert!(!schema.is_serializable("Blob"));
    }
}
