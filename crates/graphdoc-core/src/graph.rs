//! # Graph Store
//!
//! The transactional authority that owns object identity.
//!
//! This module defines the `GraphStore` trait consumed by the flattener and
//! the reconstructor, plus `MemoryGraph`, an in-memory reference store that
//! enforces a `Schema`. All data structures use `BTreeMap` for deterministic
//! ordering.

use crate::schema::{Cardinality, RelationshipDescriptor, Schema};
use crate::{ObjectId, ScopeId, StoreError, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// Typed field access and object creation over a graph of entities.
///
/// Attribute and relationship names are those declared by the schema the
/// store was built against. Every operation on an unknown object fails with
/// `StoreError::UnknownObject`.
pub trait GraphStore {
    /// Entity (type) name of an object.
    fn entity_of(&self, object: ObjectId) -> Result<&str, StoreError>;

    /// Scope of an object, `None` for detached objects.
    fn scope_of(&self, object: ObjectId) -> Result<Option<ScopeId>, StoreError>;

    /// Create a new object of `entity` inside `scope`.
    fn create_object(&mut self, entity: &str, scope: ScopeId) -> Result<ObjectId, StoreError>;

    /// Read an attribute. `None` when unset.
    fn attribute(&self, object: ObjectId, name: &str) -> Result<Option<Value>, StoreError>;

    /// Write an attribute. `None` unsets it.
    fn set_attribute(
        &mut self,
        object: ObjectId,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError>;

    /// Read a to-one relationship.
    fn to_one(&self, object: ObjectId, name: &str) -> Result<Option<ObjectId>, StoreError>;

    /// Write a to-one relationship. `None` clears it.
    fn set_to_one(
        &mut self,
        object: ObjectId,
        name: &str,
        target: Option<ObjectId>,
    ) -> Result<(), StoreError>;

    /// Members of a to-many relationship, in collection order.
    fn to_many(&self, object: ObjectId, name: &str) -> Result<Vec<ObjectId>, StoreError>;

    /// Detach every member of a to-many relationship.
    ///
    /// Detached objects stay in the store.
    fn clear_to_many(&mut self, object: ObjectId, name: &str) -> Result<(), StoreError>;

    /// Add a member to a to-many relationship.
    ///
    /// Ordered collections append; unordered collections ignore members
    /// that are already present.
    fn add_to_many(
        &mut self,
        object: ObjectId,
        name: &str,
        member: ObjectId,
    ) -> Result<(), StoreError>;
}

// =============================================================================
// STORED OBJECT
// =============================================================================

/// One object as held by `MemoryGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    entity: String,
    scope: Option<ScopeId>,
    attributes: BTreeMap<String, Value>,
    to_one: BTreeMap<String, ObjectId>,
    to_many: BTreeMap<String, Vec<ObjectId>>,
}

impl StoredObject {
    fn new(entity: &str, scope: Option<ScopeId>) -> Self {
        Self {
            entity: entity.to_string(),
            scope,
            attributes: BTreeMap::new(),
            to_one: BTreeMap::new(),
            to_many: BTreeMap::new(),
        }
    }

    /// Entity name.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Owning scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<ScopeId> {
        self.scope
    }
}

// =============================================================================
// MEMORY GRAPH
// =============================================================================

/// In-memory graph store validated against a schema.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    schema: Arc<Schema>,

    /// Object storage: ObjectId -> object
    objects: BTreeMap<ObjectId, StoredObject>,

    /// Open scopes
    scopes: BTreeSet<ScopeId>,

    next_object_id: u64,
    next_scope_id: u64,
}

impl MemoryGraph {
    /// Create an empty store for the given schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            objects: BTreeMap::new(),
            scopes: BTreeSet::new(),
            next_object_id: 0,
            next_scope_id: 0,
        }
    }

    /// The schema this store enforces.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Open a new transactional scope.
    pub fn open_scope(&mut self) -> ScopeId {
        let scope = ScopeId(self.next_scope_id);
        self.next_scope_id = self.next_scope_id.saturating_add(1);
        self.scopes.insert(scope);
        scope
    }

    /// Insert an object that belongs to no scope.
    ///
    /// Detached objects can be flattened and updated, but reconstruction
    /// cannot create related objects for them.
    pub fn insert_detached(&mut self, entity: &str) -> Result<ObjectId, StoreError> {
        self.insert(entity, None)
    }

    /// Get a stored object.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&StoredObject> {
        self.objects.get(&id)
    }

    /// All objects in deterministic order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &StoredObject)> {
        self.objects.iter().map(|(id, o)| (*id, o))
    }

    /// Total number of objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Rebuild a store from a snapshot, checking every object against the schema.
    ///
    /// Rejected with `StoreError::Snapshot`:
    /// - an object or scope id that is not below its id counter
    /// - the same object id stored twice
    /// - a relationship pointing at an object the snapshot does not hold
    pub fn from_snapshot(snapshot: GraphSnapshot, schema: Arc<Schema>) -> Result<Self, StoreError> {
        let mut graph = Self::new(schema);
        graph.next_object_id = snapshot.next_object_id;
        graph.next_scope_id = snapshot.next_scope_id;

        for scope in snapshot.scopes {
            if scope.0 >= graph.next_scope_id {
                return Err(StoreError::Snapshot(format!(
                    "Scope {:?} is not below the scope counter {}",
                    scope, graph.next_scope_id
                )));
            }
            graph.scopes.insert(scope);
        }

        for (id, object) in snapshot.objects {
            if id.0 >= graph.next_object_id {
                return Err(StoreError::Snapshot(format!(
                    "Object {} is not below the object counter {}",
                    id, graph.next_object_id
                )));
            }
            if graph.schema.entity(&object.entity).is_none() {
                return Err(StoreError::UnknownEntity(object.entity));
            }
            if let Some(scope) = object.scope
                && !graph.scopes.contains(&scope)
            {
                return Err(StoreError::UnknownScope(scope));
            }
            if graph.objects.insert(id, object).is_some() {
                return Err(StoreError::Snapshot(format!("Object {} stored twice", id)));
            }
        }

        for (id, object) in &graph.objects {
            let targets = object
                .to_one
                .values()
                .chain(object.to_many.values().flatten());
            for target in targets {
                if !graph.objects.contains_key(target) {
                    return Err(StoreError::Snapshot(format!(
                        "Object {} refers to missing object {}",
                        id, target
                    )));
                }
            }
        }

        Ok(graph)
    }

    fn insert(&mut self, entity: &str, scope: Option<ScopeId>) -> Result<ObjectId, StoreError> {
        if self.schema.entity(entity).is_none() {
            return Err(StoreError::UnknownEntity(entity.to_string()));
        }
        if let Some(scope) = scope
            && !self.scopes.contains(&scope)
        {
            return Err(StoreError::UnknownScope(scope));
        }

        let id = ObjectId(self.next_object_id);
        self.next_object_id = self.next_object_id.saturating_add(1);
        self.objects.insert(id, StoredObject::new(entity, scope));
        Ok(id)
    }

    fn stored(&self, id: ObjectId) -> Result<&StoredObject, StoreError> {
        self.objects.get(&id).ok_or(StoreError::UnknownObject(id))
    }
}

/// Check that `name` is a declared attribute of `entity`.
fn check_attribute(schema: &Schema, entity: &str, name: &str) -> Result<(), StoreError> {
    let declared = schema
        .entity(entity)
        .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;

    if declared.attributes.contains_key(name) {
        return Ok(());
    }
    if declared.relationships.contains_key(name) {
        return Err(StoreError::CardinalityMismatch {
            entity: entity.to_string(),
            field: name.to_string(),
        });
    }
    Err(StoreError::UnknownField {
        entity: entity.to_string(),
        field: name.to_string(),
    })
}

/// Look up a declared relationship and check its cardinality.
fn relationship<'a>(
    schema: &'a Schema,
    entity: &str,
    name: &str,
    expected: Cardinality,
) -> Result<&'a RelationshipDescriptor, StoreError> {
    let declared = schema
        .entity(entity)
        .ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;

    match declared.relationships.get(name) {
        Some(rel) if rel.cardinality == expected => Ok(rel),
        Some(_) => Err(StoreError::CardinalityMismatch {
            entity: entity.to_string(),
            field: name.to_string(),
        }),
        None if declared.attributes.contains_key(name) => Err(StoreError::CardinalityMismatch {
            entity: entity.to_string(),
            field: name.to_string(),
        }),
        None => Err(StoreError::UnknownField {
            entity: entity.to_string(),
            field: name.to_string(),
        }),
    }
}

impl GraphStore for MemoryGraph {
    fn entity_of(&self, object: ObjectId) -> Result<&str, StoreError> {
        self.stored(object).map(StoredObject::entity)
    }

    fn scope_of(&self, object: ObjectId) -> Result<Option<ScopeId>, StoreError> {
        self.stored(object).map(StoredObject::scope)
    }

    fn create_object(&mut self, entity: &str, scope: ScopeId) -> Result<ObjectId, StoreError> {
        self.insert(entity, Some(scope))
    }

    fn attribute(&self, object: ObjectId, name: &str) -> Result<Option<Value>, StoreError> {
        let stored = self.stored(object)?;
        check_attribute(&self.schema, &stored.entity, name)?;
        Ok(stored.attributes.get(name).cloned())
    }

    fn set_attribute(
        &mut self,
        object: ObjectId,
        name: &str,
        value: Option<Value>,
    ) -> Result<(), StoreError> {
        let stored = self
            .objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject(object))?;
        check_attribute(&self.schema, &stored.entity, name)?;

        match value {
            Some(value) => {
                stored.attributes.insert(name.to_string(), value);
            }
            None => {
                stored.attributes.remove(name);
            }
        }
        Ok(())
    }

    fn to_one(&self, object: ObjectId, name: &str) -> Result<Option<ObjectId>, StoreError> {
        let stored = self.stored(object)?;
        relationship(&self.schema, &stored.entity, name, Cardinality::ToOne)?;
        Ok(stored.to_one.get(name).copied())
    }

    fn set_to_one(
        &mut self,
        object: ObjectId,
        name: &str,
        target: Option<ObjectId>,
    ) -> Result<(), StoreError> {
        if let Some(target) = target
            && !self.objects.contains_key(&target)
        {
            return Err(StoreError::UnknownObject(target));
        }

        let stored = self
            .objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject(object))?;
        relationship(&self.schema, &stored.entity, name, Cardinality::ToOne)?;

        match target {
            Some(target) => {
                stored.to_one.insert(name.to_string(), target);
            }
            None => {
                stored.to_one.remove(name);
            }
        }
        Ok(())
    }

    fn to_many(&self, object: ObjectId, name: &str) -> Result<Vec<ObjectId>, StoreError> {
        let stored = self.stored(object)?;
        relationship(&self.schema, &stored.entity, name, Cardinality::ToMany)?;
        Ok(stored.to_many.get(name).cloned().unwrap_or_default())
    }

    fn clear_to_many(&mut self, object: ObjectId, name: &str) -> Result<(), StoreError> {
        let stored = self
            .objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject(object))?;
        relationship(&self.schema, &stored.entity, name, Cardinality::ToMany)?;
        stored.to_many.remove(name);
        Ok(())
    }

    fn add_to_many(
        &mut self,
        object: ObjectId,
        name: &str,
        member: ObjectId,
    ) -> Result<(), StoreError> {
        if !self.objects.contains_key(&member) {
            return Err(StoreError::UnknownObject(member));
        }

        let stored = self
            .objects
            .get_mut(&object)
            .ok_or(StoreError::UnknownObject(object))?;
        let rel = relationship(&self.schema, &stored.entity, name, Cardinality::ToMany)?;

        let members = stored.to_many.entry(name.to_string()).or_default();
        if rel.ordered || !members.contains(&member) {
            members.push(member);
        }
        Ok(())
    }
}

// =============================================================================
// SNAPSHOT REPRESENTATION
// =============================================================================

/// A serializable representation of a `MemoryGraph`.
///
/// The schema is not part of the snapshot; it is supplied again on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub objects: Vec<(ObjectId, StoredObject)>,
    pub scopes: Vec<ScopeId>,
    pub next_object_id: u64,
    pub next_scope_id: u64,
}

impl From<&MemoryGraph> for GraphSnapshot {
    fn from(graph: &MemoryGraph) -> Self {
        Self {
            objects: graph
                .objects
                .iter()
                .map(|(id, o)| (*id, o.clone()))
                .collect(),
            scopes: graph.scopes.iter().copied().collect(),
            next_object_id: graph.next_object_id,
            next_scope_id: graph.next_scope_id,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
