//! # Core Type Definitions
//!
//! This module contains the types shared by every part of the serializer:
//! - Object and scope identifiers (`ObjectId`, `ScopeId`)
//! - Attribute values (`Value`, `Timestamp`)
//! - The document representation (`Document`)
//! - Error types (`SerializationError`, `StoreError`)
//!
//! ## Determinism Guarantees
//!
//! Identifiers implement `Ord` so that stores and pass state can key
//! `BTreeMap`/`BTreeSet` collections and iterate in a stable order.

use crate::primitives::REFERENCE_EPOCH_UNIX_SECONDS;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of a graph object. Owned and assigned by the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a transactional scope.
///
/// Every object created while reconstructing a document lands in the scope
/// of the object being updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u64);

// =============================================================================
// DOCUMENT
// =============================================================================

/// The tree-shaped representation produced by flattening.
///
/// Keys keep insertion order (`serde_json` is built with `preserve_order`).
/// Values are scalars, nested documents (to-one) or arrays of documents
/// (to-many).
pub type Document = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// TIMESTAMP
// =============================================================================

/// A point in time, stored as seconds since the reference epoch
/// (2001-01-01T00:00:00Z).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp(f64);

impl Timestamp {
    /// Create a timestamp from seconds since the reference epoch.
    #[must_use]
    pub const fn from_reference_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    /// Create a timestamp from Unix seconds.
    #[must_use]
    pub fn from_unix_seconds(seconds: f64) -> Self {
        Self(seconds - REFERENCE_EPOCH_UNIX_SECONDS as f64)
    }

    /// Seconds since the reference epoch. This is the wire representation.
    #[must_use]
    pub const fn reference_seconds(self) -> f64 {
        self.0
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn unix_seconds(self) -> f64 {
        self.0 + REFERENCE_EPOCH_UNIX_SECONDS as f64
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A scalar attribute value.
///
/// An unset attribute is represented by the absence of a `Value`
/// (`Option::None`), never by a dedicated null variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(Timestamp),
    Binary(Vec<u8>),
}

impl Value {
    /// Get the value as a string slice, if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the JSON wire representation.
    ///
    /// Timestamps become seconds since the reference epoch and binary data
    /// becomes a standard base64 string. Returns `None` for non-finite
    /// floats, which JSON cannot carry.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::String(s) => Some(serde_json::Value::String(s.clone())),
            Self::Integer(i) => Some(serde_json::Value::from(*i)),
            Self::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
            Self::Boolean(b) => Some(serde_json::Value::Bool(*b)),
            Self::Timestamp(t) => {
                serde_json::Number::from_f64(t.reference_seconds()).map(serde_json::Value::Number)
            }
            Self::Binary(bytes) => Some(serde_json::Value::String(BASE64.encode(bytes))),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Self::Timestamp(t)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors reported by a graph store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object id is not known to the store.
    #[error("Object not found: {0}")]
    UnknownObject(ObjectId),

    /// The entity name is not declared in the schema.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// The scope id is not known to the store.
    #[error("Unknown scope: {0:?}")]
    UnknownScope(ScopeId),

    /// The field is not declared on the entity.
    #[error("Entity {entity} has no field {field}")]
    UnknownField { entity: String, field: String },

    /// The field exists but was accessed with the wrong shape
    /// (attribute vs to-one vs to-many).
    #[error("Field {entity}.{field} accessed with the wrong cardinality")]
    CardinalityMismatch { entity: String, field: String },

    /// A snapshot could not be written or read.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Errors raised while flattening or reconstructing.
///
/// Flattening only ever surfaces `Store`. Reconstruction surfaces every
/// variant according to the configured `UpdateMode`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// The object being updated belongs to no scope, so related objects
    /// cannot be created for it.
    #[error("No scope found for {object} while creating a related {entity}")]
    NoContext { object: ObjectId, entity: String },

    /// The resolved target entity does not support serialization.
    #[error("Entity {entity} does not support serialization")]
    NotSerializable { entity: String },

    /// The document does not match the shape the schema declares.
    #[error("Invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// The schema is inconsistent.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// The graph store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// JSON encoding or decoding failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl SerializationError {
    /// Shorthand for an `InvalidDocument` error.
    pub(crate) fn invalid(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_unix_conversion() {
        let t = Timestamp::from_unix_seconds(978_307_200.0);
        assert_eq!(t.reference_seconds(), 0.0);

        let later = Timestamp::from_reference_seconds(60.0);
        assert_eq!(later.unix_seconds(), 978_307_260.0);
    }

    #[test]
    fn value_to_json_scalars() {
        assert_eq!(Value::from("Ann").to_json(), Some(serde_json::json!("Ann")));
        assert_eq!(Value::from(42).to_json(), Some(serde_json::json!(42)));
        assert_eq!(Value::from(true).to_json(), Some(serde_json::json!(true)));
        assert_eq!(
            Value::Timestamp(Timestamp::from_reference_seconds(1.5)).to_json(),
            Some(serde_json::json!(1.5))
        );
    }

    #[test]
    fn binary_is_base64() {
        let v = Value::Binary(b"hello".to_vec());
        assert_eq!(v.to_json(), Some(serde_json::json!("aGVsbG8=")));
    }

    #[test]
    fn non_finite_float_has_no_json_form() {
        assert_eq!(Value::Float(f64::NAN).to_json(), None);
        assert_eq!(Value::Float(f64::INFINITY).to_json(), None);
    }

    #[test]
    fn store_error_converts() {
        let err: SerializationError = StoreError::UnknownObject(ObjectId(7)).into();
        assert_eq!(err.to_string(), "Object not found: #7");
    }
}
