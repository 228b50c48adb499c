//! # Snapshot Format
//!
//! Binary serialization for `MemoryGraph`.
//!
//! File I/O is left to the app layer; this module only maps stores to bytes
//! and back.
//!
//! Format: Header (13 bytes) + postcard-serialized `GraphSnapshot`.
//! - 4 bytes: Magic ("GDOC")
//! - 1 byte: Version
//! - 8 bytes: Schema fingerprint
//!
//! The schema itself is not stored. It is supplied again on load, must carry
//! the same fingerprint as the one the snapshot was written with, and every
//! object is checked against it.

use crate::graph::{GraphSnapshot, MemoryGraph};
use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_SNAPSHOT_SIZE};
use crate::schema::Schema;
use crate::StoreError;
use std::sync::Arc;

const FINGERPRINT_SIZE: usize = 8;
const HEADER_SIZE: usize = 5 + FINGERPRINT_SIZE;

/// First 8 bytes of the BLAKE3 hash of the schema's postcard encoding.
///
/// Entities and fields live in `BTreeMap`s, so equal schemas always encode
/// to the same bytes.
pub fn schema_fingerprint(schema: &Schema) -> Result<[u8; FINGERPRINT_SIZE], StoreError> {
    let encoded = postcard::to_stdvec(schema).map_err(|e| StoreError::Snapshot(e.to_string()))?;
    let hash = blake3::hash(&encoded);
    let mut fingerprint = [0u8; FINGERPRINT_SIZE];
    fingerprint.copy_from_slice(&hash.as_bytes()[..FINGERPRINT_SIZE]);
    Ok(fingerprint)
}

// =============================================================================
// HEADER
// =============================================================================

/// Leading bytes of a snapshot: format marker plus the schema it was
/// written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u8,
    pub schema: [u8; FINGERPRINT_SIZE],
}

impl SnapshotHeader {
    /// Header for a snapshot of a store built on `schema`.
    pub fn for_schema(schema: &Schema) -> Result<Self, StoreError> {
        Ok(Self {
            version: FORMAT_VERSION,
            schema: schema_fingerprint(schema)?,
        })
    }

    /// Parse the header, rejecting foreign data and other format versions.
    pub fn parse(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::Snapshot("Header too short".to_string()));
        }
        if &bytes[0..4] != MAGIC_BYTES {
            return Err(StoreError::Snapshot("Invalid magic bytes".to_string()));
        }
        if bytes[4] != FORMAT_VERSION {
            return Err(StoreError::Snapshot(format!(
                "Unsupported version: {} (expected {})",
                bytes[4], FORMAT_VERSION
            )));
        }

        let mut schema = [0u8; FINGERPRINT_SIZE];
        schema.copy_from_slice(&bytes[5..HEADER_SIZE]);
        Ok(Self {
            version: bytes[4],
            schema,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC_BYTES);
        bytes[4] = self.version;
        bytes[5..].copy_from_slice(&self.schema);
        bytes
    }

    /// Check that the snapshot was written against `schema`.
    pub fn check_schema(&self, schema: &Schema) -> Result<(), StoreError> {
        if self.schema != schema_fingerprint(schema)? {
            return Err(StoreError::Snapshot(
                "Snapshot was written with a different schema".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a store to bytes (header + payload).
pub fn graph_to_bytes(graph: &MemoryGraph) -> Result<Vec<u8>, StoreError> {
    let header = SnapshotHeader::for_schema(graph.schema())?;
    let payload = postcard::to_stdvec(&GraphSnapshot::from(graph))
        .map_err(|e| StoreError::Snapshot(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&header.to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a store from bytes.
///
/// Size, header and schema fingerprint are validated before the payload is
/// parsed.
pub fn graph_from_bytes(bytes: &[u8], schema: Arc<Schema>) -> Result<MemoryGraph, StoreError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(StoreError::Snapshot(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    SnapshotHeader::parse(bytes)?.check_schema(&schema)?;

    let snapshot: GraphSnapshot = postcard::from_bytes(&bytes[HEADER_SIZE..])
        .map_err(|e| StoreError::Snapshot(format!("Failed to deserialize store: {}", e)))?;

    MemoryGraph::from_snapshot(snapshot, schema)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use crate::schema::{AttributeKind, EntityDescriptor};
    use crate::{Timestamp, Value};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new().with_entity(
                "Person",
                EntityDescriptor::new()
                    .attribute("name", AttributeKind::String)
                    .attribute("born", AttributeKind::Timestamp)
                    .to_one("bestFriend", Some("Person")),
            ),
        )
    }

    #[test]
    fn header_roundtrip() {
        let header = SnapshotHeader::for_schema(&schema()).expect("header");
        let restored = SnapshotHeader::parse(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
        assert!(restored.check_schema(&schema()).is_ok());
    }

    #[test]
    fn fingerprint_tracks_schema_content() {
        let same = schema_fingerprint(&schema()).expect("fingerprint");
        assert_eq!(same, schema_fingerprint(&schema()).expect("fingerprint"));

        // Same names, different attribute kind.
        let retyped = Schema::new().with_entity(
            "Person",
            EntityDescriptor::new()
                .attribute("name", AttributeKind::String)
                .attribute("born", AttributeKind::Float)
                .to_one("bestFriend", Some("Person")),
        );
        assert_ne!(same, schema_fingerprint(&retyped).expect("fingerprint"));
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let mut graph = MemoryGraph::new(schema());
        let scope = graph.open_scope();
        let a = graph.create_object("Person", scope).expect("create");
        let b = graph.insert_detached("Person").expect("insert");
        graph
            .set_attribute(a, "name", Some(Value::from("A")))
            .expect("name");
        graph
            .set_attribute(
                b,
                "born",
                Some(Value::Timestamp(Timestamp::from_reference_seconds(12.5))),
            )
            .expect("born");
        graph.set_to_one(a, "bestFriend", Some(b)).expect("link");

        let bytes1 = graph_to_bytes(&graph).expect("first serialize");
        let restored = graph_from_bytes(&bytes1, schema()).expect("deserialize");
        let bytes2 = graph_to_bytes(&restored).expect("second serialize");

        assert_eq!(
            bytes1, bytes2,
            "save -> load -> save must produce identical bytes"
        );
        assert_eq!(restored.to_one(a, "bestFriend").expect("get"), Some(b));
    }

    #[test]
    fn other_schema_rejected() {
        let mut graph = MemoryGraph::new(schema());
        graph.insert_detached("Person").expect("insert");
        let bytes = graph_to_bytes(&graph).expect("serialize");

        // Every entity in the payload still exists, but the field types moved.
        let widened = Arc::new(
            Schema::new().with_entity(
                "Person",
                EntityDescriptor::new()
                    .attribute("name", AttributeKind::Binary)
                    .attribute("born", AttributeKind::Timestamp)
                    .to_one("bestFriend", Some("Person")),
            ),
        );
        assert_eq!(
            graph_from_bytes(&bytes, widened).err(),
            Some(StoreError::Snapshot(
                "Snapshot was written with a different schema".to_string()
            ))
        );
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 20];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert_eq!(
            graph_from_bytes(&bytes, schema()).err(),
            Some(StoreError::Snapshot("Invalid magic bytes".to_string()))
        );
    }

    #[test]
    fn truncated_data_rejected() {
        assert_eq!(
            graph_from_bytes(b"GDOC\x01", schema()).err(),
            Some(StoreError::Snapshot("Header too short".to_string()))
        );
    }
}
