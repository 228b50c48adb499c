//! # Serializer Primitives
//!
//! Hardcoded constants shared by the flattener, the reconstructor and the
//! binary snapshot format. These are compiled in and immutable at runtime.

/// Unix timestamp (seconds) of the reference epoch used on the wire.
///
/// Timestamp attributes travel as a number of seconds since
/// 2001-01-01T00:00:00Z, both when flattening and when reconstructing.
pub const REFERENCE_EPOCH_UNIX_SECONDS: i64 = 978_307_200;

/// Default bound on relationship nesting during a flatten pass.
///
/// Objects deeper than this are still emitted with their attributes,
/// but their relationships are not expanded.
pub const MAX_FLATTEN_DEPTH: usize = 100;

/// Default bound on object expansions during a flatten pass.
///
/// Shared objects count once per position they are inlined at. Small
/// documents stay well below `MAX_DOCUMENT_SIZE` at this bound.
pub const MAX_FLATTEN_OBJECTS: usize = 100_000;

/// Maximum size of a JSON payload accepted by the codec (64 MB).
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Magic bytes for the graph snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"GDOC";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum allowed snapshot size (500 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_epoch_is_2001() {
        // 31 years of 365 days plus 8 leap days.
        assert_eq!(REFERENCE_EPOCH_UNIX_SECONDS, (31 * 365 + 8) * 86_400);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"GDOC");
    }
}
