//! # JSON Codec
//!
//! Document <-> UTF-8 JSON bytes. A thin boundary over `serde_json`.
//!
//! Payloads larger than `MAX_DOCUMENT_SIZE` are rejected before parsing, and
//! the top-level value must be a JSON object.

use crate::primitives::MAX_DOCUMENT_SIZE;
use crate::{Document, SerializationError};

/// Encode a document as JSON bytes.
pub fn to_json_bytes(doc: &Document, pretty: bool) -> Result<Vec<u8>, SerializationError> {
    let result = if pretty {
        serde_json::to_vec_pretty(doc)
    } else {
        serde_json::to_vec(doc)
    };
    result.map_err(|e| SerializationError::Codec(e.to_string()))
}

/// Decode JSON bytes into a document.
pub fn from_json_bytes(bytes: &[u8]) -> Result<Document, SerializationError> {
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(SerializationError::Codec(format!(
            "Payload size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DOCUMENT_SIZE
        )));
    }

    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| SerializationError::Codec(e.to_string()))?;

    match value {
        serde_json::Value::Object(doc) => Ok(doc),
        other => Err(SerializationError::invalid(
            "$",
            format!("top-level value must be an object, found {}", kind_name(&other)),
        )),
    }
}

fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_keep_document_order() {
        let bytes = br#"{"zeta":1,"alpha":{"b":2,"a":1}}"#;
        let doc = from_json_bytes(bytes).expect("decode");

        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(to_json_bytes(&doc, false).expect("encode"), bytes.to_vec());
    }

    #[test]
    fn non_object_rejected() {
        let result = from_json_bytes(b"[1, 2]");
        assert_eq!(
            result,
            Err(SerializationError::InvalidDocument {
                path: "$".to_string(),
                reason: "top-level value must be an object, found array".to_string(),
            })
        );
    }

    #[test]
    fn malformed_json_is_codec_error() {
        assert!(matches!(
            from_json_bytes(b"{\"name\":"),
            Err(SerializationError::Codec(_))
        ));
    }

    #[test]
    fn pretty_output_is_multiline() {
        let doc = from_json_bytes(br#"{"name":"Ann"}"#).expect("decode");
        let pretty = to_json_bytes(&doc, true).expect("encode");
        assert!(pretty.contains(&b'\n'));
    }
}
