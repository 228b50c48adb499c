//! # Application Config
//!
//! TOML config for the CLI: the schema plus flatten, update and output
//! settings.
//!
//! ```toml
//! [flatten]
//! shared_references = "first-only"
//! max_depth = 32
//! max_objects = 10000
//!
//! [update]
//! mode = "lenient"
//!
//! [output]
//! pretty = true
//!
//! [schema.entities.Person.attributes]
//! name = "string"
//! born = "timestamp"
//!
//! [schema.entities.Person.relationships.pets]
//! cardinality = "to-many"
//! target = "Pet"
//! ordered = true
//!
//! [schema.entities.Pet.attributes]
//! name = "string"
//! ```

use graphdoc_core::{FlattenOptions, ObjectSerializer, Schema, SerializationError, UpdateMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Maximum config file size (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// `[update]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    pub mode: UpdateMode,
}

/// `[output]` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub pretty: bool,
}

/// The whole config file. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub flatten: FlattenOptions,
    pub update: UpdateConfig,
    pub output: OutputConfig,
    pub schema: Schema,
}

impl AppConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SerializationError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| SerializationError::Codec(format!("Config parse: {}", e)))?;
        config.schema.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, SerializationError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SerializationError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(SerializationError::Io(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SerializationError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;

        tracing::debug!(
            "Loaded config {:?}: {} entities, {:?} update mode",
            path,
            config.schema.len(),
            config.update.mode
        );
        Ok(config)
    }

    /// Build a serializer carrying this config's schema and settings.
    #[must_use]
    pub fn serializer(&self) -> ObjectSerializer<Arc<Schema>> {
        ObjectSerializer::new(Arc::new(self.schema.clone()))
            .with_flatten_options(self.flatten)
            .with_update_mode(self.update.mode)
            .pretty(self.output.pretty)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use graphdoc_core::{SchemaInspector, SharedReferences};

    #[test]
    fn empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.update.mode, UpdateMode::Strict);
        assert!(!config.output.pretty);
    }

    #[test]
    fn partial_flatten_table_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [flatten]
            shared_references = "first-only"
            "#,
        )
        .expect("parse");
        assert_eq!(
            config.flatten.shared_references,
            SharedReferences::FirstOnly
        );
        assert_eq!(config.flatten.max_depth, FlattenOptions::default().max_depth);
        assert_eq!(
            config.flatten.max_objects,
            FlattenOptions::default().max_objects
        );
    }

    #[test]
    fn unknown_table_rejected() {
        let result = AppConfig::from_toml_str("[server]\nport = 80\n");
        assert!(matches!(result, Err(SerializationError::Codec(_))));
    }

    #[test]
    fn dangling_target_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
            [schema.entities.Person.relationships.pets]
            cardinality = "to-many"
            target = "Pet"
            "#,
        );
        assert!(matches!(result, Err(SerializationError::InvalidSchema(_))));
    }

    #[test]
    fn serializer_sees_config_schema() {
        let config = AppConfig::from_toml_str(
            r#"
            [schema.entities.Pet.attributes]
            name = "string"
            "#,
        )
        .expect("parse");
        let serializer = config.serializer();
        assert_eq!(serializer.schema().attribute_names("Pet"), vec!["name"]);
    }
}
