//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use graphdoc_core::{
    Cardinality, GraphStore, MemoryGraph, ObjectId, Schema, SerializationError, UpdateReport,
    graph_from_bytes, graph_to_bytes,
    primitives::{MAX_DOCUMENT_SIZE, MAX_SNAPSHOT_SIZE},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: usize) -> Result<(), SerializationError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| SerializationError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size as u64 {
        return Err(SerializationError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to a canonical regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, SerializationError> {
    let canonical = path.canonicalize().map_err(|e| {
        SerializationError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(SerializationError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, SerializationError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SerializationError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SerializationError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SerializationError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read a JSON document file, bounded by `MAX_DOCUMENT_SIZE`.
fn read_document(input: &Path) -> Result<Vec<u8>, SerializationError> {
    let validated = validate_file_path(input)?;
    validate_file_size(&validated, MAX_DOCUMENT_SIZE)?;
    std::fs::read(&validated).map_err(|e| SerializationError::Io(format!("Read file: {}", e)))
}

fn log_warnings(report: &UpdateReport) {
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
}

// =============================================================================
// SNAPSHOT FILES
// =============================================================================

/// Load a graph snapshot, or start an empty graph if the file does not exist.
pub fn load_or_create_graph(
    path: &Path,
    schema: Arc<Schema>,
) -> Result<MemoryGraph, SerializationError> {
    if !path.exists() {
        tracing::debug!("Snapshot {:?} not found, starting empty", path);
        return Ok(MemoryGraph::new(schema));
    }

    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_SNAPSHOT_SIZE)?;
    let data = std::fs::read(&validated)
        .map_err(|e| SerializationError::Io(format!("Read snapshot: {}", e)))?;

    Ok(graph_from_bytes(&data, schema)?)
}

/// Write a graph snapshot.
pub fn save_graph(graph: &MemoryGraph, path: &Path) -> Result<(), SerializationError> {
    let validated = validate_output_path(path)?;
    let data = graph_to_bytes(graph)?;
    std::fs::write(&validated, &data)
        .map_err(|e| SerializationError::Io(format!("Write snapshot: {}", e)))
}

// =============================================================================
// DOCUMENT OPERATIONS
// =============================================================================

/// Create a root object of `entity` in a new scope of `graph` and apply the
/// JSON document to it.
pub fn import_document(
    config: &AppConfig,
    graph: &mut MemoryGraph,
    entity: &str,
    json: &[u8],
) -> Result<(ObjectId, UpdateReport), SerializationError> {
    let serializer = config.serializer();
    let scope = graph.open_scope();
    let root = graph.create_object(entity, scope)?;
    let report = serializer.update_from_json(graph, root, json)?;
    Ok((root, report))
}

/// Apply a JSON document to a fresh object and flatten it back to JSON.
pub fn roundtrip_document(
    config: &AppConfig,
    entity: &str,
    json: &[u8],
) -> Result<(Vec<u8>, UpdateReport), SerializationError> {
    let serializer = config.serializer();
    let mut graph = MemoryGraph::new(Arc::clone(serializer.schema()));
    let (root, report) = import_document(config, &mut graph, entity, json)?;
    let output = serializer.json_data(&graph, root)?;
    Ok((output, report))
}

/// Flatten an object of `graph` to JSON.
pub fn export_document(
    config: &AppConfig,
    graph: &MemoryGraph,
    object: ObjectId,
) -> Result<Vec<u8>, SerializationError> {
    config.serializer().json_data(graph, object)
}

fn print_json(bytes: Vec<u8>) -> Result<(), SerializationError> {
    let text = String::from_utf8(bytes).map_err(|e| SerializationError::Codec(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SCHEMA COMMAND
// =============================================================================

/// Show the configured schema.
pub fn cmd_schema(config: &AppConfig, json_mode: bool) -> Result<(), SerializationError> {
    let schema = &config.schema;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(schema).unwrap_or_default()
        );
        return Ok(());
    }

    println!("graphdoc Schema");
    println!("===============");
    println!("Entities:          {}", schema.len());
    println!("Shared references: {:?}", config.flatten.shared_references);
    println!("Max depth:         {}", config.flatten.max_depth);
    println!("Max objects:       {}", config.flatten.max_objects);
    println!("Update mode:       {:?}", config.update.mode);

    for (name, entity) in schema.entities() {
        println!();
        if entity.serializable {
            println!("{}", name);
        } else {
            println!("{} (opaque)", name);
        }
        for (attr, kind) in &entity.attributes {
            println!("  {:<20} {:?}", attr, kind);
        }
        for (rel, desc) in &entity.relationships {
            let target = desc.target.as_deref().unwrap_or("?");
            let shape = match (desc.cardinality, desc.ordered) {
                (Cardinality::ToOne, _) => "to-one",
                (Cardinality::ToMany, true) => "to-many, ordered",
                (Cardinality::ToMany, false) => "to-many",
            };
            println!("  {:<20} -> {} ({})", rel, target, shape);
        }
    }

    Ok(())
}

// =============================================================================
// ROUNDTRIP COMMAND
// =============================================================================

/// Apply a document to a fresh object and print it flattened back.
pub fn cmd_roundtrip(
    config: &AppConfig,
    input: &Path,
    entity: &str,
) -> Result<(), SerializationError> {
    tracing::info!("Round-tripping {:?} as {}", input, entity);

    let json = read_document(input)?;
    let (output, report) = roundtrip_document(config, entity, &json)?;
    log_warnings(&report);

    print_json(output)
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Apply a document to a new object and store it in a snapshot.
pub fn cmd_import(
    config: &AppConfig,
    json_mode: bool,
    input: &Path,
    entity: &str,
    snapshot: &Path,
) -> Result<(), SerializationError> {
    tracing::info!("Importing {:?} as {} into {:?}", input, entity, snapshot);

    let json = read_document(input)?;
    let mut graph = load_or_create_graph(snapshot, Arc::new(config.schema.clone()))?;
    let (root, report) = import_document(config, &mut graph, entity, &json)?;
    log_warnings(&report);
    save_graph(&graph, snapshot)?;

    if json_mode {
        let output = serde_json::json!({
            "object": root.0,
            "created": report.created,
            "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "object_count": graph.object_count(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Imported {} as object {}", entity, root);
    println!("Related objects created: {}", report.created);
    println!("Warnings:                {}", report.warnings.len());
    println!("Snapshot now holds {} objects", graph.object_count());

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Flatten an object of a snapshot.
pub fn cmd_export(
    config: &AppConfig,
    snapshot: &Path,
    object: u64,
    output: Option<&Path>,
) -> Result<(), SerializationError> {
    let validated = validate_file_path(snapshot)?;
    let graph = load_or_create_graph(&validated, Arc::new(config.schema.clone()))?;
    let data = export_document(config, &graph, ObjectId(object))?;

    match output {
        Some(path) => {
            let validated_output = validate_output_path(path)?;
            std::fs::write(&validated_output, &data)
                .map_err(|e| SerializationError::Io(format!("Write file: {}", e)))?;
            println!("Exported {} bytes to {:?}", data.len(), validated_output);
            Ok(())
        }
        None => print_json(data),
    }
}
