//! YAML Document Loading
//!
//! Every OpenControl file is a YAML mapping. This module reads one file,
//! checks that it is a mapping with a recognised `schema_version`, and
//! writes a (possibly mutated) mapping back in a single pass.

use std::fs;
use std::path::Path;

use serde_yaml::{Mapping, Value};

use crate::error::{OpenControlError, Result};

/// Schema versions understood for the system manifest
pub const SYSTEM_SCHEMA_VERSIONS: &[&str] = &["1.0.0"];

/// Schema versions understood for component files
pub const COMPONENT_SCHEMA_VERSIONS: &[&str] = &["3.0.0"];

/// Kind of OpenControl file, used for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaType {
    /// Root `opencontrol.yaml` of a project
    System,
    /// `opencontrol.yaml` inside a standards directory
    Standards,
    /// A single control catalog
    Standard,
    /// A control selection
    Certification,
    /// A component definition or one of its included files
    Component,
}

impl SchemaType {
    /// Label shown to users in error messages
    pub fn label(&self) -> &'static str {
        match self {
            SchemaType::System => "system",
            SchemaType::Standards => "standards",
            SchemaType::Standard => "standard",
            SchemaType::Certification => "certification",
            SchemaType::Component => "component",
        }
    }
}

/// Load a YAML file holding a mapping and check its `schema_version`.
///
/// An empty `expected_versions` skips the version check.
pub fn load_document(
    path: &Path,
    schema_type: SchemaType,
    expected_versions: &[&str],
) -> Result<Mapping> {
    let content = fs::read_to_string(path).map_err(|source| OpenControlError::Io {
        schema_type: schema_type.label(),
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), schema = schema_type.label(), "loading document");
    parse_document(&content, path, schema_type, expected_versions)
}

/// Parse document text that was read from `path`.
pub fn parse_document(
    content: &str,
    path: &Path,
    schema_type: SchemaType,
    expected_versions: &[&str],
) -> Result<Mapping> {
    let invalid = |reason: String| OpenControlError::InvalidDocument {
        schema_type: schema_type.label(),
        path: path.to_path_buf(),
        reason,
    };

    let value: Value = serde_yaml::from_str(content)
        .map_err(|e| invalid(format!("is not valid YAML: {}", e)))?;

    let mapping = match value {
        Value::Mapping(m) => m,
        other => {
            return Err(invalid(format!(
                "should be a mapping, is a {}",
                value_kind(&other)
            )))
        }
    };

    if !expected_versions.is_empty() {
        let version = mapping.get("schema_version");
        let recognised = version
            .and_then(scalar_string)
            .map(|v| expected_versions.contains(&v.as_str()))
            .unwrap_or(false);
        if !recognised {
            return Err(OpenControlError::UnsupportedSchema {
                schema_type: schema_type.label(),
                path: path.to_path_buf(),
                version: match version.and_then(scalar_string) {
                    Some(v) => format!("'{}'", v),
                    None => "None".to_string(),
                },
            });
        }
    }

    Ok(mapping)
}

/// Serialize `mapping` completely, then replace the contents of `path`.
///
/// Encoding happens before the file is truncated, so an encoding failure
/// leaves the original file untouched.
pub fn write_document(path: &Path, schema_type: SchemaType, mapping: &Mapping) -> Result<()> {
    let content = serde_yaml::to_string(mapping).map_err(|e| OpenControlError::InvalidDocument {
        schema_type: schema_type.label(),
        path: path.to_path_buf(),
        reason: format!("could not be encoded: {}", e),
    })?;
    fs::write(path, content).map_err(|source| OpenControlError::Io {
        schema_type: schema_type.label(),
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), schema = schema_type.label(), "rewrote document");
    Ok(())
}

// =============================================================================
// Value helpers
// =============================================================================

/// Render a scalar as a string. Numbers and booleans are accepted because
/// YAML happily reads `1.0` or `10` where a key string was intended.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// String value stored under `key`, if it is a scalar
pub fn get_string(mapping: &Mapping, key: &str) -> Option<String> {
    mapping.get(key).and_then(scalar_string)
}

/// Nested mapping stored under `key`
pub fn get_mapping<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    mapping.get(key).and_then(Value::as_mapping)
}

/// Sequence of scalar strings stored under `key`; other entries are skipped
pub fn get_string_list(mapping: &Mapping, key: &str) -> Vec<String> {
    mapping
        .get(key)
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().filter_map(scalar_string).collect())
        .unwrap_or_default()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
