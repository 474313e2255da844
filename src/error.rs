//! Error types for the OpenControl loader

use std::path::PathBuf;

use thiserror::Error;

/// Result type for OpenControl operations
pub type Result<T> = std::result::Result<T, OpenControlError>;

/// Errors raised while reading, aggregating or rewriting OpenControl data
#[derive(Error, Debug)]
pub enum OpenControlError {
    #[error("{kind} `{key}` not found")]
    NotFound { kind: &'static str, key: String },

    #[error("OpenControl {schema_type} file {} has invalid data ({reason})", .path.display())]
    InvalidDocument {
        schema_type: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("Don't know how to read OpenControl {schema_type} file {} which has unsupported schema_version {version}", .path.display())]
    UnsupportedSchema {
        schema_type: &'static str,
        path: PathBuf,
        version: String,
    },

    #[error("OpenControl {schema_type} file {} could not be loaded: {source}", .path.display())]
    Io {
        schema_type: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{standard} {control}{} already has a narrative in {}", part_suffix(.part), .path.display())]
    ConflictOnAdd {
        standard: String,
        control: String,
        part: Option<String>,
        path: PathBuf,
    },

    #[error("satisfies include cycle through {}", .path.display())]
    IncludeCycle { path: PathBuf },

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

fn part_suffix(part: &Option<String>) -> String {
    match part {
        Some(p) => format!(" part {}", p),
        None => String::new(),
    }
}

impl OpenControlError {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Whether this error means the requested thing simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_part() {
        let err = OpenControlError::ConflictOnAdd {
            standard: "NIST-800-53".to_string(),
            control: "AC-2".to_string(),
            part: Some("a".to_string()),
            path: PathBuf::from("component.yaml"),
        };
        assert_eq!(
            err.to_string(),
            "NIST-800-53 AC-2 part a already has a narrative in component.yaml"
        );
    }

    #[test]
    fn test_unsupported_schema_message() {
        let err = OpenControlError::UnsupportedSchema {
            schema_type: "component",
            path: PathBuf::from("x/component.yaml"),
            version: "'2.0.0'".to_string(),
        };
        assert!(err.to_string().contains("unsupported schema_version '2.0.0'"));
        assert!(!err.is_not_found());
    }
}
