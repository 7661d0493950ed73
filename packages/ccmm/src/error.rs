//! Error types for CCMM metadata handling.
//!
//! `CcmmError` covers everything a caller can see: rejected input,
//! unresolvable schemas, XML failures and refused saves. Schema
//! conformance problems are not errors; they are reported as
//! [`SchemaViolation`](crate::schema::SchemaViolation) lists.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum CcmmError {
    /// Input rejected before any state was changed.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Schema file missing or unreadable.
    #[error("Cannot load schema {}: {source}", .path.display())]
    SchemaResolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema file is readable but uses constructs that cannot be compiled.
    #[error("Schema {} is malformed: {message}", .path.display())]
    SchemaParse { path: PathBuf, message: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// XML serialization failed.
    #[error("XML serialization failed: {0}")]
    XmlWrite(String),

    /// `save_to_file` refused to write an invalid dataset.
    #[error("Dataset is not valid, refusing to write {}: {}", .path.display(), .reasons.join("; "))]
    SaveRefused { path: PathBuf, reasons: Vec<String> },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CcmmError {
    /// Build a validation error for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CcmmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = CcmmError::validation("title", "cannot be empty");
        assert_eq!(err.to_string(), "Invalid title: cannot be empty");
    }

    #[test]
    fn test_save_refused_lists_reasons() {
        let err = CcmmError::SaveRefused {
            path: PathBuf::from("out.xml"),
            reasons: vec!["missing subject".to_string(), "schema".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Dataset is not valid, refusing to write out.xml: missing subject; schema"
        );
    }

    #[test]
    fn test_schema_resolution_names_path() {
        let err = CcmmError::SchemaResolution {
            path: PathBuf::from("/nowhere/dataset/schema.xsd"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/nowhere/dataset/schema.xsd"));
    }
}
