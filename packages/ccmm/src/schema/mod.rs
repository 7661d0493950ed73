//! Schema lookup and XSD conformance checking.
//!
//! [`SchemaResolver`] maps a schema name to `<root>/<name>/schema.xsd`;
//! [`XsdSchema`] compiles that file and validates documents against it.

mod instance;
mod simple;
mod xsd;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use xsd::XsdSchema;

use crate::config::{BUNDLED_SCHEMA_DIR, SCHEMA_FILE_NAME};
use crate::error::{CcmmError, Result};

/// One conformance problem in an instance document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Element path such as `/dataset/qualified_relation[2]/relation`.
    pub path: String,
    /// 1-based line of the offending element.
    pub line: u32,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}): {}", self.path, self.line, self.message)
    }
}

/// Locates schema files under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaResolver {
    root: PathBuf,
}

impl SchemaResolver {
    /// Resolver over the schemas shipped with this crate.
    pub fn bundled() -> Self {
        Self::with_root(Path::new(env!("CARGO_MANIFEST_DIR")).join(BUNDLED_SCHEMA_DIR))
    }

    /// Resolver over a custom schema directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the named schema. The file is not required to exist.
    ///
    /// # Examples
    /// ```
    /// use ccmm_metadata::schema::SchemaResolver;
    ///
    /// let resolver = SchemaResolver::with_root("/schemas");
    /// assert_eq!(
    ///     resolver.resolve("dataset"),
    ///     std::path::PathBuf::from("/schemas/dataset/schema.xsd")
    /// );
    /// ```
    pub fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name).join(SCHEMA_FILE_NAME)
    }

    /// Load and compile the named schema.
    pub fn load(&self, name: &str) -> Result<XsdSchema> {
        let path = self.resolve(name);
        if !path.is_file() {
            return Err(CcmmError::SchemaResolution {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no schema named '{name}' under {}", self.root.display()),
                ),
                path,
            });
        }
        XsdSchema::from_file(&path)
    }
}

impl Default for SchemaResolver {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_name_and_file() {
        let resolver = SchemaResolver::with_root("/tmp/schemas");
        assert_eq!(
            resolver.resolve("identifier"),
            PathBuf::from("/tmp/schemas/identifier/schema.xsd")
        );
    }

    #[test]
    fn test_bundled_dataset_schema_exists() {
        let resolver = SchemaResolver::bundled();
        assert!(resolver.resolve("dataset").is_file());
    }

    #[test]
    fn test_missing_schema_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchemaResolver::with_root(dir.path()).load("dataset").unwrap_err();
        assert!(matches!(err, CcmmError::SchemaResolution { .. }));
        assert!(err.to_string().contains("schema.xsd"));
    }

    #[test]
    fn test_violation_display() {
        let violation = SchemaViolation {
            path: "/dataset/subject".to_string(),
            line: 4,
            message: "missing".to_string(),
        };
        assert_eq!(violation.to_string(), "/dataset/subject (line 4): missing");
    }
}
