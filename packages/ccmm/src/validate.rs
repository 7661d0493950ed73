//! Two-tier dataset validation.
//!
//! The structural tier checks that required collections are populated.
//! The schema tier renders the dataset, parses the text back and validates
//! it against the `dataset` XSD. Neither tier returns an error: failures
//! come back as data and are logged.

use serde::Serialize;

use crate::config::DEFAULT_SCHEMA_NAME;
use crate::error::Result;
use crate::model::Dataset;
use crate::render::ToXml;
use crate::schema::{SchemaResolver, SchemaViolation};

/// Outcome of the schema tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    Conforms,
    Violations(Vec<SchemaViolation>),
    /// Rendering, parsing or schema loading failed.
    Failed(String),
}

impl SchemaCheck {
    pub fn conforms(&self) -> bool {
        matches!(self, Self::Conforms)
    }
}

/// Number of fields the structural tier checks.
pub const REQUIRED_FIELD_COUNT: usize = 6;

/// Required fields that are blank or empty, in schema order.
pub fn missing_required_fields(dataset: &Dataset) -> Vec<&'static str> {
    let checks: [(&'static str, bool); REQUIRED_FIELD_COUNT] = [
        ("title", dataset.title.trim().is_empty()),
        ("metadata_records", dataset.metadata_records.is_empty()),
        ("identifiers", dataset.identifiers.is_empty()),
        ("qualified_relations", dataset.qualified_relations.is_empty()),
        ("time_references", dataset.time_references.is_empty()),
        ("subjects", dataset.subjects.is_empty()),
    ];
    checks
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect()
}

pub fn check_required_fields(dataset: &Dataset) -> bool {
    let missing = missing_required_fields(dataset);
    if !missing.is_empty() {
        tracing::debug!(?missing, "required fields missing");
    }
    missing.is_empty()
}

/// Validate document text against the named schema.
pub fn check_document(
    xml: &str,
    resolver: &SchemaResolver,
    schema_name: &str,
) -> Result<Vec<SchemaViolation>> {
    let schema = resolver.load(schema_name)?;
    schema.validate_str(xml)
}

pub fn check_schema_conformance(dataset: &Dataset, resolver: &SchemaResolver) -> SchemaCheck {
    let outcome = dataset
        .to_xml()
        .to_xml_string(false)
        .and_then(|xml| check_document(&xml, resolver, DEFAULT_SCHEMA_NAME));

    match outcome {
        Ok(violations) if violations.is_empty() => SchemaCheck::Conforms,
        Ok(violations) => {
            for violation in &violations {
                tracing::warn!(
                    path = %violation.path,
                    line = violation.line,
                    "schema violation: {}",
                    violation.message
                );
            }
            SchemaCheck::Violations(violations)
        }
        Err(e) => {
            tracing::warn!(error = %e, "schema validation could not run");
            SchemaCheck::Failed(e.to_string())
        }
    }
}

/// Combined result of both tiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub missing_fields: Vec<&'static str>,
    pub violations: Vec<SchemaViolation>,
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.missing_fields.is_empty() && self.violations.is_empty() && self.error.is_none()
    }

    /// Human-readable failure reasons, empty when valid.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.missing_fields.is_empty() {
            reasons.push(format!(
                "missing required fields: {}",
                self.missing_fields.join(", ")
            ));
        }
        reasons.extend(self.violations.iter().map(ToString::to_string));
        reasons.extend(self.error.iter().cloned());
        reasons
    }
}

/// Run both tiers; the schema tier only runs when required fields and
/// scalar values pass.
pub fn validate_dataset(dataset: &Dataset, resolver: &SchemaResolver) -> ValidationReport {
    let missing_fields = missing_required_fields(dataset);
    if !missing_fields.is_empty() {
        tracing::debug!(missing = ?missing_fields, "skipping schema check");
        return ValidationReport {
            missing_fields,
            ..ValidationReport::default()
        };
    }
    if let Err(e) = dataset.validate_scalars() {
        tracing::warn!(error = %e, "dataset scalars are invalid");
        return ValidationReport {
            error: Some(e.to_string()),
            ..ValidationReport::default()
        };
    }

    match check_schema_conformance(dataset, resolver) {
        SchemaCheck::Conforms => ValidationReport::default(),
        SchemaCheck::Violations(violations) => ValidationReport {
            violations,
            ..ValidationReport::default()
        },
        SchemaCheck::Failed(error) => ValidationReport {
            error: Some(error),
            ..ValidationReport::default()
        },
    }
}
