//! CCMM Metadata - Build and validate CCMM dataset metadata documents.
//!
//! This crate models dataset metadata as typed records, renders them into
//! an XML document whose element order follows the CCMM schema, and checks
//! the result against the bundled XSD.
//!
//! # Example
//!
//! ```
//! use ccmm_metadata::config;
//!
//! // Validate inputs the same way the handler does
//! assert!(config::validate_uri("https://example.com/data", "iri").is_ok());
//! assert!(config::validate_year(999).is_err());
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants and input validation
//! - [`vocab`]: Closed vocabularies (languages, roles, schemes, formats)
//! - [`model`]: Value entities and the [`Dataset`] aggregate
//! - [`document`]: XML node tree, serialization and canonical reordering
//! - [`render`]: Rendering of the typed model into document trees
//! - [`draft`]: Append-only dataset assembly with deferred reordering
//! - [`schema`]: Schema lookup and XSD conformance checking
//! - [`validate`]: Two-tier dataset validation
//! - [`handler`]: Mutation facade used by callers
//! - [`output`]: Atomic file output
//! - [`cli`]: Command-line interface
//! - [`error`]: Error types and Result alias

pub mod cli;
pub mod config;
pub mod document;
pub mod draft;
pub mod error;
pub mod handler;
pub mod model;
pub mod output;
pub mod render;
pub mod schema;
pub mod validate;
pub mod vocab;

// Re-export commonly used items
pub use config::{validate_email, validate_uri, validate_year};
pub use document::XmlNode;
pub use draft::DatasetDraft;
pub use error::{CcmmError, Result};
pub use handler::{CcmmHandler, DatasetSummary, HandlerState};
pub use model::{
    Agent, AlternateTitle, Dataset, Description, Distribution, Identifier, Location,
    MetadataRecord, MultiLanguageText, ResourceToAgentRelationship, Subject, TermsOfUse,
    TimeReference, Validate,
};
pub use render::ToXml;
pub use schema::{SchemaResolver, SchemaViolation, XsdSchema};
pub use validate::{validate_dataset, ValidationReport};
pub use vocab::{
    AgentRole, AgentType, DistributionFormat, IdentifierScheme, Language, LocationType,
    ResourceType, SubjectScheme, TimeReferenceType,
};
