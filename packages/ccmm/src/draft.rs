//! Append-only dataset assembly with a deferred reorder pass.
//!
//! A [`DatasetDraft`] collects fragments under a flat `dataset` root in
//! whatever order the caller supplies them. Output paths reorder the tree
//! into canonical order first. Drafts can also be loaded from raw XML,
//! which is kept as an untyped tree.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{
    validate_non_empty, validate_uri, validate_year, DEFAULT_SCHEMA_NAME, ROOT_ELEMENT,
};
use crate::document::{FieldValue, XmlNode};
use crate::error::{CcmmError, Result};
use crate::model::Validate;
use crate::output::write_atomic;
use crate::render::ToXml;
use crate::schema::SchemaResolver;
use crate::vocab::Language;

/// Top-level tags a draft must contain before it is worth validating.
const REQUIRED_TAGS: [&str; 3] = ["title", "publication_year", "identifier"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDraft {
    root: XmlNode,
}

impl Default for DatasetDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetDraft {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: XmlNode::new(ROOT_ELEMENT),
        }
    }

    /// Load a raw tree; the root must be `dataset`.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let root = XmlNode::parse(xml)?;
        if root.name != ROOT_ELEMENT {
            return Err(CcmmError::validation(
                "root element",
                format!("expected '{ROOT_ELEMENT}', found '{}'", root.name),
            ));
        }
        Ok(Self { root })
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_xml_str(&xml)
    }

    /// The tree as assembled, not reordered.
    pub fn root(&self) -> &XmlNode {
        &self.root
    }

    /// Replace the first child with the same tag, or append `node`.
    fn set_scalar(&mut self, node: XmlNode) {
        match self.root.child_mut(&node.name) {
            Some(existing) => *existing = node,
            None => self.root.push(node),
        }
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        validate_non_empty(title, "title")?;
        self.set_scalar(XmlNode::text_node("title", title));
        Ok(())
    }

    pub fn set_publication_year(&mut self, year: i32) -> Result<()> {
        validate_year(year)?;
        self.set_scalar(XmlNode::text_node("publication_year", year.to_string()));
        Ok(())
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        validate_non_empty(version, "version")?;
        self.set_scalar(XmlNode::text_node("version", version));
        Ok(())
    }

    pub fn set_iri(&mut self, iri: &str) -> Result<()> {
        validate_uri(iri, "dataset iri")?;
        self.set_scalar(XmlNode::text_node("iri", iri));
        Ok(())
    }

    pub fn set_primary_language(&mut self, language: Language) {
        self.set_scalar(XmlNode::iri_ref("primary_language", language.as_str()));
    }

    pub fn add_other_language(&mut self, language: Language) {
        self.root
            .push(XmlNode::iri_ref("other_language", language.as_str()));
    }

    /// Validate an entity and append its fragment at the end.
    pub fn append<T: ToXml + Validate>(&mut self, entity: &T) -> Result<()> {
        entity.validate()?;
        let node = entity.to_xml();
        tracing::debug!(tag = %node.name, "appending fragment");
        self.root.push(node);
        Ok(())
    }

    /// Presence of the draft's required tags.
    pub fn required_fields(&self) -> BTreeMap<&'static str, bool> {
        REQUIRED_TAGS
            .into_iter()
            .map(|tag| (tag, self.root.child(tag).is_some()))
            .collect()
    }

    pub fn has_required_fields(&self) -> bool {
        self.required_fields().values().all(|present| *present)
    }

    /// Regroup the tree into canonical order in place.
    pub fn reorder(&mut self) {
        self.root.reorder_canonical();
    }

    /// A canonically ordered copy of the tree.
    pub fn ordered(&self) -> XmlNode {
        let mut root = self.root.clone();
        root.reorder_canonical();
        root
    }

    pub fn to_xml_string(&self, pretty: bool) -> Result<String> {
        self.ordered().to_xml_string(pretty)
    }

    /// Reorder, then write a pretty document with declaration.
    pub fn save_to_file(&mut self, path: &Path) -> Result<()> {
        self.reorder();
        let content = self.root.to_document_string(true)?;
        write_atomic(path, &content)?;
        tracing::info!(path = %path.display(), "saved draft");
        Ok(())
    }

    /// Required tags present and the ordered tree conforms to the schema.
    pub fn is_valid(&self, resolver: &SchemaResolver) -> bool {
        if !self.has_required_fields() {
            return false;
        }
        let outcome = self
            .to_xml_string(false)
            .and_then(|xml| crate::validate::check_document(&xml, resolver, DEFAULT_SCHEMA_NAME));
        match outcome {
            Ok(violations) => {
                for violation in &violations {
                    tracing::warn!(path = %violation.path, "schema violation: {}", violation.message);
                }
                violations.is_empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "draft validation could not run");
                false
            }
        }
    }

    /// Text of the first top-level child named `tag`.
    pub fn field_value(&self, tag: &str) -> Option<&str> {
        self.root.child(tag).and_then(|node| node.text.as_deref())
    }

    /// Describe every top-level field.
    pub fn all_fields(&self) -> BTreeMap<String, Vec<FieldValue>> {
        self.root.describe_fields()
    }
}
