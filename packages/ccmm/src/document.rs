//! In-memory document tree and its XML serialization.
//!
//! Renderers build [`XmlNode`] trees; this module turns them into text
//! with `quick-xml` and loads raw trees back with `roxmltree`.

use std::collections::{BTreeMap, HashMap};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use roxmltree::{Document, Node};

use crate::config::{CANONICAL_ORDER, XML_DECLARATION, XML_LANG, XML_NAMESPACE};
use crate::error::{CcmmError, Result};
use crate::vocab::Language;

/// A named element with ordered attributes, optional text and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

/// One entry of [`XmlNode::describe_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// A leaf child: its text, if any.
    Text(Option<String>),
    /// A child with element children: sub-tag to text.
    Fields(BTreeMap<String, Option<String>>),
}

impl XmlNode {
    /// Create an empty element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Create an element holding `text`.
    #[must_use]
    pub fn text_node(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    /// Create an element holding `text` tagged with `xml:lang`.
    #[must_use]
    pub fn lang_node(name: impl Into<String>, text: impl Into<String>, language: Language) -> Self {
        Self::text_node(name, text).with_lang(language)
    }

    /// Create `<name><iri>value</iri></name>`, the schema's IRI reference shape.
    #[must_use]
    pub fn iri_ref(name: impl Into<String>, iri: impl Into<String>) -> Self {
        Self::new(name).with_child(Self::text_node("iri", iri))
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Tag the element with `xml:lang`.
    #[must_use]
    pub fn with_lang(self, language: Language) -> Self {
        self.with_attribute(XML_LANG, language.as_str())
    }

    #[must_use]
    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    /// Append `<name>text</name>` when `text` is present and not blank.
    pub fn push_optional_text(&mut self, name: &str, text: Option<&str>) {
        if let Some(text) = text.filter(|text| !text.trim().is_empty()) {
            self.push(Self::text_node(name, text));
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given tag.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// All children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Tags of the direct children, in document order.
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|child| child.name.as_str()).collect()
    }

    /// Serialize without an XML declaration.
    ///
    /// `pretty` indents with two spaces and puts every element on its own
    /// line; text stays inline with its element.
    pub fn to_xml_string(&self, pretty: bool) -> Result<String> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };
        self.write_to(&mut writer)?;

        let mut text = String::from_utf8(writer.into_inner())
            .map_err(|e| CcmmError::XmlWrite(e.to_string()))?;
        if pretty {
            text.push('\n');
        }
        Ok(text)
    }

    /// Serialize as a complete document with the standard XML declaration.
    pub fn to_document_string(&self, pretty: bool) -> Result<String> {
        let body = self.to_xml_string(pretty)?;
        let separator = if pretty { "\n" } else { "" };
        Ok(format!("{XML_DECLARATION}{separator}{body}"))
    }

    fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        if let Some(text) = &self.text {
            write_event(writer, Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }

    /// Load a raw tree from XML text.
    ///
    /// Whitespace-only text is dropped, other text is kept exactly as
    /// written. Text split by comments is joined. Attributes in the `xml`
    /// namespace keep their `xml:` prefix.
    ///
    /// # Examples
    /// ```
    /// use ccmm_metadata::document::XmlNode;
    ///
    /// let node = XmlNode::parse(r#"<dataset><title xml:lang="en"> A </title></dataset>"#).unwrap();
    /// let title = node.child("title").unwrap();
    /// assert_eq!(title.text.as_deref(), Some(" A "));
    /// assert_eq!(title.attribute("xml:lang"), Some("en"));
    /// ```
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        Ok(Self::from_roxmltree(doc.root_element()))
    }

    /// Convert a `roxmltree` element (and its subtree).
    pub fn from_roxmltree(node: Node<'_, '_>) -> Self {
        let mut result = Self::new(node.tag_name().name());

        for attr in node.attributes() {
            let name = if attr.namespace() == Some(XML_NAMESPACE) {
                format!("xml:{}", attr.name())
            } else {
                attr.name().to_string()
            };
            result.attributes.push((name, attr.value().to_string()));
        }

        let text: String = node
            .children()
            .filter(|child| child.is_text())
            .filter_map(|child| child.text())
            .collect();
        if !text.trim().is_empty() {
            result.text = Some(text);
        }

        result.children = node
            .children()
            .filter(|child| child.is_element())
            .map(Self::from_roxmltree)
            .collect();
        result
    }

    /// Regroup children into the canonical top-level order.
    ///
    /// Children are bucketed by tag, each bucket keeps its insertion order,
    /// and buckets are emitted in [`CANONICAL_ORDER`]. Tags outside the
    /// canonical list are dropped.
    pub fn reorder_canonical(&mut self) {
        let mut buckets: HashMap<String, Vec<XmlNode>> = HashMap::new();
        for child in self.children.drain(..) {
            buckets.entry(child.name.clone()).or_default().push(child);
        }

        for tag in CANONICAL_ORDER {
            if let Some(bucket) = buckets.remove(tag) {
                self.children.extend(bucket);
            }
        }

        if !buckets.is_empty() {
            let mut dropped: Vec<&String> = buckets.keys().collect();
            dropped.sort();
            tracing::debug!(?dropped, "dropping non-canonical elements");
        }
    }

    /// Describe the direct children as tag to list of values.
    ///
    /// Leaf children contribute their text; children with element
    /// children contribute a map of sub-tag to sub-text (later duplicates
    /// of a sub-tag win).
    pub fn describe_fields(&self) -> BTreeMap<String, Vec<FieldValue>> {
        let mut fields: BTreeMap<String, Vec<FieldValue>> = BTreeMap::new();
        for child in &self.children {
            let value = if child.children.is_empty() {
                FieldValue::Text(child.text.clone())
            } else {
                FieldValue::Fields(
                    child
                        .children
                        .iter()
                        .map(|grandchild| (grandchild.name.clone(), grandchild.text.clone()))
                        .collect(),
                )
            };
            fields.entry(child.name.clone()).or_default().push(value);
        }
        fields
    }
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| CcmmError::XmlWrite(e.to_string()))
}
