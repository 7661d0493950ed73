//! Compiles an XSD file (and its includes) into an in-memory schema.
//!
//! Only the constructs the CCMM schemas use are supported. Names are
//! compared by local part; the schemas carry no target namespace.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use roxmltree::{Document, Node};

use crate::error::{CcmmError, Result};

pub(crate) const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Upper bound of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

/// Reference to a type: a built-in, a named global, or an anonymous one.
#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    Builtin(String),
    Named(String),
    Simple(Box<SimpleType>),
    Complex(Box<ComplexType>),
}

impl TypeRef {
    /// The `xs:anyType` default of untyped elements.
    pub(crate) fn any_type() -> Self {
        Self::Builtin("anyType".to_string())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ElementDecl {
    pub name: String,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone)]
pub(crate) enum Term {
    Element(ElementDecl),
    ElementRef(String),
    GroupRef(String),
    Sequence(Vec<Particle>),
    Choice(Vec<Particle>),
    All(Vec<Particle>),
    Any,
}

#[derive(Debug, Clone)]
pub(crate) struct Particle {
    pub term: Term,
    pub min: u32,
    pub max: MaxOccurs,
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeUse {
    pub name: String,
    /// `None` refers to the global attribute of the same name.
    pub type_ref: Option<TypeRef>,
    pub required: bool,
    pub prohibited: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Derivation {
    Extension,
    Restriction,
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Empty,
    Elements(Particle),
    /// `complexContent` derived from a named complex type.
    Derived {
        base: String,
        derivation: Derivation,
        particle: Option<Particle>,
    },
    /// `simpleContent` derived from a simple or complex type.
    SimpleDerived {
        base: TypeRef,
        facets: Facets,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ComplexType {
    pub content: Content,
    pub attributes: Vec<AttributeUse>,
    pub attribute_groups: Vec<String>,
    pub any_attribute: bool,
    pub mixed: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Facets {
    pub enumeration: Vec<String>,
    pub patterns: Vec<Regex>,
    pub length: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_inclusive: Option<f64>,
    pub max_inclusive: Option<f64>,
    pub min_exclusive: Option<f64>,
    pub max_exclusive: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) enum SimpleType {
    Restriction { base: TypeRef, facets: Facets },
    List { item: TypeRef },
    Union { members: Vec<TypeRef> },
}

/// A compiled XML Schema.
#[derive(Debug, Default)]
pub struct XsdSchema {
    pub(crate) path: PathBuf,
    pub(crate) elements: HashMap<String, ElementDecl>,
    pub(crate) complex_types: HashMap<String, ComplexType>,
    pub(crate) simple_types: HashMap<String, SimpleType>,
    pub(crate) groups: HashMap<String, Particle>,
    pub(crate) attribute_groups: HashMap<String, (Vec<AttributeUse>, Vec<String>)>,
    pub(crate) attributes: HashMap<String, AttributeUse>,
}

impl XsdSchema {
    /// Load and compile a schema file, following `include`s.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut schema = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };
        let mut visited = HashSet::new();
        schema.load_file(path, &mut visited)?;
        tracing::debug!(
            path = %path.display(),
            elements = schema.elements.len(),
            complex_types = schema.complex_types.len(),
            simple_types = schema.simple_types.len(),
            "compiled schema"
        );
        Ok(schema)
    }

    /// Compile schema text; relative includes resolve against `base_dir`.
    pub fn from_str_in(xsd: &str, base_dir: &Path) -> Result<Self> {
        let path = base_dir.join("<inline>");
        let mut schema = Self {
            path: path.clone(),
            ..Self::default()
        };
        let mut visited = HashSet::new();
        schema.load_text(xsd, &path, &mut visited)?;
        Ok(schema)
    }

    /// Names of the global elements, sorted.
    pub fn root_elements(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Path of the main schema file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&mut self, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !visited.insert(key) {
            return Ok(());
        }
        let text = std::fs::read_to_string(path).map_err(|source| CcmmError::SchemaResolution {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_text(&text, path, visited)
    }

    fn load_text(&mut self, text: &str, path: &Path, visited: &mut HashSet<PathBuf>) -> Result<()> {
        let doc = Document::parse(text).map_err(|e| parse_error(path, e.to_string()))?;
        let root = doc.root_element();
        if !is_xsd(root, "schema") {
            return Err(parse_error(path, "root element is not xs:schema"));
        }

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let compiler = Compiler { path };

        for child in root.children().filter(Node::is_element) {
            if child.tag_name().namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            match child.tag_name().name() {
                "include" | "import" | "redefine" => {
                    let namespace = child.attribute("namespace");
                    if namespace == Some(crate::config::XML_NAMESPACE) {
                        continue;
                    }
                    if let Some(location) = child.attribute("schemaLocation") {
                        self.load_file(&base_dir.join(location), visited)?;
                    }
                }
                "element" => {
                    let decl = compiler.element_decl(child)?;
                    self.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let name = compiler.required_name(child)?;
                    let ct = compiler.complex_type(child)?;
                    self.complex_types.insert(name, ct);
                }
                "simpleType" => {
                    let name = compiler.required_name(child)?;
                    let st = compiler.simple_type(child)?;
                    self.simple_types.insert(name, st);
                }
                "group" => {
                    let name = compiler.required_name(child)?;
                    let particle = compiler
                        .group_body(child)?
                        .ok_or_else(|| parse_error(path, format!("group '{name}' is empty")))?;
                    self.groups.insert(name, particle);
                }
                "attributeGroup" => {
                    let name = compiler.required_name(child)?;
                    let body = compiler.attribute_container(child)?;
                    self.attribute_groups.insert(name, (body.uses, body.groups));
                }
                "attribute" => {
                    let attr = compiler.attribute_use(child)?;
                    self.attributes.insert(attr.name.clone(), attr);
                }
                "annotation" | "notation" => {}
                other => {
                    tracing::debug!(construct = other, "ignoring unsupported top-level construct");
                }
            }
        }
        Ok(())
    }
}

fn parse_error(path: &Path, message: impl Into<String>) -> CcmmError {
    CcmmError::SchemaParse {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn is_xsd(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NAMESPACE)
        && node.tag_name().name() == name
}

fn xsd_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|child| child.is_element() && child.tag_name().namespace() == Some(XSD_NAMESPACE))
}

fn local_part(qname: &str) -> &str {
    qname.rsplit_once(':').map_or(qname, |(_, local)| local)
}

struct AttributeContainer {
    uses: Vec<AttributeUse>,
    groups: Vec<String>,
    any_attribute: bool,
}

/// Per-file compilation context.
struct Compiler<'p> {
    path: &'p Path,
}

impl Compiler<'_> {
    fn error(&self, node: Node<'_, '_>, message: impl std::fmt::Display) -> CcmmError {
        let pos = node.document().text_pos_at(node.range().start);
        parse_error(self.path, format!("line {}: {message}", pos.row))
    }

    fn required_name(&self, node: Node<'_, '_>) -> Result<String> {
        node.attribute("name")
            .map(str::to_string)
            .ok_or_else(|| self.error(node, format!("{} without a name", node.tag_name().name())))
    }

    /// Resolve a QName-valued attribute into a type reference.
    fn type_ref(&self, node: Node<'_, '_>, qname: &str) -> TypeRef {
        let prefix = qname.split_once(':').map(|(prefix, _)| prefix);
        let local = local_part(qname).to_string();
        if node.lookup_namespace_uri(prefix) == Some(XSD_NAMESPACE) {
            TypeRef::Builtin(local)
        } else {
            TypeRef::Named(local)
        }
    }

    fn occurs(&self, node: Node<'_, '_>) -> Result<(u32, MaxOccurs)> {
        let min = match node.attribute("minOccurs") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| self.error(node, format!("invalid minOccurs '{value}'")))?,
            None => 1,
        };
        let max = match node.attribute("maxOccurs").map(str::trim) {
            Some("unbounded") => MaxOccurs::Unbounded,
            Some(value) => MaxOccurs::Bounded(
                value
                    .parse()
                    .map_err(|_| self.error(node, format!("invalid maxOccurs '{value}'")))?,
            ),
            None => MaxOccurs::Bounded(1),
        };
        if let MaxOccurs::Bounded(max) = max {
            if max < min {
                return Err(self.error(node, "maxOccurs is smaller than minOccurs"));
            }
        }
        Ok((min, max))
    }

    fn element_decl(&self, node: Node<'_, '_>) -> Result<ElementDecl> {
        let name = self.required_name(node)?;
        let type_ref = if let Some(type_name) = node.attribute("type") {
            self.type_ref(node, type_name)
        } else if let Some(inline) = xsd_children(node).find(|c| is_xsd(*c, "complexType")) {
            TypeRef::Complex(Box::new(self.complex_type(inline)?))
        } else if let Some(inline) = xsd_children(node).find(|c| is_xsd(*c, "simpleType")) {
            TypeRef::Simple(Box::new(self.simple_type(inline)?))
        } else {
            TypeRef::any_type()
        };
        Ok(ElementDecl { name, type_ref })
    }

    /// Compile a particle-bearing node (`element`, `sequence`, ...).
    fn particle(&self, node: Node<'_, '_>) -> Result<Option<Particle>> {
        let (min, max) = self.occurs(node)?;
        let term = match node.tag_name().name() {
            "element" => match node.attribute("ref") {
                Some(reference) => Term::ElementRef(local_part(reference).to_string()),
                None => Term::Element(self.element_decl(node)?),
            },
            "group" => {
                let reference = node
                    .attribute("ref")
                    .ok_or_else(|| self.error(node, "local group without ref"))?;
                Term::GroupRef(local_part(reference).to_string())
            }
            "sequence" => Term::Sequence(self.particles(node)?),
            "choice" => Term::Choice(self.particles(node)?),
            "all" => Term::All(self.particles(node)?),
            "any" => Term::Any,
            "annotation" => return Ok(None),
            other => return Err(self.error(node, format!("unsupported particle '{other}'"))),
        };
        Ok(Some(Particle { term, min, max }))
    }

    fn particles(&self, node: Node<'_, '_>) -> Result<Vec<Particle>> {
        let mut result = Vec::new();
        for child in xsd_children(node) {
            if let Some(particle) = self.particle(child)? {
                result.push(particle);
            }
        }
        Ok(result)
    }

    /// Body of a named `group`: its single model group.
    fn group_body(&self, node: Node<'_, '_>) -> Result<Option<Particle>> {
        for child in xsd_children(node) {
            if matches!(child.tag_name().name(), "sequence" | "choice" | "all") {
                return self.particle(child);
            }
        }
        Ok(None)
    }

    /// The first model group or group ref among `node`'s children.
    fn content_particle(&self, node: Node<'_, '_>) -> Result<Option<Particle>> {
        for child in xsd_children(node) {
            if matches!(
                child.tag_name().name(),
                "sequence" | "choice" | "all" | "group"
            ) {
                return self.particle(child);
            }
        }
        Ok(None)
    }

    fn attribute_use(&self, node: Node<'_, '_>) -> Result<AttributeUse> {
        let required = node.attribute("use") == Some("required");
        let prohibited = node.attribute("use") == Some("prohibited");

        if let Some(reference) = node.attribute("ref") {
            let (prefix, local) = match reference.split_once(':') {
                Some((prefix, local)) => (Some(prefix), local),
                None => (None, reference),
            };
            let name = if node.lookup_namespace_uri(prefix) == Some(crate::config::XML_NAMESPACE)
                || prefix == Some("xml")
            {
                format!("xml:{local}")
            } else {
                local.to_string()
            };
            let type_ref = (name == crate::config::XML_LANG)
                .then(|| TypeRef::Builtin("language".to_string()));
            return Ok(AttributeUse {
                name,
                type_ref,
                required,
                prohibited,
            });
        }

        let name = self.required_name(node)?;
        let type_ref = if let Some(type_name) = node.attribute("type") {
            self.type_ref(node, type_name)
        } else if let Some(inline) = xsd_children(node).find(|c| is_xsd(*c, "simpleType")) {
            TypeRef::Simple(Box::new(self.simple_type(inline)?))
        } else {
            TypeRef::Builtin("anySimpleType".to_string())
        };
        Ok(AttributeUse {
            name,
            type_ref: Some(type_ref),
            required,
            prohibited,
        })
    }

    fn attribute_container(&self, node: Node<'_, '_>) -> Result<AttributeContainer> {
        let mut container = AttributeContainer {
            uses: Vec::new(),
            groups: Vec::new(),
            any_attribute: false,
        };
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "attribute" => container.uses.push(self.attribute_use(child)?),
                "attributeGroup" => {
                    if let Some(reference) = child.attribute("ref") {
                        container.groups.push(local_part(reference).to_string());
                    }
                }
                "anyAttribute" => container.any_attribute = true,
                _ => {}
            }
        }
        Ok(container)
    }

    fn complex_type(&self, node: Node<'_, '_>) -> Result<ComplexType> {
        let mixed = node.attribute("mixed") == Some("true");

        if let Some(simple) = xsd_children(node).find(|c| is_xsd(*c, "simpleContent")) {
            let derivation = xsd_children(simple)
                .find(|c| is_xsd(*c, "extension") || is_xsd(*c, "restriction"))
                .ok_or_else(|| self.error(simple, "simpleContent without derivation"))?;
            let base = derivation
                .attribute("base")
                .ok_or_else(|| self.error(derivation, "derivation without base"))?;
            let facets = if derivation.tag_name().name() == "restriction" {
                self.facets(derivation)?
            } else {
                Facets::default()
            };
            let attrs = self.attribute_container(derivation)?;
            return Ok(ComplexType {
                content: Content::SimpleDerived {
                    base: self.type_ref(derivation, base),
                    facets,
                },
                attributes: attrs.uses,
                attribute_groups: attrs.groups,
                any_attribute: attrs.any_attribute,
                mixed: false,
            });
        }

        if let Some(complex) = xsd_children(node).find(|c| is_xsd(*c, "complexContent")) {
            let mixed = mixed || complex.attribute("mixed") == Some("true");
            let derivation_node = xsd_children(complex)
                .find(|c| is_xsd(*c, "extension") || is_xsd(*c, "restriction"))
                .ok_or_else(|| self.error(complex, "complexContent without derivation"))?;
            let base = derivation_node
                .attribute("base")
                .ok_or_else(|| self.error(derivation_node, "derivation without base"))?;
            let derivation = if derivation_node.tag_name().name() == "extension" {
                Derivation::Extension
            } else {
                Derivation::Restriction
            };
            let particle = self.content_particle(derivation_node)?;
            let attrs = self.attribute_container(derivation_node)?;
            let content = match self.type_ref(derivation_node, base) {
                TypeRef::Named(base) => Content::Derived {
                    base,
                    derivation,
                    particle,
                },
                // Deriving from xs:anyType restates the content model.
                _ => particle.map_or(Content::Empty, Content::Elements),
            };
            return Ok(ComplexType {
                content,
                attributes: attrs.uses,
                attribute_groups: attrs.groups,
                any_attribute: attrs.any_attribute,
                mixed,
            });
        }

        let content = self
            .content_particle(node)?
            .map_or(Content::Empty, Content::Elements);
        let attrs = self.attribute_container(node)?;
        Ok(ComplexType {
            content,
            attributes: attrs.uses,
            attribute_groups: attrs.groups,
            any_attribute: attrs.any_attribute,
            mixed,
        })
    }

    fn simple_type(&self, node: Node<'_, '_>) -> Result<SimpleType> {
        for child in xsd_children(node) {
            match child.tag_name().name() {
                "restriction" => {
                    let base = match child.attribute("base") {
                        Some(base) => self.type_ref(child, base),
                        None => match xsd_children(child).find(|c| is_xsd(*c, "simpleType")) {
                            Some(inline) => TypeRef::Simple(Box::new(self.simple_type(inline)?)),
                            None => return Err(self.error(child, "restriction without base")),
                        },
                    };
                    return Ok(SimpleType::Restriction {
                        base,
                        facets: self.facets(child)?,
                    });
                }
                "list" => {
                    let item = match child.attribute("itemType") {
                        Some(item) => self.type_ref(child, item),
                        None => match xsd_children(child).find(|c| is_xsd(*c, "simpleType")) {
                            Some(inline) => TypeRef::Simple(Box::new(self.simple_type(inline)?)),
                            None => return Err(self.error(child, "list without item type")),
                        },
                    };
                    return Ok(SimpleType::List { item });
                }
                "union" => {
                    let mut members: Vec<TypeRef> = child
                        .attribute("memberTypes")
                        .unwrap_or_default()
                        .split_whitespace()
                        .map(|member| self.type_ref(child, member))
                        .collect();
                    for inline in xsd_children(child).filter(|c| is_xsd(*c, "simpleType")) {
                        members.push(TypeRef::Simple(Box::new(self.simple_type(inline)?)));
                    }
                    return Ok(SimpleType::Union { members });
                }
                _ => {}
            }
        }
        Err(self.error(node, "simpleType without restriction, list or union"))
    }

    fn facets(&self, node: Node<'_, '_>) -> Result<Facets> {
        let mut facets = Facets::default();
        for child in xsd_children(node) {
            let Some(value) = child.attribute("value") else {
                continue;
            };
            let name = child.tag_name().name();
            match name {
                "enumeration" => facets.enumeration.push(value.to_string()),
                "pattern" => {
                    let regex = Regex::new(&format!("^(?:{value})$"))
                        .map_err(|e| self.error(child, format!("invalid pattern '{value}': {e}")))?;
                    facets.patterns.push(regex);
                }
                "length" => facets.length = Some(self.count(child, value)?),
                "minLength" => facets.min_length = Some(self.count(child, value)?),
                "maxLength" => facets.max_length = Some(self.count(child, value)?),
                "minInclusive" => facets.min_inclusive = Some(self.bound(child, value)?),
                "maxInclusive" => facets.max_inclusive = Some(self.bound(child, value)?),
                "minExclusive" => facets.min_exclusive = Some(self.bound(child, value)?),
                "maxExclusive" => facets.max_exclusive = Some(self.bound(child, value)?),
                // whiteSpace, totalDigits and fractionDigits are not enforced
                _ => {}
            }
        }
        Ok(facets)
    }

    fn count(&self, node: Node<'_, '_>, value: &str) -> Result<usize> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(node, format!("invalid length '{value}'")))
    }

    fn bound(&self, node: Node<'_, '_>, value: &str) -> Result<f64> {
        value
            .trim()
            .parse()
            .map_err(|_| self.error(node, format!("invalid numeric bound '{value}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
        <xs:element name="root" type="root_type"/>
        <xs:complexType name="root_type">
            <xs:sequence>
                <xs:element name="a" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
                <xs:element ref="b"/>
            </xs:sequence>
            <xs:attribute name="id" type="xs:integer" use="required"/>
        </xs:complexType>
        <xs:element name="b" type="code"/>
        <xs:simpleType name="code">
            <xs:restriction base="xs:string">
                <xs:pattern value="[A-Z]{2}"/>
            </xs:restriction>
        </xs:simpleType>
    </xs:schema>"#;

    #[test]
    fn test_compiles_globals() {
        let schema = XsdSchema::from_str_in(MINIMAL, Path::new(".")).unwrap();
        assert_eq!(schema.root_elements(), vec!["b", "root"]);
        assert!(schema.complex_types.contains_key("root_type"));
        assert!(schema.simple_types.contains_key("code"));
    }

    #[test]
    fn test_builtin_types_resolved_by_namespace() {
        let schema = XsdSchema::from_str_in(MINIMAL, Path::new(".")).unwrap();
        let root = &schema.complex_types["root_type"];
        let Content::Elements(particle) = &root.content else {
            panic!("expected element content");
        };
        let Term::Sequence(items) = &particle.term else {
            panic!("expected sequence");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].max, MaxOccurs::Unbounded);
        let Term::Element(decl) = &items[0].term else {
            panic!("expected local element");
        };
        assert!(matches!(&decl.type_ref, TypeRef::Builtin(name) if name == "string"));
        assert!(matches!(&items[1].term, Term::ElementRef(name) if name == "b"));
    }

    #[test]
    fn test_not_a_schema() {
        let err = XsdSchema::from_str_in("<foo/>", Path::new(".")).unwrap_err();
        assert!(matches!(err, CcmmError::SchemaParse { .. }));
    }

    #[test]
    fn test_bad_occurs_rejected() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:element name="r"><xs:complexType><xs:sequence>
                <xs:element name="a" minOccurs="3" maxOccurs="1"/>
            </xs:sequence></xs:complexType></xs:element>
        </xs:schema>"#;
        let err = XsdSchema::from_str_in(xsd, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("maxOccurs"));
    }

    #[test]
    fn test_missing_include_is_resolution_error() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:include schemaLocation="does-not-exist.xsd"/>
        </xs:schema>"#;
        let dir = tempfile::tempdir().unwrap();
        let err = XsdSchema::from_str_in(xsd, dir.path()).unwrap_err();
        assert!(matches!(err, CcmmError::SchemaResolution { .. }));
    }

    #[test]
    fn test_include_cycle_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let a = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:include schemaLocation="b.xsd"/>
            <xs:element name="a" type="xs:string"/>
        </xs:schema>"#;
        let b = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:include schemaLocation="a.xsd"/>
            <xs:element name="b" type="xs:string"/>
        </xs:schema>"#;
        std::fs::write(dir.path().join("a.xsd"), a).unwrap();
        std::fs::write(dir.path().join("b.xsd"), b).unwrap();

        let schema = XsdSchema::from_file(&dir.path().join("a.xsd")).unwrap();
        assert_eq!(schema.root_elements(), vec!["a", "b"]);
    }
}
