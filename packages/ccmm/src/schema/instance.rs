//! Validates instance documents against a compiled [`XsdSchema`].
//!
//! Content models are matched over the sequence of child element names by
//! tracking the set of reachable positions, so choices and optional
//! particles need no backtracking.

use std::collections::{BTreeSet, HashMap, HashSet};

use roxmltree::{Document, Node};

use super::simple::check_facets;
use super::xsd::{
    AttributeUse, ComplexType, Content, Derivation, Facets, MaxOccurs, Particle, Term, TypeRef,
    XsdSchema,
};
use super::SchemaViolation;
use crate::config::XML_NAMESPACE;
use crate::error::Result;

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const MAX_NESTING: usize = 64;

/// Simple content of a complex type: base type plus restriction layers.
struct SimpleContent<'s> {
    base: &'s TypeRef,
    facets: Vec<&'s Facets>,
}

/// A complex type with its derivation chain flattened.
#[derive(Default)]
struct Effective<'s> {
    particles: Vec<&'s Particle>,
    simple: Option<SimpleContent<'s>>,
    attributes: Vec<&'s AttributeUse>,
    any_attribute: bool,
    mixed: bool,
}

enum Resolved<'s> {
    AnyType,
    Simple(&'s TypeRef),
    Complex(&'s ComplexType),
}

impl XsdSchema {
    /// Parse `xml` and validate it.
    ///
    /// Malformed XML is an error; conformance problems are returned as
    /// violations (empty when the document conforms).
    pub fn validate_str(&self, xml: &str) -> Result<Vec<SchemaViolation>> {
        let doc = Document::parse(xml)?;
        Ok(self.validate_document(&doc))
    }

    /// Validate an already parsed document.
    pub fn validate_document(&self, doc: &Document<'_>) -> Vec<SchemaViolation> {
        let mut run = Validation {
            schema: self,
            doc,
            violations: Vec::new(),
        };
        let root = doc.root_element();
        let name = root.tag_name().name();
        let path = format!("/{name}");
        match self.elements.get(name) {
            Some(decl) => run.element(root, &decl.type_ref, &path, 0),
            None => run.report(
                root,
                &path,
                format!("no global declaration for root element '{name}'"),
            ),
        }
        run.violations
    }

    fn resolve_type<'s>(&'s self, type_ref: &'s TypeRef) -> std::result::Result<Resolved<'s>, String> {
        match type_ref {
            TypeRef::Builtin(name) if name == "anyType" => Ok(Resolved::AnyType),
            TypeRef::Builtin(_) | TypeRef::Simple(_) => Ok(Resolved::Simple(type_ref)),
            TypeRef::Complex(complex) => Ok(Resolved::Complex(complex)),
            TypeRef::Named(name) => {
                if let Some(complex) = self.complex_types.get(name) {
                    Ok(Resolved::Complex(complex))
                } else if self.simple_types.contains_key(name) {
                    Ok(Resolved::Simple(type_ref))
                } else {
                    Err(format!("unknown type '{name}'"))
                }
            }
        }
    }

    fn effective<'s>(
        &'s self,
        complex: &'s ComplexType,
        depth: usize,
    ) -> std::result::Result<Effective<'s>, String> {
        if depth > MAX_NESTING {
            return Err("type derivation chain is too deep".to_string());
        }

        let mut effective = match &complex.content {
            Content::Empty => Effective::default(),
            Content::Elements(particle) => Effective {
                particles: vec![particle],
                ..Effective::default()
            },
            Content::Derived {
                base,
                derivation,
                particle,
            } => {
                let base_type = self
                    .complex_types
                    .get(base)
                    .ok_or_else(|| format!("unknown base type '{base}'"))?;
                let inherited = self.effective(base_type, depth + 1)?;
                let mut effective = match derivation {
                    Derivation::Extension => inherited,
                    // A restriction restates the content model and keeps the attributes
                    Derivation::Restriction => Effective {
                        attributes: inherited.attributes,
                        any_attribute: inherited.any_attribute,
                        ..Effective::default()
                    },
                };
                effective.particles.extend(particle.iter());
                effective
            }
            Content::SimpleDerived { base, facets } => match base {
                TypeRef::Named(name) if self.complex_types.contains_key(name) => {
                    let base_type = &self.complex_types[name];
                    let mut effective = self.effective(base_type, depth + 1)?;
                    match effective.simple.as_mut() {
                        Some(simple) => simple.facets.push(facets),
                        None => return Err(format!("base type '{name}' has no simple content")),
                    }
                    effective
                }
                other => Effective {
                    simple: Some(SimpleContent {
                        base: other,
                        facets: vec![facets],
                    }),
                    ..Effective::default()
                },
            },
        };

        effective.mixed |= complex.mixed;
        effective.any_attribute |= complex.any_attribute;
        for attribute in &complex.attributes {
            effective.attributes.retain(|known| known.name != attribute.name);
            effective.attributes.push(attribute);
        }
        for group in &complex.attribute_groups {
            self.collect_attribute_group(group, &mut effective.attributes, depth + 1)?;
        }
        Ok(effective)
    }

    fn collect_attribute_group<'s>(
        &'s self,
        name: &str,
        out: &mut Vec<&'s AttributeUse>,
        depth: usize,
    ) -> std::result::Result<(), String> {
        if depth > MAX_NESTING {
            return Err(format!("attribute group '{name}' nests too deeply"));
        }
        let (uses, groups) = self
            .attribute_groups
            .get(name)
            .ok_or_else(|| format!("unknown attribute group '{name}'"))?;
        for attribute in uses {
            out.retain(|known| known.name != attribute.name);
            out.push(attribute);
        }
        for group in groups {
            self.collect_attribute_group(group, out, depth + 1)?;
        }
        Ok(())
    }

    fn attribute_type<'s>(&'s self, attribute: &'s AttributeUse) -> Option<&'s TypeRef> {
        attribute.type_ref.as_ref().or_else(|| {
            self.attributes
                .get(&attribute.name)
                .and_then(|global| global.type_ref.as_ref())
        })
    }

    /// Map element names reachable in a content model to their types.
    fn collect_declarations<'s>(
        &'s self,
        particle: &'s Particle,
        out: &mut HashMap<&'s str, &'s TypeRef>,
        wildcard: &mut bool,
        depth: usize,
    ) {
        if depth > MAX_NESTING {
            return;
        }
        match &particle.term {
            Term::Element(decl) => {
                out.entry(decl.name.as_str()).or_insert(&decl.type_ref);
            }
            Term::ElementRef(name) => {
                if let Some(decl) = self.elements.get(name) {
                    out.entry(decl.name.as_str()).or_insert(&decl.type_ref);
                }
            }
            Term::GroupRef(name) => {
                if let Some(group) = self.groups.get(name) {
                    self.collect_declarations(group, out, wildcard, depth + 1);
                }
            }
            Term::Sequence(items) | Term::Choice(items) | Term::All(items) => {
                for item in items {
                    self.collect_declarations(item, out, wildcard, depth + 1);
                }
            }
            Term::Any => *wildcard = true,
        }
    }
}

/// Element name a term matches directly, if it is an element term.
fn term_element_name(term: &Term) -> Option<&str> {
    match term {
        Term::Element(decl) => Some(&decl.name),
        Term::ElementRef(name) => Some(name),
        _ => None,
    }
}

/// Position-set matcher over a list of sibling names.
struct Matcher<'s, 'n> {
    schema: &'s XsdSchema,
    names: &'n [&'n str],
    furthest: usize,
    fail_position: usize,
    expected: BTreeSet<String>,
}

impl<'s, 'n> Matcher<'s, 'n> {
    fn new(schema: &'s XsdSchema, names: &'n [&'n str]) -> Self {
        Self {
            schema,
            names,
            furthest: 0,
            fail_position: 0,
            expected: BTreeSet::new(),
        }
    }

    fn particle(&mut self, particle: &Particle, starts: &BTreeSet<usize>, depth: usize) -> BTreeSet<usize> {
        let mut reached = BTreeSet::new();
        if particle.min == 0 {
            reached.extend(starts.iter().copied());
        }

        let mut frontier = starts.clone();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut count: u32 = 0;
        loop {
            if let MaxOccurs::Bounded(max) = particle.max {
                if count >= max {
                    break;
                }
            }
            let next = self.term(&particle.term, &frontier, depth);
            count += 1;
            if next.is_empty() {
                break;
            }
            if count >= particle.min {
                if next.iter().all(|position| seen.contains(position)) {
                    break;
                }
                seen.extend(next.iter().copied());
                reached.extend(next.iter().copied());
            }
            frontier = next;
        }
        reached
    }

    fn term(&mut self, term: &Term, starts: &BTreeSet<usize>, depth: usize) -> BTreeSet<usize> {
        if depth > MAX_NESTING {
            return BTreeSet::new();
        }
        let schema = self.schema;
        if let Some(name) = term_element_name(term) {
            return starts
                .iter()
                .filter_map(|&position| self.element(name, position))
                .collect();
        }
        match term {
            Term::Any => starts
                .iter()
                .filter(|&&position| position < self.names.len())
                .map(|&position| {
                    self.furthest = self.furthest.max(position + 1);
                    position + 1
                })
                .collect(),
            Term::Sequence(items) => {
                let mut current = starts.clone();
                for item in items {
                    if current.is_empty() {
                        break;
                    }
                    current = self.particle(item, &current, depth + 1);
                }
                current
            }
            Term::Choice(items) => {
                let mut result = BTreeSet::new();
                for item in items {
                    result.extend(self.particle(item, starts, depth + 1));
                }
                result
            }
            Term::All(items) => self.all(items, starts, depth),
            Term::GroupRef(name) => match schema.groups.get(name) {
                Some(group) => self.particle(group, starts, depth + 1),
                None => BTreeSet::new(),
            },
            Term::Element(_) | Term::ElementRef(_) => BTreeSet::new(),
        }
    }

    fn element(&mut self, name: &str, position: usize) -> Option<usize> {
        if self.names.get(position) == Some(&name) {
            self.furthest = self.furthest.max(position + 1);
            return Some(position + 1);
        }
        if position > self.fail_position {
            self.fail_position = position;
            self.expected.clear();
        }
        if position == self.fail_position {
            self.expected.insert(name.to_string());
        }
        None
    }

    /// `xs:all`: each member at most once, in any order.
    fn all(&mut self, items: &[Particle], starts: &BTreeSet<usize>, depth: usize) -> BTreeSet<usize> {
        let items = &items[..items.len().min(64)];
        let mut result = BTreeSet::new();
        for &start in starts {
            let mut stack = vec![(start, 0u64)];
            let mut visited = HashSet::new();
            while let Some((position, used)) = stack.pop() {
                if !visited.insert((position, used)) {
                    continue;
                }
                let complete = items
                    .iter()
                    .enumerate()
                    .all(|(i, item)| used & (1 << i) != 0 || item.min == 0);
                if complete {
                    result.insert(position);
                }
                for (i, item) in items.iter().enumerate() {
                    if used & (1 << i) != 0 {
                        continue;
                    }
                    let single = BTreeSet::from([position]);
                    for end in self.term(&item.term, &single, depth + 1) {
                        if end != position {
                            stack.push((end, used | (1 << i)));
                        }
                    }
                }
            }
        }
        result
    }
}

/// One validation run over a document.
struct Validation<'s, 'd, 'input> {
    schema: &'s XsdSchema,
    doc: &'d Document<'input>,
    violations: Vec<SchemaViolation>,
}

impl Validation<'_, '_, '_> {
    fn report(&mut self, node: Node<'_, '_>, path: &str, message: impl Into<String>) {
        let line = self.doc.text_pos_at(node.range().start).row;
        self.violations.push(SchemaViolation {
            path: path.to_string(),
            line,
            message: message.into(),
        });
    }

    fn element(&mut self, node: Node<'_, '_>, type_ref: &TypeRef, path: &str, depth: usize) {
        if depth > MAX_NESTING {
            self.report(node, path, "document nests too deeply");
            return;
        }
        let schema = self.schema;
        match schema.resolve_type(type_ref) {
            Err(message) => self.report(node, path, message),
            Ok(Resolved::AnyType) => {}
            Ok(Resolved::Simple(simple)) => {
                self.attributes(node, path, &[], false);
                if node.children().any(|child| child.is_element()) {
                    self.report(node, path, "element has a simple type and cannot contain elements");
                    return;
                }
                if let Err(message) = schema.check_simple(simple, &text_of(node)) {
                    self.report(node, path, message);
                }
            }
            Ok(Resolved::Complex(complex)) => match schema.effective(complex, 0) {
                Err(message) => self.report(node, path, message),
                Ok(effective) => self.complex(node, &effective, path, depth),
            },
        }
    }

    fn complex(&mut self, node: Node<'_, '_>, effective: &Effective<'_>, path: &str, depth: usize) {
        let schema = self.schema;
        self.attributes(node, path, &effective.attributes, effective.any_attribute);

        if let Some(simple) = &effective.simple {
            if node.children().any(|child| child.is_element()) {
                self.report(node, path, "element has simple content and cannot contain elements");
                return;
            }
            let text = text_of(node);
            if let Err(message) = schema.check_simple(simple.base, &text) {
                self.report(node, path, message);
                return;
            }
            let value = if schema.preserves_whitespace(simple.base, 0) {
                text.as_str()
            } else {
                text.trim()
            };
            for facets in &simple.facets {
                if let Err(message) = check_facets(facets, value) {
                    self.report(node, path, message);
                    return;
                }
            }
            return;
        }

        if !effective.mixed && !text_of(node).trim().is_empty() {
            self.report(node, path, "text content is not allowed in an element-only type");
        }

        let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();
        let names: Vec<&str> = children.iter().map(|child| child.tag_name().name()).collect();

        let mut matcher = Matcher::new(schema, &names);
        let mut current = BTreeSet::from([0]);
        for particle in &effective.particles {
            current = matcher.particle(particle, &current, 0);
        }

        let paths = child_paths(path, &names);
        let mut reported = None;
        if !current.contains(&names.len()) {
            let position = matcher.furthest;
            let expected = if matcher.fail_position == position && !matcher.expected.is_empty() {
                let expected: Vec<&str> = matcher.expected.iter().map(String::as_str).collect();
                format!("; expected one of: {}", expected.join(", "))
            } else {
                String::new()
            };
            if position < names.len() {
                self.report(
                    children[position],
                    &paths[position],
                    format!("element '{}' is not expected here{expected}", names[position]),
                );
                reported = Some(position);
            } else if names.is_empty() {
                self.report(node, path, format!("element has no content{expected}"));
            } else {
                self.report(node, path, format!("content is incomplete{expected}"));
            }
        }

        let mut declarations = HashMap::new();
        let mut wildcard = false;
        for particle in &effective.particles {
            schema.collect_declarations(particle, &mut declarations, &mut wildcard, 0);
        }

        for (index, child) in children.iter().enumerate() {
            match declarations.get(names[index]) {
                Some(type_ref) => self.element(*child, type_ref, &paths[index], depth + 1),
                None if wildcard || reported == Some(index) => {}
                None => self.report(
                    *child,
                    &paths[index],
                    format!("element '{}' is not declared in this context", names[index]),
                ),
            }
        }
    }

    fn attributes(
        &mut self,
        node: Node<'_, '_>,
        path: &str,
        uses: &[&AttributeUse],
        any_attribute: bool,
    ) {
        let schema = self.schema;
        let mut present = HashSet::new();
        for attribute in node.attributes() {
            let name = match attribute.namespace() {
                Some(XSI_NAMESPACE) => continue,
                Some(XML_NAMESPACE) => format!("xml:{}", attribute.name()),
                _ => attribute.name().to_string(),
            };
            match uses.iter().find(|known| known.name == name) {
                Some(known) if known.prohibited => {
                    self.report(node, path, format!("attribute '{name}' is prohibited"));
                }
                Some(known) => {
                    if let Some(type_ref) = schema.attribute_type(known) {
                        if let Err(message) = schema.check_simple(type_ref, attribute.value()) {
                            self.report(node, path, format!("attribute '{name}': {message}"));
                        }
                    }
                }
                None if any_attribute => {}
                None => self.report(node, path, format!("attribute '{name}' is not allowed")),
            }
            present.insert(name);
        }

        for known in uses {
            if known.required && !known.prohibited && !present.contains(&known.name) {
                self.report(
                    node,
                    path,
                    format!("missing required attribute '{}'", known.name),
                );
            }
        }
    }
}

fn text_of(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

/// Paths of sibling elements; repeated names get a 1-based index.
fn child_paths(parent: &str, names: &[&str]) -> Vec<String> {
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *totals.entry(name).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let index = seen.entry(name).or_default();
            *index += 1;
            if totals[name] > 1 {
                format!("{parent}/{name}[{index}]")
            } else {
                format!("{parent}/{name}")
            }
        })
        .collect()
}
