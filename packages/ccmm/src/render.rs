//! Document builder: typed records to schema-ordered [`XmlNode`] trees.
//!
//! Every entity renders its own fragment with a fixed child order. The
//! dataset walks its collections in canonical slot order, so the output does
//! not depend on the order fields were populated in. Rendering is pure.

use crate::config::{DEFAULT_DISTRIBUTION_TITLE, PLACEHOLDER_BYTE_SIZE, ROOT_ELEMENT};
use crate::document::XmlNode;
use crate::model::{
    AlternateTitle, Dataset, Description, Distribution, Identifier, Location, MetadataRecord,
    ResourceToAgentRelationship, Subject, TermsOfUse, TimeReference,
};
use crate::vocab::{AgentType, Language};

/// Render a value into its document fragment.
pub trait ToXml {
    fn to_xml(&self) -> XmlNode;
}

/// Leading optional `<iri>` shared by most entity shapes.
fn with_leading_iri(name: &str, iri: Option<&str>) -> XmlNode {
    let mut node = XmlNode::new(name);
    node.push_optional_text("iri", iri);
    node
}

impl ToXml for Identifier {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("identifier", self.iri.as_deref());
        node.push(XmlNode::text_node("value", &self.value));
        node.push(XmlNode::iri_ref("scheme", self.scheme.as_str()));
        node
    }
}

impl ToXml for AlternateTitle {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("alternate_title", self.iri.as_deref());
        for title in &self.titles {
            node.push(XmlNode::lang_node("title", &title.text, title.language));
        }
        if let Some(kind) = &self.alternate_title_type {
            node.push(XmlNode::iri_ref("alternate_title_type", kind));
        }
        node
    }
}

impl ToXml for Description {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("has_description", self.iri.as_deref());
        node.push(XmlNode::text_node("description_text", &self.text));
        if let Some(kind) = &self.description_type {
            node.push(XmlNode::iri_ref("has_description_type", kind));
        }
        node
    }
}

impl ToXml for Subject {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("subject", self.iri.as_deref());
        for definition in &self.definitions {
            node.push(XmlNode::lang_node(
                "definition",
                &definition.text,
                definition.language,
            ));
        }
        for title in &self.titles {
            node.push(XmlNode::lang_node("title", &title.text, title.language));
        }
        node.push_optional_text("classification_code", self.classification_code.as_deref());
        if let Some(scheme) = self.scheme {
            node.push(XmlNode::iri_ref("subject_scheme", scheme.as_str()));
        }
        node
    }
}

impl ToXml for ResourceToAgentRelationship {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("qualified_relation", self.iri.as_deref());
        node.push(XmlNode::text_node("role", self.role.as_str()));

        // The agent shape is a schema choice: exactly one of the two.
        let shape = match self.agent.agent_type {
            AgentType::Organization => "organization",
            AgentType::Person => "person",
        };
        let mut agent = with_leading_iri(shape, self.agent.iri.as_deref());
        agent.push(XmlNode::text_node("name", &self.agent.name));
        if let Some(identifier) = &self.agent.identifier {
            agent.push(identifier.to_xml());
        }

        node.push(XmlNode::new("relation").with_child(agent));
        node
    }
}

impl ToXml for TimeReference {
    fn to_xml(&self) -> XmlNode {
        let mut instant = with_leading_iri("time_instant", self.iri.as_deref());
        instant.push(XmlNode::iri_ref("date_type", self.time_type.as_str()));
        instant.push(XmlNode::text_node("date", &self.value));
        XmlNode::new("time_reference").with_child(instant)
    }
}

impl ToXml for Location {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("location", self.iri.as_deref());
        node.push(XmlNode::text_node("name", &self.value));
        node.push(XmlNode::iri_ref("relation_type", self.location_type.as_str()));
        node
    }
}

impl ToXml for Distribution {
    fn to_xml(&self) -> XmlNode {
        let mut file = with_leading_iri("distribution_-_downloadable_file", self.iri.as_deref());
        let title = self
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(DEFAULT_DISTRIBUTION_TITLE);
        file.push(XmlNode::lang_node("title", title, Language::Cs));
        file.push(XmlNode::text_node(
            "byte_size",
            PLACEHOLDER_BYTE_SIZE.to_string(),
        ));
        file.push(XmlNode::iri_ref("access_url", &self.access_url));
        if let Some(format) = self.format {
            file.push(XmlNode::iri_ref("format", format.as_str()));
        }
        XmlNode::new("distribution").with_child(file)
    }
}

impl ToXml for TermsOfUse {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("terms_of_use", self.iri.as_deref());
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            node.push(XmlNode::lang_node("description", description, Language::Cs));
        }
        node.push(XmlNode::iri_ref("access_rights", &self.access_rights));
        node.push(XmlNode::iri_ref("license", &self.license_name));
        node
    }
}

impl ToXml for MetadataRecord {
    fn to_xml(&self) -> XmlNode {
        let mut node = with_leading_iri("is_described_by", self.iri.as_deref());
        for updated in &self.date_updated {
            node.push(XmlNode::text_node(
                "date_updated",
                updated.format("%Y-%m-%d").to_string(),
            ));
        }
        if let Some(created) = self.date_created {
            node.push(XmlNode::text_node(
                "date_created",
                created.format("%Y-%m-%d").to_string(),
            ));
        }
        for relation in &self.qualified_relations {
            node.push(relation.to_xml());
        }
        for language in &self.languages {
            node.push(XmlNode::iri_ref("language", language.as_str()));
        }
        node
    }
}

impl ToXml for Dataset {
    /// Render the whole dataset in canonical slot order.
    ///
    /// Slots without a model field (provenance, validation_result,
    /// funding_reference, related_resource) are never emitted.
    fn to_xml(&self) -> XmlNode {
        fn extend<T: ToXml>(root: &mut XmlNode, items: &[T]) {
            for item in items {
                root.push(item.to_xml());
            }
        }

        let mut root = with_leading_iri(ROOT_ELEMENT, self.iri.as_deref());
        root.push(XmlNode::text_node(
            "publication_year",
            self.publication_year.to_string(),
        ));
        root.push_optional_text("version", self.version.as_deref());
        root.push(XmlNode::text_node("title", &self.title));
        extend(&mut root, &self.descriptions);
        extend(&mut root, &self.alternate_titles);
        extend(&mut root, &self.metadata_records);
        extend(&mut root, &self.identifiers);
        extend(&mut root, &self.locations);
        extend(&mut root, &self.qualified_relations);
        extend(&mut root, &self.time_references);
        extend(&mut root, &self.subjects);
        extend(&mut root, &self.distributions);
        root.push(self.terms_of_use.to_xml());
        if let Some(kind) = self.resource_type {
            root.push(XmlNode::iri_ref("resource_type", kind.as_str()));
        }
        for language in &self.other_languages {
            root.push(XmlNode::iri_ref("other_language", language.as_str()));
        }
        if let Some(language) = self.primary_language {
            root.push(XmlNode::iri_ref("primary_language", language.as_str()));
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Agent, MultiLanguageText};
    use crate::vocab::{
        AgentRole, DistributionFormat, IdentifierScheme, LocationType, SubjectScheme,
        TimeReferenceType,
    };
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn relation(agent: Agent, role: AgentRole) -> ResourceToAgentRelationship {
        ResourceToAgentRelationship::new(agent, role)
    }

    #[test]
    fn test_blank_distribution_title_uses_default() {
        let mut distribution = Distribution::new("https://example.com/data.zip").unwrap();
        distribution.title = Some("  ".to_string());
        let file = distribution.to_xml();
        let title = file
            .child("distribution_-_downloadable_file")
            .and_then(|f| f.child("title"))
            .and_then(|t| t.text.as_deref());
        assert_eq!(title, Some(DEFAULT_DISTRIBUTION_TITLE));
    }

    #[test]
    fn test_identifier_shape() {
        let id = Identifier::new("10.1234/x", IdentifierScheme::Doi)
            .unwrap()
            .with_iri("https://doi.org/10.1234/x")
            .unwrap();
        assert_eq!(
            id.to_xml().to_xml_string(false).unwrap(),
            "<identifier><iri>https://doi.org/10.1234/x</iri><value>10.1234/x</value>\
             <scheme><iri>DOI</iri></scheme></identifier>"
        );
    }

    #[test]
    fn test_organization_and_person_shapes() {
        let org = relation(Agent::organization("CESNET").unwrap(), AgentRole::Publisher).to_xml();
        let relation_node = org.child("relation").unwrap();
        assert_eq!(relation_node.child_names(), vec!["organization"]);

        let person = relation(Agent::person("Jan Novák").unwrap(), AgentRole::Creator).to_xml();
        let relation_node = person.child("relation").unwrap();
        assert_eq!(relation_node.child_names(), vec!["person"]);
        assert_eq!(
            relation_node.child("person").unwrap().child("name").unwrap().text.as_deref(),
            Some("Jan Novák")
        );
        assert_eq!(person.child("role").unwrap().text.as_deref(), Some("creator"));
    }

    #[test]
    fn test_agent_email_and_affiliation_not_rendered() {
        let agent = Agent::person("Jan")
            .unwrap()
            .with_email("jan@example.cz")
            .unwrap()
            .with_affiliation("Charles University");
        let xml = relation(agent, AgentRole::Creator)
            .to_xml()
            .to_xml_string(false)
            .unwrap();
        assert!(!xml.contains("jan@example.cz"));
        assert!(!xml.contains("Charles University"));
    }

    #[test]
    fn test_agent_identifier_nested() {
        let agent = Agent::person("Jan")
            .unwrap()
            .with_identifier(Identifier::new("0000-0001", IdentifierScheme::Orcid).unwrap())
            .unwrap();
        let node = relation(agent, AgentRole::Creator).to_xml();
        let person = node.child("relation").unwrap().child("person").unwrap();
        assert_eq!(person.child_names(), vec!["name", "identifier"]);
    }

    #[test]
    fn test_time_reference_is_instant() {
        let node = TimeReference::new("2024-01-15", TimeReferenceType::Created)
            .unwrap()
            .to_xml();
        assert_eq!(
            node.to_xml_string(false).unwrap(),
            "<time_reference><time_instant><date_type><iri>created</iri></date_type>\
             <date>2024-01-15</date></time_instant></time_reference>"
        );
    }

    #[test]
    fn test_distribution_defaults() {
        let mut distribution = Distribution::new("https://example.com/data.csv").unwrap();
        distribution.format = Some(DistributionFormat::Csv);
        let node = distribution.to_xml();
        let file = node.child("distribution_-_downloadable_file").unwrap();
        assert_eq!(
            file.child_names(),
            vec!["title", "byte_size", "access_url", "format"]
        );
        let title = file.child("title").unwrap();
        assert_eq!(title.text.as_deref(), Some("Dataset file"));
        assert_eq!(title.attribute("xml:lang"), Some("cs"));
        assert_eq!(file.child("byte_size").unwrap().text.as_deref(), Some("1000"));
    }

    #[test]
    fn test_subject_order() {
        let mut subject = Subject::new(MultiLanguageText::new("Data", Language::En)).unwrap();
        subject.definitions.push(MultiLanguageText::new("Def", Language::En));
        subject.classification_code = Some("1.2".to_string());
        subject.scheme = Some(SubjectScheme::Classification);
        assert_eq!(
            subject.to_xml().child_names(),
            vec!["definition", "title", "classification_code", "subject_scheme"]
        );
    }

    #[test]
    fn test_metadata_record_order() {
        let mut record = MetadataRecord::new(vec![relation(
            Agent::person("Cataloguer").unwrap(),
            AgentRole::Curator,
        )])
        .unwrap();
        record.date_created = NaiveDate::from_ymd_opt(2024, 1, 1);
        record.date_updated = vec![NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()];
        record.languages = vec![Language::Cs];
        let node = record.to_xml();
        assert_eq!(
            node.child_names(),
            vec!["date_updated", "date_created", "qualified_relation", "language"]
        );
        assert_eq!(node.child("date_created").unwrap().text.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_dataset_render_is_canonical_and_idempotent() {
        let mut dataset = Dataset::empty();
        dataset.title = "Test".to_string();
        dataset.primary_language = Some(Language::Cs);
        dataset.other_languages.push(Language::En);
        dataset
            .distributions
            .push(Distribution::new("https://example.com/f.zip").unwrap());
        dataset
            .locations
            .push(Location::new("Praha", LocationType::Place).unwrap());
        dataset
            .identifiers
            .push(Identifier::new("10.1/x", IdentifierScheme::Doi).unwrap());

        let first = dataset.to_xml();
        let mut reordered = first.clone();
        reordered.reorder_canonical();
        assert_eq!(reordered, first);
        assert_eq!(first, dataset.to_xml());
        assert_eq!(
            first.child_names(),
            vec![
                "publication_year",
                "title",
                "identifier",
                "location",
                "distribution",
                "terms_of_use",
                "other_language",
                "primary_language",
            ]
        );
    }
}
