//! End-to-end tests for the handler facade.
//!
//! Builds datasets through `CcmmHandler`, renders them and checks them
//! against the bundled CCMM schema.

use std::fs;

use ccmm_metadata::config::max_publication_year;
use ccmm_metadata::{
    Agent, AgentRole, CcmmError, CcmmHandler, DistributionFormat, HandlerState, IdentifierScheme,
    Language, ResourceType, TimeReferenceType, XmlNode,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// Handler holding the smallest dataset the schema accepts.
fn minimal_handler() -> CcmmHandler {
    let mut handler = CcmmHandler::new();
    populate_minimal(&mut handler);
    handler
}

fn populate_minimal(handler: &mut CcmmHandler) {
    handler.set_title("Minimal dataset").unwrap();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();
    handler
        .add_agent_relationship(Agent::person("Jan Novák").unwrap(), AgentRole::Creator, None)
        .unwrap();
    handler
        .add_agent_relationship(
            Agent::organization("Archiv").unwrap(),
            AgentRole::Publisher,
            None,
        )
        .unwrap();
    handler
        .add_time_reference("2024-03-01", TimeReferenceType::Created, None)
        .unwrap();
    handler
        .add_subject("metadata", Language::Cs, None, None, None, None)
        .unwrap();
    let relations = handler.agent_relationships().to_vec();
    handler
        .add_metadata_record(relations, None, Vec::new(), Vec::new(), None)
        .unwrap();
}

#[test]
fn test_minimal_dataset_is_valid() {
    let handler = minimal_handler();
    let report = handler.validation_report();
    assert!(report.is_valid(), "{:?}", report.reasons());
    assert!(handler.is_valid());
    assert_eq!(handler.state(), HandlerState::Valid);
}

#[test]
fn test_rendering_is_idempotent() {
    let handler = minimal_handler();
    let first = handler.to_xml_string(true).unwrap();
    let second = handler.to_xml_string(true).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        handler.to_xml_string(false).unwrap(),
        handler.to_xml_string(false).unwrap()
    );
}

#[test]
fn test_top_level_order_ignores_insertion_order() {
    let mut handler = CcmmHandler::new();
    handler.set_primary_language(Language::En);
    handler.set_resource_type(ResourceType::Dataset);
    handler
        .add_distribution(
            "https://example.com/data.csv",
            Some(DistributionFormat::Csv),
            None,
            None,
            None,
        )
        .unwrap();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();
    handler.set_version("2.0").unwrap();
    handler.set_title("Ordered").unwrap();

    let root = XmlNode::parse(&handler.to_xml_string(false).unwrap()).unwrap();
    assert_eq!(
        root.child_names(),
        vec![
            "publication_year",
            "version",
            "title",
            "identifier",
            "distribution",
            "terms_of_use",
            "resource_type",
            "primary_language",
        ]
    );
    assert_eq!(
        root.child("resource_type")
            .and_then(|node| node.child("iri"))
            .and_then(|iri| iri.text.as_deref()),
        Some("dataset")
    );
}

#[test]
fn test_two_identifiers_render_as_ordered_siblings() {
    let mut handler = CcmmHandler::new();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();
    handler
        .add_identifier("ark:/12345/x", IdentifierScheme::Ark, None)
        .unwrap();

    let root = XmlNode::parse(&handler.to_xml_string(false).unwrap()).unwrap();
    let identifiers: Vec<&XmlNode> = root.children_named("identifier").collect();
    assert_eq!(identifiers.len(), 2);

    let describe = |node: &XmlNode| {
        let value = node.child("value").and_then(|v| v.text.clone());
        let scheme = node
            .child("scheme")
            .and_then(|s| s.child("iri"))
            .and_then(|iri| iri.text.clone());
        (value, scheme)
    };
    assert_eq!(
        describe(identifiers[0]),
        (Some("10.1234/x".to_string()), Some("DOI".to_string()))
    );
    assert_eq!(
        describe(identifiers[1]),
        (Some("ark:/12345/x".to_string()), Some("ARK".to_string()))
    );
}

#[test]
fn test_agent_type_selects_shape() {
    let handler = minimal_handler();
    let root = XmlNode::parse(&handler.to_xml_string(false).unwrap()).unwrap();
    let relations: Vec<&XmlNode> = root.children_named("qualified_relation").collect();

    let shapes: Vec<Vec<&str>> = relations
        .iter()
        .map(|relation| relation.child("relation").unwrap().child_names())
        .collect();
    assert_eq!(shapes, vec![vec!["person"], vec!["organization"]]);
}

#[test]
fn test_publication_year_boundaries() {
    let mut handler = CcmmHandler::new();
    assert!(handler.set_publication_year(1000).is_ok());
    assert!(handler.set_publication_year(max_publication_year()).is_ok());
    assert!(handler.set_publication_year(999).is_err());
    assert!(handler
        .set_publication_year(max_publication_year() + 1)
        .is_err());
    assert_eq!(handler.publication_year(), max_publication_year());
}

#[test]
fn test_uri_boundary() {
    let mut handler = CcmmHandler::new();
    let err = handler.set_iri("invalid-uri").unwrap_err();
    assert!(matches!(err, CcmmError::Validation { .. }));
    handler.set_iri("https://example.com/data").unwrap();
    assert_eq!(handler.iri(), Some("https://example.com/data"));
}

#[test]
fn test_uri_without_authority_is_rejected() {
    let mut handler = CcmmHandler::new();
    for uri in ["https:example.com", "https:/example.com", "http:\\\\example.com"] {
        let err = handler.set_iri(uri).unwrap_err();
        assert!(matches!(err, CcmmError::Validation { .. }), "{uri}");
    }
    assert_eq!(handler.iri(), None);
    assert!(handler
        .add_distribution("https:example.com/data.zip", None, None, None, None)
        .is_err());
    assert!(handler.distributions().is_empty());
}

#[test]
fn test_blank_optional_text_is_treated_as_absent() {
    let mut handler = CcmmHandler::new();
    handler
        .add_subject("kw", Language::Cs, Some(""), None, Some("  "), None)
        .unwrap();
    handler
        .add_distribution(
            "https://example.com/data.zip",
            Some(DistributionFormat::Zip),
            Some(""),
            Some(" "),
            None,
        )
        .unwrap();
    handler
        .set_terms_of_use(
            ccmm_metadata::config::DEFAULT_ACCESS_RIGHTS,
            ccmm_metadata::config::DEFAULT_LICENSE,
            Some(""),
            None,
        )
        .unwrap();

    let subject = &handler.subjects()[0];
    assert_eq!(subject.classification_code, None);
    assert!(subject.definitions.is_empty());
    assert_eq!(handler.distributions()[0].title, None);
    assert_eq!(handler.terms_of_use().description, None);

    let xml = handler.to_xml_string(false).unwrap();
    assert!(!xml.contains("<definition"));
    assert!(!xml.contains("<classification_code"));
    assert!(xml.contains(r#"<title xml:lang="cs">Dataset file</title>"#));
    let root = XmlNode::parse(&xml).unwrap();
    let terms = root.child("terms_of_use").unwrap();
    assert_eq!(terms.child_names(), vec!["access_rights", "license"]);
}

#[test]
fn test_empty_metadata_record_names_qualified_relation() {
    let mut handler = CcmmHandler::new();
    let err = handler
        .add_metadata_record(Vec::new(), None, Vec::new(), Vec::new(), None)
        .unwrap_err();
    let CcmmError::Validation { field, message } = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(field, "qualified_relation");
    assert!(message.contains("qualified_relation"));
}

#[test]
fn test_save_refused_without_subjects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset.xml");

    let mut handler = CcmmHandler::new();
    handler.set_title("No subjects").unwrap();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();

    let err = handler.save_to_file(&path, true).unwrap_err();
    let CcmmError::SaveRefused { reasons, .. } = &err else {
        panic!("expected refusal, got {err:?}");
    };
    assert!(reasons[0].contains("subjects"));
    assert!(!path.exists());

    handler.save_to_file(&path, false).unwrap();
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<dataset>"));
    assert!(saved.contains("<title>No subjects</title>"));
}

#[test]
fn test_saved_valid_document_conforms() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("dataset.xml");

    let handler = minimal_handler();
    handler.save_to_file(&path, true).unwrap();

    let saved = fs::read_to_string(&path).unwrap();
    let violations = ccmm_metadata::validate::check_document(
        &saved,
        handler.resolver(),
        ccmm_metadata::config::DEFAULT_SCHEMA_NAME,
    )
    .unwrap();
    assert!(violations.is_empty(), "{violations:?}");
}

#[test]
fn test_single_relation_is_reported_by_schema() {
    let mut handler = CcmmHandler::new();
    handler.set_title("One agent").unwrap();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();
    handler
        .add_agent_relationship(Agent::person("Solo").unwrap(), AgentRole::Creator, None)
        .unwrap();
    handler
        .add_time_reference("2024-03-01", TimeReferenceType::Created, None)
        .unwrap();
    handler
        .add_subject("metadata", Language::Cs, None, None, None, None)
        .unwrap();
    let relations = handler.agent_relationships().to_vec();
    handler
        .add_metadata_record(relations, None, Vec::new(), Vec::new(), None)
        .unwrap();

    let report = handler.validation_report();
    assert!(report.missing_fields.is_empty());
    assert_eq!(report.violations.len(), 1);
    assert!(!handler.is_valid());
    assert_eq!(handler.state(), HandlerState::Partial);
}

#[test]
fn test_missing_schema_directory_degrades_to_invalid() {
    let dir = tempdir().unwrap();
    let mut handler = CcmmHandler::with_schema_root(dir.path());
    populate_minimal(&mut handler);

    assert!(!handler.is_valid());
    let report = handler.validation_report();
    assert!(report.missing_fields.is_empty());
    assert!(report.error.is_some());
}
