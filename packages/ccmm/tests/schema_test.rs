//! Conformance tests against the bundled CCMM schemas and a fixture schema
//! directory.

use std::fs;

use ccmm_metadata::validate::check_document;
use ccmm_metadata::{
    Agent, AgentRole, CcmmError, CcmmHandler, DistributionFormat, IdentifierScheme, Language,
    SchemaResolver, TimeReferenceType,
};
use tempfile::tempdir;

fn render_valid(pretty: bool) -> String {
    let mut handler = CcmmHandler::new();
    handler.set_title("Schema fixture").unwrap();
    handler
        .add_identifier("10.1234/x", IdentifierScheme::Doi, None)
        .unwrap();
    handler
        .add_agent_relationship(Agent::person("Jan").unwrap(), AgentRole::Creator, None)
        .unwrap();
    handler
        .add_agent_relationship(Agent::person("Eva").unwrap(), AgentRole::Editor, None)
        .unwrap();
    handler
        .add_time_reference("2024-06-30", TimeReferenceType::Issued, None)
        .unwrap();
    handler
        .add_subject("data", Language::En, None, None, None, None)
        .unwrap();
    handler
        .add_distribution(
            "https://example.com/data.zip",
            Some(DistributionFormat::Zip),
            None,
            None,
            None,
        )
        .unwrap();
    let relations = handler.agent_relationships()[..1].to_vec();
    handler
        .add_metadata_record(relations, None, Vec::new(), Vec::new(), None)
        .unwrap();
    handler.to_xml_string(pretty).unwrap()
}

fn valid_document() -> String {
    render_valid(false)
}

fn check(xml: &str) -> Vec<ccmm_metadata::SchemaViolation> {
    check_document(xml, &SchemaResolver::bundled(), "dataset").unwrap()
}

#[test]
fn test_rendered_document_conforms() {
    assert!(check(&valid_document()).is_empty());
    assert!(check(&render_valid(true)).is_empty());
}

#[test]
fn test_bundled_component_schemas_load() {
    let resolver = SchemaResolver::bundled();
    for name in ["common", "identifier", "resource-to-agent-relationship", "dataset"] {
        assert!(resolver.load(name).is_ok(), "schema {name} failed to load");
    }
    let dataset = resolver.load("dataset").unwrap();
    assert!(dataset.root_elements().contains(&"dataset"));
    assert!(dataset.path().ends_with("dataset/schema.xsd"));
}

#[test]
fn test_distribution_without_format_is_incomplete() {
    let xml = valid_document().replace("<format><iri>application/zip</iri></format>", "");
    let violations = check(&xml);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(
        violations[0].path,
        "/dataset/distribution/distribution_-_downloadable_file"
    );
    assert!(violations[0].message.contains("format"));
}

#[test]
fn test_invalid_date_reported_with_path() {
    let xml = valid_document().replace("2024-06-30", "2024-13-45");
    let violations = check(&xml);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].path, "/dataset/time_reference/time_instant/date");
}

#[test]
fn test_lang_string_requires_language() {
    let xml = valid_document().replace(r#"<title xml:lang="en">data</title>"#, "<title>data</title>");
    let violations = check(&xml);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].path, "/dataset/subject/title");
    assert!(violations[0].message.contains("xml:lang"));
}

#[test]
fn test_out_of_order_elements_reported() {
    let xml = "<dataset><title>T</title><publication_year>2024</publication_year></dataset>";
    let violations = check(xml);
    assert!(!violations.is_empty());
    assert_eq!(violations[0].path, "/dataset/title");
    assert!(violations[0].message.contains("publication_year"));
}

#[test]
fn test_violations_carry_line_numbers() {
    let xml = render_valid(true).replace(
        "<title>Schema fixture</title>",
        "<title>Schema fixture</title>\n  <unexpected/>",
    );
    let violations = check(&xml);
    let line = xml
        .lines()
        .position(|l| l.contains("<unexpected/>"))
        .map(|index| index as u32 + 1)
        .unwrap();
    assert_eq!(violations[0].path, "/dataset/unexpected");
    assert_eq!(violations[0].line, line);
}

#[test]
fn test_custom_schema_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("base")).unwrap();
    fs::create_dir_all(dir.path().join("note")).unwrap();
    fs::write(
        dir.path().join("base").join("schema.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:simpleType name="short_text">
                <xs:restriction base="xs:string"><xs:maxLength value="5"/></xs:restriction>
            </xs:simpleType>
        </xs:schema>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("note").join("schema.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:include schemaLocation="../base/schema.xsd"/>
            <xs:element name="note" type="short_text"/>
        </xs:schema>"#,
    )
    .unwrap();

    let resolver = SchemaResolver::with_root(dir.path());
    assert!(check_document("<note>short</note>", &resolver, "note")
        .unwrap()
        .is_empty());
    let violations = check_document("<note>far too long</note>", &resolver, "note").unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].path, "/note");
}

#[test]
fn test_unknown_schema_name_is_error() {
    let err = check_document("<dataset/>", &SchemaResolver::bundled(), "no-such-schema")
        .unwrap_err();
    assert!(matches!(err, CcmmError::SchemaResolution { .. }));
}
