//! Mutation facade over a single [`Dataset`].
//!
//! Every mutator checks all of its input before touching the dataset, so a
//! rejected call leaves the state exactly as it was. Export goes through
//! the renderer; saving validates first unless told otherwise.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{validate_non_empty, validate_optional_uri, validate_uri, validate_year};
use crate::error::{CcmmError, Result};
use crate::model::{
    Agent, AlternateTitle, Dataset, Description, Distribution, Identifier, Location,
    MetadataRecord, MultiLanguageText, ResourceToAgentRelationship, Subject, TermsOfUse,
    TimeReference,
};
use crate::output::write_atomic;
use crate::render::ToXml;
use crate::schema::SchemaResolver;
use crate::validate::{
    missing_required_fields, validate_dataset, ValidationReport, REQUIRED_FIELD_COUNT,
};
use crate::vocab::{
    AgentRole, DistributionFormat, IdentifierScheme, Language, LocationType, ResourceType,
    SubjectScheme, TimeReferenceType,
};

/// Read-only projection of the dataset for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub title: String,
    pub publication_year: i32,
    pub version: Option<String>,
    pub identifiers_count: usize,
    pub descriptions_count: usize,
    pub subjects_count: usize,
    pub agents_count: usize,
    pub distributions_count: usize,
    pub primary_language: Option<Language>,
    pub other_languages: Vec<Language>,
}

/// Lifecycle position of the handler's dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerState {
    /// No required field set yet.
    Empty,
    /// Some fields set, not yet valid.
    Partial,
    /// Both validation tiers pass.
    Valid,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

/// Optional free text; blank input counts as absent.
fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

/// Builds one dataset through validated add/set operations.
#[derive(Debug, Clone)]
pub struct CcmmHandler {
    dataset: Dataset,
    resolver: SchemaResolver,
}

impl Default for CcmmHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CcmmHandler {
    /// Handler using the bundled schemas.
    pub fn new() -> Self {
        Self::with_resolver(SchemaResolver::bundled())
    }

    /// Handler resolving schemas under `root`.
    pub fn with_schema_root(root: impl Into<PathBuf>) -> Self {
        Self::with_resolver(SchemaResolver::with_root(root))
    }

    pub fn with_resolver(resolver: SchemaResolver) -> Self {
        Self {
            dataset: Dataset::empty(),
            resolver,
        }
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    // === Scalars ===

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        validate_non_empty(title, "title")?;
        self.dataset.title = title.to_string();
        tracing::debug!(title, "set title");
        Ok(())
    }

    pub fn set_publication_year(&mut self, year: i32) -> Result<()> {
        validate_year(year)?;
        self.dataset.publication_year = year;
        Ok(())
    }

    pub fn set_version(&mut self, version: &str) -> Result<()> {
        validate_non_empty(version, "version")?;
        self.dataset.version = Some(version.to_string());
        Ok(())
    }

    pub fn set_iri(&mut self, iri: &str) -> Result<()> {
        validate_uri(iri, "dataset iri")?;
        self.dataset.iri = Some(iri.to_string());
        Ok(())
    }

    pub fn set_resource_type(&mut self, resource_type: ResourceType) {
        self.dataset.resource_type = Some(resource_type);
    }

    pub fn set_primary_language(&mut self, language: Language) {
        self.dataset.primary_language = Some(language);
    }

    /// Add a secondary language; already listed languages are ignored.
    pub fn add_other_language(&mut self, language: Language) {
        if !self.dataset.other_languages.contains(&language) {
            self.dataset.other_languages.push(language);
        }
    }

    pub fn set_terms_of_use(
        &mut self,
        access_rights: &str,
        license_name: &str,
        description: Option<&str>,
        iri: Option<&str>,
    ) -> Result<()> {
        let terms = TermsOfUse {
            access_rights: access_rights.to_string(),
            license_name: license_name.to_string(),
            iri: owned(iri),
            description: non_blank(description),
        };
        terms.validate()?;
        self.dataset.terms_of_use = terms;
        Ok(())
    }

    // === Collections ===

    pub fn add_identifier(
        &mut self,
        value: &str,
        scheme: IdentifierScheme,
        iri: Option<&str>,
    ) -> Result<()> {
        let identifier = Identifier {
            value: value.to_string(),
            scheme,
            iri: owned(iri),
        };
        identifier.validate()?;
        tracing::debug!(value, %scheme, "add identifier");
        self.dataset.identifiers.push(identifier);
        Ok(())
    }

    pub fn add_description(
        &mut self,
        text: &str,
        description_type: Option<&str>,
        iri: Option<&str>,
    ) -> Result<()> {
        let description = Description {
            text: text.to_string(),
            description_type: non_blank(description_type),
            iri: owned(iri),
        };
        description.validate()?;
        self.dataset.descriptions.push(description);
        Ok(())
    }

    pub fn add_alternate_title(
        &mut self,
        title: &str,
        language: Language,
        alternate_title_type: Option<&str>,
        iri: Option<&str>,
    ) -> Result<()> {
        let alternate = AlternateTitle {
            titles: vec![MultiLanguageText::new(title, language)],
            alternate_title_type: non_blank(alternate_title_type),
            iri: owned(iri),
        };
        alternate.validate()?;
        self.dataset.alternate_titles.push(alternate);
        Ok(())
    }

    /// Add a subject; a definition, when given, shares the title's language.
    pub fn add_subject(
        &mut self,
        title: &str,
        language: Language,
        classification_code: Option<&str>,
        scheme: Option<SubjectScheme>,
        definition: Option<&str>,
        iri: Option<&str>,
    ) -> Result<()> {
        let subject = Subject {
            titles: vec![MultiLanguageText::new(title, language)],
            classification_code: non_blank(classification_code),
            scheme,
            definitions: non_blank(definition)
                .map(|text| MultiLanguageText::new(text, language))
                .into_iter()
                .collect(),
            iri: owned(iri),
        };
        subject.validate()?;
        self.dataset.subjects.push(subject);
        Ok(())
    }

    pub fn add_agent_relationship(
        &mut self,
        agent: Agent,
        role: AgentRole,
        iri: Option<&str>,
    ) -> Result<()> {
        let relationship = ResourceToAgentRelationship {
            agent,
            role,
            iri: owned(iri),
        };
        relationship.validate()?;
        tracing::debug!(agent = %relationship.agent.name, %role, "add qualified relation");
        self.dataset.qualified_relations.push(relationship);
        Ok(())
    }

    pub fn add_time_reference(
        &mut self,
        value: &str,
        time_type: TimeReferenceType,
        iri: Option<&str>,
    ) -> Result<()> {
        let reference = TimeReference {
            value: value.to_string(),
            time_type,
            iri: owned(iri),
        };
        reference.validate()?;
        self.dataset.time_references.push(reference);
        Ok(())
    }

    pub fn add_location(
        &mut self,
        value: &str,
        location_type: LocationType,
        iri: Option<&str>,
    ) -> Result<()> {
        let location = Location {
            value: value.to_string(),
            location_type,
            iri: owned(iri),
        };
        location.validate()?;
        self.dataset.locations.push(location);
        Ok(())
    }

    pub fn add_distribution(
        &mut self,
        access_url: &str,
        format: Option<DistributionFormat>,
        title: Option<&str>,
        description: Option<&str>,
        iri: Option<&str>,
    ) -> Result<()> {
        let distribution = Distribution {
            access_url: access_url.to_string(),
            format,
            title: non_blank(title),
            description: non_blank(description),
            iri: owned(iri),
        };
        distribution.validate()?;
        self.dataset.distributions.push(distribution);
        Ok(())
    }

    pub fn add_metadata_record(
        &mut self,
        qualified_relations: Vec<ResourceToAgentRelationship>,
        date_created: Option<NaiveDate>,
        date_updated: Vec<NaiveDate>,
        languages: Vec<Language>,
        iri: Option<&str>,
    ) -> Result<()> {
        validate_optional_uri(iri, "metadata record iri")?;
        let mut record = MetadataRecord::new(qualified_relations)?;
        record.date_created = date_created;
        record.date_updated = date_updated;
        record.languages = languages;
        record.iri = owned(iri);
        self.dataset.metadata_records.push(record);
        Ok(())
    }

    // === Validation ===

    /// Run both validation tiers and report every failure.
    pub fn validation_report(&self) -> ValidationReport {
        validate_dataset(&self.dataset, &self.resolver)
    }

    /// True when the required fields are present and the document conforms.
    pub fn is_valid(&self) -> bool {
        let report = self.validation_report();
        if !report.missing_fields.is_empty() {
            tracing::warn!(missing = ?report.missing_fields, "dataset is missing required fields");
        }
        report.is_valid()
    }

    pub fn state(&self) -> HandlerState {
        let missing = missing_required_fields(&self.dataset);
        if missing.len() == REQUIRED_FIELD_COUNT {
            HandlerState::Empty
        } else if missing.is_empty() && self.validation_report().is_valid() {
            HandlerState::Valid
        } else {
            HandlerState::Partial
        }
    }

    // === Export ===

    /// Render the dataset without an XML declaration.
    pub fn to_xml_string(&self, pretty: bool) -> Result<String> {
        self.dataset.to_xml().to_xml_string(pretty)
    }

    /// Write the pretty-printed document with declaration.
    ///
    /// With `validate` set, an invalid dataset is not written and
    /// [`CcmmError::SaveRefused`] lists the reasons.
    pub fn save_to_file(&self, path: &Path, validate: bool) -> Result<()> {
        if validate {
            let report = self.validation_report();
            if !report.is_valid() {
                return Err(CcmmError::SaveRefused {
                    path: path.to_path_buf(),
                    reasons: report.reasons(),
                });
            }
        }

        let content = self.dataset.to_xml().to_document_string(true)?;
        write_atomic(path, &content)?;
        tracing::info!(path = %path.display(), validated = validate, "saved dataset");
        Ok(())
    }

    // === Getters ===

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn title(&self) -> &str {
        &self.dataset.title
    }

    pub fn publication_year(&self) -> i32 {
        self.dataset.publication_year
    }

    pub fn version(&self) -> Option<&str> {
        self.dataset.version.as_deref()
    }

    pub fn iri(&self) -> Option<&str> {
        self.dataset.iri.as_deref()
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.dataset.identifiers
    }

    pub fn descriptions(&self) -> &[Description] {
        &self.dataset.descriptions
    }

    pub fn alternate_titles(&self) -> &[AlternateTitle] {
        &self.dataset.alternate_titles
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.dataset.subjects
    }

    pub fn agent_relationships(&self) -> &[ResourceToAgentRelationship] {
        &self.dataset.qualified_relations
    }

    pub fn time_references(&self) -> &[TimeReference] {
        &self.dataset.time_references
    }

    pub fn locations(&self) -> &[Location] {
        &self.dataset.locations
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.dataset.distributions
    }

    pub fn metadata_records(&self) -> &[MetadataRecord] {
        &self.dataset.metadata_records
    }

    pub fn terms_of_use(&self) -> &TermsOfUse {
        &self.dataset.terms_of_use
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        self.dataset.resource_type
    }

    pub fn primary_language(&self) -> Option<Language> {
        self.dataset.primary_language
    }

    pub fn other_languages(&self) -> &[Language] {
        &self.dataset.other_languages
    }

    pub fn summary(&self) -> DatasetSummary {
        let dataset = &self.dataset;
        DatasetSummary {
            title: dataset.title.clone(),
            publication_year: dataset.publication_year,
            version: dataset.version.clone(),
            identifiers_count: dataset.identifiers.len(),
            descriptions_count: dataset.descriptions.len(),
            subjects_count: dataset.subjects.len(),
            agents_count: dataset.qualified_relations.len(),
            distributions_count: dataset.distributions.len(),
            primary_language: dataset.primary_language,
            other_languages: dataset.other_languages.clone(),
        }
    }
}
