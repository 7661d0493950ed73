//! Typed CCMM metadata records.
//!
//! Entities are plain structs with public fields. Constructors and
//! `with_*` builders check invariants as values come in; `validate` checks
//! them again so hand-assembled values are vetted before they reach a
//! [`Dataset`].

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{
    validate_email, validate_non_empty, validate_optional_uri, validate_uri, validate_year,
    DEFAULT_ACCESS_RIGHTS, DEFAULT_LICENSE, DEFAULT_PUBLICATION_YEAR, DEFAULT_TERMS_DESCRIPTION,
};
use crate::error::{CcmmError, Result};
use crate::vocab::{
    AgentRole, AgentType, DistributionFormat, IdentifierScheme, Language, LocationType,
    ResourceType, SubjectScheme, TimeReferenceType,
};

/// Entities that can re-check their own invariants.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

macro_rules! impl_validate {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Validate for $ty {
                fn validate(&self) -> Result<()> {
                    <$ty>::validate(self)
                }
            }
        )*
    };
}

/// Text with a language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiLanguageText {
    pub text: String,
    pub language: Language,
}

impl MultiLanguageText {
    #[must_use]
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    /// Text in the default language (Czech).
    #[must_use]
    pub fn default_language(text: impl Into<String>) -> Self {
        Self::new(text, Language::default())
    }
}

/// A persistent identifier of the dataset or of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identifier {
    pub value: String,
    pub scheme: IdentifierScheme,
    pub iri: Option<String>,
}

impl Identifier {
    /// Create an identifier.
    ///
    /// # Examples
    /// ```
    /// use ccmm_metadata::model::Identifier;
    /// use ccmm_metadata::vocab::IdentifierScheme;
    ///
    /// assert!(Identifier::new("10.1234/x", IdentifierScheme::Doi).is_ok());
    /// assert!(Identifier::new(" ", IdentifierScheme::Doi).is_err());
    /// ```
    pub fn new(value: impl Into<String>, scheme: IdentifierScheme) -> Result<Self> {
        let value = value.into();
        validate_non_empty(&value, "identifier value")?;
        Ok(Self {
            value,
            scheme,
            iri: None,
        })
    }

    pub fn with_iri(mut self, iri: impl Into<String>) -> Result<Self> {
        let iri = iri.into();
        validate_uri(&iri, "identifier iri")?;
        self.iri = Some(iri);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.value, "identifier value")?;
        validate_optional_uri(self.iri.as_deref(), "identifier iri")
    }
}

/// Alternative title, possibly in several languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternateTitle {
    pub titles: Vec<MultiLanguageText>,
    pub alternate_title_type: Option<String>,
    pub iri: Option<String>,
}

impl AlternateTitle {
    pub fn new(titles: Vec<MultiLanguageText>) -> Result<Self> {
        let title = Self {
            titles,
            alternate_title_type: None,
            iri: None,
        };
        title.validate()?;
        Ok(title)
    }

    pub fn validate(&self) -> Result<()> {
        if self.titles.is_empty() {
            return Err(CcmmError::validation(
                "alternate_title",
                "needs at least one title",
            ));
        }
        for title in &self.titles {
            validate_non_empty(&title.text, "alternate title")?;
        }
        validate_optional_uri(self.iri.as_deref(), "alternate title iri")
    }
}

/// Free-text description of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    pub text: String,
    pub description_type: Option<String>,
    pub iri: Option<String>,
}

impl Description {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        validate_non_empty(&text, "description text")?;
        Ok(Self {
            text,
            description_type: None,
            iri: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.text, "description text")?;
        validate_optional_uri(self.iri.as_deref(), "description iri")
    }
}

/// Subject, keyword or classification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub titles: Vec<MultiLanguageText>,
    pub classification_code: Option<String>,
    pub scheme: Option<SubjectScheme>,
    pub definitions: Vec<MultiLanguageText>,
    pub iri: Option<String>,
}

impl Subject {
    /// A subject with a single title.
    pub fn new(title: MultiLanguageText) -> Result<Self> {
        let subject = Self {
            titles: vec![title],
            classification_code: None,
            scheme: None,
            definitions: Vec::new(),
            iri: None,
        };
        subject.validate()?;
        Ok(subject)
    }

    /// A keyword subject.
    pub fn keyword(text: impl Into<String>, language: Language) -> Result<Self> {
        let mut subject = Self::new(MultiLanguageText::new(text, language))?;
        subject.scheme = Some(SubjectScheme::Keyword);
        Ok(subject)
    }

    pub fn validate(&self) -> Result<()> {
        if self.titles.is_empty() {
            return Err(CcmmError::validation("subject", "needs at least one title"));
        }
        for title in &self.titles {
            validate_non_empty(&title.text, "subject title")?;
        }
        validate_optional_uri(self.iri.as_deref(), "subject iri")
    }
}

/// A person or an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub name: String,
    pub agent_type: AgentType,
    pub identifier: Option<Identifier>,
    pub email: Option<String>,
    pub affiliation: Option<String>,
    pub iri: Option<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>, agent_type: AgentType) -> Result<Self> {
        let name = name.into();
        validate_non_empty(&name, "agent name")?;
        Ok(Self {
            name,
            agent_type,
            identifier: None,
            email: None,
            affiliation: None,
            iri: None,
        })
    }

    pub fn person(name: impl Into<String>) -> Result<Self> {
        Self::new(name, AgentType::Person)
    }

    pub fn organization(name: impl Into<String>) -> Result<Self> {
        Self::new(name, AgentType::Organization)
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Result<Self> {
        let email = email.into();
        validate_email(&email, "agent email")?;
        self.email = Some(email);
        Ok(self)
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Result<Self> {
        identifier.validate()?;
        self.identifier = Some(identifier);
        Ok(self)
    }

    #[must_use]
    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_iri(mut self, iri: impl Into<String>) -> Result<Self> {
        let iri = iri.into();
        validate_uri(&iri, "agent iri")?;
        self.iri = Some(iri);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.name, "agent name")?;
        if let Some(email) = &self.email {
            validate_email(email, "agent email")?;
        }
        if let Some(identifier) = &self.identifier {
            identifier.validate()?;
        }
        validate_optional_uri(self.iri.as_deref(), "agent iri")
    }
}

/// A dataset-to-agent link with a role ("qualified relation").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceToAgentRelationship {
    pub agent: Agent,
    pub role: AgentRole,
    pub iri: Option<String>,
}

impl ResourceToAgentRelationship {
    #[must_use]
    pub fn new(agent: Agent, role: AgentRole) -> Self {
        Self {
            agent,
            role,
            iri: None,
        }
    }

    pub fn with_iri(mut self, iri: impl Into<String>) -> Result<Self> {
        let iri = iri.into();
        validate_uri(&iri, "qualified_relation iri")?;
        self.iri = Some(iri);
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        self.agent.validate()?;
        validate_optional_uri(self.iri.as_deref(), "qualified_relation iri")
    }
}

/// A dated event in the dataset's life, rendered as a time instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeReference {
    pub value: String,
    pub time_type: TimeReferenceType,
    pub iri: Option<String>,
}

impl TimeReference {
    pub fn new(value: impl Into<String>, time_type: TimeReferenceType) -> Result<Self> {
        let value = value.into();
        validate_non_empty(&value, "time value")?;
        Ok(Self {
            value,
            time_type,
            iri: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.value, "time value")?;
        validate_optional_uri(self.iri.as_deref(), "time reference iri")
    }
}

/// A place the dataset covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub value: String,
    pub location_type: LocationType,
    pub iri: Option<String>,
}

impl Location {
    pub fn new(value: impl Into<String>, location_type: LocationType) -> Result<Self> {
        let value = value.into();
        validate_non_empty(&value, "location value")?;
        Ok(Self {
            value,
            location_type,
            iri: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.value, "location value")?;
        validate_optional_uri(self.iri.as_deref(), "location iri")
    }
}

/// A downloadable file of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Distribution {
    pub access_url: String,
    pub format: Option<DistributionFormat>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub iri: Option<String>,
}

impl Distribution {
    pub fn new(access_url: impl Into<String>) -> Result<Self> {
        let access_url = access_url.into();
        validate_uri(&access_url, "access_url")?;
        Ok(Self {
            access_url,
            format: None,
            title: None,
            description: None,
            iri: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_uri(&self.access_url, "access_url")?;
        validate_optional_uri(self.iri.as_deref(), "distribution iri")
    }
}

/// Access rights and license of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermsOfUse {
    pub access_rights: String,
    pub license_name: String,
    pub iri: Option<String>,
    pub description: Option<String>,
}

impl TermsOfUse {
    pub fn new(access_rights: impl Into<String>, license_name: impl Into<String>) -> Result<Self> {
        let terms = Self {
            access_rights: access_rights.into(),
            license_name: license_name.into(),
            iri: None,
            description: None,
        };
        terms.validate()?;
        Ok(terms)
    }

    pub fn validate(&self) -> Result<()> {
        validate_non_empty(&self.access_rights, "access rights")?;
        validate_non_empty(&self.license_name, "license name")?;
        validate_optional_uri(self.iri.as_deref(), "terms of use iri")
    }
}

impl Default for TermsOfUse {
    /// Open access under CC BY 4.0.
    fn default() -> Self {
        Self {
            access_rights: DEFAULT_ACCESS_RIGHTS.to_string(),
            license_name: DEFAULT_LICENSE.to_string(),
            iri: None,
            description: Some(DEFAULT_TERMS_DESCRIPTION.to_string()),
        }
    }
}

/// Record describing who catalogued the dataset and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    pub qualified_relations: Vec<ResourceToAgentRelationship>,
    pub date_created: Option<NaiveDate>,
    pub date_updated: Vec<NaiveDate>,
    pub languages: Vec<Language>,
    pub iri: Option<String>,
}

impl MetadataRecord {
    /// Create a record; at least one qualified relation is required.
    pub fn new(qualified_relations: Vec<ResourceToAgentRelationship>) -> Result<Self> {
        let record = Self {
            qualified_relations,
            date_created: None,
            date_updated: Vec::new(),
            languages: Vec::new(),
            iri: None,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<()> {
        if self.qualified_relations.is_empty() {
            return Err(CcmmError::validation(
                "qualified_relation",
                "metadata record must have at least one qualified_relation",
            ));
        }
        for relation in &self.qualified_relations {
            relation.validate()?;
        }
        validate_optional_uri(self.iri.as_deref(), "metadata record iri")
    }
}

/// The aggregate root: one dataset and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub title: String,
    pub publication_year: i32,
    pub identifiers: Vec<Identifier>,
    pub metadata_records: Vec<MetadataRecord>,
    pub qualified_relations: Vec<ResourceToAgentRelationship>,
    pub time_references: Vec<TimeReference>,
    pub subjects: Vec<Subject>,
    pub terms_of_use: TermsOfUse,

    pub iri: Option<String>,
    pub version: Option<String>,
    pub descriptions: Vec<Description>,
    pub alternate_titles: Vec<AlternateTitle>,
    pub locations: Vec<Location>,
    pub distributions: Vec<Distribution>,
    pub resource_type: Option<ResourceType>,
    pub primary_language: Option<Language>,
    pub other_languages: Vec<Language>,
}

impl Dataset {
    /// A dataset with nothing set except the default terms of use.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            title: String::new(),
            publication_year: DEFAULT_PUBLICATION_YEAR,
            identifiers: Vec::new(),
            metadata_records: Vec::new(),
            qualified_relations: Vec::new(),
            time_references: Vec::new(),
            subjects: Vec::new(),
            terms_of_use: TermsOfUse::default(),
            iri: None,
            version: None,
            descriptions: Vec::new(),
            alternate_titles: Vec::new(),
            locations: Vec::new(),
            distributions: Vec::new(),
            resource_type: None,
            primary_language: None,
            other_languages: Vec::new(),
        }
    }

    /// Check the scalar fields that carry their own constraints.
    pub fn validate_scalars(&self) -> Result<()> {
        validate_year(self.publication_year)?;
        validate_optional_uri(self.iri.as_deref(), "dataset iri")?;
        self.terms_of_use.validate()
    }
}

impl_validate!(
    Identifier,
    AlternateTitle,
    Description,
    Subject,
    Agent,
    ResourceToAgentRelationship,
    TimeReference,
    Location,
    Distribution,
    TermsOfUse,
    MetadataRecord,
);

impl Default for Dataset {
    fn default() -> Self {
        Self::empty()
    }
}
