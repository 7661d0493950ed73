//! Closed vocabularies used by the CCMM dataset schema.
//!
//! Every vocabulary is a plain enum with one canonical wire string per
//! variant. Parsing accepts the wire string only; anything else is a
//! [`CcmmError::Validation`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CcmmError, Result};

/// Shared behaviour of the closed vocabularies.
pub trait Vocabulary: Copy + 'static {
    /// Name used in error messages.
    const NAME: &'static str;

    /// All variants in declaration order.
    const ALL: &'static [Self];

    /// Canonical wire string.
    fn as_str(&self) -> &'static str;
}

/// Parse a wire string into a vocabulary value.
///
/// # Examples
/// ```
/// use ccmm_metadata::vocab::{parse_vocabulary, AgentRole};
///
/// let role: AgentRole = parse_vocabulary("contact_person").unwrap();
/// assert_eq!(role, AgentRole::ContactPerson);
/// assert!(parse_vocabulary::<AgentRole>("boss").is_err());
/// ```
pub fn parse_vocabulary<T: Vocabulary>(value: &str) -> Result<T> {
    T::ALL
        .iter()
        .copied()
        .find(|variant| variant.as_str() == value)
        .ok_or_else(|| {
            let allowed: Vec<&str> = T::ALL.iter().map(|variant| variant.as_str()).collect();
            CcmmError::validation(
                T::NAME,
                format!("unknown value '{value}', expected one of: {}", allowed.join(", ")),
            )
        })
}

/// Derives `Display`, `FromStr` and `Vocabulary` from the inherent `ALL` and `as_str`.
macro_rules! impl_vocabulary {
    ($ty:ty, $name:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = CcmmError;

            fn from_str(s: &str) -> Result<Self> {
                parse_vocabulary(s)
            }
        }

        impl Vocabulary for $ty {
            const NAME: &'static str = $name;
            const ALL: &'static [Self] = <$ty>::ALL;

            fn as_str(&self) -> &'static str {
                <$ty>::as_str(self)
            }
        }
    };
}

/// Languages of text values and of the dataset itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Czech, the default for untagged input.
    #[default]
    Cs,
    En,
    De,
    Fr,
    Es,
    It,
    Sk,
}

impl Language {
    pub const ALL: &'static [Self] = &[
        Self::Cs,
        Self::En,
        Self::De,
        Self::Fr,
        Self::Es,
        Self::It,
        Self::Sk,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cs => "cs",
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::It => "it",
            Self::Sk => "sk",
        }
    }
}

impl_vocabulary!(Language, "language");

/// Kind of agent; selects the rendered `person` or `organization` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Person,
    Organization,
}

impl AgentType {
    pub const ALL: &'static [Self] = &[Self::Person, Self::Organization];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
        }
    }
}

impl_vocabulary!(AgentType, "agent_type");

/// Role an agent plays for the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Creator,
    Contributor,
    Editor,
    Publisher,
    Curator,
    Reviewer,
    ContactPerson,
}

impl AgentRole {
    pub const ALL: &'static [Self] = &[
        Self::Creator,
        Self::Contributor,
        Self::Editor,
        Self::Publisher,
        Self::Curator,
        Self::Reviewer,
        Self::ContactPerson,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Contributor => "contributor",
            Self::Editor => "editor",
            Self::Publisher => "publisher",
            Self::Curator => "curator",
            Self::Reviewer => "reviewer",
            Self::ContactPerson => "contact_person",
        }
    }
}

impl_vocabulary!(AgentRole, "role");

/// Persistent identifier schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierScheme {
    #[serde(rename = "DOI")]
    Doi,
    #[serde(rename = "Handle")]
    Handle,
    #[serde(rename = "ARK")]
    Ark,
    #[serde(rename = "ORCID")]
    Orcid,
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "UUID")]
    Uuid,
}

impl IdentifierScheme {
    pub const ALL: &'static [Self] = &[
        Self::Doi,
        Self::Handle,
        Self::Ark,
        Self::Orcid,
        Self::Url,
        Self::Uuid,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doi => "DOI",
            Self::Handle => "Handle",
            Self::Ark => "ARK",
            Self::Orcid => "ORCID",
            Self::Url => "URL",
            Self::Uuid => "UUID",
        }
    }
}

impl_vocabulary!(IdentifierScheme, "identifier_scheme");

/// How a subject term was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectScheme {
    Keyword,
    Classification,
    FieldOfScience,
}

impl SubjectScheme {
    pub const ALL: &'static [Self] = &[Self::Keyword, Self::Classification, Self::FieldOfScience];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Classification => "classification",
            Self::FieldOfScience => "field_of_science",
        }
    }
}

impl_vocabulary!(SubjectScheme, "subject_scheme");

/// Meaning of a dated time reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeReferenceType {
    Created,
    Updated,
    Issued,
    Available,
    Submitted,
    Accepted,
    Collected,
}

impl TimeReferenceType {
    pub const ALL: &'static [Self] = &[
        Self::Created,
        Self::Updated,
        Self::Issued,
        Self::Available,
        Self::Submitted,
        Self::Accepted,
        Self::Collected,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Issued => "issued",
            Self::Available => "available",
            Self::Submitted => "submitted",
            Self::Accepted => "accepted",
            Self::Collected => "collected",
        }
    }
}

impl_vocabulary!(TimeReferenceType, "time_reference_type");

/// Granularity of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Place,
    Region,
    Country,
    Coordinates,
}

impl LocationType {
    pub const ALL: &'static [Self] = &[Self::Place, Self::Region, Self::Country, Self::Coordinates];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Place => "place",
            Self::Region => "region",
            Self::Country => "country",
            Self::Coordinates => "coordinates",
        }
    }
}

impl_vocabulary!(LocationType, "location_type");

/// Media types of downloadable distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionFormat {
    #[serde(rename = "text/csv")]
    Csv,
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/xml")]
    Xml,
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "application/zip")]
    Zip,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "text/plain")]
    PlainText,
}

impl DistributionFormat {
    pub const ALL: &'static [Self] = &[
        Self::Csv,
        Self::Json,
        Self::Xml,
        Self::Pdf,
        Self::Zip,
        Self::Html,
        Self::PlainText,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Pdf => "application/pdf",
            Self::Zip => "application/zip",
            Self::Html => "text/html",
            Self::PlainText => "text/plain",
        }
    }
}

impl_vocabulary!(DistributionFormat, "distribution_format");

/// General kind of the described resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Dataset,
    Software,
    Text,
    Image,
    Audiovisual,
    Collection,
    Other,
}

impl ResourceType {
    pub const ALL: &'static [Self] = &[
        Self::Dataset,
        Self::Software,
        Self::Text,
        Self::Image,
        Self::Audiovisual,
        Self::Collection,
        Self::Other,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Software => "software",
            Self::Text => "text",
            Self::Image => "image",
            Self::Audiovisual => "audiovisual",
            Self::Collection => "collection",
            Self::Other => "other",
        }
    }
}

impl_vocabulary!(ResourceType, "resource_type");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_strings() {
        assert_eq!(AgentRole::Creator.as_str(), "creator");
        assert_eq!(AgentRole::ContactPerson.as_str(), "contact_person");
        assert_eq!(AgentRole::ContactPerson.to_string(), "contact_person");
    }

    #[test]
    fn test_identifier_scheme_wire_strings() {
        assert_eq!(IdentifierScheme::Doi.as_str(), "DOI");
        assert_eq!(IdentifierScheme::Handle.as_str(), "Handle");
        assert_eq!(IdentifierScheme::Ark.as_str(), "ARK");
    }

    #[test]
    fn test_format_wire_strings() {
        assert_eq!(DistributionFormat::Csv.as_str(), "text/csv");
        assert_eq!(DistributionFormat::PlainText.as_str(), "text/plain");
    }

    #[test]
    fn test_resource_type_wire_strings() {
        assert_eq!(ResourceType::Audiovisual.as_str(), "audiovisual");
        assert_eq!("software".parse::<ResourceType>().unwrap(), ResourceType::Software);
        assert!("Dataset".parse::<ResourceType>().is_err());
        assert_eq!(ResourceType::ALL.len(), 7);
    }

    #[test]
    fn test_parse_every_variant() {
        for lang in Language::ALL {
            assert_eq!(lang.as_str().parse::<Language>().unwrap(), *lang);
        }
        for scheme in SubjectScheme::ALL {
            assert_eq!(scheme.as_str().parse::<SubjectScheme>().unwrap(), *scheme);
        }
        for kind in LocationType::ALL {
            assert_eq!(kind.as_str().parse::<LocationType>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_parse_is_exact() {
        // Wire strings are case sensitive
        assert!("doi".parse::<IdentifierScheme>().is_err());
        assert!("CS".parse::<Language>().is_err());
        assert!(" creator".parse::<AgentRole>().is_err());
    }

    #[test]
    fn test_unknown_value_error_lists_allowed() {
        let err = "robot".parse::<AgentType>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("agent_type"));
        assert!(message.contains("robot"));
        assert!(message.contains("person, organization"));
    }

    #[test]
    fn test_default_language_is_czech() {
        assert_eq!(Language::default(), Language::Cs);
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        assert_eq!(
            serde_json::to_string(&AgentRole::ContactPerson).unwrap(),
            "\"contact_person\""
        );
        assert_eq!(
            serde_json::to_string(&DistributionFormat::Json).unwrap(),
            "\"application/json\""
        );
        assert_eq!(
            serde_json::to_string(&IdentifierScheme::Orcid).unwrap(),
            "\"ORCID\""
        );
    }
}
