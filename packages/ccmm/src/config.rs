//! Configuration constants and input validation functions.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use url::Url;

use crate::error::{CcmmError, Result};

/// Schema used when the caller does not name one.
pub const DEFAULT_SCHEMA_NAME: &str = "dataset";

/// File name of the XSD inside each schema directory.
pub const SCHEMA_FILE_NAME: &str = "schema.xsd";

/// Bundled CCMM schema directory, relative to the crate root.
pub const BUNDLED_SCHEMA_DIR: &str = "schemas/CCMM";

/// Root element of every rendered document.
pub const ROOT_ELEMENT: &str = "dataset";

/// XML declaration written in front of saved documents.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Qualified name of the language attribute on text nodes.
pub const XML_LANG: &str = "xml:lang";

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Earliest accepted publication year.
pub const MIN_PUBLICATION_YEAR: i32 = 1000;

/// How many years past the current one a publication year may lie.
pub const PUBLICATION_YEAR_MARGIN: i32 = 10;

/// Publication year of a freshly created dataset.
pub const DEFAULT_PUBLICATION_YEAR: i32 = 2024;

/// Value emitted for `byte_size` on downloadable files.
///
/// The schema requires the element, but file sizes are not tracked.
pub const PLACEHOLDER_BYTE_SIZE: u64 = 1000;

/// Title emitted for a distribution that has none.
pub const DEFAULT_DISTRIBUTION_TITLE: &str = "Dataset file";

/// Access rights of the default terms of use (COAR "open access").
pub const DEFAULT_ACCESS_RIGHTS: &str = "http://purl.org/coar/access_right/c_abf2";

/// License of the default terms of use.
pub const DEFAULT_LICENSE: &str = "http://creativecommons.org/licenses/by/4.0/";

/// Description of the default terms of use.
pub const DEFAULT_TERMS_DESCRIPTION: &str = "Default terms of use";

/// Top-level element order mandated by the dataset schema.
///
/// `provenance`, `validation_result`, `funding_reference` and
/// `related_resource` are never produced by the renderer, but keep their
/// slots so loaded documents sort correctly.
pub const CANONICAL_ORDER: [&str; 21] = [
    "iri",
    "publication_year",
    "version",
    "title",
    "has_description",
    "alternate_title",
    "is_described_by",
    "identifier",
    "location",
    "provenance",
    "qualified_relation",
    "time_reference",
    "subject",
    "validation_result",
    "distribution",
    "funding_reference",
    "terms_of_use",
    "related_resource",
    "resource_type",
    "other_language",
    "primary_language",
];

/// Conservative e-mail shape: local part, `@`, dotted domain, alphabetic TLD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// Reject empty or whitespace-only strings.
///
/// # Arguments
/// * `value` - The value to check
/// * `field` - Field name used in the error
///
/// # Returns
/// * `Ok(())` if the value has non-whitespace content
/// * `Err(CcmmError::Validation)` otherwise
///
/// # Examples
/// ```
/// use ccmm_metadata::config::validate_non_empty;
///
/// assert!(validate_non_empty("Dataset", "title").is_ok());
/// assert!(validate_non_empty("   ", "title").is_err());
/// ```
pub fn validate_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CcmmError::validation(field, "cannot be empty"));
    }
    Ok(())
}

/// Validate URI shape: it must parse and carry both a scheme and an authority.
///
/// The authority has to be written out as `scheme://host`. Forms such as
/// `https:example.com` are rejected even though a URL parser would repair
/// them.
///
/// # Arguments
/// * `uri` - The URI to check
/// * `field` - Field name used in the error
///
/// # Returns
/// * `Ok(())` if the URI has a scheme and a non-empty host
/// * `Err(CcmmError::Validation)` otherwise
///
/// # Examples
/// ```
/// use ccmm_metadata::config::validate_uri;
///
/// assert!(validate_uri("https://example.com/data", "iri").is_ok());
/// assert!(validate_uri("invalid-uri", "iri").is_err());
/// assert!(validate_uri("https:example.com", "iri").is_err());
/// ```
pub fn validate_uri(uri: &str, field: &str) -> Result<()> {
    validate_non_empty(uri, field)?;

    let parsed = Url::parse(uri.trim())
        .map_err(|e| CcmmError::validation(field, format!("invalid URI format '{uri}': {e}")))?;

    let has_authority = uri
        .trim()
        .split_once("://")
        .is_some_and(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'));
    let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
    if parsed.scheme().is_empty() || !has_host || !has_authority {
        return Err(CcmmError::validation(
            field,
            format!("invalid URI format '{uri}': scheme and host are required"),
        ));
    }
    Ok(())
}

/// Validate an optional URI, accepting `None`.
///
/// # Returns
/// * `Ok(())` for `None` or a URI accepted by [`validate_uri`]
/// * `Err(CcmmError::Validation)` otherwise
pub fn validate_optional_uri(uri: Option<&str>, field: &str) -> Result<()> {
    match uri {
        Some(uri) => validate_uri(uri, field),
        None => Ok(()),
    }
}

/// Latest accepted publication year (current year plus the margin).
pub fn max_publication_year() -> i32 {
    chrono::Local::now().year() + PUBLICATION_YEAR_MARGIN
}

/// Validate the publication year range `[1000, current_year + 10]`.
///
/// # Arguments
/// * `year` - Publication year to check
///
/// # Returns
/// * `Ok(())` if the year is inside the range, bounds included
/// * `Err(CcmmError::Validation)` naming `publication_year` otherwise
///
/// # Examples
/// ```
/// use ccmm_metadata::config::validate_year;
///
/// assert!(validate_year(1000).is_ok());
/// assert!(validate_year(999).is_err());
/// ```
pub fn validate_year(year: i32) -> Result<()> {
    let max = max_publication_year();
    if !(MIN_PUBLICATION_YEAR..=max).contains(&year) {
        return Err(CcmmError::validation(
            "publication_year",
            format!("{year} is outside the range {MIN_PUBLICATION_YEAR}..={max}"),
        ));
    }
    Ok(())
}

/// Validate e-mail shape.
///
/// # Arguments
/// * `email` - Address to check
/// * `field` - Field name used in the error
///
/// # Returns
/// * `Ok(())` if the address matches the local-part@domain shape
/// * `Err(CcmmError::Validation)` otherwise
pub fn validate_email(email: &str, field: &str) -> Result<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(CcmmError::validation(
            field,
            format!("invalid email format '{email}'"),
        ))
    }
}
