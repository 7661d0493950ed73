//! Value checks for simple types and the supported XSD built-ins.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::xsd::{Facets, SimpleType, TypeRef, XsdSchema};

/// Bound on restriction chains, guards against self-referencing types.
const MAX_DERIVATION_DEPTH: usize = 32;

#[allow(clippy::expect_used)] // Static regexes that are guaranteed to be valid
static GYEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d{4,}(Z|[+-]\d{2}:\d{2})?$").expect("valid regex"));

#[allow(clippy::expect_used)]
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("valid regex"));

#[allow(clippy::expect_used)]
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("valid regex"));

#[allow(clippy::expect_used)]
static LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").expect("valid regex")
});

impl XsdSchema {
    /// Check `value` against a simple type, returning a message on failure.
    pub(crate) fn check_simple(&self, type_ref: &TypeRef, value: &str) -> Result<(), String> {
        self.check_simple_at(type_ref, value, 0)
    }

    fn check_simple_at(&self, type_ref: &TypeRef, value: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_DERIVATION_DEPTH {
            return Err("type derivation chain is too deep".to_string());
        }
        match type_ref {
            TypeRef::Builtin(name) => check_builtin(name, value),
            TypeRef::Named(name) => match self.simple_types.get(name) {
                Some(simple) => self.check_simple_type(simple, value, depth + 1),
                None if self.complex_types.contains_key(name) => {
                    Err(format!("complex type '{name}' used where a simple type is required"))
                }
                None => Err(format!("unknown type '{name}'")),
            },
            TypeRef::Simple(simple) => self.check_simple_type(simple, value, depth + 1),
            TypeRef::Complex(_) => {
                Err("anonymous complex type used where a simple type is required".to_string())
            }
        }
    }

    fn check_simple_type(&self, simple: &SimpleType, value: &str, depth: usize) -> Result<(), String> {
        match simple {
            SimpleType::Restriction { base, facets } => {
                self.check_simple_at(base, value, depth)?;
                let value = if self.preserves_whitespace(base, depth) {
                    value
                } else {
                    value.trim()
                };
                check_facets(facets, value)
            }
            SimpleType::List { item } => {
                for token in value.split_whitespace() {
                    self.check_simple_at(item, token, depth)?;
                }
                Ok(())
            }
            SimpleType::Union { members } => {
                if members
                    .iter()
                    .any(|member| self.check_simple_at(member, value, depth).is_ok())
                {
                    Ok(())
                } else {
                    Err(format!("'{value}' matches none of the union member types"))
                }
            }
        }
    }

    /// Whether the primitive at the root of `type_ref` keeps whitespace.
    pub(crate) fn preserves_whitespace(&self, type_ref: &TypeRef, depth: usize) -> bool {
        if depth > MAX_DERIVATION_DEPTH {
            return false;
        }
        let simple = match type_ref {
            TypeRef::Builtin(name) => {
                return matches!(name.as_str(), "string" | "anySimpleType" | "anyType");
            }
            TypeRef::Named(name) => match self.simple_types.get(name) {
                Some(simple) => simple,
                None => return false,
            },
            TypeRef::Simple(simple) => simple,
            TypeRef::Complex(_) => return false,
        };
        match simple {
            SimpleType::Restriction { base, .. } => self.preserves_whitespace(base, depth + 1),
            SimpleType::List { .. } | SimpleType::Union { .. } => false,
        }
    }
}

pub(super) fn check_facets(facets: &Facets, value: &str) -> Result<(), String> {
    if !facets.enumeration.is_empty() && !facets.enumeration.iter().any(|v| v == value) {
        return Err(format!(
            "'{value}' is not one of the allowed values: {}",
            facets.enumeration.join(", ")
        ));
    }

    // Patterns of one restriction step are alternatives
    if !facets.patterns.is_empty() && !facets.patterns.iter().any(|p| p.is_match(value)) {
        return Err(format!("'{value}' does not match the required pattern"));
    }

    let chars = value.chars().count();
    if let Some(length) = facets.length {
        if chars != length {
            return Err(format!("'{value}' must be exactly {length} characters long"));
        }
    }
    if let Some(min) = facets.min_length {
        if chars < min {
            return Err(format!("'{value}' is shorter than {min} characters"));
        }
    }
    if let Some(max) = facets.max_length {
        if chars > max {
            return Err(format!("'{value}' is longer than {max} characters"));
        }
    }

    let has_bounds = facets.min_inclusive.is_some()
        || facets.max_inclusive.is_some()
        || facets.min_exclusive.is_some()
        || facets.max_exclusive.is_some();
    if has_bounds {
        let number: f64 = value
            .parse()
            .map_err(|_| format!("'{value}' is not numeric"))?;
        let in_range = facets.min_inclusive.is_none_or(|min| number >= min)
            && facets.max_inclusive.is_none_or(|max| number <= max)
            && facets.min_exclusive.is_none_or(|min| number > min)
            && facets.max_exclusive.is_none_or(|max| number < max);
        if !in_range {
            return Err(format!("'{value}' is outside the allowed range"));
        }
    }
    Ok(())
}

/// Drop a trailing `Z` or `+hh:mm` / `-hh:mm` zone designator.
fn strip_timezone(value: &str) -> &str {
    if let Some(stripped) = value.strip_suffix('Z') {
        return stripped;
    }
    let bytes = value.as_bytes();
    let len = bytes.len();
    if len > 6 && matches!(bytes[len - 6], b'+' | b'-') && bytes[len - 3] == b':' {
        return &value[..len - 6];
    }
    value
}

fn integer_range(name: &str) -> Option<(i128, i128)> {
    let range = match name {
        "integer" => (i128::MIN, i128::MAX),
        "nonNegativeInteger" => (0, i128::MAX),
        "positiveInteger" => (1, i128::MAX),
        "nonPositiveInteger" => (i128::MIN, 0),
        "negativeInteger" => (i128::MIN, -1),
        "long" => (i64::MIN.into(), i64::MAX.into()),
        "int" => (i32::MIN.into(), i32::MAX.into()),
        "short" => (i16::MIN.into(), i16::MAX.into()),
        "byte" => (i8::MIN.into(), i8::MAX.into()),
        "unsignedLong" => (0, u64::MAX.into()),
        "unsignedInt" => (0, u32::MAX.into()),
        "unsignedShort" => (0, u16::MAX.into()),
        "unsignedByte" => (0, u8::MAX.into()),
        _ => return None,
    };
    Some(range)
}

fn check_builtin(name: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    let invalid = || format!("'{trimmed}' is not a valid xs:{name}");

    if let Some((min, max)) = integer_range(name) {
        if !INTEGER.is_match(trimmed) {
            return Err(invalid());
        }
        // Digits beyond i128 only matter for the unbounded integer types
        return match trimmed.trim_start_matches('+').parse::<i128>() {
            Ok(number) if (min..=max).contains(&number) => Ok(()),
            Ok(_) => Err(format!("'{trimmed}' is out of range for xs:{name}")),
            Err(_) if name == "integer" => Ok(()),
            Err(_) => Err(invalid()),
        };
    }

    let ok = match name {
        "boolean" => matches!(trimmed, "true" | "false" | "1" | "0"),
        "date" => NaiveDate::parse_from_str(strip_timezone(trimmed), "%Y-%m-%d").is_ok(),
        "dateTime" => {
            NaiveDateTime::parse_from_str(strip_timezone(trimmed), "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        }
        "gYear" => GYEAR.is_match(trimmed),
        "decimal" => DECIMAL.is_match(trimmed),
        "float" | "double" => {
            matches!(trimmed, "INF" | "-INF" | "NaN") || trimmed.parse::<f64>().is_ok()
        }
        "language" => LANGUAGE.is_match(trimmed),
        // String family, anyURI and unsupported built-ins accept any text
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dates() {
        assert!(check_builtin("date", "2024-01-15").is_ok());
        assert!(check_builtin("date", "2024-01-15Z").is_ok());
        assert!(check_builtin("date", "2024-01-15+02:00").is_ok());
        assert!(check_builtin("date", "2024-13-01").is_err());
        assert!(check_builtin("date", "15.1.2024").is_err());
        assert!(check_builtin("dateTime", "2024-01-15T10:30:00").is_ok());
        assert!(check_builtin("dateTime", "2024-01-15T10:30:00.5Z").is_ok());
        assert!(check_builtin("dateTime", "2024-01-15").is_err());
    }

    #[test]
    fn test_builtin_year() {
        assert!(check_builtin("gYear", "2024").is_ok());
        assert!(check_builtin("gYear", "12024").is_ok());
        assert!(check_builtin("gYear", "24").is_err());
        assert!(check_builtin("gYear", "year").is_err());
    }

    #[test]
    fn test_builtin_integers() {
        assert!(check_builtin("integer", "-42").is_ok());
        assert!(check_builtin("nonNegativeInteger", "0").is_ok());
        assert!(check_builtin("nonNegativeInteger", "-1").is_err());
        assert!(check_builtin("positiveInteger", "0").is_err());
        assert!(check_builtin("byte", "128").is_err());
        assert!(check_builtin("integer", "1.5").is_err());
    }

    #[test]
    fn test_builtin_misc() {
        assert!(check_builtin("boolean", "true").is_ok());
        assert!(check_builtin("boolean", "yes").is_err());
        assert!(check_builtin("decimal", "3.14").is_ok());
        assert!(check_builtin("decimal", "3.1.4").is_err());
        assert!(check_builtin("language", "cs").is_ok());
        assert!(check_builtin("language", "en-GB").is_ok());
        assert!(check_builtin("language", "not a tag").is_err());
        assert!(check_builtin("anyURI", "creator").is_ok());
        assert!(check_builtin("somethingNew", "whatever").is_ok());
    }

    #[test]
    fn test_strip_timezone() {
        assert_eq!(strip_timezone("2024-01-15Z"), "2024-01-15");
        assert_eq!(strip_timezone("2024-01-15-05:00"), "2024-01-15");
        assert_eq!(strip_timezone("2024-01-15"), "2024-01-15");
    }

    #[test]
    fn test_facets() {
        let facets = Facets {
            enumeration: vec!["a".to_string(), "b".to_string()],
            ..Facets::default()
        };
        assert!(check_facets(&facets, "a").is_ok());
        assert!(check_facets(&facets, "c").is_err());

        let facets = Facets {
            min_inclusive: Some(1.0),
            max_exclusive: Some(10.0),
            ..Facets::default()
        };
        assert!(check_facets(&facets, "1").is_ok());
        assert!(check_facets(&facets, "10").is_err());
        assert!(check_facets(&facets, "ten").is_err());

        let facets = Facets {
            max_length: Some(3),
            ..Facets::default()
        };
        assert!(check_facets(&facets, "abc").is_ok());
        assert!(check_facets(&facets, "abcd").is_err());
    }
}
