//! Identifier validation and table name derivation.
//!
//! Caller-supplied group and field names never reach the backing store
//! directly. Names are validated, reduced to a slug, and table names are
//! built from the slug only.

use crate::error::Error;

/// Maximum length of a group or field name.
pub const MAX_NAME_LEN: usize = 64;

/// Prefix of every per-group table.
const TABLE_PREFIX: &str = "group:";

/// Check that a name is storage-safe.
///
/// Accepts 1..=64 ASCII letters, digits, `_` or `-`, starting with a letter
/// or digit.
pub fn validate_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
        _ => false,
    };

    if valid && name.len() <= MAX_NAME_LEN {
        Ok(())
    } else {
        Err(Error::InvalidName(name.to_string()))
    }
}

/// Reduce a validated name to its table slug.
///
/// Distinct names may share a slug (`Hero-Banner` and `hero_banner`); the
/// group registry rejects the second one.
pub fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Definition table name for a slug.
pub fn fields_table(slug: &str) -> String {
    format!("{TABLE_PREFIX}{slug}:fields")
}

/// Value table name for a slug.
pub fn values_table(slug: &str) -> String {
    format!("{TABLE_PREFIX}{slug}:values")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["products", "hero_banner", "Hero-Banner", "a", "group2"] {
            assert!(validate_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        let too_long = "x".repeat(MAX_NAME_LEN + 1);
        for name in ["", "_hidden", "-x", "has space", "semi;colon", "naïve", "a:b", &too_long] {
            assert!(
                matches!(validate_name(name), Err(Error::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hero-Banner"), "hero_banner");
        assert_eq!(slugify("products"), "products");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(fields_table("products"), "group:products:fields");
        assert_eq!(values_table("products"), "group:products:values");
    }
}
