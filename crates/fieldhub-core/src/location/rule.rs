//! Location rule definitions.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

/// What a location rule tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LocationType {
    /// Record type (`post`, `page`, `product`, ...).
    RecordType,
    /// A specific record id.
    Record,
    /// Taxonomy term attached to the record; value is `<taxonomy>:<term_id>`.
    TaxonomyTerm,
    /// Page template slug; `default` matches records without a template.
    PageTemplate,
    /// Role of the current user.
    UserRole,
    /// A specific user id.
    User,
    /// Admin screen the group is rendered on.
    AdminSurface,
    /// Menu; `all` matches any menu.
    Menu,
    /// Attachment type; `all` matches any attachment.
    Attachment,
    /// Comment type; `all` matches any comment.
    Comment,
    /// Options page slug.
    OptionsSurface,
    /// Unrecognised type. Never matches.
    Unknown(String),
}

impl LocationType {
    /// String tag of the type.
    pub fn tag(&self) -> &str {
        match self {
            LocationType::RecordType => "record_type",
            LocationType::Record => "record",
            LocationType::TaxonomyTerm => "taxonomy_term",
            LocationType::PageTemplate => "page_template",
            LocationType::UserRole => "user_role",
            LocationType::User => "user",
            LocationType::AdminSurface => "admin_surface",
            LocationType::Menu => "menu",
            LocationType::Attachment => "attachment",
            LocationType::Comment => "comment",
            LocationType::OptionsSurface => "options_surface",
            LocationType::Unknown(tag) => tag,
        }
    }

    /// Parse a tag. Unrecognised tags become [`LocationType::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "record_type" => LocationType::RecordType,
            "record" => LocationType::Record,
            "taxonomy_term" => LocationType::TaxonomyTerm,
            "page_template" => LocationType::PageTemplate,
            "user_role" => LocationType::UserRole,
            "user" => LocationType::User,
            "admin_surface" => LocationType::AdminSurface,
            "menu" => LocationType::Menu,
            "attachment" => LocationType::Attachment,
            "comment" => LocationType::Comment,
            "options_surface" => LocationType::OptionsSurface,
            other => LocationType::Unknown(other.to_string()),
        }
    }

    /// Context attribute the type reads, if it reads a fixed one.
    ///
    /// Taxonomy rules read `taxonomy:<name>`, derived from the rule value.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            LocationType::RecordType => Some("record_type"),
            LocationType::Record => Some("record_id"),
            LocationType::PageTemplate => Some("page_template"),
            LocationType::UserRole => Some("user_role"),
            LocationType::User => Some("user_id"),
            LocationType::AdminSurface => Some("admin_surface"),
            LocationType::Menu => Some("menu"),
            LocationType::Attachment => Some("attachment"),
            LocationType::Comment => Some("comment"),
            LocationType::OptionsSurface => Some("options_surface"),
            LocationType::TaxonomyTerm | LocationType::Unknown(_) => None,
        }
    }

    /// Whether the rule value `all` means "attribute present".
    pub fn accepts_all(&self) -> bool {
        matches!(
            self,
            LocationType::Menu | LocationType::Attachment | LocationType::Comment
        )
    }
}

impl From<String> for LocationType {
    fn from(tag: String) -> Self {
        LocationType::from_tag(&tag)
    }
}

impl From<LocationType> for String {
    fn from(location_type: LocationType) -> Self {
        location_type.tag().to_string()
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Rule comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Operator {
    /// Equality, or membership for collection-valued attributes.
    #[serde(rename = "==")]
    Equal,
    /// Negation of [`Operator::Equal`].
    #[serde(rename = "!=")]
    NotEqual,
}

impl Operator {
    /// Apply the operator to an equality/membership result.
    pub fn apply(self, hit: bool) -> bool {
        match self {
            Operator::Equal => hit,
            Operator::NotEqual => !hit,
        }
    }

    /// Symbol form.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            other => Err(Error::InvalidRule(format!("unknown operator: {other}"))),
        }
    }
}

/// One boolean test deciding whether a field group applies to a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LocationRule {
    /// What the rule tests.
    #[serde(rename = "type")]
    pub location_type: LocationType,
    /// Comparison operator.
    #[serde(alias = "op")]
    pub operator: Operator,
    /// Expected value.
    pub value: String,
}

impl LocationRule {
    /// Create a rule.
    pub fn new(location_type: LocationType, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            location_type,
            operator,
            value: value.into(),
        }
    }

    /// `location_type == value`.
    pub fn equals(location_type: LocationType, value: impl Into<String>) -> Self {
        Self::new(location_type, Operator::Equal, value)
    }

    /// `location_type != value`.
    pub fn not_equals(location_type: LocationType, value: impl Into<String>) -> Self {
        Self::new(location_type, Operator::NotEqual, value)
    }

    /// Split a taxonomy rule value into `(taxonomy, term_id)`.
    pub fn taxonomy_term(&self) -> Option<(&str, &str)> {
        if self.location_type != LocationType::TaxonomyTerm {
            return None;
        }
        let (taxonomy, term) = self.value.split_once(':')?;
        if taxonomy.is_empty() || term.is_empty() {
            return None;
        }
        Some((taxonomy, term))
    }

    /// Check that the rule can be stored.
    pub fn validate(&self) -> Result<(), Error> {
        if self.location_type == LocationType::TaxonomyTerm && self.taxonomy_term().is_none() {
            return Err(Error::InvalidRule(format!(
                "taxonomy rule value must be <taxonomy>:<term_id>, got {:?}",
                self.value
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LocationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.location_type, self.operator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_type_tags() {
        for tag in [
            "record_type",
            "record",
            "taxonomy_term",
            "page_template",
            "user_role",
            "user",
            "admin_surface",
            "menu",
            "attachment",
            "comment",
            "options_surface",
        ] {
            let parsed = LocationType::from_tag(tag);
            assert!(!matches!(parsed, LocationType::Unknown(_)), "{tag}");
            assert_eq!(parsed.tag(), tag);
        }
        assert_eq!(
            LocationType::from_tag("widget"),
            LocationType::Unknown("widget".into())
        );
    }

    #[test]
    fn test_rule_json() {
        let rule: LocationRule =
            serde_json::from_str(r#"{ "type": "record_type", "op": "==", "value": "post" }"#)
                .unwrap();
        assert_eq!(rule, LocationRule::equals(LocationType::RecordType, "post"));

        let json = serde_json::to_string(&LocationRule::not_equals(LocationType::UserRole, "editor"))
            .unwrap();
        assert_eq!(json, r#"{"type":"user_role","operator":"!=","value":"editor"}"#);

        let unknown: LocationRule =
            serde_json::from_str(r#"{ "type": "widget", "operator": "==", "value": "x" }"#).unwrap();
        assert_eq!(unknown.location_type, LocationType::Unknown("widget".into()));
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Equal);
        assert_eq!("!=".parse::<Operator>().unwrap(), Operator::NotEqual);
        assert!("<".parse::<Operator>().is_err());
        assert!(Operator::NotEqual.apply(false));
    }

    #[test]
    fn test_taxonomy_value_form() {
        let rule = LocationRule::equals(LocationType::TaxonomyTerm, "category:12");
        assert_eq!(rule.taxonomy_term(), Some(("category", "12")));
        assert!(rule.validate().is_ok());

        for bad in ["12", "category:", ":12"] {
            let rule = LocationRule::equals(LocationType::TaxonomyTerm, bad);
            assert!(matches!(rule.validate(), Err(Error::InvalidRule(_))), "{bad}");
        }
        assert!(LocationRule::equals(LocationType::RecordType, "post")
            .validate()
            .is_ok());
    }
}
