//! Field type tags.

use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Field types supported by FieldHub.
///
/// Built-in types are closed variants; third-party types registered with a
/// [`FieldTypeRegistry`](super::FieldTypeRegistry) use [`FieldType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    /// Single-line text.
    Text,
    /// Multi-line text.
    Textarea,
    /// Finite number.
    Number,
    /// Email address.
    Email,
    /// Absolute URL.
    Url,
    /// True/false toggle.
    Boolean,
    /// One choice out of a list.
    Select,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Reference to an attachment record.
    Image,
    /// Reference to another content record.
    Relation,
    /// Arbitrary JSON document.
    Json,
    /// Plugin-provided type, identified by its tag.
    Custom(String),
}

impl FieldType {
    /// All built-in types.
    pub const BUILTIN: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Number,
        FieldType::Email,
        FieldType::Url,
        FieldType::Boolean,
        FieldType::Select,
        FieldType::Date,
        FieldType::Image,
        FieldType::Relation,
        FieldType::Json,
    ];

    /// The string tag of this type.
    pub fn tag(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Boolean => "boolean",
            FieldType::Select => "select",
            FieldType::Date => "date",
            FieldType::Image => "image",
            FieldType::Relation => "relation",
            FieldType::Json => "json",
            FieldType::Custom(tag) => tag,
        }
    }

    /// Parse a tag. Unrecognised tags become [`FieldType::Custom`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "number" => FieldType::Number,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "boolean" => FieldType::Boolean,
            "select" => FieldType::Select,
            "date" => FieldType::Date,
            "image" => FieldType::Image,
            "relation" => FieldType::Relation,
            "json" => FieldType::Json,
            other => FieldType::Custom(other.to_string()),
        }
    }

    /// Check if this is a built-in type.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, FieldType::Custom(_))
    }

    /// Check if values of this type reference another record.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Image | FieldType::Relation)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from_tag(&tag)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.tag().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_builtin() {
        for field_type in FieldType::BUILTIN {
            assert_eq!(FieldType::from_tag(field_type.tag()), field_type);
            assert!(field_type.is_builtin());
        }
    }

    #[test]
    fn test_unknown_tag_is_custom() {
        let color = FieldType::from_tag("color_picker");
        assert_eq!(color, FieldType::Custom("color_picker".into()));
        assert!(!color.is_builtin());
        assert_eq!(color.to_string(), "color_picker");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&FieldType::Number).unwrap();
        assert_eq!(json, "\"number\"");

        let parsed: FieldType = serde_json::from_str("\"relation\"").unwrap();
        assert_eq!(parsed, FieldType::Relation);
        assert!(parsed.is_reference());
    }
}
