//! Evaluation context for location rules.
//!
//! A context maps attribute names to the ambient facts of the current
//! request: record type, record id, taxonomy membership, user role and so on.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Value of one context attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// A single value.
    One(String),
    /// A set of values, compared by membership.
    Many(Vec<String>),
}

impl ContextValue {
    /// Equality for single values, membership for sets.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            ContextValue::One(value) => value == expected,
            ContextValue::Many(values) => values.iter().any(|value| value == expected),
        }
    }

    /// Check whether the value carries anything.
    pub fn is_present(&self) -> bool {
        match self {
            ContextValue::One(value) => !value.is_empty(),
            ContextValue::Many(values) => !values.is_empty(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::One(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::One(value)
    }
}

impl From<u64> for ContextValue {
    fn from(value: u64) -> Self {
        ContextValue::One(value.to_string())
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(values: Vec<String>) -> Self {
        ContextValue::Many(values)
    }
}

impl From<Vec<&str>> for ContextValue {
    fn from(values: Vec<&str>) -> Self {
        ContextValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

fn scalar(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("unsupported context value: {other}")),
    }
}

impl TryFrom<serde_json::Value> for ContextValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(scalar)
                .collect::<Result<Vec<_>, _>>()
                .map(ContextValue::Many),
            other => scalar(other).map(ContextValue::One),
        }
    }
}

// Numbers and booleans are accepted and kept in their string form.
impl<'de> Deserialize<'de> for ContextValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        ContextValue::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Attribute map a rule set is evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationContext {
    attributes: BTreeMap<String, ContextValue>,
}

impl LocationContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.set(attribute, value);
        self
    }

    /// Set an attribute.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<ContextValue>) {
        self.attributes.insert(attribute.into(), value.into());
    }

    /// Look up an attribute.
    pub fn get(&self, attribute: &str) -> Option<&ContextValue> {
        self.attributes.get(attribute)
    }

    /// Set the record type.
    pub fn with_record_type(self, record_type: &str) -> Self {
        self.with("record_type", record_type)
    }

    /// Set the record id.
    pub fn with_record_id(self, record_id: u64) -> Self {
        self.with("record_id", record_id)
    }

    /// Set the terms of one taxonomy attached to the record.
    pub fn with_taxonomy(self, taxonomy: &str, term_ids: Vec<&str>) -> Self {
        self.with(format!("taxonomy:{taxonomy}"), term_ids)
    }

    /// Set the roles of the current user.
    pub fn with_user_roles(self, roles: Vec<&str>) -> Self {
        self.with("user_role", roles)
    }

    /// Set the current user id.
    pub fn with_user_id(self, user_id: u64) -> Self {
        self.with("user_id", user_id)
    }

    /// Set the page template slug.
    pub fn with_page_template(self, template: &str) -> Self {
        self.with("page_template", template)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check whether no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        assert!(ContextValue::from("post").contains("post"));
        assert!(!ContextValue::from("post").contains("page"));
        assert!(ContextValue::from(vec!["12", "14"]).contains("14"));
        assert!(!ContextValue::from(vec!["12"]).contains("1"));
        assert!(!ContextValue::Many(Vec::new()).is_present());
    }

    #[test]
    fn test_context_from_json() {
        let context: LocationContext = serde_json::from_str(
            r#"{ "record_type": "post", "record_id": 42, "taxonomy:category": [12, "14"] }"#,
        )
        .unwrap();
        assert_eq!(context.len(), 3);
        assert_eq!(context.get("record_id"), Some(&ContextValue::from("42")));
        assert!(context.get("taxonomy:category").unwrap().contains("12"));
        assert!(context.get("user_role").is_none());

        assert!(serde_json::from_str::<LocationContext>(r#"{ "record_type": {} }"#).is_err());
    }

    #[test]
    fn test_builders() {
        let context = LocationContext::new()
            .with_record_type("post")
            .with_record_id(7)
            .with_taxonomy("category", vec!["12"])
            .with_user_roles(vec!["editor"])
            .with_user_id(3)
            .with_page_template("wide");
        assert_eq!(context.len(), 6);
        assert!(context.get("taxonomy:category").unwrap().contains("12"));
        assert_eq!(context.get("user_id"), Some(&ContextValue::from("3")));
    }
}
