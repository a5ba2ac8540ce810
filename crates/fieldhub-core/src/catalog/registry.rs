//! Field type registry.
//!
//! Maps each field type tag to its storage representation and the codec
//! that turns caller values into the opaque text kept in value tables.

use super::types::FieldType;
use crate::error::Error;
use crate::storage::naming::validate_name;
use dashmap::DashMap;
use serde_json::Value;

/// Encode a caller value into stored text. `Err` carries the reason.
pub type EncodeFn = fn(&Value) -> Result<String, String>;

/// Decode stored text back into a value. `Err` carries the reason.
pub type DecodeFn = fn(&str) -> Result<Value, String>;

/// How a field type is laid out in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageRepr {
    /// Free text.
    Text,
    /// Decimal number in its canonical JSON form.
    Number,
    /// `"1"` or `"0"`.
    Boolean,
    /// A JSON document.
    Json,
}

/// Codec and representation of one field type.
#[derive(Debug, Clone, Copy)]
pub struct FieldTypeSpec {
    /// Storage representation.
    pub repr: StorageRepr,
    /// Value encoder.
    pub encode: EncodeFn,
    /// Value decoder.
    pub decode: DecodeFn,
}

impl FieldTypeSpec {
    /// Create a spec.
    pub fn new(repr: StorageRepr, encode: EncodeFn, decode: DecodeFn) -> Self {
        Self {
            repr,
            encode,
            decode,
        }
    }
}

/// Registry of field type codecs.
///
/// Built-in types are always present. Plugin types are added with
/// [`FieldTypeRegistry::register`] and addressed as [`FieldType::Custom`].
pub struct FieldTypeRegistry {
    specs: DashMap<String, FieldTypeSpec>,
}

impl FieldTypeRegistry {
    /// Create a registry holding the built-in types.
    pub fn new() -> Self {
        let specs = DashMap::new();
        for field_type in FieldType::BUILTIN {
            if let Some(spec) = builtin_spec(&field_type) {
                specs.insert(field_type.tag().to_string(), spec);
            }
        }
        Self { specs }
    }

    /// Register a plugin field type.
    ///
    /// Built-in tags cannot be replaced.
    pub fn register(&self, tag: &str, spec: FieldTypeSpec) -> Result<FieldType, Error> {
        validate_name(tag)?;
        let field_type = FieldType::from_tag(tag);
        if field_type.is_builtin() {
            return Err(Error::AlreadyExists(format!("built-in field type {tag}")));
        }
        self.specs.insert(tag.to_string(), spec);
        Ok(field_type)
    }

    /// Check whether a type has a codec.
    pub fn contains(&self, field_type: &FieldType) -> bool {
        self.specs.contains_key(field_type.tag())
    }

    /// Look up the spec of a type.
    pub fn spec(&self, field_type: &FieldType) -> Result<FieldTypeSpec, Error> {
        self.specs
            .get(field_type.tag())
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::UnknownFieldType(field_type.tag().to_string()))
    }

    /// Storage representation of a type.
    pub fn repr(&self, field_type: &FieldType) -> Result<StorageRepr, Error> {
        Ok(self.spec(field_type)?.repr)
    }

    /// Encode a value for storage.
    pub fn encode(&self, field_type: &FieldType, value: &Value) -> Result<String, Error> {
        let spec = self.spec(field_type)?;
        (spec.encode)(value).map_err(|reason| Error::InvalidValue {
            field_type: field_type.tag().to_string(),
            reason,
        })
    }

    /// Decode stored text.
    pub fn decode(&self, field_type: &FieldType, data: &str) -> Result<Value, Error> {
        let spec = self.spec(field_type)?;
        (spec.decode)(data).map_err(|reason| Error::InvalidValue {
            field_type: field_type.tag().to_string(),
            reason,
        })
    }

    /// Tags of every registered type, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.specs.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_spec(field_type: &FieldType) -> Option<FieldTypeSpec> {
    let spec = match field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Select => {
            FieldTypeSpec::new(StorageRepr::Text, encode_string, decode_string)
        }
        FieldType::Number => FieldTypeSpec::new(StorageRepr::Number, encode_number, decode_number),
        FieldType::Email => FieldTypeSpec::new(StorageRepr::Text, encode_email, decode_string),
        FieldType::Url => FieldTypeSpec::new(StorageRepr::Text, encode_url, decode_string),
        FieldType::Boolean => {
            FieldTypeSpec::new(StorageRepr::Boolean, encode_boolean, decode_boolean)
        }
        FieldType::Date => FieldTypeSpec::new(StorageRepr::Text, encode_date, decode_string),
        FieldType::Image | FieldType::Relation => {
            FieldTypeSpec::new(StorageRepr::Number, encode_record_ref, decode_record_ref)
        }
        FieldType::Json => FieldTypeSpec::new(StorageRepr::Json, encode_json, decode_json),
        FieldType::Custom(_) => return None,
    };
    Some(spec)
}

fn expect_str(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {value}"))
}

fn encode_string(value: &Value) -> Result<String, String> {
    expect_str(value).map(str::to_string)
}

fn decode_string(data: &str) -> Result<Value, String> {
    Ok(Value::String(data.to_string()))
}

fn encode_number(value: &Value) -> Result<String, String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => canonical_number(s.trim())
            .map(|n| n.to_string())
            .ok_or_else(|| format!("{s:?} is not a finite number")),
        other => Err(format!("expected a number, got {other}")),
    }
}

/// Parse free-form numeric text into the form `decode_number` reads back.
///
/// JSON number syntax is kept as written. Anything else `f64` accepts
/// (`+5`, `.5`, `1.`, `007`) is rebuilt from the parsed value.
fn canonical_number(text: &str) -> Option<serde_json::Number> {
    if let Ok(n) = serde_json::from_str::<serde_json::Number>(text) {
        return Some(n);
    }
    let n = text.parse::<f64>().ok().filter(|n| n.is_finite())?;
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Some(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
    }
}

fn decode_number(data: &str) -> Result<Value, String> {
    serde_json::from_str::<serde_json::Number>(data)
        .map(Value::Number)
        .map_err(|e| format!("stored number {data:?} is corrupt: {e}"))
}

fn encode_email(value: &Value) -> Result<String, String> {
    let s = expect_str(value)?;
    match s.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(s.to_string()),
        _ => Err(format!("{s:?} is not an email address")),
    }
}

fn encode_url(value: &Value) -> Result<String, String> {
    let s = expect_str(value)?;
    match s.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphabetic())
                && !rest.is_empty() =>
        {
            Ok(s.to_string())
        }
        _ => Err(format!("{s:?} is not an absolute URL")),
    }
}

fn encode_boolean(value: &Value) -> Result<String, String> {
    match value {
        Value::Bool(true) => Ok("1".to_string()),
        Value::Bool(false) => Ok("0".to_string()),
        other => Err(format!("expected a boolean, got {other}")),
    }
}

fn decode_boolean(data: &str) -> Result<Value, String> {
    match data {
        "1" => Ok(Value::Bool(true)),
        "0" => Ok(Value::Bool(false)),
        other => Err(format!("stored boolean {other:?} is corrupt")),
    }
}

fn encode_date(value: &Value) -> Result<String, String> {
    let s = expect_str(value)?;
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .map_err(|e| format!("{s:?} is not a YYYY-MM-DD date: {e}"))
}

fn encode_record_ref(value: &Value) -> Result<String, String> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    id.map(|id| id.to_string())
        .ok_or_else(|| format!("expected a record id, got {value}"))
}

fn decode_record_ref(data: &str) -> Result<Value, String> {
    data.parse::<u64>()
        .map(Value::from)
        .map_err(|e| format!("stored record id {data:?} is corrupt: {e}"))
}

fn encode_json(value: &Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn decode_json(data: &str) -> Result<Value, String> {
    serde_json::from_str(data).map_err(|e| e.to_string())
}
