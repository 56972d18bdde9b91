//! Field definition types
//!
//! A `FieldDefinition` is the immutable, declarative description of one
//! input or configuration value: its type tag, type-specific constraints,
//! and common attributes. Definitions are assembled by the builders in
//! `field::builder` and never change after `build()`.
//!
//! Definitions carry declarations only. Checking happens in the compiler;
//! malformed declarations (empty enum set, bad pattern) are detected at
//! compile time, not here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output transforms applied to string values after validation succeeds.
///
/// Transforms never participate in validation itself; checks always run
/// against the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Strip leading and trailing whitespace
    Trim,
    /// Lowercase the entire value
    Lowercase,
    /// Uppercase the entire value
    Uppercase,
    /// Trim and collapse interior whitespace runs to single spaces
    Normalize,
}

/// Structural formats for string fields.
///
/// Each format is a fixed structural check; none of them perform I/O or
/// resolve anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Email,
    Url,
    Uuid,
    Ipv4,
    Ipv6,
    Base64,
    Jwt,
    Slug,
    HexColor,
    Semver,
}

impl StringFormat {
    /// Returns the format name used in error messages and doc fragments.
    pub fn name(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Url => "url",
            StringFormat::Uuid => "uuid",
            StringFormat::Ipv4 => "ipv4",
            StringFormat::Ipv6 => "ipv6",
            StringFormat::Base64 => "base64",
            StringFormat::Jwt => "jwt",
            StringFormat::Slug => "slug",
            StringFormat::HexColor => "hex-color",
            StringFormat::Semver => "semver",
        }
    }
}

/// Config-only validation sub-record.
///
/// Layered on top of the base type rules when a field is compiled in the
/// config namespace. `error_message` overrides the generated message for
/// any failure produced by this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigValidation {
    /// Minimum numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum numeric value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Regex pattern the value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Closed set of allowed values
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Allowed URL protocols (for url-typed config fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_protocols: Option<Vec<String>>,
    /// Message used instead of the generated one on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Field type tag plus type-specific constraints.
///
/// Recursive variants (`Array`, `Object`) box/contain full definitions so
/// constraints nest arbitrarily deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldType {
    /// UTF-8 string with optional length/pattern/format constraints
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<StringFormat>,
    },
    /// Numeric value with optional bounds
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        /// Whether the value must be an integer
        #[serde(default)]
        integer: bool,
        /// Declared decimal precision. Advisory only: surfaced in doc
        /// fragments, not enforced by the compiler.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    /// Boolean
    Boolean,
    /// Closed set of string values. The value set must be non-empty; an
    /// empty set is a schema-authoring error reported at compile time.
    Enum {
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        labels: Option<Vec<String>>,
    },
    /// Homogeneous array; the element definition is validated per index
    Array {
        items: Box<FieldDefinition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_items: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_items: Option<usize>,
        #[serde(default)]
        unique_items: bool,
    },
    /// Nested object with named properties
    Object {
        properties: BTreeMap<String, FieldDefinition>,
        /// Property names required regardless of their own `required` flag
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required_properties: Vec<String>,
        /// Whether undeclared keys are tolerated
        #[serde(default)]
        additional_properties: bool,
    },
    /// Calendar date (`YYYY-MM-DD`), inclusive bounds
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_date: Option<String>,
    },
    /// RFC 3339 date-time, inclusive bounds
    #[serde(rename = "datetime")]
    DateTime {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_date: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },
    /// Time of day (`HH:MM` or `HH:MM:SS`)
    Time,
    /// File descriptor object: `{ name, size, type }`
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_mime_types: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_file_size: Option<u64>,
    },
    /// Syntactically valid JSON (string form or already-structured)
    Json,
    /// Non-empty opaque credential
    ApiKey,
    /// Non-empty opaque secret
    Secret,
    /// Parseable URL with an optional protocol allowlist
    Url {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        allowed_protocols: Option<Vec<String>>,
    },
}

impl FieldType {
    /// Returns the type name for error messages and doc fragments.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String { .. } => "string",
            FieldType::Number { .. } => "number",
            FieldType::Boolean => "boolean",
            FieldType::Enum { .. } => "enum",
            FieldType::Array { .. } => "array",
            FieldType::Object { .. } => "object",
            FieldType::Date { .. } => "date",
            FieldType::DateTime { .. } => "datetime",
            FieldType::Time => "time",
            FieldType::File { .. } => "file",
            FieldType::Json => "json",
            FieldType::ApiKey => "apiKey",
            FieldType::Secret => "secret",
            FieldType::Url { .. } => "url",
        }
    }
}

/// Immutable description of one field.
///
/// Produced by the builders in `field::builder` and read-only thereafter.
/// The config-only attributes (`env_var`, `category`, `secret`,
/// `validation`) are meaningful only for fields placed in the config
/// namespace; they are inert for input fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Type tag and type-specific constraints
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present. A declared default always
    /// implies `required = false`.
    pub required: bool,
    /// Substituted into the output when the field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Explicit example for documentation and example synthesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether offending values are redacted from error details
    #[serde(default)]
    pub sensitive: bool,
    /// Whether control characters are stripped from the output
    #[serde(default)]
    pub sanitize: bool,
    /// Output transform applied after all checks succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    /// Environment variable backing this config field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
    /// Grouping category for config documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Whether this config field holds secret material
    #[serde(default)]
    pub secret: bool,
    /// Config-only validation sub-record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ConfigValidation>,
}

impl FieldDefinition {
    /// Creates a bare definition of the given type with every common
    /// attribute at its resting value (optional, no default, no transform).
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            example: None,
            description: None,
            sensitive: false,
            sanitize: false,
            transform: None,
            env_var: None,
            category: None,
            secret: false,
            validation: None,
        }
    }

    /// Returns the type name for error messages and doc fragments.
    pub fn type_name(&self) -> &'static str {
        self.field_type.type_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names() {
        assert_eq!(FieldType::Boolean.type_name(), "boolean");
        assert_eq!(FieldType::Json.type_name(), "json");
        assert_eq!(FieldType::ApiKey.type_name(), "apiKey");
        assert_eq!(
            FieldType::Enum {
                values: vec!["a".into()],
                labels: None
            }
            .type_name(),
            "enum"
        );
    }

    #[test]
    fn test_definition_serializes_with_type_tag() {
        let def = FieldDefinition::new(FieldType::String {
            min_length: Some(1),
            max_length: None,
            pattern: None,
            format: Some(StringFormat::Email),
        });
        let value = serde_json::to_value(&def).unwrap();
        assert_eq!(value["type"], json!("string"));
        assert_eq!(value["format"], json!("email"));
        assert_eq!(value["required"], json!(false));
    }

    #[test]
    fn test_definition_round_trips() {
        let mut def = FieldDefinition::new(FieldType::Number {
            min: Some(1.0),
            max: Some(10.0),
            integer: true,
            precision: None,
        });
        def.required = true;
        let encoded = serde_json::to_string(&def).unwrap();
        let decoded: FieldDefinition = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, def);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(StringFormat::HexColor.name(), "hex-color");
        assert_eq!(StringFormat::Semver.name(), "semver");
    }
}
