//! Error formatting and example/documentation generation
//!
//! Everything here is stateless and derived purely from definitions or
//! finished results. Nothing in this module participates in the
//! validation path itself.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::executor::{PathSegment, ValidationErrorDetail, ValidationResult};
use crate::field::{FieldDefinition, FieldType, StringFormat};
use crate::schema::{Schema, SchemaKind};

/// Synthesizes an example value for a field.
///
/// Priority: explicit example, then declared default, then a type-driven
/// synthetic value. Object and array fields recurse.
pub fn example_value(definition: &FieldDefinition) -> Value {
    if let Some(example) = &definition.example {
        return example.clone();
    }
    if let Some(default) = &definition.default {
        return default.clone();
    }
    synthetic_value(&definition.field_type)
}

fn synthetic_value(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::String { format, min_length, .. } => match format {
            Some(StringFormat::Email) => json!("user@example.com"),
            Some(StringFormat::Url) => json!("https://example.com"),
            Some(StringFormat::Uuid) => json!("00000000-0000-4000-8000-000000000000"),
            Some(StringFormat::Ipv4) => json!("192.0.2.1"),
            Some(StringFormat::Ipv6) => json!("2001:db8::1"),
            Some(StringFormat::Base64) => json!("ZXhhbXBsZQ=="),
            Some(StringFormat::Jwt) => json!("eyJhbGciOiJub25lIn0.e30.c2ln"),
            Some(StringFormat::Slug) => json!("example-slug"),
            Some(StringFormat::HexColor) => json!("#336699"),
            Some(StringFormat::Semver) => json!("1.0.0"),
            None => {
                // Pad to the declared minimum so the example validates.
                let min = min_length.unwrap_or(0);
                let mut sample = String::from("example");
                while sample.len() < min {
                    sample.push_str("example");
                }
                json!(sample)
            }
        },
        FieldType::Number { min, max, integer, .. } => {
            let value = match (min, max) {
                (Some(lower), _) => *lower,
                (None, Some(upper)) => *upper,
                (None, None) => 0.0,
            };
            if *integer {
                json!(value as i64)
            } else {
                json!(value)
            }
        }
        FieldType::Boolean => json!(false),
        FieldType::Enum { values, .. } => {
            values.first().map(|value| json!(value)).unwrap_or(Value::Null)
        }
        FieldType::Array { items, min_items, .. } => {
            let count = min_items.unwrap_or(1).max(1);
            let element = example_value(items);
            json!(vec![element; count])
        }
        FieldType::Object { properties, .. } => {
            let mut object = serde_json::Map::new();
            for (name, property) in properties {
                object.insert(name.clone(), example_value(property));
            }
            Value::Object(object)
        }
        FieldType::Date { min_date, .. } => min_date
            .as_deref()
            .map(|date| json!(date))
            .unwrap_or_else(|| json!("2024-01-01")),
        FieldType::DateTime { min_date, .. } => min_date
            .as_deref()
            .map(|date| json!(date))
            .unwrap_or_else(|| json!("2024-01-01T00:00:00Z")),
        FieldType::Time => json!("12:00:00"),
        FieldType::File { allowed_mime_types, .. } => json!({
            "name": "example.txt",
            "size": 1024,
            "type": allowed_mime_types
                .as_ref()
                .and_then(|types| types.first().cloned())
                .unwrap_or_else(|| "text/plain".to_string()),
        }),
        FieldType::Json => json!({}),
        FieldType::ApiKey => json!("api-key-example"),
        FieldType::Secret => json!("secret-example"),
        FieldType::Url { allowed_protocols } => {
            let protocol = allowed_protocols
                .as_ref()
                .and_then(|protocols| protocols.first().cloned())
                .unwrap_or_else(|| "https".to_string());
            json!(format!("{protocol}://example.com"))
        }
    }
}

/// Interface-description fragment for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDoc {
    /// Wire type name
    pub field_type: String,
    /// Whether the field must be present
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Rendered constraint summaries, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Synthesized example
    pub example: Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// Enum value labels, aligned with the value set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// Nested property docs for object fields
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldDoc>,
}

/// Builds the documentation fragment for one field.
pub fn field_doc(definition: &FieldDefinition) -> FieldDoc {
    let mut constraints = Vec::new();
    let mut format = None;
    let mut labels = None;
    let mut properties = BTreeMap::new();

    match &definition.field_type {
        FieldType::String {
            min_length,
            max_length,
            pattern,
            format: declared,
        } => {
            if let Some(length) = min_length {
                constraints.push(format!("min length {length}"));
            }
            if let Some(length) = max_length {
                constraints.push(format!("max length {length}"));
            }
            if let Some(pattern) = pattern {
                constraints.push(format!("matches /{pattern}/"));
            }
            format = declared.map(|f| f.name().to_string());
        }
        FieldType::Number {
            min,
            max,
            integer,
            precision,
        } => {
            if let Some(lower) = min {
                constraints.push(format!("min {lower}"));
            }
            if let Some(upper) = max {
                constraints.push(format!("max {upper}"));
            }
            if *integer {
                constraints.push("integer".to_string());
            }
            if let Some(digits) = precision {
                // Advisory: declared precision is documented, not enforced.
                constraints.push(format!("precision {digits} (advisory)"));
            }
        }
        FieldType::Enum {
            values,
            labels: declared,
        } => {
            constraints.push(format!("one of: {}", values.join(", ")));
            labels = declared.clone();
        }
        FieldType::Array {
            items,
            min_items,
            max_items,
            unique_items,
        } => {
            if let Some(count) = min_items {
                constraints.push(format!("min items {count}"));
            }
            if let Some(count) = max_items {
                constraints.push(format!("max items {count}"));
            }
            if *unique_items {
                constraints.push("unique items".to_string());
            }
            properties.insert("items".to_string(), field_doc(items));
        }
        FieldType::Object {
            properties: declared,
            required_properties,
            additional_properties,
        } => {
            for (name, property) in declared {
                properties.insert(name.clone(), field_doc(property));
            }
            if !required_properties.is_empty() {
                constraints.push(format!("requires: {}", required_properties.join(", ")));
            }
            if *additional_properties {
                constraints.push("allows additional properties".to_string());
            }
        }
        FieldType::Date { min_date, max_date } => {
            if let Some(bound) = min_date {
                constraints.push(format!("on or after {bound}"));
            }
            if let Some(bound) = max_date {
                constraints.push(format!("on or before {bound}"));
            }
        }
        FieldType::DateTime {
            min_date,
            max_date,
            timezone,
        } => {
            if let Some(bound) = min_date {
                constraints.push(format!("at or after {bound}"));
            }
            if let Some(bound) = max_date {
                constraints.push(format!("at or before {bound}"));
            }
            if let Some(zone) = timezone {
                constraints.push(format!("timezone {zone}"));
            }
        }
        FieldType::File {
            allowed_mime_types,
            max_file_size,
        } => {
            if let Some(types) = allowed_mime_types {
                constraints.push(format!("mime types: {}", types.join(", ")));
            }
            if let Some(size) = max_file_size {
                constraints.push(format!("max size {size} bytes"));
            }
        }
        FieldType::Url { allowed_protocols } => {
            if let Some(protocols) = allowed_protocols {
                constraints.push(format!("protocols: {}", protocols.join(", ")));
            }
        }
        FieldType::Boolean
        | FieldType::Time
        | FieldType::Json
        | FieldType::ApiKey
        | FieldType::Secret => {}
    }

    FieldDoc {
        field_type: definition.type_name().to_string(),
        required: definition.required,
        description: definition.description.clone(),
        format,
        constraints,
        default: definition.default.clone(),
        example: if definition.sensitive {
            json!("<redacted>")
        } else {
            example_value(definition)
        },
        sensitive: definition.sensitive,
        labels,
        properties,
    }
}

/// Interface description for a whole schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDoc {
    /// Input namespace docs, keyed by field name
    pub input: BTreeMap<String, FieldDoc>,
    /// Config namespace docs, keyed by field name
    pub config: BTreeMap<String, FieldDoc>,
    /// Rendered rule descriptions, in declaration order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<String>,
}

/// Builds the documentation fragments for a schema.
pub fn schema_doc(schema: &Schema) -> SchemaDoc {
    let document = |kind: SchemaKind| {
        schema
            .fields(kind)
            .iter()
            .map(|(name, definition)| (name.clone(), field_doc(definition)))
            .collect()
    };
    SchemaDoc {
        input: document(SchemaKind::Input),
        config: document(SchemaKind::Config),
        rules: schema
            .rules
            .iter()
            .filter_map(|rule| {
                rule.description
                    .clone()
                    .or_else(|| rule.error_message.clone())
            })
            .collect(),
    }
}

/// Renders a path as a dotted display string with `[i]` array indices.
pub fn display_path(path: &[PathSegment]) -> String {
    let mut rendered = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(name) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(name);
            }
            PathSegment::Index(index) => {
                rendered.push_str(&format!("[{index}]"));
            }
        }
    }
    rendered
}

/// Renders one error detail as a single human-readable line.
pub fn format_error(detail: &ValidationErrorDetail) -> String {
    let path = display_path(&detail.path);
    let location = if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    };
    let mut line = format!("{location}{}", detail.message);
    if let Some(expected) = &detail.expected {
        line.push_str(&format!(" (expected {expected})"));
    }
    line
}

/// Renders a failed result as one line per error, in error order.
pub fn format_result(result: &ValidationResult) -> Vec<String> {
    result.errors.iter().map(format_error).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ErrorCode;
    use crate::field;

    #[test]
    fn test_example_priority() {
        let with_example = field::string()
            .default_value(json!("fallback"))
            .example(json!("chosen"))
            .build();
        assert_eq!(example_value(&with_example), json!("chosen"));

        let with_default = field::string().default_value(json!("fallback")).build();
        assert_eq!(example_value(&with_default), json!("fallback"));

        let bare = field::boolean().build();
        assert_eq!(example_value(&bare), json!(false));
    }

    #[test]
    fn test_synthetic_examples_recurse() {
        let definition = field::object()
            .property("tags", field::array(field::string().build()).min_items(2).build())
            .property("count", field::number().integer().min(5.0).build())
            .build();
        let example = example_value(&definition);
        assert_eq!(example["tags"], json!(["example", "example"]));
        assert_eq!(example["count"], json!(5));
    }

    #[test]
    fn test_format_drives_synthetic_string() {
        let definition = field::email().build();
        assert_eq!(example_value(&definition), json!("user@example.com"));
    }

    #[test]
    fn test_field_doc_constraints() {
        let definition = field::number()
            .min(1.0)
            .max(65535.0)
            .integer()
            .precision(2)
            .description("listen port")
            .build();
        let doc = field_doc(&definition);
        assert_eq!(doc.field_type, "number");
        assert!(!doc.required);
        assert_eq!(doc.description.as_deref(), Some("listen port"));
        assert!(doc.constraints.contains(&"min 1".to_string()));
        assert!(doc.constraints.contains(&"integer".to_string()));
        assert!(doc
            .constraints
            .iter()
            .any(|constraint| constraint.contains("advisory")));
    }

    #[test]
    fn test_sensitive_example_redacted() {
        let doc = field_doc(&field::api_key().build());
        assert!(doc.sensitive);
        assert_eq!(doc.example, json!("<redacted>"));
    }

    #[test]
    fn test_schema_doc_covers_both_namespaces() {
        let schema = Schema::builder()
            .input_field("city", field::string().required().build())
            .config_field("api_key", field::api_key().required().build())
            .build()
            .unwrap();
        let doc = schema_doc(&schema);
        assert!(doc.input.contains_key("city"));
        assert!(doc.config.contains_key("api_key"));
        assert!(doc.input["city"].required);
    }

    #[test]
    fn test_display_path() {
        let path = vec![
            PathSegment::key("items"),
            PathSegment::index(2),
            PathSegment::key("name"),
        ];
        assert_eq!(display_path(&path), "items[2].name");
        assert_eq!(display_path(&[]), "");
    }

    #[test]
    fn test_format_error_line() {
        let detail = ValidationErrorDetail::new(
            vec![PathSegment::key("city")],
            ErrorCode::Structural,
            "required field is missing",
        )
        .with_expected("field to be present");
        assert_eq!(
            format_error(&detail),
            "city: required field is missing (expected field to be present)"
        );
    }
}
