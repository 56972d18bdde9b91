//! Fluent builders for field definitions
//!
//! One value-returning builder per field type. Builders only assemble
//! declarations; they never validate values or constraint consistency.
//! Malformed declarations (empty enum set, unparseable pattern or date
//! bound) are detected when the schema is compiled.
//!
//! Contract: `default_value(v)` always forces `required = false`,
//! regardless of call order. A default implies optional.

use std::collections::BTreeMap;

use serde_json::Value;

use super::types::{ConfigValidation, FieldDefinition, FieldType, StringFormat, Transform};

/// Common attributes accumulated by every builder.
#[derive(Debug, Clone, Default)]
struct CommonAttrs {
    required: bool,
    default: Option<Value>,
    example: Option<Value>,
    description: Option<String>,
    sensitive: bool,
    sanitize: bool,
    transform: Option<Transform>,
    env_var: Option<String>,
    category: Option<String>,
    secret: bool,
    validation: Option<ConfigValidation>,
}

impl CommonAttrs {
    /// Snapshots the accumulated state onto a definition of the given type.
    fn into_definition(self, field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            field_type,
            // A declared default always wins over any required() call.
            required: self.required && self.default.is_none(),
            default: self.default,
            example: self.example,
            description: self.description,
            sensitive: self.sensitive,
            sanitize: self.sanitize,
            transform: self.transform,
            env_var: self.env_var,
            category: self.category,
            secret: self.secret,
            validation: self.validation,
        }
    }
}

macro_rules! impl_common_setters {
    ($builder:ty) => {
        impl $builder {
            /// Marks the field as required.
            pub fn required(mut self) -> Self {
                self.common.required = true;
                self
            }

            /// Marks the field as optional.
            pub fn optional(mut self) -> Self {
                self.common.required = false;
                self
            }

            /// Declares a default, which also forces the field optional.
            pub fn default_value(mut self, value: impl Into<Value>) -> Self {
                self.common.default = Some(value.into());
                self.common.required = false;
                self
            }

            /// Declares an explicit example for documentation.
            pub fn example(mut self, value: impl Into<Value>) -> Self {
                self.common.example = Some(value.into());
                self
            }

            /// Sets the human-readable description.
            pub fn description(mut self, text: impl Into<String>) -> Self {
                self.common.description = Some(text.into());
                self
            }

            /// Redacts offending values from error details.
            pub fn sensitive(mut self) -> Self {
                self.common.sensitive = true;
                self
            }

            /// Strips control characters from the transformed output.
            pub fn sanitize(mut self) -> Self {
                self.common.sanitize = true;
                self
            }

            /// Sets the output transform.
            pub fn transform(mut self, transform: Transform) -> Self {
                self.common.transform = Some(transform);
                self
            }

            /// Names the environment variable backing this config field.
            pub fn env_var(mut self, name: impl Into<String>) -> Self {
                self.common.env_var = Some(name.into());
                self
            }

            /// Sets the grouping category for config documentation.
            pub fn category(mut self, name: impl Into<String>) -> Self {
                self.common.category = Some(name.into());
                self
            }

            /// Marks this config field as holding secret material.
            pub fn secret(mut self) -> Self {
                self.common.secret = true;
                self
            }

            /// Attaches the config-only validation sub-record.
            pub fn validation(mut self, validation: ConfigValidation) -> Self {
                self.common.validation = Some(validation);
                self
            }
        }
    };
}

/// Builder for string fields.
#[derive(Debug, Clone, Default)]
pub struct StringBuilder {
    common: CommonAttrs,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
    format: Option<StringFormat>,
}

impl StringBuilder {
    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    /// Sets the regex pattern. The pattern is compiled (and rejected if
    /// invalid) when the schema is compiled, not here.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::String {
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern,
            format: self.format,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(StringBuilder);

/// Builder for number fields.
#[derive(Debug, Clone, Default)]
pub struct NumberBuilder {
    common: CommonAttrs,
    min: Option<f64>,
    max: Option<f64>,
    integer: bool,
    precision: Option<u32>,
}

impl NumberBuilder {
    pub fn min(mut self, value: f64) -> Self {
        self.min = Some(value);
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        self.max = Some(value);
        self
    }

    /// Requires the value to be an integer.
    pub fn integer(mut self) -> Self {
        self.integer = true;
        self
    }

    /// Declares decimal precision (advisory, surfaced in docs only).
    pub fn precision(mut self, digits: u32) -> Self {
        self.precision = Some(digits);
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Number {
            min: self.min,
            max: self.max,
            integer: self.integer,
            precision: self.precision,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(NumberBuilder);

/// Builder for boolean fields.
#[derive(Debug, Clone, Default)]
pub struct BooleanBuilder {
    common: CommonAttrs,
}

impl BooleanBuilder {
    pub fn build(self) -> FieldDefinition {
        self.common.into_definition(FieldType::Boolean)
    }
}

impl_common_setters!(BooleanBuilder);

/// Builder for enum fields.
///
/// The value set must end up non-empty; an empty set is a schema-authoring
/// error reported by the compiler.
#[derive(Debug, Clone, Default)]
pub struct EnumBuilder {
    common: CommonAttrs,
    values: Vec<String>,
    labels: Option<Vec<String>>,
}

impl EnumBuilder {
    pub fn values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Enum {
            values: self.values,
            labels: self.labels,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(EnumBuilder);

/// Builder for array fields.
#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    common: CommonAttrs,
    items: FieldDefinition,
    min_items: Option<usize>,
    max_items: Option<usize>,
    unique_items: bool,
}

impl ArrayBuilder {
    fn new(items: FieldDefinition) -> Self {
        Self {
            common: CommonAttrs::default(),
            items,
            min_items: None,
            max_items: None,
            unique_items: false,
        }
    }

    pub fn min_items(mut self, count: usize) -> Self {
        self.min_items = Some(count);
        self
    }

    pub fn max_items(mut self, count: usize) -> Self {
        self.max_items = Some(count);
        self
    }

    /// Requires all elements to be structurally distinct.
    pub fn unique_items(mut self) -> Self {
        self.unique_items = true;
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Array {
            items: Box::new(self.items),
            min_items: self.min_items,
            max_items: self.max_items,
            unique_items: self.unique_items,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(ArrayBuilder);

/// Builder for object fields.
#[derive(Debug, Clone, Default)]
pub struct ObjectBuilder {
    common: CommonAttrs,
    properties: BTreeMap<String, FieldDefinition>,
    required_properties: Vec<String>,
    additional_properties: bool,
}

impl ObjectBuilder {
    pub fn property(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.properties.insert(name.into(), definition);
        self
    }

    /// Marks property names as required regardless of their own flag.
    pub fn required_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_properties = names.into_iter().map(Into::into).collect();
        self
    }

    /// Tolerates undeclared keys inside this object.
    pub fn additional_properties(mut self) -> Self {
        self.additional_properties = true;
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Object {
            properties: self.properties,
            required_properties: self.required_properties,
            additional_properties: self.additional_properties,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(ObjectBuilder);

/// Builder for date fields (`YYYY-MM-DD`).
#[derive(Debug, Clone, Default)]
pub struct DateBuilder {
    common: CommonAttrs,
    min_date: Option<String>,
    max_date: Option<String>,
}

impl DateBuilder {
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub fn min_date(mut self, date: impl Into<String>) -> Self {
        self.min_date = Some(date.into());
        self
    }

    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub fn max_date(mut self, date: impl Into<String>) -> Self {
        self.max_date = Some(date.into());
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Date {
            min_date: self.min_date,
            max_date: self.max_date,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(DateBuilder);

/// Builder for datetime fields (RFC 3339).
#[derive(Debug, Clone, Default)]
pub struct DateTimeBuilder {
    common: CommonAttrs,
    min_date: Option<String>,
    max_date: Option<String>,
    timezone: Option<String>,
}

impl DateTimeBuilder {
    /// Inclusive lower bound, RFC 3339.
    pub fn min_date(mut self, datetime: impl Into<String>) -> Self {
        self.min_date = Some(datetime.into());
        self
    }

    /// Inclusive upper bound, RFC 3339.
    pub fn max_date(mut self, datetime: impl Into<String>) -> Self {
        self.max_date = Some(datetime.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::DateTime {
            min_date: self.min_date,
            max_date: self.max_date,
            timezone: self.timezone,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(DateTimeBuilder);

/// Builder for time-of-day fields.
#[derive(Debug, Clone, Default)]
pub struct TimeBuilder {
    common: CommonAttrs,
}

impl TimeBuilder {
    pub fn build(self) -> FieldDefinition {
        self.common.into_definition(FieldType::Time)
    }
}

impl_common_setters!(TimeBuilder);

/// Builder for file descriptor fields.
#[derive(Debug, Clone, Default)]
pub struct FileBuilder {
    common: CommonAttrs,
    allowed_mime_types: Option<Vec<String>>,
    max_file_size: Option<u64>,
}

impl FileBuilder {
    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::File {
            allowed_mime_types: self.allowed_mime_types,
            max_file_size: self.max_file_size,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(FileBuilder);

/// Builder for JSON fields.
#[derive(Debug, Clone, Default)]
pub struct JsonBuilder {
    common: CommonAttrs,
}

impl JsonBuilder {
    pub fn build(self) -> FieldDefinition {
        self.common.into_definition(FieldType::Json)
    }
}

impl_common_setters!(JsonBuilder);

/// Builder for API-key fields.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyBuilder {
    common: CommonAttrs,
}

impl ApiKeyBuilder {
    pub fn build(self) -> FieldDefinition {
        let mut definition = self.common.into_definition(FieldType::ApiKey);
        definition.sensitive = true;
        definition
    }
}

impl_common_setters!(ApiKeyBuilder);

/// Builder for secret fields.
#[derive(Debug, Clone, Default)]
pub struct SecretBuilder {
    common: CommonAttrs,
}

impl SecretBuilder {
    pub fn build(self) -> FieldDefinition {
        let mut definition = self.common.into_definition(FieldType::Secret);
        definition.sensitive = true;
        definition
    }
}

impl_common_setters!(SecretBuilder);

/// Builder for URL fields.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    common: CommonAttrs,
    allowed_protocols: Option<Vec<String>>,
}

impl UrlBuilder {
    pub fn allowed_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_protocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> FieldDefinition {
        let field_type = FieldType::Url {
            allowed_protocols: self.allowed_protocols,
        };
        self.common.into_definition(field_type)
    }
}

impl_common_setters!(UrlBuilder);

// Entry points, one per field type.

/// Starts a string field.
pub fn string() -> StringBuilder {
    StringBuilder::default()
}

/// Starts a number field.
pub fn number() -> NumberBuilder {
    NumberBuilder::default()
}

/// Starts a boolean field.
pub fn boolean() -> BooleanBuilder {
    BooleanBuilder::default()
}

/// Starts an enum field.
pub fn enumeration() -> EnumBuilder {
    EnumBuilder::default()
}

/// Starts an array field with the given element definition.
pub fn array(items: FieldDefinition) -> ArrayBuilder {
    ArrayBuilder::new(items)
}

/// Starts an object field.
pub fn object() -> ObjectBuilder {
    ObjectBuilder::default()
}

/// Starts a date field.
pub fn date() -> DateBuilder {
    DateBuilder::default()
}

/// Starts a datetime field.
pub fn datetime() -> DateTimeBuilder {
    DateTimeBuilder::default()
}

/// Starts a time-of-day field.
pub fn time() -> TimeBuilder {
    TimeBuilder::default()
}

/// Starts a file field.
pub fn file() -> FileBuilder {
    FileBuilder::default()
}

/// Starts a JSON field.
pub fn json() -> JsonBuilder {
    JsonBuilder::default()
}

/// Starts an API-key field.
pub fn api_key() -> ApiKeyBuilder {
    ApiKeyBuilder::default()
}

/// Starts a secret field.
pub fn secret() -> SecretBuilder {
    SecretBuilder::default()
}

/// Starts a URL field.
pub fn url() -> UrlBuilder {
    UrlBuilder::default()
}

// Convenience builders composing primitives.

/// An email field: string + email format + lowercase transform.
pub fn email() -> StringBuilder {
    string()
        .format(StringFormat::Email)
        .transform(Transform::Lowercase)
}

/// An identifier field: string + uuid format.
pub fn identifier() -> StringBuilder {
    string().format(StringFormat::Uuid)
}

/// A TCP port field: integer number in 1..=65535.
pub fn port() -> NumberBuilder {
    number().integer().min(1.0).max(65535.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_implies_optional() {
        let def = string().required().default_value("x").build();
        assert!(!def.required);
    }

    #[test]
    fn test_default_implies_optional_any_order() {
        let def = number().default_value(5).required().build();
        assert!(!def.required);

        let def = number().required().default_value(5).build();
        assert!(!def.required);
    }

    #[test]
    fn test_required_without_default() {
        let def = string().required().build();
        assert!(def.required);
        assert!(def.default.is_none());
    }

    #[test]
    fn test_string_constraints_recorded() {
        let def = string()
            .min_length(2)
            .max_length(8)
            .pattern("^[a-z]+$")
            .build();
        match def.field_type {
            FieldType::String {
                min_length,
                max_length,
                pattern,
                format,
            } => {
                assert_eq!(min_length, Some(2));
                assert_eq!(max_length, Some(8));
                assert_eq!(pattern.as_deref(), Some("^[a-z]+$"));
                assert!(format.is_none());
            }
            other => panic!("unexpected type: {:?}", other),
        }
    }

    #[test]
    fn test_builders_do_not_validate() {
        // An empty enum set builds fine; the compiler rejects it later.
        let def = enumeration().build();
        match def.field_type {
            FieldType::Enum { values, .. } => assert!(values.is_empty()),
            other => panic!("unexpected type: {:?}", other),
        }
    }

    #[test]
    fn test_email_composes_primitives() {
        let def = email().required().build();
        match def.field_type {
            FieldType::String { format, .. } => assert_eq!(format, Some(StringFormat::Email)),
            other => panic!("unexpected type: {:?}", other),
        }
        assert_eq!(def.transform, Some(Transform::Lowercase));
        assert!(def.required);
    }

    #[test]
    fn test_secret_builders_are_sensitive() {
        assert!(api_key().build().sensitive);
        assert!(secret().build().sensitive);
    }

    #[test]
    fn test_nested_object_builder() {
        let def = object()
            .property("city", string().required().build())
            .property("zip", string().build())
            .build();
        match def.field_type {
            FieldType::Object { properties, .. } => {
                assert_eq!(properties.len(), 2);
                assert!(properties["city"].required);
            }
            other => panic!("unexpected type: {:?}", other),
        }
    }

    #[test]
    fn test_config_attributes() {
        let def = string()
            .env_var("API_URL")
            .category("network")
            .secret()
            .validation(ConfigValidation {
                pattern: Some("^https".into()),
                error_message: Some("must be https".into()),
                ..ConfigValidation::default()
            })
            .build();
        assert_eq!(def.env_var.as_deref(), Some("API_URL"));
        assert_eq!(def.category.as_deref(), Some("network"));
        assert!(def.secret);
        assert_eq!(
            def.validation.unwrap().error_message.as_deref(),
            Some("must be https")
        );
    }

    #[test]
    fn test_port_bounds() {
        let def = port().default_value(json!(8080)).build();
        match def.field_type {
            FieldType::Number {
                min, max, integer, ..
            } => {
                assert_eq!(min, Some(1.0));
                assert_eq!(max, Some(65535.0));
                assert!(integer);
            }
            other => panic!("unexpected type: {:?}", other),
        }
        assert!(!def.required);
    }
}
