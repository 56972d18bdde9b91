//! Compiled validators
//!
//! Compilation turns a namespace of field definitions into an executable
//! `CompiledValidator` tree: regexes compiled once, date bounds parsed
//! once, nested array/object validators built recursively. The tree is
//! immutable after compilation and safe to share behind an `Arc`.
//!
//! Validation semantics:
//! - All checks run against the raw input value
//! - Transforms are applied only when producing the output, after every
//!   check on the field has passed
//! - Absent required field: structural error at that path
//! - Absent optional field with a default: default substituted into output
//! - Absent optional field without a default: key omitted from output
//! - Unknown keys inside declared objects are rejected unless
//!   `additional_properties` is set; unknown top-level keys are ignored

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::executor::result::{PathSegment, ValidationErrorDetail};
use crate::executor::ValidationOptions;
use crate::field::{ConfigValidation, FieldDefinition, FieldType, StringFormat, Transform};
use crate::schema::SchemaKind;

use super::errors::{CompileError, CompileResult};
use super::formats::check_format;

/// Executable form of one schema namespace plus the options it was
/// compiled under. Opaque to callers; produced by `compile`, consumed by
/// the executor, stored in the validator cache.
#[derive(Debug)]
pub struct CompiledValidator {
    kind: SchemaKind,
    fields: BTreeMap<String, CompiledField>,
    options: ValidationOptions,
}

/// One compiled field: resolved requiredness, prepared checks, and the
/// output treatment (default, sanitize, transform).
#[derive(Debug)]
struct CompiledField {
    required: bool,
    default: Option<Value>,
    sensitive: bool,
    sanitize: bool,
    transform: Option<Transform>,
    /// Config-only message override for failures from the validation
    /// sub-record
    custom_message: Option<String>,
    check: CompiledCheck,
    extra: Option<ExtraChecks>,
}

/// Type-specific compiled checks.
#[derive(Debug)]
enum CompiledCheck {
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Regex>,
        format: Option<StringFormat>,
    },
    Number {
        min: Option<f64>,
        max: Option<f64>,
        integer: bool,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
    Array {
        items: Box<CompiledField>,
        min_items: Option<usize>,
        max_items: Option<usize>,
        unique_items: bool,
    },
    Object {
        properties: BTreeMap<String, CompiledField>,
        additional_properties: bool,
    },
    Date {
        min: Option<NaiveDate>,
        max: Option<NaiveDate>,
    },
    DateTime {
        min: Option<DateTime<FixedOffset>>,
        max: Option<DateTime<FixedOffset>>,
    },
    Time,
    File {
        allowed_mime_types: Option<Vec<String>>,
        max_file_size: Option<u64>,
    },
    Json,
    ApiKey,
    Secret,
    Url {
        allowed_protocols: Option<Vec<String>>,
    },
}

impl CompiledCheck {
    fn type_name(&self) -> &'static str {
        match self {
            CompiledCheck::String { .. } => "string",
            CompiledCheck::Number { .. } => "number",
            CompiledCheck::Boolean => "boolean",
            CompiledCheck::Enum { .. } => "enum",
            CompiledCheck::Array { .. } => "array",
            CompiledCheck::Object { .. } => "object",
            CompiledCheck::Date { .. } => "date",
            CompiledCheck::DateTime { .. } => "datetime",
            CompiledCheck::Time => "time",
            CompiledCheck::File { .. } => "file",
            CompiledCheck::Json => "json",
            CompiledCheck::ApiKey => "apiKey",
            CompiledCheck::Secret => "secret",
            CompiledCheck::Url { .. } => "url",
        }
    }
}

/// Compiled config-only validation sub-record.
#[derive(Debug)]
struct ExtraChecks {
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<Regex>,
    allowed_values: Option<Vec<String>>,
    allowed_protocols: Option<Vec<String>>,
}

/// Compiles one namespace of field definitions.
///
/// # Errors
///
/// Returns `CompileError` for schema-authoring mistakes: empty enum sets,
/// mismatched enum labels, unparseable patterns or date bounds, defaults
/// whose JSON type cannot satisfy the field.
pub fn compile(
    kind: SchemaKind,
    fields: &BTreeMap<String, FieldDefinition>,
    options: &ValidationOptions,
) -> CompileResult<CompiledValidator> {
    let mut compiled = BTreeMap::new();
    for (name, definition) in fields {
        compiled.insert(
            name.clone(),
            compile_field(kind, name, definition, false)?,
        );
    }
    Ok(CompiledValidator {
        kind,
        fields: compiled,
        options: options.clone(),
    })
}

/// Compiles a single field definition, recursing into arrays and objects.
///
/// `force_required` overrides the definition's own flag when the field is
/// listed in an enclosing object's `required_properties`.
fn compile_field(
    kind: SchemaKind,
    path: &str,
    definition: &FieldDefinition,
    force_required: bool,
) -> CompileResult<CompiledField> {
    let check = match &definition.field_type {
        FieldType::String {
            min_length,
            max_length,
            pattern,
            format,
        } => CompiledCheck::String {
            min_length: *min_length,
            max_length: *max_length,
            pattern: compile_pattern(path, pattern.as_deref())?,
            format: *format,
        },
        FieldType::Number {
            min,
            max,
            integer,
            // Declared precision is advisory; the compiler does not
            // enforce it.
            precision: _,
        } => CompiledCheck::Number {
            min: *min,
            max: *max,
            integer: *integer,
        },
        FieldType::Boolean => CompiledCheck::Boolean,
        FieldType::Enum { values, labels } => {
            if values.is_empty() {
                return Err(CompileError::EmptyEnum { field: path.into() });
            }
            if let Some(labels) = labels {
                if labels.len() != values.len() {
                    return Err(CompileError::MismatchedLabels {
                        field: path.into(),
                        labels: labels.len(),
                        values: values.len(),
                    });
                }
            }
            CompiledCheck::Enum {
                values: values.clone(),
            }
        }
        FieldType::Array {
            items,
            min_items,
            max_items,
            unique_items,
        } => {
            let item_path = format!("{}[]", path);
            CompiledCheck::Array {
                items: Box::new(compile_field(kind, &item_path, items, false)?),
                min_items: *min_items,
                max_items: *max_items,
                unique_items: *unique_items,
            }
        }
        FieldType::Object {
            properties,
            required_properties,
            additional_properties,
        } => {
            let mut compiled = BTreeMap::new();
            for (name, property) in properties {
                let property_path = format!("{}.{}", path, name);
                let forced = required_properties.iter().any(|r| r == name);
                compiled.insert(
                    name.clone(),
                    compile_field(kind, &property_path, property, forced)?,
                );
            }
            CompiledCheck::Object {
                properties: compiled,
                additional_properties: *additional_properties,
            }
        }
        FieldType::Date { min_date, max_date } => CompiledCheck::Date {
            min: compile_date_bound(path, min_date.as_deref())?,
            max: compile_date_bound(path, max_date.as_deref())?,
        },
        FieldType::DateTime {
            min_date,
            max_date,
            timezone: _,
        } => CompiledCheck::DateTime {
            min: compile_datetime_bound(path, min_date.as_deref())?,
            max: compile_datetime_bound(path, max_date.as_deref())?,
        },
        FieldType::Time => CompiledCheck::Time,
        FieldType::File {
            allowed_mime_types,
            max_file_size,
        } => CompiledCheck::File {
            allowed_mime_types: allowed_mime_types.clone(),
            max_file_size: *max_file_size,
        },
        FieldType::Json => CompiledCheck::Json,
        FieldType::ApiKey => CompiledCheck::ApiKey,
        FieldType::Secret => CompiledCheck::Secret,
        FieldType::Url { allowed_protocols } => CompiledCheck::Url {
            allowed_protocols: allowed_protocols.clone(),
        },
    };

    if let Some(default) = &definition.default {
        if !default_matches(&check, default) {
            return Err(CompileError::InvalidDefault { field: path.into() });
        }
    }

    // The validation sub-record only applies in the config namespace.
    let extra = match (kind, &definition.validation) {
        (SchemaKind::Config, Some(validation)) => Some(compile_extra(path, validation)?),
        _ => None,
    };
    let custom_message = definition
        .validation
        .as_ref()
        .and_then(|v| v.error_message.clone());

    Ok(CompiledField {
        required: definition.required || force_required,
        default: definition.default.clone(),
        sensitive: definition.sensitive,
        sanitize: definition.sanitize,
        transform: definition.transform,
        custom_message,
        check,
        extra,
    })
}

fn compile_pattern(path: &str, pattern: Option<&str>) -> CompileResult<Option<Regex>> {
    match pattern {
        Some(source) => Regex::new(source)
            .map(Some)
            .map_err(|source| CompileError::InvalidPattern {
                field: path.into(),
                source,
            }),
        None => Ok(None),
    }
}

fn compile_date_bound(path: &str, bound: Option<&str>) -> CompileResult<Option<NaiveDate>> {
    match bound {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Some).map_err(|_| {
            CompileError::InvalidDateBound {
                field: path.into(),
                value: value.into(),
            }
        }),
        None => Ok(None),
    }
}

fn compile_datetime_bound(
    path: &str,
    bound: Option<&str>,
) -> CompileResult<Option<DateTime<FixedOffset>>> {
    match bound {
        Some(value) => DateTime::parse_from_rfc3339(value).map(Some).map_err(|_| {
            CompileError::InvalidDateBound {
                field: path.into(),
                value: value.into(),
            }
        }),
        None => Ok(None),
    }
}

fn compile_extra(path: &str, validation: &ConfigValidation) -> CompileResult<ExtraChecks> {
    Ok(ExtraChecks {
        min: validation.min,
        max: validation.max,
        pattern: compile_pattern(path, validation.pattern.as_deref())?,
        allowed_values: validation.allowed_values.clone(),
        allowed_protocols: validation.allowed_protocols.clone(),
    })
}

/// Shallow JSON-type check for declared defaults. Constraint conformance
/// of the default is the author's responsibility; only a structurally
/// impossible default is rejected.
fn default_matches(check: &CompiledCheck, default: &Value) -> bool {
    match check {
        CompiledCheck::String { .. }
        | CompiledCheck::Enum { .. }
        | CompiledCheck::Date { .. }
        | CompiledCheck::DateTime { .. }
        | CompiledCheck::Time
        | CompiledCheck::ApiKey
        | CompiledCheck::Secret
        | CompiledCheck::Url { .. } => default.is_string(),
        CompiledCheck::Number { .. } => default.is_number(),
        CompiledCheck::Boolean => default.is_boolean(),
        CompiledCheck::Array { .. } => default.is_array(),
        CompiledCheck::Object { .. } | CompiledCheck::File { .. } => default.is_object(),
        CompiledCheck::Json => true,
    }
}

impl CompiledValidator {
    /// The namespace this validator was compiled for.
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Number of top-level fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Runs the validator against raw data.
    ///
    /// Returns the transformed output on success, or the ordered error
    /// details on failure. Unknown top-level keys are ignored and omitted
    /// from the output.
    pub fn apply(&self, data: &Value) -> Result<Value, Vec<ValidationErrorDetail>> {
        let Some(object) = data.as_object() else {
            return Err(vec![ValidationErrorDetail::type_mismatch(
                Vec::new(),
                "object",
                json_type_name(data),
            )]);
        };

        let mut errors = Vec::new();
        let mut output = Map::new();
        for (name, field) in &self.fields {
            let path = vec![PathSegment::key(name.clone())];
            match object.get(name) {
                Some(value) => {
                    if let Some(out) = field.check_value(value, &path, &self.options, &mut errors)
                    {
                        output.insert(name.clone(), out);
                    }
                }
                None if field.required => {
                    errors.push(ValidationErrorDetail::missing_field(path));
                }
                None => {
                    if self.options.apply_defaults {
                        if let Some(default) = &field.default {
                            output.insert(name.clone(), default.clone());
                        }
                    }
                }
            }
            if self.options.fail_fast && !errors.is_empty() {
                break;
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(output))
        } else {
            Err(errors)
        }
    }
}

impl CompiledField {
    /// Checks one value. Pushes error details and returns `None` on
    /// failure; returns the transformed output on success.
    fn check_value(
        &self,
        value: &Value,
        path: &[PathSegment],
        options: &ValidationOptions,
        errors: &mut Vec<ValidationErrorDetail>,
    ) -> Option<Value> {
        let before = errors.len();
        let output = self.check_type(value, path, options, errors);
        if errors.len() > before {
            return None;
        }

        if let Some(extra) = &self.extra {
            self.check_extra(extra, value, path, errors);
            if errors.len() > before {
                return None;
            }
        }

        output.map(|out| self.transform_output(out, options))
    }

    fn check_type(
        &self,
        value: &Value,
        path: &[PathSegment],
        options: &ValidationOptions,
        errors: &mut Vec<ValidationErrorDetail>,
    ) -> Option<Value> {
        match &self.check {
            CompiledCheck::String {
                min_length,
                max_length,
                pattern,
                format,
            } => {
                let raw = self.expect_string(value, path, errors)?;
                let length = raw.chars().count();
                if let Some(min) = min_length {
                    if length < *min {
                        errors.push(self.constraint(
                            path,
                            format!("length {} is below minimum {}", length, min),
                            value,
                        ));
                    }
                }
                if let Some(max) = max_length {
                    if length > *max {
                        errors.push(self.constraint(
                            path,
                            format!("length {} exceeds maximum {}", length, max),
                            value,
                        ));
                    }
                }
                if let Some(pattern) = pattern {
                    if !pattern.is_match(raw) {
                        errors.push(self.constraint(
                            path,
                            format!("value does not match pattern {}", pattern.as_str()),
                            value,
                        ));
                    }
                }
                if let Some(format) = format {
                    if !check_format(*format, raw) {
                        errors.push(self.constraint(
                            path,
                            format!("value is not a valid {}", format.name()),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
            CompiledCheck::Number { min, max, integer } => {
                let Some(number) = value.as_f64() else {
                    errors.push(self.type_error(path, value));
                    return None;
                };
                if *integer && !(value.is_i64() || value.is_u64()) {
                    errors.push(self.constraint(path, "value must be an integer", value));
                }
                if let Some(min) = min {
                    if number < *min {
                        errors.push(self.constraint(
                            path,
                            format!("value {} is below minimum {}", number, min),
                            value,
                        ));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        errors.push(self.constraint(
                            path,
                            format!("value {} exceeds maximum {}", number, max),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
            CompiledCheck::Boolean => {
                if !value.is_boolean() {
                    errors.push(self.type_error(path, value));
                    return None;
                }
                Some(value.clone())
            }
            CompiledCheck::Enum { values } => {
                let Some(raw) = value.as_str() else {
                    errors.push(
                        ValidationErrorDetail::enum_mismatch(path.to_vec(), values)
                            .with_value(value, self.sensitive),
                    );
                    return None;
                };
                if !values.iter().any(|candidate| candidate == raw) {
                    errors.push(
                        ValidationErrorDetail::enum_mismatch(path.to_vec(), values)
                            .with_value(value, self.sensitive),
                    );
                    return None;
                }
                Some(value.clone())
            }
            CompiledCheck::Array {
                items,
                min_items,
                max_items,
                unique_items,
            } => {
                let Some(elements) = value.as_array() else {
                    errors.push(self.type_error(path, value));
                    return None;
                };
                if let Some(min) = min_items {
                    if elements.len() < *min {
                        errors.push(self.constraint(
                            path,
                            format!("{} items is below minimum {}", elements.len(), min),
                            value,
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if elements.len() > *max {
                        errors.push(self.constraint(
                            path,
                            format!("{} items exceeds maximum {}", elements.len(), max),
                            value,
                        ));
                    }
                }
                if *unique_items {
                    for (index, element) in elements.iter().enumerate() {
                        if elements[..index].contains(element) {
                            let mut element_path = path.to_vec();
                            element_path.push(PathSegment::index(index));
                            errors.push(self.constraint(
                                &element_path,
                                "duplicate element in unique array",
                                element,
                            ));
                        }
                    }
                }

                let mut out = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let mut element_path = path.to_vec();
                    element_path.push(PathSegment::index(index));
                    if let Some(transformed) =
                        items.check_value(element, &element_path, options, errors)
                    {
                        out.push(transformed);
                    }
                    if options.fail_fast && !errors.is_empty() {
                        break;
                    }
                }
                Some(Value::Array(out))
            }
            CompiledCheck::Object {
                properties,
                additional_properties,
            } => {
                let Some(object) = value.as_object() else {
                    errors.push(self.type_error(path, value));
                    return None;
                };

                if !additional_properties {
                    for key in object.keys() {
                        if !properties.contains_key(key) {
                            let mut key_path = path.to_vec();
                            key_path.push(PathSegment::key(key.clone()));
                            errors.push(ValidationErrorDetail::new(
                                key_path,
                                crate::executor::result::ErrorCode::Structural,
                                "unknown property",
                            ));
                        }
                    }
                }

                let mut out = Map::new();
                for (name, property) in properties {
                    let mut property_path = path.to_vec();
                    property_path.push(PathSegment::key(name.clone()));
                    match object.get(name) {
                        Some(inner) => {
                            if let Some(transformed) =
                                property.check_value(inner, &property_path, options, errors)
                            {
                                out.insert(name.clone(), transformed);
                            }
                        }
                        None if property.required => {
                            errors.push(ValidationErrorDetail::missing_field(property_path));
                        }
                        None => {
                            if options.apply_defaults {
                                if let Some(default) = &property.default {
                                    out.insert(name.clone(), default.clone());
                                }
                            }
                        }
                    }
                    if options.fail_fast && !errors.is_empty() {
                        break;
                    }
                }
                if *additional_properties {
                    for (key, inner) in object {
                        if !properties.contains_key(key) {
                            out.insert(key.clone(), inner.clone());
                        }
                    }
                }
                Some(Value::Object(out))
            }
            CompiledCheck::Date { min, max } => {
                let raw = self.expect_string(value, path, errors)?;
                let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") else {
                    errors.push(self.constraint(path, "value is not a valid date", value));
                    return None;
                };
                if let Some(min) = min {
                    if date < *min {
                        errors.push(self.constraint(
                            path,
                            format!("date is before minimum {}", min),
                            value,
                        ));
                    }
                }
                if let Some(max) = max {
                    if date > *max {
                        errors.push(self.constraint(
                            path,
                            format!("date is after maximum {}", max),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
            CompiledCheck::DateTime { min, max } => {
                let raw = self.expect_string(value, path, errors)?;
                let Ok(datetime) = DateTime::parse_from_rfc3339(raw) else {
                    errors.push(self.constraint(
                        path,
                        "value is not a valid RFC 3339 datetime",
                        value,
                    ));
                    return None;
                };
                if let Some(min) = min {
                    if datetime < *min {
                        errors.push(self.constraint(
                            path,
                            format!("datetime is before minimum {}", min.to_rfc3339()),
                            value,
                        ));
                    }
                }
                if let Some(max) = max {
                    if datetime > *max {
                        errors.push(self.constraint(
                            path,
                            format!("datetime is after maximum {}", max.to_rfc3339()),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
            CompiledCheck::Time => {
                let raw = self.expect_string(value, path, errors)?;
                let parsed = NaiveTime::parse_from_str(raw, "%H:%M:%S")
                    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"));
                if parsed.is_err() {
                    errors.push(self.constraint(path, "value is not a valid time of day", value));
                    return None;
                }
                Some(value.clone())
            }
            CompiledCheck::File {
                allowed_mime_types,
                max_file_size,
            } => {
                let Some(object) = value.as_object() else {
                    errors.push(self.type_error(path, value));
                    return None;
                };
                let name = object.get("name").and_then(Value::as_str);
                let size = object.get("size").and_then(Value::as_u64);
                let mime = object.get("type").and_then(Value::as_str);
                let (Some(_), Some(size), Some(mime)) = (name, size, mime) else {
                    errors.push(self.constraint(
                        path,
                        "file must have string 'name', numeric 'size', and string 'type'",
                        value,
                    ));
                    return None;
                };
                if let Some(max) = max_file_size {
                    if size > *max {
                        errors.push(self.constraint(
                            path,
                            format!("file size {} exceeds maximum {}", size, max),
                            value,
                        ));
                    }
                }
                if let Some(allowed) = allowed_mime_types {
                    if !allowed.iter().any(|candidate| candidate == mime) {
                        errors.push(self.constraint(
                            path,
                            format!("mime type '{}' is not allowed", mime),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
            CompiledCheck::Json => match value {
                Value::String(raw) => {
                    if serde_json::from_str::<Value>(raw).is_err() {
                        errors.push(self.constraint(path, "value is not valid JSON", value));
                        return None;
                    }
                    Some(value.clone())
                }
                Value::Object(_) | Value::Array(_) => Some(value.clone()),
                _ => {
                    errors.push(self.type_error(path, value));
                    None
                }
            },
            CompiledCheck::ApiKey | CompiledCheck::Secret => {
                let raw = self.expect_string(value, path, errors)?;
                if raw.is_empty() {
                    errors.push(self.constraint(path, "value must not be empty", value));
                    return None;
                }
                Some(value.clone())
            }
            CompiledCheck::Url { allowed_protocols } => {
                let raw = self.expect_string(value, path, errors)?;
                let Ok(url) = Url::parse(raw) else {
                    errors.push(self.constraint(path, "value is not a valid URL", value));
                    return None;
                };
                if let Some(allowed) = allowed_protocols {
                    if !allowed.iter().any(|scheme| scheme == url.scheme()) {
                        errors.push(self.constraint(
                            path,
                            format!("protocol '{}' is not allowed", url.scheme()),
                            value,
                        ));
                    }
                }
                Some(value.clone())
            }
        }
    }

    /// Config-only checks layered on the raw value after the base type
    /// checks pass.
    fn check_extra(
        &self,
        extra: &ExtraChecks,
        value: &Value,
        path: &[PathSegment],
        errors: &mut Vec<ValidationErrorDetail>,
    ) {
        if let Some(min) = extra.min {
            if value.as_f64().is_some_and(|number| number < min) {
                errors.push(self.constraint(
                    path,
                    format!("value is below configured minimum {}", min),
                    value,
                ));
            }
        }
        if let Some(max) = extra.max {
            if value.as_f64().is_some_and(|number| number > max) {
                errors.push(self.constraint(
                    path,
                    format!("value exceeds configured maximum {}", max),
                    value,
                ));
            }
        }
        if let Some(pattern) = &extra.pattern {
            if value.as_str().is_some_and(|raw| !pattern.is_match(raw)) {
                errors.push(self.constraint(
                    path,
                    format!("value does not match pattern {}", pattern.as_str()),
                    value,
                ));
            }
        }
        if let Some(allowed) = &extra.allowed_values {
            if let Some(raw) = value.as_str() {
                if !allowed.iter().any(|candidate| candidate == raw) {
                    errors.push(
                        ValidationErrorDetail::enum_mismatch(path.to_vec(), allowed)
                            .with_value(value, self.sensitive),
                    );
                }
            }
        }
        if let Some(allowed) = &extra.allowed_protocols {
            if let Some(raw) = value.as_str() {
                if let Ok(url) = Url::parse(raw) {
                    if !allowed.iter().any(|scheme| scheme == url.scheme()) {
                        errors.push(self.constraint(
                            path,
                            format!("protocol '{}' is not allowed", url.scheme()),
                            value,
                        ));
                    }
                }
            }
        }
    }

    /// Produces the output value: sanitize, then transform, strings only.
    fn transform_output(&self, value: Value, options: &ValidationOptions) -> Value {
        if !options.apply_transforms {
            return value;
        }
        let Value::String(raw) = value else {
            return value;
        };
        let mut out = raw;
        if self.sanitize {
            out.retain(|c| !c.is_control());
        }
        if let Some(transform) = self.transform {
            out = match transform {
                Transform::Trim => out.trim().to_string(),
                Transform::Lowercase => out.to_lowercase(),
                Transform::Uppercase => out.to_uppercase(),
                Transform::Normalize => out.split_whitespace().collect::<Vec<_>>().join(" "),
            };
        }
        Value::String(out)
    }

    fn expect_string<'v>(
        &self,
        value: &'v Value,
        path: &[PathSegment],
        errors: &mut Vec<ValidationErrorDetail>,
    ) -> Option<&'v str> {
        match value.as_str() {
            Some(raw) => Some(raw),
            None => {
                errors.push(self.type_error(path, value));
                None
            }
        }
    }

    fn type_error(&self, path: &[PathSegment], value: &Value) -> ValidationErrorDetail {
        ValidationErrorDetail::type_mismatch(
            path.to_vec(),
            self.check.type_name(),
            json_type_name(value),
        )
        .with_value(value, self.sensitive)
    }

    fn constraint(
        &self,
        path: &[PathSegment],
        message: impl Into<String>,
        value: &Value,
    ) -> ValidationErrorDetail {
        let message = match &self.custom_message {
            Some(custom) => custom.clone(),
            None => message.into(),
        };
        ValidationErrorDetail::constraint(path.to_vec(), message).with_value(value, self.sensitive)
    }
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::result::ErrorCode;
    use crate::field;
    use serde_json::json;

    fn options() -> ValidationOptions {
        ValidationOptions::default()
    }

    fn compile_one(definition: FieldDefinition) -> CompiledValidator {
        let mut fields = BTreeMap::new();
        fields.insert("field".to_string(), definition);
        compile(SchemaKind::Input, &fields, &options()).unwrap()
    }

    fn first_error(validator: &CompiledValidator, data: Value) -> ValidationErrorDetail {
        validator.apply(&data).unwrap_err().remove(0)
    }

    #[test]
    fn test_missing_required_field() {
        let validator = compile_one(field::string().required().build());
        let error = first_error(&validator, json!({}));
        assert_eq!(error.code, ErrorCode::Structural);
        assert_eq!(error.path, vec![PathSegment::key("field")]);
    }

    #[test]
    fn test_absent_optional_with_default() {
        let validator = compile_one(field::number().default_value(5).build());
        let output = validator.apply(&json!({})).unwrap();
        assert_eq!(output["field"], json!(5));
    }

    #[test]
    fn test_absent_optional_without_default_omitted() {
        let validator = compile_one(field::string().build());
        let output = validator.apply(&json!({})).unwrap();
        assert!(output.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_null_is_a_type_error() {
        let validator = compile_one(field::string().required().build());
        let error = first_error(&validator, json!({ "field": null }));
        assert_eq!(error.code, ErrorCode::Structural);
    }

    #[test]
    fn test_string_length_and_pattern() {
        let validator = compile_one(
            field::string()
                .min_length(3)
                .max_length(5)
                .pattern("^[a-z]+$")
                .required()
                .build(),
        );
        assert!(validator.apply(&json!({ "field": "abcd" })).is_ok());

        let error = first_error(&validator, json!({ "field": "ab" }));
        assert_eq!(error.code, ErrorCode::Constraint);

        let error = first_error(&validator, json!({ "field": "ABCD" }));
        assert!(error.message.contains("pattern"));
    }

    #[test]
    fn test_validation_runs_on_raw_value_before_transform() {
        // Uppercase input fails the lowercase pattern even though the
        // transform would lowercase it.
        let validator = compile_one(
            field::string()
                .pattern("^[A-Z]+$")
                .transform(Transform::Lowercase)
                .required()
                .build(),
        );
        let output = validator.apply(&json!({ "field": "HELLO" })).unwrap();
        assert_eq!(output["field"], json!("hello"));
    }

    #[test]
    fn test_number_bounds_and_integer() {
        let validator = compile_one(field::number().min(1.0).max(10.0).integer().required().build());
        assert!(validator.apply(&json!({ "field": 5 })).is_ok());
        assert!(validator.apply(&json!({ "field": 0 })).is_err());
        assert!(validator.apply(&json!({ "field": 11 })).is_err());
        assert!(validator.apply(&json!({ "field": 2.5 })).is_err());
    }

    #[test]
    fn test_enum_membership() {
        let validator = compile_one(field::enumeration().values(["a", "b"]).required().build());
        assert!(validator.apply(&json!({ "field": "a" })).is_ok());

        let error = first_error(&validator, json!({ "field": "c" }));
        assert_eq!(error.code, ErrorCode::EnumMismatch);

        // Case-sensitive membership.
        let error = first_error(&validator, json!({ "field": "A" }));
        assert_eq!(error.code, ErrorCode::EnumMismatch);
    }

    #[test]
    fn test_empty_enum_is_authoring_error() {
        let mut fields = BTreeMap::new();
        fields.insert("choice".to_string(), field::enumeration().build());
        let result = compile(SchemaKind::Input, &fields, &options());
        assert!(matches!(result, Err(CompileError::EmptyEnum { .. })));
    }

    #[test]
    fn test_invalid_pattern_is_authoring_error() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), field::string().pattern("([").build());
        let result = compile(SchemaKind::Input, &fields, &options());
        assert!(matches!(result, Err(CompileError::InvalidPattern { .. })));
    }

    #[test]
    fn test_invalid_default_is_authoring_error() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "count".to_string(),
            field::number().default_value("five").build(),
        );
        let result = compile(SchemaKind::Input, &fields, &options());
        assert!(matches!(result, Err(CompileError::InvalidDefault { .. })));
    }

    #[test]
    fn test_array_per_index_paths() {
        let validator = compile_one(
            field::array(field::number().integer().build())
                .required()
                .build(),
        );
        let error = first_error(&validator, json!({ "field": [1, "two", 3] }));
        assert_eq!(
            error.path,
            vec![PathSegment::key("field"), PathSegment::index(1)]
        );
    }

    #[test]
    fn test_array_bounds_and_unique() {
        let validator = compile_one(
            field::array(field::string().build())
                .min_items(1)
                .max_items(3)
                .unique_items()
                .required()
                .build(),
        );
        assert!(validator.apply(&json!({ "field": ["a", "b"] })).is_ok());
        assert!(validator.apply(&json!({ "field": [] })).is_err());
        assert!(validator
            .apply(&json!({ "field": ["a", "b", "c", "d"] }))
            .is_err());

        let error = first_error(&validator, json!({ "field": ["a", "a"] }));
        assert!(error.message.contains("duplicate"));
        assert_eq!(
            error.path,
            vec![PathSegment::key("field"), PathSegment::index(1)]
        );
    }

    #[test]
    fn test_object_dotted_paths_and_unknown_keys() {
        let validator = compile_one(
            field::object()
                .property("city", field::string().required().build())
                .required()
                .build(),
        );
        let error = first_error(&validator, json!({ "field": { "city": "x", "zip": "y" } }));
        assert_eq!(
            error.path,
            vec![PathSegment::key("field"), PathSegment::key("zip")]
        );

        let error = first_error(&validator, json!({ "field": {} }));
        assert_eq!(
            error.path,
            vec![PathSegment::key("field"), PathSegment::key("city")]
        );
    }

    #[test]
    fn test_object_additional_properties_pass_through() {
        let validator = compile_one(
            field::object()
                .property("city", field::string().required().build())
                .additional_properties()
                .required()
                .build(),
        );
        let output = validator
            .apply(&json!({ "field": { "city": "x", "zip": "y" } }))
            .unwrap();
        assert_eq!(output["field"]["zip"], json!("y"));
    }

    #[test]
    fn test_required_properties_override() {
        let validator = compile_one(
            field::object()
                .property("zip", field::string().build())
                .required_properties(["zip"])
                .required()
                .build(),
        );
        assert!(validator.apply(&json!({ "field": {} })).is_err());
    }

    #[test]
    fn test_date_bounds_inclusive() {
        let validator = compile_one(
            field::date()
                .min_date("2024-01-01")
                .max_date("2024-12-31")
                .required()
                .build(),
        );
        assert!(validator.apply(&json!({ "field": "2024-01-01" })).is_ok());
        assert!(validator.apply(&json!({ "field": "2024-12-31" })).is_ok());
        assert!(validator.apply(&json!({ "field": "2023-12-31" })).is_err());
        assert!(validator.apply(&json!({ "field": "not-a-date" })).is_err());
    }

    #[test]
    fn test_datetime_and_time() {
        let validator = compile_one(field::datetime().required().build());
        assert!(validator
            .apply(&json!({ "field": "2024-06-01T12:00:00Z" }))
            .is_ok());
        assert!(validator.apply(&json!({ "field": "2024-06-01" })).is_err());

        let validator = compile_one(field::time().required().build());
        assert!(validator.apply(&json!({ "field": "23:59" })).is_ok());
        assert!(validator.apply(&json!({ "field": "23:59:59" })).is_ok());
        assert!(validator.apply(&json!({ "field": "25:00" })).is_err());
    }

    #[test]
    fn test_file_checks() {
        let validator = compile_one(
            field::file()
                .allowed_mime_types(["image/png"])
                .max_file_size(1024)
                .required()
                .build(),
        );
        let ok = json!({ "field": { "name": "a.png", "size": 512, "type": "image/png" } });
        assert!(validator.apply(&ok).is_ok());

        let too_big = json!({ "field": { "name": "a.png", "size": 4096, "type": "image/png" } });
        assert!(validator.apply(&too_big).is_err());

        let bad_mime = json!({ "field": { "name": "a.gif", "size": 10, "type": "image/gif" } });
        assert!(validator.apply(&bad_mime).is_err());

        let malformed = json!({ "field": { "name": "a.png" } });
        assert!(validator.apply(&malformed).is_err());
    }

    #[test]
    fn test_json_api_key_secret_url() {
        let validator = compile_one(field::json().required().build());
        assert!(validator.apply(&json!({ "field": "{\"a\":1}" })).is_ok());
        assert!(validator.apply(&json!({ "field": {"a": 1} })).is_ok());
        assert!(validator.apply(&json!({ "field": "{oops" })).is_err());

        let validator = compile_one(field::api_key().required().build());
        assert!(validator.apply(&json!({ "field": "k-123" })).is_ok());
        assert!(validator.apply(&json!({ "field": "" })).is_err());

        let validator = compile_one(
            field::url()
                .allowed_protocols(["https"])
                .required()
                .build(),
        );
        assert!(validator
            .apply(&json!({ "field": "https://example.com" }))
            .is_ok());
        assert!(validator
            .apply(&json!({ "field": "http://example.com" }))
            .is_err());
        assert!(validator.apply(&json!({ "field": "not a url" })).is_err());
    }

    #[test]
    fn test_sensitive_value_not_attached() {
        let validator = compile_one(field::secret().required().build());
        let error = first_error(&validator, json!({ "field": "" }));
        assert!(error.value.is_none());
    }

    #[test]
    fn test_sanitize_and_normalize_output() {
        let validator = compile_one(
            field::string()
                .sanitize()
                .transform(Transform::Normalize)
                .required()
                .build(),
        );
        let output = validator
            .apply(&json!({ "field": "  hello \t world  " }))
            .unwrap();
        assert_eq!(output["field"], json!("hello world"));
    }

    #[test]
    fn test_config_validation_sub_record() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "endpoint".to_string(),
            field::string()
                .required()
                .validation(ConfigValidation {
                    pattern: Some("^https://".into()),
                    error_message: Some("endpoint must use https".into()),
                    ..ConfigValidation::default()
                })
                .build(),
        );

        let validator = compile(SchemaKind::Config, &fields, &options()).unwrap();
        assert!(validator
            .apply(&json!({ "endpoint": "https://example.com" }))
            .is_ok());
        let error = validator
            .apply(&json!({ "endpoint": "http://example.com" }))
            .unwrap_err()
            .remove(0);
        assert_eq!(error.message, "endpoint must use https");

        // The same sub-record is inert in the input namespace.
        let validator = compile(SchemaKind::Input, &fields, &options()).unwrap();
        assert!(validator
            .apply(&json!({ "endpoint": "http://example.com" }))
            .is_ok());
    }

    #[test]
    fn test_fail_fast_stops_after_first_error() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), field::string().required().build());
        fields.insert("b".to_string(), field::string().required().build());
        let opts = ValidationOptions {
            fail_fast: true,
            ..ValidationOptions::default()
        };
        let validator = compile(SchemaKind::Input, &fields, &opts).unwrap();
        let errors = validator.apply(&json!({})).unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_non_object_root() {
        let validator = compile_one(field::string().build());
        let errors = validator.apply(&json!([1, 2])).unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::Structural);
        assert!(errors[0].path.is_empty());
    }

    #[test]
    fn test_unknown_top_level_keys_ignored() {
        let validator = compile_one(field::string().build());
        let output = validator
            .apply(&json!({ "field": "x", "extra": true }))
            .unwrap();
        assert!(output.as_object().unwrap().get("extra").is_none());
    }
}
