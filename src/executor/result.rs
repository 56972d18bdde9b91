//! Result types for validation execution
//!
//! Every expected validation outcome is data: a `ValidationResult` carrying
//! either the transformed payload or an ordered list of structured error
//! details. Nothing in here is thrown past the engine boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One segment of an error path.
///
/// Paths are arrays of keys and indices, never a single dotted string;
/// rendering a dotted display form is the formatter's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key or top-level field name
    Key(String),
    /// Array element index
    Index(usize),
}

impl PathSegment {
    /// Top-level field or object key segment.
    pub fn key(name: impl Into<String>) -> Self {
        PathSegment::Key(name.into())
    }

    /// Array index segment.
    pub fn index(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(name) => write!(f, "{}", name),
            PathSegment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing required field or wrong value type
    Structural,
    /// Length, range, pattern, or format violation
    Constraint,
    /// Value outside a declared enum set
    EnumMismatch,
    /// A cross-field rule failed
    CrossFieldValidationFailed,
    /// A cross-field condition could not be evaluated
    CrossFieldEvaluationError,
    /// Unexpected internal failure, caught at the engine boundary
    ValidationSystemError,
}

impl ErrorCode {
    /// Returns the wire string for this code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::Structural => "STRUCTURAL",
            ErrorCode::Constraint => "CONSTRAINT",
            ErrorCode::EnumMismatch => "ENUM_MISMATCH",
            ErrorCode::CrossFieldValidationFailed => "CROSS_FIELD_VALIDATION_FAILED",
            ErrorCode::CrossFieldEvaluationError => "CROSS_FIELD_EVALUATION_ERROR",
            ErrorCode::ValidationSystemError => "VALIDATION_SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Path to the offending field, as key/index segments
    pub path: Vec<PathSegment>,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Offending value. Omitted for sensitive fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Expected type or condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Additional context (rule description, nested cause)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ValidationErrorDetail {
    /// Creates a detail with no value/expected/context attachments.
    pub fn new(path: Vec<PathSegment>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            path,
            code,
            message: message.into(),
            value: None,
            expected: None,
            context: None,
        }
    }

    /// Missing required field at the given path.
    pub fn missing_field(path: Vec<PathSegment>) -> Self {
        Self::new(path, ErrorCode::Structural, "required field is missing")
            .with_expected("field to be present")
    }

    /// Wrong value type at the given path.
    pub fn type_mismatch(path: Vec<PathSegment>, expected: &str, actual: &str) -> Self {
        Self::new(
            path,
            ErrorCode::Structural,
            format!("expected {}, got {}", expected, actual),
        )
        .with_expected(expected)
    }

    /// Constraint violation (length/range/pattern/format) at the path.
    pub fn constraint(path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self::new(path, ErrorCode::Constraint, message)
    }

    /// Enum membership failure at the path.
    pub fn enum_mismatch(path: Vec<PathSegment>, allowed: &[String]) -> Self {
        Self::new(
            path,
            ErrorCode::EnumMismatch,
            format!("value is not one of: {}", allowed.join(", ")),
        )
        .with_expected(format!("one of: {}", allowed.join(", ")))
    }

    /// Cross-field rule failure; path is always `["cross-field"]`.
    pub fn cross_field(message: impl Into<String>) -> Self {
        Self::new(
            vec![PathSegment::key("cross-field")],
            ErrorCode::CrossFieldValidationFailed,
            message,
        )
    }

    /// Caught fault while evaluating a cross-field condition.
    pub fn cross_field_evaluation(message: impl Into<String>) -> Self {
        Self::new(
            vec![PathSegment::key("cross-field")],
            ErrorCode::CrossFieldEvaluationError,
            message,
        )
    }

    /// Unexpected internal failure, reported as data.
    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new(Vec::new(), ErrorCode::ValidationSystemError, message)
    }

    /// Attaches the offending value unless the field is sensitive.
    pub fn with_value(mut self, value: &Value, sensitive: bool) -> Self {
        if !sensitive {
            self.value = Some(value.clone());
        }
        self
    }

    /// Attaches the expected type or condition.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Attaches additional context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Elapsed-time record for one validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationTiming {
    /// Wall-clock duration of the call in microseconds
    pub duration_micros: u64,
    /// Whether the compiled validator came from the cache
    pub from_cache: bool,
}

/// Outcome of one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether validation passed
    pub success: bool,
    /// Transformed payload, present only on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Ordered failure details, empty on success
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationErrorDetail>,
    /// Timing, absent for results synthesized without running a validator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<ValidationTiming>,
}

impl ValidationResult {
    /// Successful result carrying the transformed payload.
    pub fn passed(data: Value, timing: ValidationTiming) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: Vec::new(),
            timing: Some(timing),
        }
    }

    /// Failed result carrying ordered error details.
    pub fn failed(errors: Vec<ValidationErrorDetail>, timing: ValidationTiming) -> Self {
        Self {
            success: false,
            data: None,
            errors,
            timing: Some(timing),
        }
    }

    /// Result for an internal failure caught at the engine boundary.
    pub fn system_error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            errors: vec![ValidationErrorDetail::system_error(message)],
            timing: None,
        }
    }

    /// Returns true if any error carries the given code.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|detail| detail.code == code)
    }
}
