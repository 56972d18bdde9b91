//! Schema-authoring errors
//!
//! These are the only errors returned as `Err` from the engine's public
//! entry points. They represent programmer mistakes in a schema
//! definition, not runtime data problems; data problems are always
//! reported inside a `ValidationResult`.

use thiserror::Error;

use crate::rules::expr::ExprError;

/// Result type for schema compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// Schema-authoring error detected at compile time.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Enum field with zero declared values
    #[error("enum field '{field}' declares no values")]
    EmptyEnum {
        /// Dotted path of the offending field
        field: String,
    },

    /// Unparseable regex pattern
    #[error("invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        /// Dotted path of the offending field
        field: String,
        /// Regex compilation failure
        #[source]
        source: regex::Error,
    },

    /// Unparseable declared date/datetime bound
    #[error("invalid date bound '{value}' for field '{field}'")]
    InvalidDateBound {
        /// Dotted path of the offending field
        field: String,
        /// The bound as declared
        value: String,
    },

    /// Declared default whose JSON type cannot satisfy the field type
    #[error("default for field '{field}' does not match its declared type")]
    InvalidDefault {
        /// Dotted path of the offending field
        field: String,
    },

    /// Enum labels declared with a different length than the value set
    #[error("enum field '{field}' declares {labels} labels for {values} values")]
    MismatchedLabels {
        /// Dotted path of the offending field
        field: String,
        /// Number of declared labels
        labels: usize,
        /// Number of declared values
        values: usize,
    },

    /// Cross-field rule condition rejected by the expression grammar
    #[error("invalid cross-field condition: {0}")]
    InvalidCondition(#[from] ExprError),

    /// Cross-field rule referencing a namespace other than input/config
    #[error("cross-field path '{path}' must start with 'input.' or 'config.'")]
    InvalidRulePath {
        /// The offending dotted path
        path: String,
    },
}
