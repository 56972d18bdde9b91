//! # validus
//!
//! A strict, deterministic schema-and-validation engine.
//!
//! Schemas are declared with fluent field builders, compiled once into
//! executable validators, and cached by structural identity. Validation
//! runs are deterministic: the same schema and data always produce the
//! same output payload and the same ordered error list.
//!
//! Expected validation failures are data, never `Err`: the engine's
//! entry points return a [`executor::ValidationResult`] carrying either
//! the transformed payload or structured error details. Only
//! schema-authoring mistakes (bad patterns, empty enums, malformed rule
//! conditions) surface as [`compiler::CompileError`].
//!
//! ```
//! use serde_json::json;
//! use validus::executor::ValidationEngine;
//! use validus::field;
//! use validus::schema::Schema;
//!
//! let schema = Schema::builder()
//!     .input_field("city", field::string().min_length(1).required().build())
//!     .input_field(
//!         "units",
//!         field::enumeration()
//!             .values(["metric", "imperial"])
//!             .default_value(json!("metric"))
//!             .build(),
//!     )
//!     .build()?;
//!
//! let engine = ValidationEngine::new();
//! let result = engine.validate_input(&schema, &json!({"city": "Oslo"}))?;
//! assert!(result.success);
//! assert_eq!(result.data, Some(json!({"city": "Oslo", "units": "metric"})));
//! # Ok::<(), validus::compiler::CompileError>(())
//! ```

pub mod cache;
pub mod compiler;
pub mod describe;
pub mod executor;
pub mod field;
pub mod observability;
pub mod rules;
pub mod schema;
