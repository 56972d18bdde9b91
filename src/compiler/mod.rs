//! Schema Compiler subsystem for validus
//!
//! Turns immutable field definitions into executable, cacheable
//! validators.
//!
//! # Design Principles
//!
//! - Compilation is pure and deterministic: same definitions and options
//!   always produce an equivalent validator
//! - Expensive preparation (regex compilation, date-bound parsing) happens
//!   once here, never per validation
//! - Schema-authoring mistakes fail compilation; data problems never do
//! - Checks run on raw input; transforms shape only the output

mod errors;
mod formats;
mod validator;

pub use errors::{CompileError, CompileResult};
pub use formats::check_format;
pub use validator::{compile, json_type_name, CompiledValidator};
