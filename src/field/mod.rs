//! Field Definition Model for validus
//!
//! Declarative, immutable descriptions of input and configuration values,
//! assembled with fluent builders.
//!
//! # Design Principles
//!
//! - Definitions are frozen at `build()` and never mutated
//! - A declared default always implies optional
//! - Builders assemble declarations only; the compiler rejects malformed
//!   ones (empty enum set, invalid pattern, bad date bound)
//! - Deterministic: no clocks, no randomness, no I/O

pub mod builder;
mod types;

pub use builder::{
    api_key, array, boolean, date, datetime, email, enumeration, file, identifier, json, number,
    object, port, secret, string, time, url,
};
pub use types::{ConfigValidation, FieldDefinition, FieldType, StringFormat, Transform};
