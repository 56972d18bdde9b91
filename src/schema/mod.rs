//! Schema model for validus
//!
//! A schema pairs two field namespaces, `input` for per-invocation data
//! and `config` for long-lived settings, with the cross-field rules
//! relating them. Namespaces validate independently; rules run only
//! after both succeed.

mod types;

pub use types::{Schema, SchemaBuilder, SchemaKind};
