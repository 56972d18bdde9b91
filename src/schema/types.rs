//! Schema model: two field namespaces plus cross-field rules

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compiler::{CompileError, CompileResult};
use crate::field::FieldDefinition;
use crate::rules::{check_rule, CrossFieldRule, RuleCheckError};

/// Which namespace of a schema a validator was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Per-invocation data
    Input,
    /// Long-lived settings; `validation` sub-records apply here
    Config,
}

impl SchemaKind {
    /// Stable lowercase name, used in log fields and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Input => "input",
            SchemaKind::Config => "config",
        }
    }
}

/// A complete declarative schema: input fields, config fields, and the
/// cross-field rules relating them.
///
/// Field maps are ordered by name so compilation, hashing, and error
/// ordering are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Input namespace definitions, keyed by field name
    #[serde(default)]
    pub input: BTreeMap<String, FieldDefinition>,
    /// Config namespace definitions, keyed by field name
    #[serde(default)]
    pub config: BTreeMap<String, FieldDefinition>,
    /// Cross-field rules, evaluated in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<CrossFieldRule>,
}

impl Schema {
    /// Starts a schema builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Definitions for the given namespace.
    pub fn fields(&self, kind: SchemaKind) -> &BTreeMap<String, FieldDefinition> {
        match kind {
            SchemaKind::Input => &self.input,
            SchemaKind::Config => &self.config,
        }
    }
}

/// Fluent builder for [`Schema`].
///
/// `build` checks every cross-field rule: conditions must parse under
/// the restricted expression grammar and every referenced path must
/// root in `input.` or `config.`. Field-level mistakes surface later,
/// when the namespace is compiled.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    input: BTreeMap<String, FieldDefinition>,
    config: BTreeMap<String, FieldDefinition>,
    rules: Vec<CrossFieldRule>,
}

impl SchemaBuilder {
    /// Adds a field to the input namespace.
    pub fn input_field(mut self, name: impl Into<String>, field: FieldDefinition) -> Self {
        self.input.insert(name.into(), field);
        self
    }

    /// Adds a field to the config namespace.
    pub fn config_field(mut self, name: impl Into<String>, field: FieldDefinition) -> Self {
        self.config.insert(name.into(), field);
        self
    }

    /// Adds a cross-field rule.
    pub fn rule(mut self, rule: CrossFieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finalizes the schema, rejecting malformed rules.
    pub fn build(self) -> CompileResult<Schema> {
        for rule in &self.rules {
            check_rule(rule).map_err(|error| match error {
                RuleCheckError::Condition(source) => CompileError::InvalidCondition(source),
                RuleCheckError::Path(path) => CompileError::InvalidRulePath { path },
            })?;
        }
        Ok(Schema {
            input: self.input,
            config: self.config,
            rules: self.rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field;

    #[test]
    fn test_builder_collects_namespaces() {
        let schema = Schema::builder()
            .input_field("city", field::string().required().build())
            .input_field(
                "units",
                field::enumeration().values(["metric", "imperial"]).build(),
            )
            .config_field("api_key", field::api_key().required().build())
            .build()
            .unwrap();

        assert_eq!(schema.input.len(), 2);
        assert_eq!(schema.config.len(), 1);
        assert!(schema.fields(SchemaKind::Input).contains_key("city"));
        assert!(schema.fields(SchemaKind::Config).contains_key("api_key"));
    }

    #[test]
    fn test_builder_rejects_bad_condition() {
        let result = Schema::builder()
            .rule(CrossFieldRule::conditional("input.a + 1 == 2"))
            .build();
        assert!(matches!(result, Err(CompileError::InvalidCondition(_))));
    }

    #[test]
    fn test_builder_rejects_foreign_namespace() {
        let result = Schema::builder()
            .rule(CrossFieldRule::mutual_exclusion(["env.HOME", "input.a"]))
            .build();
        assert!(matches!(result, Err(CompileError::InvalidRulePath { .. })));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SchemaKind::Input.as_str(), "input");
        assert_eq!(SchemaKind::Config.as_str(), "config");
    }

    #[test]
    fn test_schema_serializes_round_trip() {
        let schema = Schema::builder()
            .input_field("count", field::number().integer().build())
            .rule(
                CrossFieldRule::dependency("input.count").requires(["config.limit"]),
            )
            .build()
            .unwrap();

        let encoded = serde_json::to_string(&schema).unwrap();
        let decoded: Schema = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, schema);
    }
}
