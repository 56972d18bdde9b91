//! Validation Executor for validus
//!
//! The engine is the single entry point for running validations. It owns
//! the validator cache and the metrics counters, and guarantees that
//! expected validation failures are always reported as data inside a
//! [`ValidationResult`]; only schema-authoring mistakes surface as `Err`.

pub mod result;

pub use result::{
    ErrorCode, PathSegment, ValidationErrorDetail, ValidationResult, ValidationTiming,
};

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::cache::{structural_hash, CacheConfig, CacheKey, ValidatorCache};
use crate::compiler::{compile, CompileResult, CompiledValidator};
use crate::field::FieldDefinition;
use crate::observability::{Event, Logger, MetricsSnapshot, ValidationMetrics};
use crate::rules::evaluate_rules;
use crate::schema::{Schema, SchemaKind};

/// Per-call execution options.
///
/// Options participate in the cache key, so validators compiled under
/// different options never collide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Fill in declared defaults for absent optional fields
    pub apply_defaults: bool,
    /// Apply sanitization and declared transforms to the output
    pub apply_transforms: bool,
    /// Stop at the first error instead of collecting all of them
    pub fail_fast: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            apply_defaults: true,
            apply_transforms: true,
            fail_fast: false,
        }
    }
}

/// Thread-safe validation engine with a shared validator cache.
pub struct ValidationEngine {
    cache: Mutex<ValidatorCache>,
    metrics: ValidationMetrics,
}

impl ValidationEngine {
    /// Engine with default cache tuning.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Engine with explicit cache tuning, used by tests and embedders.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            cache: Mutex::new(ValidatorCache::with_config(config)),
            metrics: ValidationMetrics::new(),
        }
    }

    /// Validates per-invocation input data with default options.
    pub fn validate_input(&self, schema: &Schema, data: &Value) -> CompileResult<ValidationResult> {
        self.validate_namespace(schema, SchemaKind::Input, data, &ValidationOptions::default())
    }

    /// Validates config data with default options. Fields with
    /// `validation` sub-records get those extra checks here.
    pub fn validate_config(
        &self,
        schema: &Schema,
        data: &Value,
    ) -> CompileResult<ValidationResult> {
        self.validate_namespace(schema, SchemaKind::Config, data, &ValidationOptions::default())
    }

    /// Validates one namespace with explicit options.
    pub fn validate_with(
        &self,
        schema: &Schema,
        kind: SchemaKind,
        data: &Value,
        options: &ValidationOptions,
    ) -> CompileResult<ValidationResult> {
        self.validate_namespace(schema, kind, data, options)
    }

    /// Validates input and config together, then evaluates cross-field
    /// rules. Phases run in order and the first failing phase returns
    /// alone, so input failures shadow config failures. Rules run only
    /// when both namespaces pass; on full success the payload is
    /// `{"input": ..., "config": ...}`.
    pub fn validate_tool_schema(
        &self,
        schema: &Schema,
        input: &Value,
        config: &Value,
    ) -> CompileResult<ValidationResult> {
        let options = ValidationOptions::default();
        let started = Instant::now();

        let input_result = self.validate_namespace(schema, SchemaKind::Input, input, &options)?;
        if !input_result.success {
            return Ok(input_result);
        }
        let config_result = self.validate_namespace(schema, SchemaKind::Config, config, &options)?;
        if !config_result.success {
            return Ok(config_result);
        }

        let from_cache = match (&input_result.timing, &config_result.timing) {
            (Some(left), Some(right)) => left.from_cache && right.from_cache,
            _ => false,
        };

        let input_data = input_result.data.unwrap_or_else(|| json!({}));
        let config_data = config_result.data.unwrap_or_else(|| json!({}));
        let rule_errors = evaluate_rules(
            &schema.rules,
            as_object(&input_data),
            as_object(&config_data),
        );

        let timing = ValidationTiming {
            duration_micros: elapsed_micros(started),
            from_cache,
        };
        if rule_errors.is_empty() {
            Ok(ValidationResult::passed(
                json!({"input": input_data, "config": config_data}),
                timing,
            ))
        } else {
            Logger::info(
                Event::ValidationFailed.as_str(),
                &[("phase", "cross_field"), ("errors", &rule_errors.len().to_string())],
            );
            Ok(ValidationResult::failed(rule_errors, timing))
        }
    }

    fn validate_namespace(
        &self,
        schema: &Schema,
        kind: SchemaKind,
        data: &Value,
        options: &ValidationOptions,
    ) -> CompileResult<ValidationResult> {
        let started = Instant::now();

        let fields = schema.fields(kind);
        let key = match cache_key(kind, fields, options) {
            Ok(key) => key,
            Err(error) => {
                let result = self.fault(kind, "schema canonicalization failed", &error);
                return Ok(result);
            }
        };

        let (validator, from_cache) = match self.resolve_validator(&key, kind, fields, options)? {
            Ok(resolved) => resolved,
            Err(result) => return Ok(result),
        };

        let outcome = validator.apply(data);
        let timing = ValidationTiming {
            duration_micros: elapsed_micros(started),
            from_cache,
        };
        let success = outcome.is_ok();
        self.metrics.record(success, from_cache, timing.duration_micros);

        let result = match outcome {
            Ok(output) => {
                Logger::trace(
                    Event::ValidationPassed.as_str(),
                    &[
                        ("duration_micros", &timing.duration_micros.to_string()),
                        ("kind", kind.as_str()),
                    ],
                );
                ValidationResult::passed(output, timing)
            }
            Err(errors) => {
                Logger::info(
                    Event::ValidationFailed.as_str(),
                    &[
                        ("errors", &errors.len().to_string()),
                        ("kind", kind.as_str()),
                    ],
                );
                ValidationResult::failed(errors, timing)
            }
        };
        Ok(result)
    }

    /// Fetches a cached validator or compiles and caches a new one.
    ///
    /// The outer `Err` is a schema-authoring failure; the inner `Err` is
    /// a synthesized fault result (lock poisoning).
    #[allow(clippy::type_complexity)]
    fn resolve_validator(
        &self,
        key: &CacheKey,
        kind: SchemaKind,
        fields: &BTreeMap<String, FieldDefinition>,
        options: &ValidationOptions,
    ) -> CompileResult<Result<(Arc<CompiledValidator>, bool), ValidationResult>> {
        let Ok(mut cache) = self.cache.lock() else {
            return Ok(Err(ValidationResult::system_error(
                "validator cache is unavailable",
            )));
        };
        if let Some(validator) = cache.lookup(key) {
            Logger::trace(Event::CacheHit.as_str(), &[("kind", kind.as_str())]);
            return Ok(Ok((validator, true)));
        }
        let validator = Arc::new(compile(kind, fields, options)?);
        let evicted = cache.insert(key.clone(), Arc::clone(&validator));
        if evicted > 0 {
            Logger::info(
                Event::CacheEvicted.as_str(),
                &[("entries", &evicted.to_string())],
            );
        }
        Logger::trace(
            Event::ValidatorCompiled.as_str(),
            &[
                ("fields", &validator.field_count().to_string()),
                ("kind", kind.as_str()),
            ],
        );
        Ok(Ok((validator, false)))
    }

    fn fault(&self, kind: SchemaKind, message: &str, error: &serde_json::Error) -> ValidationResult {
        Logger::error(
            Event::ValidationFault.as_str(),
            &[("detail", &error.to_string()), ("kind", kind.as_str())],
        );
        ValidationResult::system_error(format!("{message}: {error}"))
    }

    /// Point-in-time counters plus the current cache size.
    pub fn metrics(&self) -> MetricsSnapshot {
        let cache_size = self.cache.lock().map(|cache| cache.len()).unwrap_or(0);
        self.metrics.snapshot(cache_size)
    }

    /// Drops every cached validator and zeroes the counters.
    pub fn reset(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        self.metrics.reset();
        Logger::info(Event::EngineReset.as_str(), &[]);
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(
    kind: SchemaKind,
    fields: &BTreeMap<String, FieldDefinition>,
    options: &ValidationOptions,
) -> Result<CacheKey, serde_json::Error> {
    Ok(CacheKey {
        kind,
        schema_hash: structural_hash(fields)?,
        options_hash: structural_hash(options)?,
    })
}

fn elapsed_micros(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

/// Validated outputs are always objects; the empty map covers results
/// synthesized without data.
fn as_object(value: &Value) -> &Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    value
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}
