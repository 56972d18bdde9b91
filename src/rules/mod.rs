//! Cross-Field Rule Evaluator for validus
//!
//! Rules relate fields across the combined `{input, config}` namespace and
//! run only after both namespaces have validated successfully.
//!
//! # Design Principles
//!
//! - A failing rule yields exactly one error detail at `["cross-field"]`
//! - A fault while evaluating a condition is caught and reported as
//!   `CROSS_FIELD_EVALUATION_ERROR`, never propagated
//! - Conditions use the restricted expression grammar in `expr`; richer
//!   syntax is rejected when the schema is built

pub mod expr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::executor::result::ValidationErrorDetail;

use expr::{parse, parse_reference, Scope};

/// The kinds of cross-field rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// If `condition` holds, `requires` must be present and `forbids`
    /// absent
    Conditional,
    /// At most one of `fields` may be present
    MutualExclusion,
    /// If `trigger` is present, `requires` must be present
    Dependency,
    /// Extension point; always satisfied in the baseline evaluator
    Custom,
}

/// One cross-field rule over dotted paths into `input.*` / `config.*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossFieldRule {
    /// Rule kind
    pub kind: RuleKind,
    /// Condition source for conditional rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Paths that must be present
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Paths that must be absent
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbids: Vec<String>,
    /// Trigger path for dependency rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Field paths for mutual-exclusion rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    /// Message used verbatim when the rule fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Fallback message and documentation text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CrossFieldRule {
    fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            condition: None,
            requires: Vec::new(),
            forbids: Vec::new(),
            trigger: None,
            fields: Vec::new(),
            error_message: None,
            description: None,
        }
    }

    /// Conditional rule: when `condition` holds, `requires` must be
    /// present and `forbids` absent.
    pub fn conditional(condition: impl Into<String>) -> Self {
        let mut rule = Self::new(RuleKind::Conditional);
        rule.condition = Some(condition.into());
        rule
    }

    /// Mutual-exclusion rule over the given paths.
    pub fn mutual_exclusion<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rule = Self::new(RuleKind::MutualExclusion);
        rule.fields = fields.into_iter().map(Into::into).collect();
        rule
    }

    /// Dependency rule: when `trigger` is present, `requires` must be too.
    pub fn dependency(trigger: impl Into<String>) -> Self {
        let mut rule = Self::new(RuleKind::Dependency);
        rule.trigger = Some(trigger.into());
        rule
    }

    /// Custom rule; the baseline evaluator always satisfies it.
    pub fn custom(description: impl Into<String>) -> Self {
        let mut rule = Self::new(RuleKind::Custom);
        rule.description = Some(description.into());
        rule
    }

    /// Adds paths that must be present.
    pub fn requires<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Adds paths that must be absent.
    pub fn forbids<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forbids.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Sets the message used when the rule fails.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Sets the fallback message and documentation text.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Message reported when the rule fails:
    /// `error_message` ?? `description` ?? generic text.
    fn failure_message(&self) -> String {
        if let Some(message) = &self.error_message {
            return message.clone();
        }
        if let Some(description) = &self.description {
            return description.clone();
        }
        match self.kind {
            RuleKind::Conditional => "conditional cross-field rule failed".to_string(),
            RuleKind::MutualExclusion => {
                format!("at most one of [{}] may be set", self.fields.join(", "))
            }
            RuleKind::Dependency => "dependent fields are missing".to_string(),
            RuleKind::Custom => "custom cross-field rule failed".to_string(),
        }
    }

    /// Every dotted path and condition this rule mentions, for syntax
    /// checking at schema build time.
    pub fn referenced_paths(&self) -> impl Iterator<Item = &str> {
        self.requires
            .iter()
            .chain(self.forbids.iter())
            .chain(self.fields.iter())
            .chain(self.trigger.iter())
            .map(String::as_str)
    }
}

/// Evaluates all rules against the validated namespace outputs.
///
/// Returns one error detail per failing rule, in declaration order.
pub fn evaluate_rules(
    rules: &[CrossFieldRule],
    input: &Map<String, Value>,
    config: &Map<String, Value>,
) -> Vec<ValidationErrorDetail> {
    let scope = Scope { input, config };
    let mut details = Vec::new();
    for rule in rules {
        match evaluate_rule(rule, &scope) {
            Ok(true) => {}
            Ok(false) => {
                let mut detail = ValidationErrorDetail::cross_field(rule.failure_message());
                if rule.error_message.is_some() {
                    if let Some(description) = &rule.description {
                        detail = detail.with_context(description.clone());
                    }
                }
                details.push(detail);
            }
            Err(message) => {
                details.push(ValidationErrorDetail::cross_field_evaluation(message));
            }
        }
    }
    details
}

/// Evaluates one rule. `Err` carries a caught evaluation fault.
fn evaluate_rule(rule: &CrossFieldRule, scope: &Scope<'_>) -> Result<bool, String> {
    match rule.kind {
        RuleKind::Conditional => {
            let Some(condition) = &rule.condition else {
                // A conditional rule without a condition never triggers.
                return Ok(true);
            };
            let expr = parse(condition).map_err(|error| error.to_string())?;
            let triggered = expr.evaluate(scope).map_err(|error| error.to_string())?;
            if !triggered {
                return Ok(true);
            }
            let requires_ok = rule.requires.iter().all(|path| is_present(scope, path));
            let forbids_ok = !rule.forbids.iter().any(|path| is_present(scope, path));
            Ok(requires_ok && forbids_ok)
        }
        RuleKind::MutualExclusion => {
            let present = rule
                .fields
                .iter()
                .filter(|path| is_present(scope, path))
                .count();
            Ok(present <= 1)
        }
        RuleKind::Dependency => {
            let Some(trigger) = &rule.trigger else {
                return Ok(true);
            };
            if !is_present(scope, trigger) {
                return Ok(true);
            }
            Ok(rule.requires.iter().all(|path| is_present(scope, path)))
        }
        // Extension point for embedding applications.
        RuleKind::Custom => Ok(true),
    }
}

/// A path is present when it resolves to a non-null value. Malformed
/// paths resolve to absent rather than faulting; they are rejected at
/// schema build time.
fn is_present(scope: &Scope<'_>, path: &str) -> bool {
    let Ok(field) = parse_reference(path) else {
        return false;
    };
    matches!(scope.resolve(&field), Some(value) if !value.is_null())
}

/// Syntax-checks a rule at registration time: the condition must parse
/// under the restricted grammar and every referenced path must root in
/// `input` or `config`.
pub fn check_rule(rule: &CrossFieldRule) -> Result<(), RuleCheckError> {
    if let Some(condition) = &rule.condition {
        parse(condition).map_err(RuleCheckError::Condition)?;
    }
    for path in rule.referenced_paths() {
        parse_reference(path).map_err(|_| RuleCheckError::Path(path.to_string()))?;
    }
    Ok(())
}

/// Rejection reason from `check_rule`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCheckError {
    /// Condition outside the restricted grammar
    Condition(expr::ExprError),
    /// Path that does not root in input/config
    Path(String),
}
