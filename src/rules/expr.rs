//! Restricted condition expression language
//!
//! Cross-field conditions are evaluated by a dedicated tokenizer, parser,
//! and interpreter. The grammar is deliberately small: field references
//! into the `input`/`config` namespaces, literals, equality and ordering
//! comparisons, and boolean connectives. Values are never substituted
//! into source text, and nothing here executes as general-purpose code.
//!
//! Grammar:
//!
//! ```text
//! expr    := or
//! or      := and ( ("||" | "or") and )*
//! and     := unary ( ("&&" | "and") unary )*
//! unary   := ("!" | "not") unary | comparison
//! cmp     := primary ( ("==" | "!=" | "<" | "<=" | ">" | ">=") primary )?
//! primary := literal | reference | "(" expr ")"
//! ```
//!
//! Anything outside this grammar is rejected when the rule is registered,
//! not when data arrives.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

/// Error rejecting a condition at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// Character outside the grammar
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// The offending character
        ch: char,
        /// Byte offset into the condition source
        offset: usize,
    },

    /// Token in an impossible position
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    /// Source ended mid-expression
    #[error("unexpected end of condition")]
    UnexpectedEnd,

    /// Leftover tokens after a complete expression
    #[error("trailing input after condition: '{0}'")]
    TrailingInput(String),

    /// Field reference with an unknown root namespace
    #[error("reference '{0}' must start with 'input.' or 'config.'")]
    InvalidReference(String),

    /// Unterminated string literal
    #[error("unterminated string literal")]
    UnterminatedString,
}

/// Error during evaluation of a well-formed condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// Ordering comparison across incompatible types
    #[error("cannot order {left} against {right}")]
    IncomparableTypes {
        /// JSON type name of the left operand
        left: &'static str,
        /// JSON type name of the right operand
        right: &'static str,
    },

    /// Boolean connective applied to a non-boolean operand
    #[error("expected a boolean operand, got {0}")]
    NotBoolean(&'static str),

    /// The whole condition evaluated to a non-boolean value
    #[error("condition must evaluate to a boolean, got {0}")]
    NonBooleanResult(&'static str),
}

/// Dotted reference into the combined `{input, config}` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// Root namespace
    pub namespace: Namespace,
    /// Path segments below the namespace root
    pub segments: Vec<String>,
}

/// The two field namespaces a condition may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Input,
    Config,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = match self.namespace {
            Namespace::Input => "input",
            Namespace::Config => "config",
        };
        write!(f, "{}", root)?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal string/number/boolean/null
    Literal(Value),
    /// Field reference; absent fields evaluate to null
    Field(FieldRef),
    /// Boolean negation
    Not(Box<Expr>),
    /// Short-circuit conjunction
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Comparison
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

/// Resolved data the interpreter reads from. Both maps are the validated
/// (transformed) namespace outputs.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub input: &'a Map<String, Value>,
    pub config: &'a Map<String, Value>,
}

impl<'a> Scope<'a> {
    /// Resolves a reference; `None` when any path segment is absent.
    pub fn resolve(&self, field: &FieldRef) -> Option<&'a Value> {
        let root: &Map<String, Value> = match field.namespace {
            Namespace::Input => self.input,
            Namespace::Config => self.config,
        };
        let mut segments = field.segments.iter();
        let first = segments.next()?;
        let mut current = root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

// Tokenizer

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Reference(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Reference(path) => write!(f, "{}", path),
            Token::Number(number) => write!(f, "{}", number),
            Token::Str(text) => write!(f, "'{}'", text),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Not => write!(f, "!"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut index = 0;

    while index < bytes.len() {
        // Decode a full char here so a multi-byte character outside a
        // string literal is reported as itself, not as a stray
        // continuation byte. Every accepted token starts with an ASCII
        // char, so the byte arithmetic below stays on char boundaries.
        let Some(ch) = source[index..].chars().next() else {
            break;
        };
        match ch {
            ' ' | '\t' | '\r' | '\n' => index += 1,
            '(' => {
                tokens.push(Token::LParen);
                index += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                index += 1;
            }
            '&' if bytes.get(index + 1) == Some(&b'&') => {
                tokens.push(Token::And);
                index += 2;
            }
            '|' if bytes.get(index + 1) == Some(&b'|') => {
                tokens.push(Token::Or);
                index += 2;
            }
            '=' if bytes.get(index + 1) == Some(&b'=') => {
                tokens.push(Token::Eq);
                index += 2;
            }
            '!' if bytes.get(index + 1) == Some(&b'=') => {
                tokens.push(Token::Ne);
                index += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                index += 1;
            }
            '<' if bytes.get(index + 1) == Some(&b'=') => {
                tokens.push(Token::Le);
                index += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                index += 1;
            }
            '>' if bytes.get(index + 1) == Some(&b'=') => {
                tokens.push(Token::Ge);
                index += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                index += 1;
            }
            '\'' | '"' => {
                let quote = ch;
                let start = index + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] as char != quote {
                    end += 1;
                }
                if end >= bytes.len() {
                    return Err(ExprError::UnterminatedString);
                }
                tokens.push(Token::Str(source[start..end].to_string()));
                index = end + 1;
            }
            '0'..='9' | '-' => {
                let start = index;
                let mut end = index + 1;
                while end < bytes.len()
                    && ((bytes[end] as char).is_ascii_digit() || bytes[end] == b'.')
                {
                    end += 1;
                }
                let text = &source[start..end];
                let number = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedToken(text.to_string()))?;
                tokens.push(Token::Number(number));
                index = end;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = index;
                let mut end = index;
                while end < bytes.len() {
                    let c = bytes[end] as char;
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        end += 1;
                    } else {
                        break;
                    }
                }
                let word = &source[start..end];
                let token = match word {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Reference(word.to_string()),
                };
                tokens.push(token);
                index = end;
            }
            other => {
                return Err(ExprError::UnexpectedChar {
                    ch: other,
                    offset: index,
                })
            }
        }
    }

    Ok(tokens)
}

// Parser

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::And) {
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.position += 1;
        let right = self.parse_primary()?;
        Ok(Expr::Cmp(op, Box::new(left), Box::new(right)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Some(Token::Number(number)) => Ok(Expr::Literal(number_value(number))),
            Some(Token::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Reference(path)) => Ok(Expr::Field(parse_reference(&path)?)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(ExprError::UnexpectedEnd);
                }
                Ok(inner)
            }
            Some(other) => Err(ExprError::UnexpectedToken(other.to_string())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parses a dotted reference and checks the namespace root.
pub fn parse_reference(path: &str) -> Result<FieldRef, ExprError> {
    let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.len() < 2 || segments.iter().any(String::is_empty) {
        return Err(ExprError::InvalidReference(path.to_string()));
    }
    let namespace = match segments.remove(0).as_str() {
        "input" => Namespace::Input,
        "config" => Namespace::Config,
        _ => return Err(ExprError::InvalidReference(path.to_string())),
    };
    Ok(FieldRef {
        namespace,
        segments,
    })
}

fn number_value(number: f64) -> Value {
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Parses a condition source into an expression tree.
///
/// # Errors
///
/// Returns `ExprError` for any syntax outside the restricted grammar.
pub fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        position: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::TrailingInput(extra.to_string()));
    }
    Ok(expr)
}

impl Expr {
    /// Evaluates the expression against resolved data. The result of the
    /// whole condition must be a boolean.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<bool, EvalError> {
        match self.evaluate_value(scope)? {
            Value::Bool(result) => Ok(result),
            other => Err(EvalError::NonBooleanResult(
                crate::compiler::json_type_name(&other),
            )),
        }
    }

    fn evaluate_value(&self, scope: &Scope<'_>) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(field) => Ok(scope.resolve(field).cloned().unwrap_or(Value::Null)),
            Expr::Not(inner) => match inner.evaluate_value(scope)? {
                Value::Bool(result) => Ok(Value::Bool(!result)),
                other => Err(EvalError::NotBoolean(crate::compiler::json_type_name(
                    &other,
                ))),
            },
            Expr::And(left, right) => {
                if !expect_bool(left.evaluate_value(scope)?)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(expect_bool(right.evaluate_value(scope)?)?))
            }
            Expr::Or(left, right) => {
                if expect_bool(left.evaluate_value(scope)?)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(expect_bool(right.evaluate_value(scope)?)?))
            }
            Expr::Cmp(op, left, right) => {
                let left = left.evaluate_value(scope)?;
                let right = right.evaluate_value(scope)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
        }
    }
}

fn expect_bool(value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(result) => Ok(result),
        other => Err(EvalError::NotBoolean(crate::compiler::json_type_name(
            &other,
        ))),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match op {
        CmpOp::Eq => Ok(values_equal(left, right)),
        CmpOp::Ne => Ok(!values_equal(left, right)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
                l.partial_cmp(&r)
            } else if let (Value::String(l), Value::String(r)) = (left, right) {
                Some(l.cmp(r))
            } else {
                return Err(EvalError::IncomparableTypes {
                    left: crate::compiler::json_type_name(left),
                    right: crate::compiler::json_type_name(right),
                });
            };
            let Some(ordering) = ordering else {
                return Err(EvalError::IncomparableTypes {
                    left: crate::compiler::json_type_name(left),
                    right: crate::compiler::json_type_name(right),
                });
            };
            Ok(match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

/// Equality with numeric widening so `1` and `1.0` compare equal.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope_from(input: Value, config: Value) -> (Map<String, Value>, Map<String, Value>) {
        (
            input.as_object().cloned().unwrap_or_default(),
            config.as_object().cloned().unwrap_or_default(),
        )
    }

    fn eval(source: &str, input: Value, config: Value) -> Result<bool, EvalError> {
        let (input, config) = scope_from(input, config);
        let expr = parse(source).unwrap();
        expr.evaluate(&Scope {
            input: &input,
            config: &config,
        })
    }

    #[test]
    fn test_equality_and_booleans() {
        assert!(eval("input.advanced == true", json!({"advanced": true}), json!({})).unwrap());
        assert!(!eval("input.advanced == true", json!({"advanced": false}), json!({})).unwrap());
        assert!(eval(
            "input.mode == 'fast' || input.mode == 'slow'",
            json!({"mode": "slow"}),
            json!({})
        )
        .unwrap());
        assert!(eval(
            "input.a == 1 && config.b == 2",
            json!({"a": 1}),
            json!({"b": 2})
        )
        .unwrap());
    }

    #[test]
    fn test_numeric_widening() {
        assert!(eval("input.count == 1", json!({"count": 1.0}), json!({})).unwrap());
    }

    #[test]
    fn test_ordering() {
        assert!(eval("input.size > 10", json!({"size": 11}), json!({})).unwrap());
        assert!(eval("input.size <= 10", json!({"size": 10}), json!({})).unwrap());
        assert!(eval(
            "input.name < 'm'",
            json!({"name": "alpha"}),
            json!({})
        )
        .unwrap());
    }

    #[test]
    fn test_missing_field_is_null() {
        assert!(eval("input.missing == null", json!({}), json!({})).unwrap());
        assert!(!eval("input.missing == true", json!({}), json!({})).unwrap());
    }

    #[test]
    fn test_nested_references() {
        assert!(eval(
            "input.user.role == 'admin'",
            json!({"user": {"role": "admin"}}),
            json!({})
        )
        .unwrap());
    }

    #[test]
    fn test_not_and_parentheses() {
        assert!(eval(
            "!(input.a == 1) && not input.flag",
            json!({"a": 2, "flag": false}),
            json!({})
        )
        .unwrap());
    }

    #[test]
    fn test_word_connectives() {
        assert!(eval(
            "input.a == 1 and input.b == 2 or input.c == 3",
            json!({"a": 1, "b": 2}),
            json!({})
        )
        .unwrap());
    }

    #[test]
    fn test_evaluation_errors() {
        let err = eval("input.name > 3", json!({"name": "x"}), json!({})).unwrap_err();
        assert!(matches!(err, EvalError::IncomparableTypes { .. }));

        let err = eval("input.name && true", json!({"name": "x"}), json!({})).unwrap_err();
        assert!(matches!(err, EvalError::NotBoolean(_)));

        let err = eval("input.name", json!({"name": "x"}), json!({})).unwrap_err();
        assert!(matches!(err, EvalError::NonBooleanResult(_)));
    }

    #[test]
    fn test_rejects_foreign_syntax() {
        assert!(parse("input.a + 1 == 2").is_err());
        assert!(parse("delete(input.a)").is_err());
        assert!(parse("input.a == ").is_err());
        assert!(parse("input.a == 1 extra").is_err());
        assert!(parse("'unterminated").is_err());
        assert!(parse("env.HOME == 'x'").is_err());
        assert!(parse("input == 1").is_err());
    }

    #[test]
    fn test_non_ascii_char_reported_intact() {
        let err = parse("input.a == é").unwrap_err();
        assert_eq!(
            err,
            ExprError::UnexpectedChar {
                ch: 'é',
                offset: 11
            }
        );
        // Inside a string literal multi-byte text is ordinary data.
        assert!(eval("input.a == 'café'", json!({"a": "café"}), json!({})).unwrap());
    }

    #[test]
    fn test_reference_roots() {
        assert!(parse_reference("input.a.b").is_ok());
        assert!(parse_reference("config.url").is_ok());
        assert!(parse_reference("data.a").is_err());
        assert!(parse_reference("input.").is_err());
        assert!(parse_reference("input").is_err());
    }
}
