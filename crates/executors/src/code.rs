//! The `code` built-in. Per spec.md §9's "Polymorphic executors... tagged
//! variants when the executor set is closed" and SPEC_FULL.md §4.6's
//! supplement: the sandbox is a narrow [`ScriptRuntime`] trait with one
//! built-in implementation — a restricted arithmetic/field-access
//! expression evaluator, not a general-purpose scripting VM. A real
//! polyglot engine (JS, Lua, …) could implement the same trait without
//! touching the scheduler.

use std::sync::Arc;

use async_trait::async_trait;
use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::decode_params;

/// Why a script failed to parse or evaluate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script is not a JSON object of field -> expression")]
    NotAnObject,
    #[error("syntax error at {0:?}")]
    Syntax(String),
    #[error("unresolved field path {0:?}")]
    UnresolvedPath(String),
    #[error("type error: {0}")]
    Type(String),
}

/// Runs a `code` node's script against `input`, returning the field map
/// it computes. Implementations must enforce their own internal limits —
/// the scheduler only enforces the node's overall timeout.
pub trait ScriptRuntime: Send + Sync {
    fn run(&self, script: &str, input: &Value) -> Result<Value, ScriptError>;
}

/// The built-in [`ScriptRuntime`]: the script text is a JSON object
/// literal; each value that is a string is evaluated as a restricted
/// expression (field paths into `input`, numeric/string literals,
/// `+ - * /` and comparisons, parenthesised grouping); every other JSON
/// value is a literal, copied through unevaluated.
pub struct RestrictedExprRuntime;

impl ScriptRuntime for RestrictedExprRuntime {
    fn run(&self, script: &str, input: &Value) -> Result<Value, ScriptError> {
        let parsed: Value = serde_json::from_str(script).map_err(|e| ScriptError::Syntax(e.to_string()))?;
        let Value::Object(fields) = parsed else {
            return Err(ScriptError::NotAnObject);
        };

        let mut out = serde_json::Map::with_capacity(fields.len());
        for (name, value) in fields {
            let evaluated = match value {
                Value::String(expr) => eval(&expr, input)?,
                other => other,
            };
            out.insert(name, evaluated);
        }
        Ok(Value::Object(out))
    }
}

/// Evaluates a single restricted expression against `input`. Exposed to
/// sibling modules (`transform`) so `filter`/`sort` can reuse the same
/// expression language for predicates/keys instead of inventing another.
pub(crate) fn eval(expr: &str, input: &Value) -> Result<Value, ScriptError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, input };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ScriptError::Syntax(expr.to_string()));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Dot,
}

fn tokenize(src: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '>' | '<' | '=' | '!' => {
                let mut op = String::from(c);
                i += 1;
                if i < chars.len() && chars[i] == '=' {
                    op.push('=');
                    i += 1;
                }
                tokens.push(Token::Ident(op));
            }
            '"' => {
                i += 1;
                let start = i;
                while i < chars.len() && chars[i] != '"' {
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(ScriptError::Syntax(src.to_string()));
                }
                tokens.push(Token::Str(chars[start..i].iter().collect()));
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Number(text.parse().map_err(|_| ScriptError::Syntax(text))?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ScriptError::Syntax(other.to_string())),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    input: &'a Value,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expression(&mut self) -> Result<Value, ScriptError> {
        let mut left = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.term()?;
            left = apply_arith(left, op, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Value, ScriptError> {
        let mut left = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let right = self.factor()?;
            left = apply_arith(left, op, right)?;
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Value, ScriptError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Value::String(s))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expression()?;
                match self.tokens.get(self.pos) {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(ScriptError::Syntax("expected )".to_string())),
                }
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                let mut path = vec![name];
                while matches!(self.peek(), Some(Token::Dot)) {
                    self.pos += 1;
                    match self.tokens.get(self.pos).cloned() {
                        Some(Token::Ident(seg)) => {
                            self.pos += 1;
                            path.push(seg);
                        }
                        _ => return Err(ScriptError::Syntax("expected path segment after .".to_string())),
                    }
                }
                resolve_path(self.input, &path)
            }
            _ => Err(ScriptError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

fn resolve_path(input: &Value, path: &[String]) -> Result<Value, ScriptError> {
    let mut current = input;
    for segment in path {
        current = if let Ok(index) = segment.parse::<usize>() {
            current.get(index)
        } else {
            current.get(segment.as_str())
        }
        .ok_or_else(|| ScriptError::UnresolvedPath(path.join(".")))?;
    }
    Ok(current.clone())
}

fn apply_arith(left: Value, op: char, right: Value) -> Result<Value, ScriptError> {
    if op == '+' {
        if let (Value::String(a), _) = (&left, &right) {
            return Ok(Value::String(format!("{a}{}", display(&right))));
        }
        if let (_, Value::String(b)) = (&left, &right) {
            return Ok(Value::String(format!("{}{b}", display(&left))));
        }
    }
    let a = as_f64(&left)?;
    let b = as_f64(&right)?;
    let result = match op {
        '+' => a + b,
        '-' => a - b,
        '*' => a * b,
        '/' => a / b,
        _ => unreachable!("tokenizer only emits +-*/ operators"),
    };
    Ok(serde_json::Number::from_f64(result).map_or(Value::Null, Value::Number))
}

fn as_f64(value: &Value) -> Result<f64, ScriptError> {
    value.as_f64().or_else(|| value.as_str().and_then(|s| s.parse().ok())).ok_or_else(|| ScriptError::Type(format!("not a number: {value}")))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Executes a `code` node's `script` parameter through its configured
/// [`ScriptRuntime`] against the current item.
pub struct CodeExecutor {
    runtime: Arc<dyn ScriptRuntime>,
    metadata: ExecutorMetadata,
}

impl CodeExecutor {
    #[must_use]
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self { runtime, metadata: ExecutorMetadata::new("code", "Code", "Evaluate a restricted expression script").with_category("transform") }
    }
}

#[derive(Debug, Deserialize)]
struct CodeParams {
    script: String,
}

#[async_trait]
impl Executor for CodeExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        &self.metadata
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let params: CodeParams = decode_params(ctx.parameters())?;
        let item = input.default_value();
        let result = self.runtime.run(&params.script, &item).map_err(|e| ExecutorError::exec_fatal(e.to_string()))?;
        Ok(ExecutorOutput::single(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_and_renames_fields() {
        let input = json!({"main": {"temp": 22}, "name": "London", "weather": [{"description": "clear"}]});
        let script = r#"{"temperature": "main.temp", "city": "name", "condition": "weather.0.description", "threshold": "25"}"#;
        let out = RestrictedExprRuntime.run(script, &input).unwrap();
        assert_eq!(out, json!({"temperature": 22.0, "city": "London", "condition": "clear", "threshold": 25.0}));
    }

    #[test]
    fn supports_arithmetic_over_fields() {
        let input = json!({"a": 3, "b": 4});
        let out = RestrictedExprRuntime.run(r#"{"sum": "a + b", "scaled": "(a + b) * 2"}"#, &input).unwrap();
        assert_eq!(out, json!({"sum": 7.0, "scaled": 14.0}));
    }

    #[test]
    fn unresolved_path_is_an_error() {
        let input = json!({});
        let err = RestrictedExprRuntime.run(r#"{"x": "missing.field"}"#, &input).unwrap_err();
        assert_eq!(err, ScriptError::UnresolvedPath("missing.field".to_string()));
    }

    #[test]
    fn non_object_script_is_rejected() {
        let err = RestrictedExprRuntime.run("42", &json!({})).unwrap_err();
        assert_eq!(err, ScriptError::NotAnObject);
    }
}
