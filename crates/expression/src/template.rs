//! Parses `{{name}}` templates and renders them against an
//! [`crate::resolver::EvaluationContext`].
//!
//! Deliberately narrower than a general expression language: a `{{…}}`
//! span holds exactly one variable name, resolved through the precedence
//! chain in [`crate::resolver`] — no operators, no function calls. Node
//! parameters that need computation do it in the executor, not the
//! template.

use std::fmt;
use std::sync::Arc;

use crate::error::ExpressionError;
use crate::error_formatter::format_template_error;
use crate::resolver::EvaluationContext;

/// Guards against a pathological template with unbounded `{{…}}` spans.
const MAX_TEMPLATE_EXPRESSIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
enum TemplatePart {
    Static { content: Arc<str> },
    Variable { name: Arc<str>, position: Position },
}

/// Line/column/offset location within a template source string, used to
/// point at the right `{{…}}` span in an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    #[must_use]
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    #[must_use]
    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

use serde::{Deserialize, Serialize};

/// A parsed template, ready to render repeatedly against different contexts.
#[derive(Debug, Clone)]
pub struct Template {
    source: Arc<str>,
    parts: Vec<TemplatePart>,
}

impl Template {
    /// Parse `source` immediately, returning a parse error for an unclosed
    /// `{{`.
    pub fn new(source: impl Into<String>) -> Result<Self, ExpressionError> {
        let source_str = source.into();
        let parts = Self::parse(&source_str)?;
        Ok(Self { source: Arc::from(source_str.as_str()), parts })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, TemplatePart::Variable { .. }))
    }

    /// Render against `ctx`, resolving every `{{name}}` through its
    /// precedence chain. The first unresolved name fails the whole render.
    pub async fn render(&self, ctx: &EvaluationContext<'_>) -> Result<String, ExpressionError> {
        let mut result = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                TemplatePart::Static { content } => result.push_str(content),
                TemplatePart::Variable { name, position } => match ctx.resolve(name).await {
                    Ok(value) => match value.as_str() {
                        Some(s) => result.push_str(s),
                        None => result.push_str(&value.to_string()),
                    },
                    Err(e) => {
                        let formatted = format_template_error(&self.source, *position, &e.to_string(), Some(name));
                        return Err(ExpressionError::Parse(formatted));
                    }
                },
            }
        }
        Ok(result)
    }

    fn parse(source: &str) -> Result<Vec<TemplatePart>, ExpressionError> {
        let mut parts = Vec::new();
        let mut current_static = String::new();
        let chars: Vec<char> = source.chars().collect();
        let len = chars.len();
        let mut i = 0;
        let mut line = 1usize;
        let mut column = 1usize;

        while i < len {
            if i + 1 < len && chars[i] == '{' && chars[i + 1] == '{' {
                if !current_static.is_empty() {
                    parts.push(TemplatePart::Static { content: Arc::from(current_static.as_str()) });
                    current_static.clear();
                }
                let expr_start = Position::new(line, column, i);

                let mut j = i + 2;
                while j + 1 < len && !(chars[j] == '}' && chars[j + 1] == '}') {
                    j += 1;
                }

                if j + 1 >= len {
                    let formatted = format_template_error(source, expr_start, "unclosed '{{' - expected closing '}}'", None);
                    return Err(ExpressionError::Parse(formatted));
                }

                let name: String = chars[i + 2..j].iter().collect::<String>().trim().to_string();
                parts.push(TemplatePart::Variable { name: Arc::from(name.as_str()), position: expr_start });

                let var_count = parts.iter().filter(|p| matches!(p, TemplatePart::Variable { .. })).count();
                if var_count > MAX_TEMPLATE_EXPRESSIONS {
                    return Err(ExpressionError::Parse(format!(
                        "template contains too many expressions: {var_count} (max {MAX_TEMPLATE_EXPRESSIONS})"
                    )));
                }

                for k in i..j + 2 {
                    if chars[k] == '\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                }
                i = j + 2;
            } else {
                current_static.push(chars[i]);
                if chars[i] == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
                i += 1;
            }
        }

        if !current_static.is_empty() {
            parts.push(TemplatePart::Static { content: Arc::from(current_static.as_str()) });
        }
        Ok(parts)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{EvaluationContext, StaticVariables};
    use serde_json::json;

    #[test]
    fn parses_static_only() {
        let template = Template::new("Hello, World!").unwrap();
        assert!(!template.has_variables());
    }

    #[test]
    fn unclosed_expression_is_a_parse_error() {
        let err = Template::new("Hello {{ name").unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[tokio::test]
    async fn renders_a_single_variable() {
        let template = Template::new("Hello {{name}}!").unwrap();
        let vars = StaticVariables::default().with_execution("name", json!("World"));
        let item = json!({});
        let ctx = EvaluationContext::new(None, &vars, &item);
        assert_eq!(template.render(&ctx).await.unwrap(), "Hello World!");
    }

    #[tokio::test]
    async fn unresolved_variable_fails_the_render() {
        let template = Template::new("{{missing}}").unwrap();
        let vars = StaticVariables::default();
        let item = json!({});
        let ctx = EvaluationContext::new(None, &vars, &item);
        assert!(template.render(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn static_text_with_no_braces_passes_through() {
        let template = Template::new("no variables here").unwrap();
        let vars = StaticVariables::default();
        let item = json!({});
        let ctx = EvaluationContext::new(None, &vars, &item);
        assert_eq!(template.render(&ctx).await.unwrap(), "no variables here");
    }
}
