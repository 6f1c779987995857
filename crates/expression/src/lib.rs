#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Expression
//!
//! Resolves `{{name}}` templates in node parameters. One ordered
//! precedence chain per variable name — credential alias, then
//! execution/workflow/global variables, then the node-output cache, then
//! the current item — see [`resolver::EvaluationContext`]. No operators,
//! no function calls: a template is a lookup, not a language.

pub mod error;
pub mod error_formatter;
pub mod resolver;
pub mod template;

pub use error::ExpressionError;
pub use resolver::{EvaluationContext, StaticVariables, VariableResolver};
pub use template::Template;
