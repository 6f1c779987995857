//! Errors raised while parsing or resolving a `{{…}}` template.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("{0}")]
    Parse(String),

    /// A `{{name}}` had no match in any precedence tier. Always fatal —
    /// the node's config is wrong, not something a retry can fix.
    #[error("unresolved template variable {name:?}")]
    UnresolvedVariable { name: String },

    /// A lookup against the credential vault failed for a reason other
    /// than "not found" (e.g. the vault itself errored).
    #[error("credential lookup failed: {0}")]
    CredentialLookup(String),
}
