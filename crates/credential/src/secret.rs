//! The value a [`crate::CredentialVault`] hands back.

use std::fmt;

/// What kind of credential this is, so an executor knows how to attach it
/// (an `Authorization: Bearer …` header vs. Basic auth vs. a provider SDK
/// key) without parsing the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    BearerToken,
    BasicAuth,
    ApiKey,
    Custom,
}

/// A decrypted credential value, live only for the duration of one
/// executor call. Always tagged `secret` for the logging pipeline — its
/// `Debug`/`Display` never print the plaintext.
#[derive(Clone)]
pub struct Secret {
    kind: SecretKind,
    value: String,
}

impl Secret {
    #[must_use]
    pub fn new(kind: SecretKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }

    #[must_use]
    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    /// The plaintext value. Every call site is a potential leak point if
    /// the result is logged or serialized — treat it accordingly.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret").field("kind", &self.kind).field("value", &"***").finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_redact_the_value() {
        let secret = Secret::new(SecretKind::ApiKey, "sk-live-abc123");
        assert_eq!(format!("{secret}"), "***");
        assert!(format!("{secret:?}").contains("***"));
        assert!(!format!("{secret:?}").contains("sk-live-abc123"));
    }

    #[test]
    fn expose_returns_the_raw_value() {
        let secret = Secret::new(SecretKind::BearerToken, "raw-token");
        assert_eq!(secret.expose(), "raw-token");
    }
}
