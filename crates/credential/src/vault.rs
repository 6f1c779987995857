//! The narrow contract executors and the expression resolver use to reach
//! a decrypted credential. Encryption-at-rest, rotation, and the storage
//! backend are out of scope here — see `spec.md`'s Non-goals; this crate
//! only defines the lookup contract and a reference in-memory
//! implementation for tests and the CLI.

use std::collections::HashMap;

use async_trait::async_trait;
use nervemind_core::CredentialRef;
use parking_lot::RwLock;

use crate::error::CredentialError;
use crate::secret::Secret;

/// Resolves credential references to short-lived plaintext secrets.
///
/// Implementations must never cache the returned [`Secret`] beyond the
/// call that requested it — the core re-resolves on every node execution
/// that needs one.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    /// Resolve by the id a node's `credentialId` field carries.
    async fn get_by_id(&self, id: &CredentialRef) -> Result<Secret, CredentialError>;

    /// Resolve by the symbolic name an interpolated `{{NAME}}` template
    /// alias refers to. `Ok(None)` (not an error) when no credential is
    /// registered under that name — the expression resolver falls through
    /// to its next precedence tier in that case.
    async fn get_by_name(&self, name: &str) -> Result<Option<Secret>, CredentialError>;
}

/// Reference implementation backed by an in-process map. Used by the CLI's
/// default `Settings` and by tests; production deployments would implement
/// [`CredentialVault`] against an encrypted store instead.
#[derive(Default)]
pub struct InMemoryVault {
    by_id: RwLock<HashMap<String, Secret>>,
    by_name: RwLock<HashMap<String, String>>,
}

impl InMemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret under `id`, optionally also reachable by `name`.
    pub fn insert(&self, id: impl Into<String>, name: Option<&str>, secret: Secret) {
        let id = id.into();
        if let Some(name) = name {
            self.by_name.write().insert(name.to_string(), id.clone());
        }
        self.by_id.write().insert(id, secret);
    }
}

#[async_trait]
impl CredentialVault for InMemoryVault {
    async fn get_by_id(&self, id: &CredentialRef) -> Result<Secret, CredentialError> {
        self.by_id
            .read()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| CredentialError::NotFoundById(id.as_str().to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Secret>, CredentialError> {
        let Some(id) = self.by_name.read().get(name).cloned() else {
            return Ok(None);
        };
        Ok(self.by_id.read().get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::SecretKind;

    #[tokio::test]
    async fn resolves_by_id() {
        let vault = InMemoryVault::new();
        vault.insert("cred-1", None, Secret::new(SecretKind::ApiKey, "sk-123"));
        let secret = vault.get_by_id(&CredentialRef::new("cred-1")).await.unwrap();
        assert_eq!(secret.expose(), "sk-123");
    }

    #[tokio::test]
    async fn missing_id_is_an_error() {
        let vault = InMemoryVault::new();
        let err = vault.get_by_id(&CredentialRef::new("nope")).await.unwrap_err();
        assert_eq!(err, CredentialError::NotFoundById("nope".to_string()));
    }

    #[tokio::test]
    async fn resolves_by_alias_name() {
        let vault = InMemoryVault::new();
        vault.insert("cred-1", Some("OPENAI_API_KEY"), Secret::new(SecretKind::ApiKey, "sk-abc"));
        let secret = vault.get_by_name("OPENAI_API_KEY").await.unwrap().unwrap();
        assert_eq!(secret.expose(), "sk-abc");
    }

    #[tokio::test]
    async fn missing_alias_is_none_not_an_error() {
        let vault = InMemoryVault::new();
        assert!(vault.get_by_name("NOPE").await.unwrap().is_none());
    }
}
