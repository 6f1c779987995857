//! Vault lookup errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credential with id {0:?}")]
    NotFoundById(String),

    #[error("no credential named {0:?}")]
    NotFoundByName(String),
}
