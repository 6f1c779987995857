#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # NerveMind Credential
//!
//! The [`CredentialVault`] port: resolve a reference (`credentialId`, or
//! an interpolated alias name) to a short-lived plaintext [`Secret`].
//! Encryption-at-rest, rotation, and the storage backend itself live
//! outside this crate and this exercise.

pub mod error;
pub mod secret;
pub mod vault;

pub use error::CredentialError;
pub use secret::{Secret, SecretKind};
pub use vault::{CredentialVault, InMemoryVault};
