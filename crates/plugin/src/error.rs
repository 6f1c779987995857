//! Plugin error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("plugin '{0}' already exists")]
    AlreadyExists(String),

    #[error("registry is frozen; plugins can only register at startup")]
    RegistryFrozen,

    #[error("plugin '{plugin}' failed to register its executors: {message}")]
    RegistrationFailed { plugin: String, message: String },
}
