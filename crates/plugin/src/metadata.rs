//! Plugin metadata and builder.

use serde::{Deserialize, Serialize};

/// Static metadata describing a plugin package — the user-visible,
/// versionable unit (e.g. "Slack", "PostgreSQL") that bundles one or more
/// node executors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMetadata {
    key: String,
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    description: String,
}

impl PluginMetadata {
    #[must_use]
    pub fn builder(key: impl Into<String>, name: impl Into<String>) -> PluginMetadataBuilder {
        PluginMetadataBuilder { key: key.into(), name: name.into(), version: "0.1.0".to_string(), description: String::new() }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

pub struct PluginMetadataBuilder {
    key: String,
    name: String,
    version: String,
    description: String,
}

impl PluginMetadataBuilder {
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn build(self) -> PluginMetadata {
        PluginMetadata { key: self.key, name: self.name, version: self.version, description: self.description }
    }
}
