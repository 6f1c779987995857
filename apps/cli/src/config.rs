//! Layered configuration: built-in defaults, an optional TOML file, then
//! `NERVEMIND_*` environment variables. Grounded on the teacher's
//! `figment` config layering (defaults -> files -> env -> CLI flags) —
//! only the CLI flags layer is handled separately, inside `clap`, since
//! figment's own CLI provider is not worth the extra dependency for three
//! subcommands.

use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use nervemind_engine::EngineSettings;
use serde::{Deserialize, Serialize};

/// One provider credential, loaded from config and registered into the
/// in-memory vault at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialEntry {
    pub id: String,
    pub name: Option<String>,
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub execution_default_timeout_ms: u64,
    pub execution_max_parallel: usize,
    pub execution_retry_attempts: u32,
    pub execution_retry_delay_ms: u64,
    pub execution_log_level: String,
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
    #[serde(default)]
    pub blocked_executables: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let defaults = EngineSettings::default();
        Self {
            execution_default_timeout_ms: defaults.default_timeout.as_millis() as u64,
            execution_max_parallel: defaults.max_parallel,
            execution_retry_attempts: defaults.default_retry_attempts,
            execution_retry_delay_ms: defaults.default_retry_delay.as_millis() as u64,
            execution_log_level: "info".to_string(),
            credentials: Vec::new(),
            blocked_executables: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `config_path` (if it exists), then
    /// `NERVEMIND_*` environment variables.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }
        figment.merge(Env::prefixed("NERVEMIND_").split("__")).extract()
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            max_parallel: self.execution_max_parallel,
            default_timeout: Duration::from_millis(self.execution_default_timeout_ms),
            default_retry_attempts: self.execution_retry_attempts,
            default_retry_delay: Duration::from_millis(self.execution_retry_delay_ms),
            ..EngineSettings::default()
        }
    }

    /// Where `apps/cli` persists execution records for `status`/`cancel`
    /// to read back, per `ExecutionContext`'s doc comment: this crate owns
    /// whatever durable state those lookups need.
    pub fn executions_dir() -> PathBuf {
        dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("nervemind").join("executions")
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir().unwrap_or_else(std::env::temp_dir).join("nervemind").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_settings_defaults() {
        let config = AppConfig::default();
        let engine_defaults = EngineSettings::default();
        assert_eq!(config.engine_settings().max_parallel, engine_defaults.max_parallel);
        assert_eq!(config.engine_settings().default_timeout, engine_defaults.default_timeout);
    }

    #[test]
    fn loads_defaults_when_no_file_or_env_present() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.execution_max_parallel, EngineSettings::default().max_parallel);
    }
}
