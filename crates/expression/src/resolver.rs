//! The precedence chain a `{{name}}` template variable is resolved
//! through: credential alias, then variables at execution/workflow/global
//! scope, then the per-node output cache, then the current item.

use nervemind_credential::CredentialVault;
use serde_json::Value;

use crate::error::ExpressionError;

/// Supplies the three variable tiers and the node-output cache. The engine
/// implements this over its live `ExecutionContext`; tests and the CLI can
/// use [`StaticVariables`].
pub trait VariableResolver: Send + Sync {
    fn execution_var(&self, name: &str) -> Option<Value>;
    fn workflow_var(&self, name: &str) -> Option<Value>;
    fn global_var(&self, name: &str) -> Option<Value>;
    /// Looked up by source node name or id, per `spec.md` §4.1.
    fn node_output(&self, name: &str) -> Option<Value>;
}

/// A fixed-at-construction [`VariableResolver`] for tests and the CLI's
/// one-shot `run` command, where there's no live scheduler to query.
#[derive(Debug, Clone, Default)]
pub struct StaticVariables {
    execution: serde_json::Map<String, Value>,
    workflow: serde_json::Map<String, Value>,
    global: serde_json::Map<String, Value>,
    node_outputs: serde_json::Map<String, Value>,
}

impl StaticVariables {
    #[must_use]
    pub fn with_execution(mut self, name: impl Into<String>, value: Value) -> Self {
        self.execution.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_workflow(mut self, name: impl Into<String>, value: Value) -> Self {
        self.workflow.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.global.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_node_output(mut self, name: impl Into<String>, value: Value) -> Self {
        self.node_outputs.insert(name.into(), value);
        self
    }
}

impl VariableResolver for StaticVariables {
    fn execution_var(&self, name: &str) -> Option<Value> {
        self.execution.get(name).cloned()
    }

    fn workflow_var(&self, name: &str) -> Option<Value> {
        self.workflow.get(name).cloned()
    }

    fn global_var(&self, name: &str) -> Option<Value> {
        self.global.get(name).cloned()
    }

    fn node_output(&self, name: &str) -> Option<Value> {
        self.node_outputs.get(name).cloned()
    }
}

/// Where a plaintext secret resolved through the vault gets registered so
/// any later log record that captures the rendered string redacts it.
/// Implemented over `ExecutionLogger` by the engine — this crate has no
/// dependency on `nervemind-log` of its own.
pub trait SecretSink: Send + Sync {
    fn register_secret(&self, value: &str);
}

/// One `{{name}}` resolution attempt: the vault (if the node declared a
/// credential), the variable tiers, the node-output cache, and the
/// currently-iterated item, tried in that order.
pub struct EvaluationContext<'a> {
    vault: Option<&'a dyn CredentialVault>,
    variables: &'a dyn VariableResolver,
    current_item: &'a Value,
    secrets: Option<&'a dyn SecretSink>,
}

impl<'a> EvaluationContext<'a> {
    #[must_use]
    pub fn new(vault: Option<&'a dyn CredentialVault>, variables: &'a dyn VariableResolver, current_item: &'a Value) -> Self {
        Self { vault, variables, current_item, secrets: None }
    }

    /// Attach a [`SecretSink`] so any credential resolved by name through
    /// this context gets registered for redaction, the same as a
    /// `credentialId`-resolved credential already is.
    #[must_use]
    pub fn with_secret_sink(mut self, secrets: &'a dyn SecretSink) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Resolve `name` through the full precedence chain.
    pub async fn resolve(&self, name: &str) -> Result<Value, ExpressionError> {
        if let Some(vault) = self.vault {
            match vault.get_by_name(name).await {
                Ok(Some(secret)) => {
                    if let Some(sink) = self.secrets {
                        sink.register_secret(secret.expose());
                    }
                    return Ok(Value::String(secret.expose().to_string()));
                }
                Ok(None) => {}
                Err(e) => return Err(ExpressionError::CredentialLookup(e.to_string())),
            }
        }
        if let Some(v) = self.variables.execution_var(name) {
            return Ok(v);
        }
        if let Some(v) = self.variables.workflow_var(name) {
            return Ok(v);
        }
        if let Some(v) = self.variables.global_var(name) {
            return Ok(v);
        }
        if let Some(v) = self.variables.node_output(name) {
            return Ok(v);
        }
        if let Value::Object(map) = self.current_item {
            if let Some(v) = map.get(name) {
                return Ok(v.clone());
            }
        }
        Err(ExpressionError::UnresolvedVariable { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nervemind_credential::{InMemoryVault, Secret, SecretKind};
    use serde_json::json;

    #[tokio::test]
    async fn credential_alias_wins_over_everything_else() {
        let vault = InMemoryVault::new();
        vault.insert("cred-1", Some("OPENAI_API_KEY"), Secret::new(SecretKind::ApiKey, "sk-live"));
        let vars = StaticVariables::default().with_execution("OPENAI_API_KEY", json!("not-this"));
        let item = json!({});
        let ctx = EvaluationContext::new(Some(&vault), &vars, &item);
        assert_eq!(ctx.resolve("OPENAI_API_KEY").await.unwrap(), json!("sk-live"));
    }

    #[tokio::test]
    async fn execution_beats_workflow_beats_global() {
        let vars = StaticVariables::default()
            .with_execution("x", json!("execution"))
            .with_workflow("x", json!("workflow"))
            .with_global("x", json!("global"));
        let item = json!({});
        let ctx = EvaluationContext::new(None, &vars, &item);
        assert_eq!(ctx.resolve("x").await.unwrap(), json!("execution"));
    }

    #[tokio::test]
    async fn falls_through_to_node_output_then_current_item() {
        let vars = StaticVariables::default().with_node_output("fetchWeather", json!({"tempC": 31}));
        let item = json!({"city": "Phoenix"});
        let ctx = EvaluationContext::new(None, &vars, &item);
        assert_eq!(ctx.resolve("fetchWeather").await.unwrap(), json!({"tempC": 31}));
        assert_eq!(ctx.resolve("city").await.unwrap(), json!("Phoenix"));
    }

    #[tokio::test]
    async fn nothing_matches_is_unresolved() {
        let vars = StaticVariables::default();
        let item = json!({});
        let ctx = EvaluationContext::new(None, &vars, &item);
        let err = ctx.resolve("nope").await.unwrap_err();
        assert!(matches!(err, ExpressionError::UnresolvedVariable { .. }));
    }
}
