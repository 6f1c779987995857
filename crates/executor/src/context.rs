//! Per-call runtime context handed to an executor's `execute`.

use std::fmt;

use nervemind_core::{ExecutionId, NodeId};
use nervemind_credential::SecretKind;
use nervemind_log::ExecutionLogger;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutorError;

/// A secret value that redacts itself in `Debug`/`Display`. The raw value
/// is reachable only through [`SecureString::expose`], an explicit,
/// grep-able call site — so a stray `{:?}` in a log line can never leak a
/// credential.
#[derive(Clone)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret value. Every call site is a place a credential could
    /// leak if the result is logged or serialized — treat it accordingly.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureString(***)")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Runtime context passed to one `execute` call.
#[non_exhaustive]
pub struct ExecutorContext {
    pub execution_id: ExecutionId,
    pub node_id: NodeId,
    cancellation: CancellationToken,
    logger: ExecutionLogger,
    credential: Option<SecureString>,
    credential_kind: Option<SecretKind>,
    parameters: serde_json::Map<String, serde_json::Value>,
}

impl ExecutorContext {
    pub fn new(
        execution_id: ExecutionId,
        node_id: NodeId,
        cancellation: CancellationToken,
        logger: ExecutionLogger,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            cancellation,
            logger,
            credential: None,
            credential_kind: None,
            parameters: serde_json::Map::new(),
        }
    }

    /// `kind` lets an executor pick how to attach the credential (bearer
    /// header, basic auth, a provider-specific field) without parsing the
    /// raw secret string.
    pub fn with_credential(mut self, credential: SecureString, kind: SecretKind) -> Self {
        self.credential = Some(credential);
        self.credential_kind = Some(kind);
        self
    }

    /// Attach the node's own configuration, already interpolated by the
    /// scheduler against the current item — an executor never renders
    /// `{{...}}` templates itself.
    pub fn with_parameters(mut self, parameters: serde_json::Map<String, serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// The resolved credential value for this node, if its executor
    /// declared `requires_credential` and the vault resolved one.
    pub fn credential(&self) -> Option<&SecureString> {
        self.credential.as_ref()
    }

    /// The credential's kind, set alongside the value by [`Self::with_credential`].
    pub fn credential_kind(&self) -> Option<SecretKind> {
        self.credential_kind
    }

    /// This node's own `parameters`, interpolated and handed over by the
    /// scheduler — decode into a typed struct at first use.
    pub fn parameters(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.parameters
    }

    pub fn logger(&self) -> &ExecutionLogger {
        &self.logger
    }

    /// Returns `Err(ExecutorError::CancelledError)` if the run has been
    /// cancelled. Long-running executors should call this between steps of
    /// their own internal loop.
    pub fn check_cancelled(&self) -> Result<(), ExecutorError> {
        if self.cancellation.is_cancelled() {
            Err(ExecutorError::CancelledError)
        } else {
            Ok(())
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl fmt::Debug for ExecutorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorContext")
            .field("execution_id", &self.execution_id)
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}
