//! The `executeCommand` built-in. Per spec.md §4.6: a fixed argv, run
//! directly via `tokio::process::Command` — never through a shell, so a
//! `{{…}}`-interpolated argument can never reopen a command-injection
//! hole the way string-concatenated shell invocation would.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nervemind_executor::{Executor, ExecutorContext, ExecutorError, ExecutorInput, ExecutorMetadata, ExecutorOutput};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::decode_params;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteCommandParams {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

/// Runs a fixed argv as a child process and captures its exit code,
/// stdout and stderr. `disallowed` names executables (by file stem, e.g.
/// `"rm"`) this instance refuses to run, configured once at startup from
/// settings.
pub struct ExecuteCommandExecutor {
    disallowed: Vec<String>,
    metadata: ExecutorMetadata,
}

impl ExecuteCommandExecutor {
    #[must_use]
    pub fn new(disallowed: Vec<String>) -> Self {
        Self { disallowed, metadata: ExecutorMetadata::new("executeCommand", "Execute Command", "Run an OS command").with_category("system") }
    }

    fn check_allowed(&self, command: &str) -> Result<(), ExecutorError> {
        let stem = std::path::Path::new(command).file_stem().and_then(|s| s.to_str()).unwrap_or(command);
        if self.disallowed.iter().any(|blocked| blocked == stem) {
            return Err(ExecutorError::config(format!("executable {command:?} is blocked by configuration")));
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for ExecuteCommandExecutor {
    fn metadata(&self) -> &ExecutorMetadata {
        &self.metadata
    }

    async fn execute(&self, input: ExecutorInput, ctx: &ExecutorContext) -> Result<ExecutorOutput, ExecutorError> {
        let _ = &input;
        let params: ExecuteCommandParams = decode_params(ctx.parameters())?;
        self.check_allowed(&params.command)?;

        let mut command = Command::new(&params.command);
        command.args(&params.args).envs(&params.env).stdout(Stdio::piped()).stderr(Stdio::piped());
        if let Some(cwd) = &params.cwd {
            command.current_dir(cwd);
        }

        let child = command.spawn().map_err(|e| ExecutorError::exec(format!("failed to spawn {:?}: {e}", params.command)))?;

        let wait = child.wait_with_output();
        let output = match params.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), wait)
                .await
                .map_err(|_| ExecutorError::timeout(Duration::from_millis(ms)))?
                .map_err(|e| ExecutorError::exec(format!("command failed: {e}")))?,
            None => wait.await.map_err(|e| ExecutorError::exec(format!("command failed: {e}")))?,
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let result = json!({
            "exitCode": exit_code,
            "stdout": String::from_utf8_lossy(&output.stdout),
            "stderr": String::from_utf8_lossy(&output.stderr),
        });

        if exit_code != 0 {
            return Err(ExecutorError::exec_fatal(format!("{} exited with status {exit_code}", params.command)));
        }

        Ok(ExecutorOutput::single(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_executable_is_rejected_by_stem() {
        let executor = ExecuteCommandExecutor::new(vec!["rm".to_string()]);
        assert!(executor.check_allowed("/bin/rm").is_err());
        assert!(executor.check_allowed("/bin/ls").is_ok());
    }

    #[tokio::test]
    async fn runs_a_command_and_captures_stdout() {
        let executor = ExecuteCommandExecutor::new(Vec::new());
        let logger = nervemind_log::ExecutionLogger::new(nervemind_core::ExecutionId::v4());
        let ctx = ExecutorContext::new(
            nervemind_core::ExecutionId::v4(),
            nervemind_core::NodeId::new("n1"),
            tokio_util::sync::CancellationToken::new(),
            logger,
        )
        .with_parameters(json!({"command": "echo", "args": ["hello"]}).as_object().unwrap().clone());

        let out = executor.execute(ExecutorInput::default(), &ctx).await.unwrap();
        let value = &out.outputs_by_handle[&nervemind_core::HandleKey::default_handle()];
        assert_eq!(value["exitCode"], json!(0));
        assert_eq!(value["stdout"].as_str().unwrap().trim(), "hello");
    }
}
