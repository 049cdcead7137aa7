//! `shell_exec` tool: runs a shell command under the working folder (spec §9
//! tool table, grounded in spirit on the teacher's now-retired `BashTool`: a
//! single shell-out tool, stdout+stderr folded into one observation).
//!
//! No per-call timeout is enforced here: spec §5 "there is no per-tool timeout
//! at the core level; tools must self-timeout" places that responsibility on the
//! tool. `ShellExecTool` honors an optional `timeoutMs` argument for this reason.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use crate::error::ToolSourceError;
use crate::tools::{Tool, ToolCallContent, ToolCallContext, ToolSpec};

pub const TOOL_SHELL_EXEC: &str = "shell_exec";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Output is capped to keep a single observation from blowing the context window.
const MAX_OUTPUT_BYTES: usize = 20_000;

pub struct ShellExecTool {
    working_folder: Arc<PathBuf>,
}

impl ShellExecTool {
    pub fn new(working_folder: Arc<PathBuf>) -> Self {
        Self { working_folder }
    }

    fn truncate(mut s: String) -> String {
        if s.len() > MAX_OUTPUT_BYTES {
            s.truncate(MAX_OUTPUT_BYTES);
            s.push_str("\n...(truncated)");
        }
        s
    }
}

#[async_trait]
impl Tool for ShellExecTool {
    fn name(&self) -> &str {
        TOOL_SHELL_EXEC
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: TOOL_SHELL_EXEC.to_string(),
            description: Some(
                "Run a shell command in the working folder. Returns combined stdout/stderr, \
                 truncated if large. Optional timeoutMs (default 30000)."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Shell command to execute via `sh -c`."
                    },
                    "timeoutMs": {
                        "type": "integer",
                        "description": "Timeout in milliseconds (default 30000).",
                        "minimum": 1
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn call(
        &self,
        args: serde_json::Value,
        _ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolSourceError::InvalidInput("missing command".to_string()))?;
        let timeout_ms = args
            .get("timeoutMs")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.working_folder.as_ref())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ToolSourceError::Transport(format!("failed to spawn shell: {e}")))?;

        let output = tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait_with_output())
            .await
            .map_err(|_| ToolSourceError::Transport(format!("command timed out after {timeout_ms}ms")))?
            .map_err(|e| ToolSourceError::Transport(format!("failed to wait on shell: {e}")))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&stderr);
        }
        if !output.status.success() {
            text.push_str(&format!("\n(exit status: {})", output.status));
        }

        Ok(ToolCallContent {
            text: Self::truncate(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_command_and_captures_stdout() {
        let tool = ShellExecTool::new(Arc::new(std::env::temp_dir()));
        let result = tool
            .call(json!({"command": "echo hello"}), None)
            .await
            .unwrap();
        assert!(result.text.contains("hello"));
    }

    #[tokio::test]
    async fn missing_command_is_invalid_input() {
        let tool = ShellExecTool::new(Arc::new(std::env::temp_dir()));
        let err = tool.call(json!({}), None).await.unwrap_err();
        assert!(matches!(err, ToolSourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_erred() {
        let tool = ShellExecTool::new(Arc::new(std::env::temp_dir()));
        let result = tool
            .call(json!({"command": "exit 3"}), None)
            .await
            .unwrap();
        assert!(result.text.contains("exit status"));
    }
}
