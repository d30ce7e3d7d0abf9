//! Running host commands with a time limit.

use std::process::Stdio;
use std::time::Duration;

use mcp::ToolError;
use tokio::process::Command;
use tracing::debug;

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl Output {
    /// Stdout, or a failure carrying `context` when the command wrote to
    /// stderr or exited unsuccessfully.
    pub fn checked(self, context: &str) -> Result<String, ToolError> {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return Err(ToolError::Execution(format!("{context}: {stderr}")));
        }
        if !self.success {
            return Err(ToolError::Execution(context.to_string()));
        }
        Ok(self.stdout)
    }
}

/// Run `program` with `args` (no shell involved), killing it after `limit`.
pub async fn run(program: &str, args: &[&str], limit: Duration) -> Result<Output, ToolError> {
    debug!(program, ?args, "running command");
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ToolError::Execution(format!("failed to run {program}: {e}")))?;

    let output = tokio::time::timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| ToolError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)))?
        .map_err(|e| ToolError::Execution(format!("failed to run {program}: {e}")))?;

    Ok(Output {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let output = run("echo", &["-a", "Safari"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "-a Safari");
        assert_eq!(output.checked("ignored").unwrap().trim(), "-a Safari");
    }

    #[tokio::test]
    async fn arguments_are_not_shell_expanded() {
        let output = run("echo", &["$HOME; rm -rf /"], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "$HOME; rm -rf /");
    }

    #[tokio::test]
    async fn stderr_is_a_failure() {
        let output = run("sh", &["-c", "echo boom >&2"], Duration::from_secs(5))
            .await
            .unwrap();
        let err = output.checked("Failed to launch application \"Nope\"").unwrap_err();
        assert_eq!(
            err,
            ToolError::Execution("Failed to launch application \"Nope\": boom".into())
        );
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let err = run("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::Timeout(100));
    }

    #[tokio::test]
    async fn missing_program() {
        let err = run("macpilot-no-such-program", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(msg) if msg.starts_with("failed to run")));
    }
}
