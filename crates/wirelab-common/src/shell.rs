//! Shell command execution for kernel interface work.
//!
//! The wiring engine drives the kernel through the standard networking
//! tools (`ip`, `ethtool`, `ovs-vsctl`). Commands are built as strings by
//! the link command builders and executed here through `/bin/sh -c`, with
//! quoting applied to every interpolated value.

use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use tokio::process::Command;

use crate::{LabError, LabResult};

/// Path to the `ip` command for interface and namespace configuration.
pub const IP_CMD: &str = "/sbin/ip";

/// Path to the `ethtool` command for offload configuration.
pub const ETHTOOL_CMD: &str = "/sbin/ethtool";

/// Path to the `ovs-vsctl` command for Open vSwitch bridge attachment.
pub const OVS_VSCTL_CMD: &str = "/usr/bin/ovs-vsctl";

// Characters with special meaning inside shell double-quotes.
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("invalid escape pattern"));

/// Quotes a string for safe interpolation into a shell command.
///
/// Wraps the string in double quotes and escapes `$`, `` ` ``, `"`, `\`
/// and newline.
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of a shell command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// Trimmed stdout.
    pub stdout: String,
    /// Trimmed stderr.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output for error messages.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Executes a shell command asynchronously through `/bin/sh -c`.
///
/// A non-zero exit code is reported in the returned [`ExecResult`], not as
/// an error; only a failure to spawn is an `Err`.
pub async fn exec(cmd: &str) -> LabResult<ExecResult> {
    tracing::debug!(command = %cmd, "executing shell command");

    let output = Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| LabError::ShellExec {
            command: cmd.to_string(),
            source: e,
        })?;

    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if !result.success() {
        tracing::warn!(
            command = %cmd,
            exit_code = result.exit_code,
            stderr = %result.stderr,
            "command failed"
        );
    }

    Ok(result)
}

/// Executes a shell command and converts a non-zero exit into an error.
pub async fn exec_checked(cmd: &str) -> LabResult<String> {
    let result = exec(cmd).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(LabError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shellquote_simple() {
        assert_eq!(shellquote("eth1"), "\"eth1\"");
        assert_eq!(shellquote("wl-1a2b3c4d"), "\"wl-1a2b3c4d\"");
    }

    #[test]
    fn test_shellquote_special_chars() {
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`id`"), "\"\\`id\\`\"");
        assert_eq!(shellquote("a\"b"), "\"a\\\"b\"");
        assert_eq!(shellquote("a\\b"), "\"a\\\\b\"");
    }

    #[test]
    fn test_combined_output() {
        let result = ExecResult {
            exit_code: 1,
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(result.combined_output(), "out\nerr");
        assert!(!result.success());
    }

    #[tokio::test]
    async fn test_exec_echo() {
        let result = exec("echo hello").await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "hello");
    }

    #[tokio::test]
    async fn test_exec_checked_failure() {
        let err = exec_checked("exit 3").await.unwrap_err();
        match err {
            LabError::ShellCommandFailed { exit_code, .. } => assert_eq!(exit_code, 3),
            other => panic!("expected ShellCommandFailed, got {other:?}"),
        }
    }
}
