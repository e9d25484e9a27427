//! Kernel operation boundary.

use async_trait::async_trait;
use std::sync::Mutex;

use wirelab_common::{shell, LabError, LabResult};

/// Executes root-namespace networking commands.
///
/// The wiring engine and the pre-deployment validator only ever talk to
/// the kernel through this trait; tests substitute [`MockNetOps`] and
/// assert on the captured command strings.
#[async_trait]
pub trait NetOps: Send + Sync {
    /// Runs a command, failing on a non-zero exit.
    async fn run(&self, cmd: &str) -> LabResult<()>;

    /// Runs a probe command, mapping the exit code to a boolean.
    async fn probe(&self, cmd: &str) -> LabResult<bool>;
}

/// The production implementation backed by `/bin/sh -c`.
#[derive(Debug, Default)]
pub struct ShellNetOps;

impl ShellNetOps {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetOps for ShellNetOps {
    async fn run(&self, cmd: &str) -> LabResult<()> {
        shell::exec_checked(cmd).await.map(|_| ())
    }

    async fn probe(&self, cmd: &str) -> LabResult<bool> {
        Ok(shell::exec(cmd).await?.success())
    }
}

/// Records every command instead of executing it.
///
/// `fail_when_contains` turns the first matching `run` call into an
/// error, which is how the rollback paths are exercised.
#[derive(Debug, Default)]
pub struct MockNetOps {
    commands: Mutex<Vec<String>>,
    fail_when_contains: Mutex<Option<String>>,
    probe_misses: Mutex<Vec<String>>,
}

impl MockNetOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `run` fail for any command containing `needle`.
    pub fn fail_when_contains(&self, needle: impl Into<String>) {
        *self
            .fail_when_contains
            .lock()
            .expect("mock netops lock poisoned") = Some(needle.into());
    }

    /// Makes `probe` report false for any command containing `needle`.
    pub fn probe_miss_for(&self, needle: impl Into<String>) {
        self.probe_misses
            .lock()
            .expect("mock netops lock poisoned")
            .push(needle.into());
    }

    /// Returns all captured commands in execution order.
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .expect("mock netops lock poisoned")
            .clone()
    }

    fn record(&self, cmd: &str) {
        self.commands
            .lock()
            .expect("mock netops lock poisoned")
            .push(cmd.to_string());
    }
}

#[async_trait]
impl NetOps for MockNetOps {
    async fn run(&self, cmd: &str) -> LabResult<()> {
        self.record(cmd);
        let fail = self
            .fail_when_contains
            .lock()
            .expect("mock netops lock poisoned");
        if let Some(needle) = fail.as_deref() {
            if cmd.contains(needle) {
                return Err(LabError::ShellCommandFailed {
                    command: cmd.to_string(),
                    exit_code: 1,
                    output: "mock failure".to_string(),
                });
            }
        }
        Ok(())
    }

    async fn probe(&self, cmd: &str) -> LabResult<bool> {
        self.record(cmd);
        let misses = self
            .probe_misses
            .lock()
            .expect("mock netops lock poisoned");
        Ok(!misses.iter().any(|needle| cmd.contains(needle)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_mock_records_and_fails_on_match() {
        let net = MockNetOps::new();
        net.run("ip link add a").await.unwrap();

        net.fail_when_contains("netns");
        assert!(net.run("ip link set dev a netns ns1").await.is_err());
        assert!(net.run("ip link del dev a").await.is_ok());

        assert_eq!(
            net.commands(),
            vec![
                "ip link add a".to_string(),
                "ip link set dev a netns ns1".to_string(),
                "ip link del dev a".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_mock_probe_misses() {
        let net = MockNetOps::new();
        assert!(net.probe("ip link show dev br0").await.unwrap());
        net.probe_miss_for("br0");
        assert!(!net.probe("ip link show dev br0").await.unwrap());
    }
}
