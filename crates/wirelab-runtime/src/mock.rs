//! In-memory mock runtime for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use wirelab_common::{LabError, LabResult};
use wirelab_types::NodeConfig;

use crate::{ContainerRuntime, ExecOutput};

/// One recorded call against the mock runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    PullImage(String),
    Create(String),
    Start(String),
    Stop(String),
    Delete(String),
    Exec(String, Vec<String>),
    GetNsPath(String),
}

/// A mock container runtime that records every call and serves canned
/// namespace paths of the form `/run/netns/<container>`.
///
/// Container ids are `mock-<n>` with `n` increasing per creation, so tests
/// can assert creation order on the serial path.
#[derive(Debug, Default)]
pub struct MockRuntime {
    calls: Mutex<Vec<RuntimeCall>>,
    next_id: AtomicU64,
    serial: bool,
    fail_create: Mutex<HashSet<String>>,
}

impl MockRuntime {
    /// Creates a new mock runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this runtime as requiring serialized container creation.
    pub fn serial(mut self) -> Self {
        self.serial = true;
        self
    }

    /// Makes `create_container` fail for the named node.
    pub fn fail_create_for(&self, long_name: impl Into<String>) {
        self.fail_create
            .lock()
            .expect("mock lock poisoned")
            .insert(long_name.into());
    }

    /// Returns a snapshot of all recorded calls.
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.calls.lock().expect("mock lock poisoned").clone()
    }

    /// Counts calls matching a predicate.
    pub fn count_calls(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: RuntimeCall) {
        self.calls.lock().expect("mock lock poisoned").push(call);
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    async fn pull_image_if_required(&self, image: &str) -> LabResult<()> {
        self.record(RuntimeCall::PullImage(image.to_string()));
        Ok(())
    }

    async fn create_container(&self, cfg: &NodeConfig) -> LabResult<String> {
        self.record(RuntimeCall::Create(cfg.long_name.clone()));
        if self
            .fail_create
            .lock()
            .expect("mock lock poisoned")
            .contains(&cfg.long_name)
        {
            return Err(LabError::runtime(
                "create",
                format!("injected failure for {}", cfg.long_name),
            ));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("mock-{n}"))
    }

    async fn start_container(&self, id: &str) -> LabResult<String> {
        self.record(RuntimeCall::Start(id.to_string()));
        Ok(format!("/run/netns/{id}"))
    }

    async fn stop_container(&self, id: &str) -> LabResult<()> {
        self.record(RuntimeCall::Stop(id.to_string()));
        Ok(())
    }

    async fn delete_container(&self, id: &str) -> LabResult<()> {
        self.record(RuntimeCall::Delete(id.to_string()));
        Ok(())
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> LabResult<ExecOutput> {
        self.record(RuntimeCall::Exec(id.to_string(), cmd.to_vec()));
        Ok(ExecOutput::default())
    }

    async fn get_ns_path(&self, id: &str) -> LabResult<String> {
        self.record(RuntimeCall::GetNsPath(id.to_string()));
        Ok(format!("/run/netns/{id}"))
    }

    fn requires_serial_create(&self) -> bool {
        self.serial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cfg(name: &str) -> NodeConfig {
        NodeConfig {
            short_name: name.to_string(),
            long_name: format!("wl-lab-{name}"),
            kind: "linux".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_start_round_trip() {
        let rt = MockRuntime::new();
        let id = rt.create_container(&cfg("r1")).await.unwrap();
        let ns = rt.start_container(&id).await.unwrap();

        assert_eq!(ns, format!("/run/netns/{id}"));
        assert_eq!(
            rt.calls(),
            vec![
                RuntimeCall::Create("wl-lab-r1".to_string()),
                RuntimeCall::Start(id),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_create_failure() {
        let rt = MockRuntime::new();
        rt.fail_create_for("wl-lab-bad");
        let err = rt.create_container(&cfg("bad")).await.unwrap_err();
        assert!(matches!(err, LabError::Runtime { .. }));
    }
}
