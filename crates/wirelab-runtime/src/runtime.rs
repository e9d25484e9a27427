//! The container runtime trait.

use async_trait::async_trait;
use wirelab_common::LabResult;
use wirelab_types::NodeConfig;

/// Output of a command executed inside a container.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl ExecOutput {
    /// Returns true if the command succeeded.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The boundary between the deployment core and a container backend.
///
/// Implementations must be `Send + Sync`: node stages run on concurrent
/// workers and share one runtime handle.
///
/// Every method may be subject to the caller's deadline; the deployer
/// wraps calls in `tokio::time::timeout` and converts an elapsed deadline
/// into a stage failure for that node only.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Returns the runtime name (for logging and serial-path selection).
    fn name(&self) -> &str;

    /// Pulls `image` unless it is already present in the local store.
    async fn pull_image_if_required(&self, image: &str) -> LabResult<()>;

    /// Creates a container for the node and returns its id.
    async fn create_container(&self, cfg: &NodeConfig) -> LabResult<String>;

    /// Starts a created container and returns its network namespace path.
    async fn start_container(&self, id: &str) -> LabResult<String>;

    /// Stops a running container.
    async fn stop_container(&self, id: &str) -> LabResult<()>;

    /// Removes a container.
    async fn delete_container(&self, id: &str) -> LabResult<()>;

    /// Executes a command inside a running container.
    async fn exec(&self, id: &str, cmd: &[String]) -> LabResult<ExecOutput>;

    /// Returns the network namespace path of a running container.
    async fn get_ns_path(&self, id: &str) -> LabResult<String>;

    /// Returns true if this runtime cannot safely create multiple
    /// containers in parallel.
    ///
    /// Nodes backed by such a runtime are taken off the worker pool and
    /// created on a dedicated serial path.
    fn requires_serial_create(&self) -> bool {
        false
    }
}
