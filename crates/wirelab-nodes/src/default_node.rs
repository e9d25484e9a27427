//! Composition-based default node behavior.

use std::sync::RwLock;
use tracing::{debug, info};

use wirelab_common::{LabError, LabResult};
use wirelab_runtime::ContainerRuntime;
use wirelab_types::{NodeConfig, NodeState};

/// Default implementation of the container-backed node lifecycle.
///
/// Concrete kinds embed a `DefaultNode` and delegate to it, overriding
/// only the steps their device family does differently. State and the
/// runtime-assigned config fields sit behind `RwLock`s because nodes are
/// shared across scheduler workers.
#[derive(Debug)]
pub struct DefaultNode {
    config: RwLock<NodeConfig>,
    state: RwLock<NodeState>,
}

impl DefaultNode {
    /// Creates a default node from a resolved configuration.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config: RwLock::new(config),
            state: RwLock::new(NodeState::Undeployed),
        }
    }

    /// Returns a snapshot of the configuration.
    pub fn config(&self) -> NodeConfig {
        self.config.read().expect("node config lock poisoned").clone()
    }

    /// Mutates the runtime-assigned configuration fields.
    pub fn update_config(&self, f: &mut dyn FnMut(&mut NodeConfig)) {
        let mut cfg = self.config.write().expect("node config lock poisoned");
        f(&mut cfg);
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> NodeState {
        *self.state.read().expect("node state lock poisoned")
    }

    /// Transitions the lifecycle state.
    pub fn set_state(&self, state: NodeState) {
        let mut cur = self.state.write().expect("node state lock poisoned");
        debug!(node = %self.config().short_name, from = %cur, to = %state, "node state transition");
        *cur = state;
    }

    /// Creates and starts the container, recording the container id and
    /// namespace path as the runtime reports them.
    pub async fn deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        let cfg = self.config();

        let id = runtime.create_container(&cfg).await?;
        self.update_config(&mut |c| c.container_id = id.clone());
        self.set_state(NodeState::Created);

        self.set_state(NodeState::Starting);
        let ns_path = runtime.start_container(&id).await?;
        self.update_config(&mut |c| c.ns_path = ns_path.clone());
        self.set_state(NodeState::Deployed);

        info!(node = %cfg.short_name, container = %id, ns = %ns_path, "node deployed");
        Ok(())
    }

    /// Stops and removes the container and deletes the netns symlink.
    pub async fn delete(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        let cfg = self.config();
        if !cfg.container_id.is_empty() {
            runtime.stop_container(&cfg.container_id).await?;
            runtime.delete_container(&cfg.container_id).await?;
        }
        remove_netns_symlink(&cfg.long_name);
        self.set_state(NodeState::Deleted);
        Ok(())
    }

    /// Runs a command inside the node's container, converting a non-zero
    /// exit into a runtime error.
    pub async fn exec_checked(
        &self,
        runtime: &dyn ContainerRuntime,
        cmd: &[&str],
    ) -> LabResult<()> {
        let cfg = self.config();
        let argv: Vec<String> = cmd.iter().map(|s| s.to_string()).collect();
        let out = runtime.exec(&cfg.container_id, &argv).await?;
        if !out.success() {
            return Err(LabError::runtime(
                "exec",
                format!(
                    "'{}' exited {} on node {}: {}",
                    argv.join(" "),
                    out.exit_code,
                    cfg.short_name,
                    out.stderr
                ),
            ));
        }
        Ok(())
    }
}

/// Removes the `/run/netns/<name>` symlink for a node, ignoring a missing
/// file. The path convention must match what the runtime created.
fn remove_netns_symlink(long_name: &str) {
    let path = format!("/run/netns/{long_name}");
    if let Err(e) = std::fs::remove_file(&path) {
        debug!(path = %path, error = %e, "netns symlink not removed");
    }
}
