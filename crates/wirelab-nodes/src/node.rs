//! The node lifecycle trait.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use wirelab_common::{LabError, LabResult};
use wirelab_runtime::ContainerRuntime;
use wirelab_types::{NodeConfig, NodeState};

/// Shared handle to a node.
///
/// Nodes are shared between the scheduler workers and the links that
/// terminate on them, so all lifecycle methods take `&self` and state
/// lives behind interior mutability.
pub type NodeRef = Arc<dyn Node>;

/// How an endpoint terminating on this node is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Moved into the node's network namespace and renamed.
    Namespace,
    /// Kept in the root namespace, mastered to a Linux bridge.
    Bridge,
    /// Kept in the root namespace, attached to an OVS bridge.
    OvsBridge,
    /// Kept in the root namespace under its final name.
    Host,
}

/// The lifecycle contract every node kind implements.
///
/// # Lifecycle
///
/// 1. Construction through the kind registry with a resolved [`NodeConfig`]
/// 2. `check_deployment_conditions` / `verify_startup_config` during the
///    pre-deployment verification pass (no side effects yet)
/// 3. `pre_deploy`, `deploy`, `post_deploy` driven by the stage scheduler
/// 4. `save_config` on demand, `delete` on teardown
#[async_trait]
pub trait Node: std::fmt::Debug + Send + Sync {
    /// Returns a snapshot of the node's configuration.
    fn config(&self) -> NodeConfig;

    /// Mutates the runtime-assigned configuration fields.
    fn update_config(&self, f: &mut dyn FnMut(&mut NodeConfig));

    /// Returns the node's current lifecycle state.
    fn state(&self) -> NodeState;

    /// Transitions the node's lifecycle state.
    fn set_state(&self, state: NodeState);

    /// How endpoints terminating on this node are wired.
    fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::Namespace
    }

    /// True if this kind must be created outside the concurrent worker
    /// pool.
    fn requires_serial_deploy(&self) -> bool {
        false
    }

    /// True if this kind needs hardware virtualization support on the
    /// host.
    fn virt_required(&self) -> bool {
        false
    }

    /// Checks node-scoped deployment preconditions. Runs before any node
    /// is created; must not have side effects.
    async fn check_deployment_conditions(&self) -> LabResult<()> {
        Ok(())
    }

    /// Tasks executed before the container is created.
    async fn pre_deploy(&self) -> LabResult<()> {
        Ok(())
    }

    /// Creates and starts the node's container.
    async fn deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()>;

    /// Kind-specific bring-up after the container started.
    async fn post_deploy(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        Ok(())
    }

    /// Saves the node's running configuration to an external file.
    async fn save_config(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        Ok(())
    }

    /// Stops and removes the node's container and cleans up its netns
    /// symlink.
    async fn delete(&self, runtime: &dyn ContainerRuntime) -> LabResult<()>;

    /// Returns the images this kind needs pulled before deployment.
    fn get_images(&self) -> Vec<String> {
        let image = self.config().image;
        if image.is_empty() {
            vec![]
        } else {
            vec![image]
        }
    }

    /// Validates the endpoint interface names declared for this node.
    ///
    /// Kinds with device-specific naming conventions override this; a
    /// mismatch is a fatal validation error, caught before any wiring.
    fn check_interface_name(&self, _ifaces: &[String]) -> LabResult<()> {
        Ok(())
    }

    /// Verifies the referenced startup-config file exists.
    fn verify_startup_config(&self, topo_dir: &Path) -> LabResult<()> {
        let cfg = self.config();
        if let Some(path) = &cfg.startup_config {
            let resolved = resolve_path(path, topo_dir);
            if !resolved.exists() {
                return Err(LabError::MissingFile {
                    node: cfg.short_name,
                    role: "startup-config".to_string(),
                    path: resolved.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Resolves a possibly relative path against the topology file directory.
pub(crate) fn resolve_path(path: &str, topo_dir: &Path) -> std::path::PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        topo_dir.join(p)
    }
}
