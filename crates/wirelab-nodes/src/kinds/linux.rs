//! Generic Linux container kind.

use async_trait::async_trait;
use tracing::debug;

use wirelab_common::LabResult;
use wirelab_runtime::ContainerRuntime;
use wirelab_types::NodeConfig;

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, Node};

/// A plain Linux container node.
///
/// The only deviation from the default lifecycle is the post-deploy step:
/// transmit checksum offload is disabled on the management interface, as
/// virtualized network OS images peering with this node mishandle
/// offloaded checksums.
#[derive(Debug)]
pub struct LinuxNode {
    base: DefaultNode,
}

impl LinuxNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for LinuxNode {
    delegate_node_base!();

    async fn deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.deploy(runtime).await
    }

    async fn post_deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        debug!(node = %self.config().short_name, "disabling tx offload on eth0");
        self.base
            .exec_checked(runtime, &["ethtool", "-K", "eth0", "tx", "off"])
            .await
    }

    async fn delete(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.delete(runtime).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirelab_runtime::{MockRuntime, RuntimeCall};

    #[tokio::test]
    async fn test_post_deploy_disables_offload() {
        let node = LinuxNode::new(NodeConfig {
            short_name: "l1".to_string(),
            long_name: "wl-lab-l1".to_string(),
            kind: "linux".to_string(),
            image: "alpine:3".to_string(),
            ..Default::default()
        });
        let rt = MockRuntime::new();

        node.deploy(&rt).await.unwrap();
        node.post_deploy(&rt).await.unwrap();

        let id = node.config().container_id;
        let expected: Vec<String> = ["ethtool", "-K", "eth0", "tx", "off"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(rt.calls().contains(&RuntimeCall::Exec(id, expected)));
    }
}
