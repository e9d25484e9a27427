//! The `host` pseudo-node: the root network namespace.

use async_trait::async_trait;

use wirelab_common::LabResult;
use wirelab_runtime::ContainerRuntime;
use wirelab_types::{NodeConfig, NodeState, HOST_NS_PATH};

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, EndpointKind, Node};

/// Pseudo-node representing the host's root network namespace.
///
/// Synthesized on demand when a link endpoint references `host`; there is
/// no container behind it, so deploy and delete are no-ops apart from the
/// state transition.
#[derive(Debug)]
pub struct HostNode {
    base: DefaultNode,
}

impl HostNode {
    pub fn new(mut config: NodeConfig) -> Self {
        config.ns_path = HOST_NS_PATH.to_string();
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for HostNode {
    delegate_node_base!();

    fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::Host
    }

    fn get_images(&self) -> Vec<String> {
        vec![]
    }

    async fn deploy(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.set_state(NodeState::Deployed);
        Ok(())
    }

    async fn delete(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.set_state(NodeState::Deleted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wirelab_runtime::MockRuntime;

    #[tokio::test]
    async fn test_deploy_is_container_free() {
        let node = HostNode::new(NodeConfig {
            short_name: "host".to_string(),
            kind: "host".to_string(),
            ..Default::default()
        });
        let rt = MockRuntime::new();

        node.deploy(&rt).await.unwrap();
        assert_eq!(node.state(), NodeState::Deployed);
        assert_eq!(node.config().ns_path, HOST_NS_PATH);
        assert!(rt.calls().is_empty());
        assert!(node.get_images().is_empty());
    }
}
