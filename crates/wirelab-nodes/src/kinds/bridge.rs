//! Linux bridge pseudo-node kind.

use async_trait::async_trait;

use wirelab_common::LabResult;
use wirelab_runtime::ContainerRuntime;
use wirelab_types::{NodeConfig, NodeState, HOST_NS_PATH};

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, EndpointKind, Node};

/// A node of kind `bridge` stands for an existing Linux bridge in the root
/// namespace; wirelab attaches link endpoints to it but never creates or
/// removes the bridge itself. The pre-deployment verification pass checks
/// that the bridge exists.
#[derive(Debug)]
pub struct BridgeNode {
    base: DefaultNode,
}

impl BridgeNode {
    pub fn new(mut config: NodeConfig) -> Self {
        config.ns_path = HOST_NS_PATH.to_string();
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for BridgeNode {
    delegate_node_base!();

    fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::Bridge
    }

    fn get_images(&self) -> Vec<String> {
        vec![]
    }

    async fn deploy(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.set_state(NodeState::Deployed);
        Ok(())
    }

    async fn delete(&self, _runtime: &dyn ContainerRuntime) -> LabResult<()> {
        // the bridge belongs to the host, leave it alone
        self.set_state(NodeState::Deleted);
        Ok(())
    }
}
