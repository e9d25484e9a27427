//! Open vSwitch bridge pseudo-node kind.

use async_trait::async_trait;

use wirelab_common::LabResult;
use wirelab_runtime::ContainerRuntime;
use wirelab_types::{NodeConfig, NodeState, HOST_NS_PATH};

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, EndpointKind, Node};

/// Same contract as `bridge`, but endpoints are attached through
/// `ovs-vsctl` instead of a bridge master.
#[derive(Debug)]
pub struct OvsBridgeNode {
    base: DefaultNode,
}

impl OvsBridgeNode {
    pub fn new(mut config: NodeConfig) -> Self {
        config.ns_path = HOST_NS_PATH.to_string();
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for OvsBridgeNode {
    delegate_node_base!();

    fn endpoint_kind(&self) -> EndpointKind {
        EndpointKind::OvsBridge
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
