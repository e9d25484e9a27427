//! Built-in node kinds.
//!
//! Each kind wraps a [`DefaultNode`](crate::DefaultNode) and overrides the
//! lifecycle steps its device family does differently.

mod bridge;
mod host;
mod linux;
mod ovs_bridge;
mod srl;
mod vrnet;

pub use bridge::BridgeNode;
pub use host::HostNode;
pub use linux::LinuxNode;
pub use ovs_bridge::OvsBridgeNode;
pub use srl::SrlNode;
pub use vrnet::VrnetNode;

use crate::NodeRegistry;
use std::sync::Arc;
use wirelab_common::LabResult;

/// Registers every built-in kind and its default credentials.
pub fn register_defaults(registry: &mut NodeRegistry) -> LabResult<()> {
    registry.register(&["linux"], |c| Arc::new(LinuxNode::new(c)))?;
    registry.register(&["host"], |c| Arc::new(HostNode::new(c)))?;
    registry.register(&["bridge"], |c| Arc::new(BridgeNode::new(c)))?;
    registry.register(&["ovs-bridge"], |c| Arc::new(OvsBridgeNode::new(c)))?;
    registry.register(&["srl"], |c| Arc::new(SrlNode::new(c)))?;
    registry.register(&["vrnet"], |c| Arc::new(VrnetNode::new(c)))?;

    registry.register_credentials(&["srl"], "admin", "NokiaSrl1!")?;
    registry.register_credentials(&["vrnet"], "admin", "admin")?;

    Ok(())
}

/// Delegates the stateful base methods of [`crate::Node`] to `self.base`.
macro_rules! delegate_node_base {
    () => {
        fn config(&self) -> wirelab_types::NodeConfig {
            self.base.config()
        }

        fn update_config(&self, f: &mut dyn FnMut(&mut wirelab_types::NodeConfig)) {
            self.base.update_config(f)
        }

        fn state(&self) -> wirelab_types::NodeState {
            self.base.state()
        }

        fn set_state(&self, state: wirelab_types::NodeState) {
            self.base.set_state(state)
        }
    };
}

pub(crate) use delegate_node_base;
