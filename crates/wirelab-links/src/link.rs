//! The link model.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::Endpoint;
use wirelab_types::DEFAULT_LINK_MTU;

/// Shared handle to a link.
///
/// Both endpoint nodes hold the same link and may race to deploy it from
/// different scheduler workers.
pub type LinkRef = Arc<Link>;

/// The wiring strategy of a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// A veth pair between two endpoints.
    Veth,
    /// A single-ended macvlan interface on a parent host interface.
    Macvlan {
        /// The parent interface in the root namespace.
        parent: String,
    },
    /// A single-ended vxlan tunnel interface.
    Vxlan {
        /// Remote tunnel endpoint address.
        remote: String,
        /// VXLAN network identifier.
        vni: u32,
        /// UDP destination port of the tunnel.
        udp_port: u16,
        /// Optional underlay device to bind the tunnel to.
        parent: Option<String>,
    },
}

/// Deployment state of a link, guarded by the link's mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkDeployState {
    NotDeployed,
    Deployed,
}

/// A resolved link between endpoints.
///
/// The deployment state transitions NotDeployed to Deployed at most once.
/// The mutex is held for the full duration of the wiring so the second
/// racing endpoint node blocks until the first finishes and then observes
/// the Deployed state.
#[derive(Debug)]
pub struct Link {
    kind: LinkKind,
    endpoints: Vec<Endpoint>,
    mtu: u32,
    labels: HashMap<String, String>,
    pub(crate) state: Mutex<LinkDeployState>,
}

impl Link {
    /// Creates a veth link between two endpoints.
    pub fn veth(a: Endpoint, b: Endpoint) -> Self {
        Self::new(LinkKind::Veth, vec![a, b])
    }

    /// Creates a macvlan link bound to a parent host interface.
    pub fn macvlan(endpoint: Endpoint, parent: impl Into<String>) -> Self {
        Self::new(
            LinkKind::Macvlan {
                parent: parent.into(),
            },
            vec![endpoint],
        )
    }

    /// Creates a vxlan tunnel link.
    pub fn vxlan(
        endpoint: Endpoint,
        remote: impl Into<String>,
        vni: u32,
        udp_port: u16,
        parent: Option<String>,
    ) -> Self {
        Self::new(
            LinkKind::Vxlan {
                remote: remote.into(),
                vni,
                udp_port,
                parent,
            },
            vec![endpoint],
        )
    }

    fn new(kind: LinkKind, endpoints: Vec<Endpoint>) -> Self {
        Self {
            kind,
            endpoints,
            mtu: DEFAULT_LINK_MTU,
            labels: HashMap::new(),
            state: Mutex::new(LinkDeployState::NotDeployed),
        }
    }

    /// Overrides the link MTU.
    pub fn with_mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    /// Attaches labels to the link.
    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn kind(&self) -> &LinkKind {
        &self.kind
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn mtu(&self) -> u32 {
        self.mtu
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }

    /// Returns true if the link has already been wired.
    pub async fn is_deployed(&self) -> bool {
        *self.state.lock().await == LinkDeployState::Deployed
    }

    /// True if `node` terminates one of the link's endpoints.
    pub fn touches(&self, node: &str) -> bool {
        self.endpoints.iter().any(|ep| ep.node_name() == node)
    }
}

// "r1:eth1<->r2:eth1" for pairs, "r1:eth1" for single-ended links
impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.endpoints.iter().map(|ep| ep.to_string()).collect();
        f.write_str(&names.join("<->"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wirelab_nodes::kinds::LinuxNode;
    use wirelab_nodes::NodeRef;
    use wirelab_types::NodeConfig;

    fn node(name: &str) -> NodeRef {
        Arc::new(LinuxNode::new(NodeConfig {
            short_name: name.to_string(),
            kind: "linux".to_string(),
            ..Default::default()
        }))
    }

    #[test]
    fn test_veth_defaults() {
        let link = Link::veth(
            Endpoint::new(node("r1"), "eth1"),
            Endpoint::new(node("r2"), "eth1"),
        );
        assert_eq!(link.mtu(), DEFAULT_LINK_MTU);
        assert_eq!(link.endpoints().len(), 2);
        assert_eq!(link.to_string(), "r1:eth1<->r2:eth1");
        assert!(link.touches("r1"));
        assert!(!link.touches("r3"));
    }

    #[test]
    fn test_single_ended_kinds() {
        let mv = Link::macvlan(Endpoint::new(node("r1"), "eth1"), "enp0s3").with_mtu(1500);
        assert_eq!(mv.mtu(), 1500);
        assert_eq!(mv.endpoints().len(), 1);
        assert_eq!(mv.to_string(), "r1:eth1");

        let vx = Link::vxlan(Endpoint::new(node("r2"), "eth1"), "10.0.0.2", 101, 14789, None);
        match vx.kind() {
            LinkKind::Vxlan { vni, udp_port, .. } => {
                assert_eq!(*vni, 101);
                assert_eq!(*udp_port, 14789);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_starts_not_deployed() {
        let link = Link::veth(
            Endpoint::new(node("r1"), "eth1"),
            Endpoint::new(node("r2"), "eth1"),
        );
        assert!(!link.is_deployed().await);
    }
}
