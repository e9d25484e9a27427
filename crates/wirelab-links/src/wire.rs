//! The virtual wiring engine.
//!
//! Realizes a resolved [`Link`] as kernel interfaces. Veth pairs are
//! created in the root namespace under their random staging names, get
//! transmit checksum offload disabled, and are then dispatched per
//! endpoint kind. Mid-wiring failures roll back the root-namespace
//! interfaces created in the current call before the error propagates.

use tracing::{debug, info, warn};

use crate::commands;
use crate::link::LinkDeployState;
use crate::{Endpoint, Link, LinkKind, NetOps};
use wirelab_common::{LabError, LabResult};
use wirelab_nodes::EndpointKind;

/// Outcome of a [`deploy`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStatus {
    /// The link was wired by this call.
    Deployed,
    /// Another caller already wired the link; nothing was done.
    AlreadyDeployed,
    /// An endpoint node is not namespace-ready yet; nothing was done.
    /// The caller re-triggers at the next readiness point.
    Deferred,
}

impl Link {
    /// Wires the link, at most once.
    ///
    /// The state mutex is held across the whole operation: of two
    /// endpoint nodes racing here from different workers, the second
    /// blocks and then observes `AlreadyDeployed`. Returns `Deferred`
    /// without side effects while any namespace endpoint's node has not
    /// produced a network namespace yet.
    pub async fn deploy(&self, net: &dyn NetOps) -> LabResult<DeployStatus> {
        let mut state = self.state.lock().await;
        if *state == LinkDeployState::Deployed {
            debug!(link = %self, "link already deployed");
            return Ok(DeployStatus::AlreadyDeployed);
        }

        for ep in self.endpoints() {
            if ep.kind() != EndpointKind::Namespace {
                continue;
            }
            // the state flips before the runtime reports the namespace
            // path, so an empty path also means not ready yet
            let node = ep.node();
            if !node.state().is_namespace_ready() || node.config().ns_path.is_empty() {
                debug!(link = %self, node = ep.node_name(), "endpoint not ready, deferring");
                return Ok(DeployStatus::Deferred);
            }
        }

        match self.kind() {
            LinkKind::Veth => self.wire_veth(net).await?,
            LinkKind::Macvlan { parent } => {
                let cmd = commands::build_create_macvlan_cmd(
                    self.single_endpoint()?.iface(),
                    parent,
                    self.mtu(),
                );
                self.wire_single_ended(net, &cmd).await?;
            }
            LinkKind::Vxlan {
                remote,
                vni,
                udp_port,
                parent,
            } => {
                let cmd = commands::build_create_vxlan_cmd(
                    self.single_endpoint()?.iface(),
                    remote,
                    *vni,
                    *udp_port,
                    parent.as_deref(),
                    self.mtu(),
                );
                self.wire_single_ended(net, &cmd).await?;
            }
        }

        *state = LinkDeployState::Deployed;
        info!(link = %self, "link deployed");
        Ok(DeployStatus::Deployed)
    }

    fn single_endpoint(&self) -> LabResult<&Endpoint> {
        match self.endpoints() {
            [ep] => Ok(ep),
            eps => Err(LabError::wiring(
                self.to_string(),
                format!("expected exactly one endpoint, found {}", eps.len()),
            )),
        }
    }

    async fn wire_veth(&self, net: &dyn NetOps) -> LabResult<()> {
        let [a, b] = self.endpoints() else {
            return Err(LabError::wiring(
                self.to_string(),
                format!("veth link needs exactly two endpoints, found {}", self.endpoints().len()),
            ));
        };

        net.run(&commands::build_create_veth_cmd(
            a.root_ns_name(),
            b.root_ns_name(),
            self.mtu(),
        ))
        .await
        .map_err(|e| LabError::wiring(self.to_string(), e.to_string()))?;

        let result = self.wire_veth_ends(net, a, b).await;
        if let Err(e) = result {
            // deleting either veth end also removes its peer, but the
            // peer may already sit inside a namespace
            rollback(net, &[a.root_ns_name(), b.root_ns_name()]).await;
            return Err(e);
        }
        Ok(())
    }

    async fn wire_veth_ends(&self, net: &dyn NetOps, a: &Endpoint, b: &Endpoint) -> LabResult<()> {
        for ep in [a, b] {
            net.run(&commands::build_tx_offload_off_cmd(ep.root_ns_name()))
                .await
                .map_err(|e| LabError::wiring(self.to_string(), e.to_string()))?;
        }
        for ep in [a, b] {
            self.setup_endpoint(net, ep).await?;
        }
        Ok(())
    }

    async fn setup_endpoint(&self, net: &dyn NetOps, ep: &Endpoint) -> LabResult<()> {
        let steps = match ep.kind() {
            EndpointKind::Namespace => {
                let netns = ep.netns_name()?;
                vec![
                    commands::build_move_to_netns_cmd(ep.staging_name(), &netns),
                    commands::build_finalize_in_netns_cmd(
                        &netns,
                        ep.staging_name(),
                        ep.iface(),
                        &ep.mac().to_string(),
                    ),
                ]
            }
            EndpointKind::Bridge => vec![
                commands::build_rename_cmd(ep.staging_name(), ep.iface()),
                commands::build_attach_bridge_cmd(ep.iface(), ep.node_name()),
                commands::build_set_up_cmd(ep.iface()),
            ],
            EndpointKind::OvsBridge => vec![
                commands::build_rename_cmd(ep.staging_name(), ep.iface()),
                commands::build_attach_ovs_cmd(ep.iface(), ep.node_name()),
                commands::build_set_up_cmd(ep.iface()),
            ],
            // created under its final name, nothing to attach
            EndpointKind::Host => vec![commands::build_set_up_cmd(ep.iface())],
        };

        for cmd in steps {
            net.run(&cmd)
                .await
                .map_err(|e| LabError::wiring(self.to_string(), e.to_string()))?;
        }
        Ok(())
    }

    /// Creates a single-ended interface (macvlan, vxlan) directly under
    /// its final name, then moves it into the target namespace if the
    /// endpoint is namespace-backed. No staging rename is involved.
    async fn wire_single_ended(&self, net: &dyn NetOps, create_cmd: &str) -> LabResult<()> {
        let ep = self.single_endpoint()?;
        let name = ep.iface();

        net.run(create_cmd)
            .await
            .map_err(|e| LabError::wiring(self.to_string(), e.to_string()))?;

        let result = async {
            net.run(&commands::build_set_mac_cmd(name, &ep.mac().to_string()))
                .await?;
            match ep.kind() {
                EndpointKind::Namespace => {
                    let netns = ep.netns_name()?;
                    net.run(&commands::build_move_to_netns_cmd(name, &netns))
                        .await?;
                    net.run(&commands::build_set_up_in_netns_cmd(&netns, ep.iface()))
                        .await?;
                }
                _ => {
                    net.run(&commands::build_set_up_cmd(name)).await?;
                }
            }
            Ok::<_, LabError>(())
        }
        .await;

        if let Err(e) = result {
            rollback(net, &[name]).await;
            return Err(LabError::wiring(self.to_string(), e.to_string()));
        }
        Ok(())
    }
}

/// Best-effort deletion of root-namespace interfaces created in the
/// current call. Interfaces that already moved into a namespace make the
/// delete fail, which is ignored.
async fn rollback(net: &dyn NetOps, ifaces: &[&str]) {
    for iface in ifaces {
        if let Err(e) = net.run(&commands::build_delete_link_cmd(iface)).await {
            warn!(iface, error = %e, "rollback delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockNetOps;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use wirelab_nodes::kinds::{BridgeNode, HostNode, LinuxNode};
    use wirelab_nodes::NodeRef;
    use wirelab_types::{NodeConfig, NodeState};

    fn ready_node(name: &str) -> NodeRef {
        let node: NodeRef = Arc::new(LinuxNode::new(NodeConfig {
            short_name: name.to_string(),
            long_name: format!("wl-lab-{name}"),
            kind: "linux".to_string(),
            ..Default::default()
        }));
        node.update_config(&mut |c| c.ns_path = format!("/run/netns/wl-lab-{name}"));
        node.set_state(NodeState::Deployed);
        node
    }

    fn veth_between(a: NodeRef, b: NodeRef) -> Link {
        Link::veth(Endpoint::new(a, "eth1"), Endpoint::new(b, "eth1"))
    }

    #[tokio::test]
    async fn test_veth_wiring_sequence() {
        let link = veth_between(ready_node("r1"), ready_node("r2"));
        let net = MockNetOps::new();

        let status = link.deploy(&net).await.unwrap();
        assert_eq!(status, DeployStatus::Deployed);
        assert!(link.is_deployed().await);

        let cmds = net.commands();
        let a = link.endpoints()[0].staging_name().to_string();
        let b = link.endpoints()[1].staging_name().to_string();

        assert!(cmds[0].contains("type veth peer name"));
        assert!(cmds[0].contains(&a));
        assert!(cmds[0].contains(&b));
        assert!(cmds[1].contains("tx off"));
        assert!(cmds[2].contains("tx off"));
        assert!(cmds[3].contains("netns \"wl-lab-r1\""));
        assert!(cmds[4].contains("name \"eth1\""));
        assert!(cmds[4].contains(&link.endpoints()[0].mac().to_string()));
        assert!(cmds[5].contains("netns \"wl-lab-r2\""));
        assert_eq!(cmds.len(), 7);
    }

    #[tokio::test]
    async fn test_second_deploy_is_noop() {
        let link = veth_between(ready_node("r1"), ready_node("r2"));
        let net = MockNetOps::new();

        link.deploy(&net).await.unwrap();
        let before = net.commands().len();

        let status = link.deploy(&net).await.unwrap();
        assert_eq!(status, DeployStatus::AlreadyDeployed);
        assert_eq!(net.commands().len(), before);
    }

    #[tokio::test]
    async fn test_concurrent_deploy_wires_once() {
        let link = Arc::new(veth_between(ready_node("r1"), ready_node("r2")));
        let net = Arc::new(MockNetOps::new());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let link = Arc::clone(&link);
            let net = Arc::clone(&net);
            handles.push(tokio::spawn(async move { link.deploy(&*net).await.unwrap() }));
        }

        let mut wired = 0;
        for h in handles {
            if h.await.unwrap() == DeployStatus::Deployed {
                wired += 1;
            }
        }
        assert_eq!(wired, 1);

        let creates = net
            .commands()
            .iter()
            .filter(|c| c.contains("type veth peer name"))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_unready_endpoint_defers() {
        let r1 = ready_node("r1");
        let r2: NodeRef = Arc::new(LinuxNode::new(NodeConfig {
            short_name: "r2".to_string(),
            kind: "linux".to_string(),
            ..Default::default()
        }));
        let link = veth_between(r1, Arc::clone(&r2));
        let net = MockNetOps::new();

        let status = link.deploy(&net).await.unwrap();
        assert_eq!(status, DeployStatus::Deferred);
        assert!(net.commands().is_empty());
        assert!(!link.is_deployed().await);

        // retried once the node produced a namespace
        r2.update_config(&mut |c| c.ns_path = "/run/netns/wl-lab-r2".to_string());
        r2.set_state(NodeState::Deployed);
        assert_eq!(link.deploy(&net).await.unwrap(), DeployStatus::Deployed);
    }

    #[tokio::test]
    async fn test_created_node_without_ns_path_defers() {
        // a node can be in a namespace-ready state before the runtime
        // reported its namespace path; wiring against it must defer
        // instead of half-creating the pair and erroring out
        let r1 = ready_node("r1");
        let r2: NodeRef = Arc::new(LinuxNode::new(NodeConfig {
            short_name: "r2".to_string(),
            kind: "linux".to_string(),
            ..Default::default()
        }));
        r2.set_state(NodeState::Created);
        let link = veth_between(r1, Arc::clone(&r2));
        let net = MockNetOps::new();

        let status = link.deploy(&net).await.unwrap();
        assert_eq!(status, DeployStatus::Deferred);
        assert!(net.commands().is_empty());

        r2.update_config(&mut |c| c.ns_path = "/run/netns/wl-lab-r2".to_string());
        r2.set_state(NodeState::Deployed);
        assert_eq!(link.deploy(&net).await.unwrap(), DeployStatus::Deployed);
    }

    #[tokio::test]
    async fn test_bridge_endpoint_attaches_master() {
        let br: NodeRef = Arc::new(BridgeNode::new(NodeConfig {
            short_name: "br0".to_string(),
            kind: "bridge".to_string(),
            ..Default::default()
        }));
        br.set_state(NodeState::Deployed);
        let link = Link::veth(
            Endpoint::new(ready_node("r1"), "eth1"),
            Endpoint::new(br, "r1-br0"),
        );
        let net = MockNetOps::new();

        link.deploy(&net).await.unwrap();
        let cmds = net.commands();
        assert!(cmds.iter().any(|c| c.contains("master \"br0\"")));
        assert!(cmds.iter().any(|c| c.contains("name \"r1-br0\"")));
    }

    #[tokio::test]
    async fn test_host_endpoint_keeps_final_name() {
        let host: NodeRef = Arc::new(HostNode::new(NodeConfig {
            short_name: "host".to_string(),
            kind: "host".to_string(),
            ..Default::default()
        }));
        host.set_state(NodeState::Deployed);
        let link = Link::veth(
            Endpoint::new(ready_node("r1"), "eth1"),
            Endpoint::new(host, "lab-out"),
        );
        let net = MockNetOps::new();

        link.deploy(&net).await.unwrap();
        let cmds = net.commands();
        // the pair is created directly under the final host-side name
        assert!(cmds[0].contains("\"lab-out\""));
        assert!(cmds.iter().any(|c| c.contains("dev \"lab-out\" up")));
    }

    #[tokio::test]
    async fn test_mid_wiring_failure_rolls_back() {
        let link = veth_between(ready_node("r1"), ready_node("r2"));
        let net = MockNetOps::new();
        net.fail_when_contains("netns \"wl-lab-r2\"");

        let err = link.deploy(&net).await.unwrap_err();
        assert!(matches!(err, LabError::Wiring { .. }));
        assert!(!link.is_deployed().await);

        let cmds = net.commands();
        let deletes: Vec<_> = cmds.iter().filter(|c| c.contains("link del")).collect();
        assert_eq!(deletes.len(), 2);
        assert!(deletes[0].contains(link.endpoints()[0].staging_name()));
        assert!(deletes[1].contains(link.endpoints()[1].staging_name()));
    }

    #[tokio::test]
    async fn test_macvlan_wiring() {
        let link = Link::macvlan(Endpoint::new(ready_node("r1"), "net0"), "enp0s3");
        let net = MockNetOps::new();

        assert_eq!(link.deploy(&net).await.unwrap(), DeployStatus::Deployed);
        let cmds = net.commands();
        assert!(cmds[0].contains("type macvlan"));
        assert!(cmds[0].contains("\"enp0s3\""));
        assert!(cmds.iter().any(|c| c.contains("netns \"wl-lab-r1\"")));
        assert!(cmds.iter().any(|c| c.contains("netns exec \"wl-lab-r1\"")));
    }

    #[tokio::test]
    async fn test_vxlan_failure_rolls_back() {
        let link = Link::vxlan(
            Endpoint::new(ready_node("r1"), "vx0"),
            "192.0.2.10",
            200,
            commands::DEFAULT_VXLAN_PORT,
            None,
        );
        let net = MockNetOps::new();
        net.fail_when_contains("address");

        assert!(link.deploy(&net).await.is_err());
        let cmds = net.commands();
        assert!(cmds.last().unwrap().contains("link del"));
    }
}
