//! Pre-deployment verification.
//!
//! Runs after resolution and before any container or kernel side effect,
//! so a failing topology never leaves partial state behind.

use std::collections::HashMap;

use tracing::debug;

use crate::Topology;
use wirelab_common::{LabError, LabResult};
use wirelab_links::{commands, NetOps};
use wirelab_nodes::EndpointKind;
use wirelab_sched::check_waitfor_graph;

/// Verifies every deployment precondition of a resolved topology.
///
/// Checks, in order: wait-for graph acyclicity, per-kind interface-name
/// signatures, startup-config and license file existence, kind-specific
/// deployment conditions, referenced bridge existence, and duplicate
/// management IP requests. The first failure aborts the run; nothing has
/// been created at that point.
pub async fn verify(topo: &Topology, net: &dyn NetOps) -> LabResult<()> {
    check_waitfor_graph(&topo.stages_map())?;

    for (name, node) in topo.nodes() {
        let ifaces: Vec<String> = topo
            .links_for(name)
            .iter()
            .flat_map(|link| {
                link.endpoints()
                    .iter()
                    .filter(|ep| ep.node_name() == name)
                    .map(|ep| ep.iface().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        node.check_interface_name(&ifaces)?;
        node.verify_startup_config(topo.topo_dir())?;
        node.check_deployment_conditions().await?;
    }

    check_bridges_exist(topo, net).await?;
    check_duplicate_mgmt_ips(topo)?;

    debug!(lab = %topo.name(), "pre-deployment verification passed");
    Ok(())
}

/// Bridge and ovs-bridge nodes refer to devices that must already exist
/// in the root namespace; the wiring engine only attaches to them.
async fn check_bridges_exist(topo: &Topology, net: &dyn NetOps) -> LabResult<()> {
    for (name, node) in topo.nodes() {
        if topo.links_for(name).is_empty() {
            continue;
        }
        let probe = match node.endpoint_kind() {
            EndpointKind::Bridge => commands::build_check_iface_cmd(name),
            EndpointKind::OvsBridge => commands::build_check_ovs_bridge_cmd(name),
            _ => continue,
        };
        if !net.probe(&probe).await? {
            return Err(LabError::BridgeMissing {
                bridge: name.clone(),
            });
        }
    }
    Ok(())
}

fn check_duplicate_mgmt_ips(topo: &Topology) -> LabResult<()> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for (name, node) in topo.nodes() {
        let cfg = node.config();
        for ip in [&cfg.mgmt_ipv4, &cfg.mgmt_ipv6] {
            if ip.is_empty() {
                continue;
            }
            if let Some(other) = seen.insert(ip.clone(), name.clone()) {
                return Err(LabError::validation(format!(
                    "management address {ip} is requested by both '{other}' and '{name}'"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{resolve, TopologyFile};
    use std::path::Path;
    use wirelab_links::MockNetOps;
    use wirelab_nodes::NodeRegistry;

    fn topo_from(yaml: &str) -> Topology {
        let file = TopologyFile::from_yaml(yaml).unwrap();
        resolve(&file, &NodeRegistry::with_default_kinds(), Path::new(".")).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_rejected_before_any_side_effect() {
        let topo = topo_from(
            r#"
name: cyclic
topology:
  nodes:
    a:
      kind: linux
      image: alpine:3
      stages:
        create:
          wait-for: [{node: b, stage: healthy}]
    b:
      kind: linux
      image: alpine:3
      stages:
        create:
          wait-for: [{node: a, stage: healthy}]
"#,
        );
        let net = MockNetOps::new();
        let err = verify(&topo, &net).await.unwrap_err();
        assert!(matches!(err, LabError::CyclicDependency { .. }));
        assert!(net.commands().is_empty());
    }

    #[tokio::test]
    async fn test_kind_iface_signature_enforced() {
        let topo = topo_from(
            r#"
name: badiface
topology:
  nodes:
    srl1: {kind: srl, image: ghcr.io/nokia/srlinux}
    r1: {kind: linux, image: alpine:3}
  links:
    - endpoints: ["srl1:eth1", "r1:eth1"]
"#,
        );
        let err = verify(&topo, &MockNetOps::new()).await.unwrap_err();
        assert!(matches!(err, LabError::Validation { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_missing_bridge_detected() {
        let topo = topo_from(
            r#"
name: nobridge
topology:
  nodes:
    r1: {kind: linux, image: alpine:3}
    br0: {kind: bridge}
  links:
    - endpoints: ["r1:eth1", "br0:r1-up"]
"#,
        );
        let net = MockNetOps::new();
        verify(&topo, &net).await.unwrap();

        net.probe_miss_for("br0");
        let err = verify(&topo, &net).await.unwrap_err();
        assert!(matches!(err, LabError::BridgeMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_startup_config_detected() {
        let topo = topo_from(
            r#"
name: nofile
topology:
  nodes:
    r1:
      kind: linux
      image: alpine:3
      startup-config: does-not-exist.cfg
"#,
        );
        let err = verify(&topo, &MockNetOps::new()).await.unwrap_err();
        assert!(matches!(err, LabError::MissingFile { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_mgmt_ip_detected() {
        let topo = topo_from(
            r#"
name: dupip
topology:
  nodes:
    r1: {kind: linux, image: alpine:3, mgmt-ipv4: 172.20.20.11}
    r2: {kind: linux, image: alpine:3, mgmt-ipv4: 172.20.20.11}
"#,
        );
        let err = verify(&topo, &MockNetOps::new()).await.unwrap_err();
        assert!(err.to_string().contains("172.20.20.11"), "{err}");
    }
}
