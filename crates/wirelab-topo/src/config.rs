//! The declarative topology document.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use wirelab_common::{LabError, LabResult};
use wirelab_types::Stages;

/// The top-level topology file.
///
/// ```yaml
/// name: frr01
/// topology:
///   nodes:
///     r1:
///       kind: linux
///       image: quay.io/frrouting/frr:9.1.0
///     r2:
///       kind: linux
///       image: quay.io/frrouting/frr:9.1.0
///   links:
///     - endpoints: ["r1:eth1", "r2:eth1"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TopologyFile {
    /// Lab name, used in container names and the lab FQDN domain.
    pub name: String,
    /// Container name prefix. Unset means the default prefix; an empty
    /// string means containers are named after the node alone.
    #[serde(default)]
    pub prefix: Option<String>,
    /// The node and link declarations.
    #[serde(default)]
    pub topology: TopologySection,
}

/// The `topology:` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologySection {
    #[serde(default)]
    pub nodes: HashMap<String, NodeDef>,
    #[serde(default)]
    pub links: Vec<LinkDef>,
}

/// A declared node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeDef {
    /// Device family, resolved against the kind registry.
    pub kind: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub startup_config: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub binds: Vec<String>,
    /// CPU limit in cores; 0 means unlimited.
    #[serde(default)]
    pub cpu: f64,
    /// Memory limit, e.g. `2Gb`.
    #[serde(default)]
    pub memory: String,
    /// Requested management IPv4 address.
    #[serde(default)]
    pub mgmt_ipv4: Option<String>,
    /// Requested management IPv6 address.
    #[serde(default)]
    pub mgmt_ipv6: Option<String>,
    /// Per-stage wait-for dependencies.
    #[serde(default)]
    pub stages: Stages,
}

/// A declared link.
///
/// The common veth form lists two `node:iface` endpoint strings. The
/// single-ended forms (`type: macvlan`, `type: vxlan`) bind one endpoint
/// to a parent interface or a remote tunnel address instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkDef {
    /// `veth` (default when omitted), `macvlan` or `vxlan`.
    #[serde(rename = "type", default)]
    pub link_type: Option<String>,
    /// Endpoint pair for veth links, as `node:iface` strings.
    #[serde(default)]
    pub endpoints: Vec<String>,
    /// The single endpoint of macvlan/vxlan links.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Parent interface for macvlan links, optional underlay device for
    /// vxlan links.
    #[serde(default)]
    pub parent: Option<String>,
    /// Remote tunnel endpoint address for vxlan links.
    #[serde(default)]
    pub remote: Option<String>,
    /// VXLAN network identifier.
    #[serde(default)]
    pub vni: Option<u32>,
    /// UDP destination port for vxlan links.
    #[serde(default)]
    pub udp_port: Option<u16>,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl TopologyFile {
    /// Parses a topology document from YAML.
    pub fn from_yaml(yaml: &str) -> LabResult<Self> {
        let file: TopologyFile = serde_yaml::from_str(yaml)
            .map_err(|e| LabError::validation(format!("failed to parse topology file: {e}")))?;
        if file.name.is_empty() {
            return Err(LabError::validation("topology file has no lab name"));
        }
        Ok(file)
    }

    /// Loads a topology document from a file.
    pub fn load(path: &Path) -> LabResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            LabError::validation(format!(
                "failed to read topology file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wirelab_types::Stage;

    #[test]
    fn test_parse_minimal() {
        let file = TopologyFile::from_yaml(
            r#"
name: twonode
topology:
  nodes:
    r1:
      kind: linux
      image: alpine:3
    r2:
      kind: linux
      image: alpine:3
  links:
    - endpoints: ["r1:eth1", "r2:eth1"]
"#,
        )
        .unwrap();

        assert_eq!(file.name, "twonode");
        assert_eq!(file.topology.nodes.len(), 2);
        assert_eq!(file.topology.nodes["r1"].kind, "linux");
        assert_eq!(
            file.topology.links[0].endpoints,
            vec!["r1:eth1".to_string(), "r2:eth1".to_string()]
        );
        assert!(file.prefix.is_none());
    }

    #[test]
    fn test_parse_stages_and_attrs() {
        let file = TopologyFile::from_yaml(
            r#"
name: staged
prefix: ""
topology:
  nodes:
    leaf:
      kind: srl
      image: ghcr.io/nokia/srlinux
      startup-config: leaf.cfg
      mgmt-ipv4: 172.20.20.11
      stages:
        create:
          wait-for:
            - node: spine
              stage: healthy
    spine:
      kind: srl
      image: ghcr.io/nokia/srlinux
  links:
    - endpoints: ["leaf:e1-1", "spine:e1-1"]
      mtu: 1500
"#,
        )
        .unwrap();

        assert_eq!(file.prefix.as_deref(), Some(""));
        let leaf = &file.topology.nodes["leaf"];
        assert_eq!(leaf.startup_config.as_deref(), Some("leaf.cfg"));
        assert_eq!(leaf.mgmt_ipv4.as_deref(), Some("172.20.20.11"));
        let wf = &leaf.stages.wait_for(Stage::Create)[0];
        assert_eq!(wf.node, "spine");
        assert_eq!(wf.stage, Stage::Healthy);
        assert_eq!(file.topology.links[0].mtu, Some(1500));
    }

    #[test]
    fn test_parse_single_ended_links() {
        let file = TopologyFile::from_yaml(
            r#"
name: tunnels
topology:
  nodes:
    r1:
      kind: linux
      image: alpine:3
  links:
    - type: macvlan
      endpoint: "r1:net0"
      parent: enp0s3
    - type: vxlan
      endpoint: "r1:vx0"
      remote: 192.0.2.10
      vni: 100
"#,
        )
        .unwrap();

        assert_eq!(file.topology.links[0].link_type.as_deref(), Some("macvlan"));
        assert_eq!(file.topology.links[0].parent.as_deref(), Some("enp0s3"));
        assert_eq!(file.topology.links[1].vni, Some(100));
    }

    #[test]
    fn test_missing_name_rejected() {
        let err = TopologyFile::from_yaml("name: \"\"\ntopology: {}\n").unwrap_err();
        assert!(matches!(err, LabError::Validation { .. }));
    }
}
