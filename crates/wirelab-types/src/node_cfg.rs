//! Per-node configuration.

use crate::Stages;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Namespace path value assigned to endpoints living in the root (host)
/// network namespace.
pub const HOST_NS_PATH: &str = "__host";

/// Configuration of a single node.
///
/// Created once during topology resolution. The runtime-assigned fields
/// (`container_id`, `ns_path`, management addresses) are filled in while
/// the node moves through its lifecycle stages and are never mutated after
/// deployment completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name as written in the topology file.
    pub short_name: String,
    /// Container name, by default `<prefix>-<lab>-<short_name>`.
    pub long_name: String,
    /// `<short_name>.<lab>.io`.
    pub fqdn: String,
    /// Device/implementation family, resolved against the kind registry.
    pub kind: String,

    /// Container image reference.
    #[serde(default)]
    pub image: String,
    /// Path to a startup configuration file, if any.
    #[serde(default)]
    pub startup_config: Option<String>,
    /// Path to a license file, if any.
    #[serde(default)]
    pub license: Option<String>,

    /// Environment variables passed to the container.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Bind mounts in `/host:/container(:opts)` form.
    #[serde(default)]
    pub binds: Vec<String>,
    /// CPU limit in cores; 0 means unlimited.
    #[serde(default)]
    pub cpu: f64,
    /// Memory limit, e.g. `2Gb`; empty means unlimited.
    #[serde(default)]
    pub memory: String,
    /// Labels attached to the container.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Stage configuration including wait-for dependencies.
    #[serde(default)]
    pub stages: Stages,

    // Runtime-assigned fields.
    /// Container id reported by the runtime after creation.
    #[serde(default)]
    pub container_id: String,
    /// Network namespace path reported by the runtime after start, or
    /// [`HOST_NS_PATH`] for host/bridge pseudo-nodes.
    #[serde(default)]
    pub ns_path: String,
    /// Management IPv4 address assigned by the runtime.
    #[serde(default)]
    pub mgmt_ipv4: String,
    /// Management IPv6 address assigned by the runtime.
    #[serde(default)]
    pub mgmt_ipv6: String,
}

impl NodeConfig {
    /// Returns true if this node's endpoints live in the root namespace.
    pub fn is_host_namespaced(&self) -> bool {
        self.ns_path == HOST_NS_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_namespaced() {
        let mut cfg = NodeConfig {
            short_name: "host".to_string(),
            kind: "host".to_string(),
            ns_path: HOST_NS_PATH.to_string(),
            ..Default::default()
        };
        assert!(cfg.is_host_namespaced());

        cfg.ns_path = "/run/netns/wl-lab-r1".to_string();
        assert!(!cfg.is_host_namespaced());
    }
}
