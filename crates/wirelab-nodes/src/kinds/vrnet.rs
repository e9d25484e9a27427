//! VM-backed network OS kind.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use wirelab_common::{LabError, LabResult};
use wirelab_runtime::ContainerRuntime;
use wirelab_types::NodeConfig;

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, Node};

static VRNET_IFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^eth[1-9]\d*$").expect("invalid vrnet iface pattern"));

/// A VM-in-container network OS node.
///
/// The backing hypervisor cannot safely launch multiple instances in
/// parallel, so these nodes are created on the scheduler's serial path.
/// Data interfaces must be `ethN` with N >= 1 (`eth0` remains the
/// management interface).
#[derive(Debug)]
pub struct VrnetNode {
    base: DefaultNode,
}

impl VrnetNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for VrnetNode {
    delegate_node_base!();

    fn requires_serial_deploy(&self) -> bool {
        true
    }

    fn virt_required(&self) -> bool {
        true
    }

    async fn check_deployment_conditions(&self) -> LabResult<()> {
        if !host_has_virt() {
            return Err(LabError::validation(format!(
                "node '{}' needs hardware virtualization (vmx/svm) which the host CPU does not expose",
                self.config().short_name
            )));
        }
        Ok(())
    }

    async fn deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.deploy(runtime).await
    }

    async fn delete(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.delete(runtime).await
    }

    fn check_interface_name(&self, ifaces: &[String]) -> LabResult<()> {
        for iface in ifaces {
            if !VRNET_IFACE_RE.is_match(iface) {
                return Err(LabError::validation(format!(
                    "vrnet endpoint '{}' on node '{}' must be named ethN with N >= 1",
                    iface,
                    self.config().short_name
                )));
            }
        }
        Ok(())
    }

    fn verify_startup_config(&self, topo_dir: &std::path::Path) -> LabResult<()> {
        let cfg = self.config();
        // a license is mandatory for VM-backed images
        match &cfg.license {
            None => Err(LabError::MissingFile {
                node: cfg.short_name,
                role: "license".to_string(),
                path: "<unset>".to_string(),
            }),
            Some(path) => {
                let resolved = crate::node::resolve_path(path, topo_dir);
                if !resolved.exists() {
                    return Err(LabError::MissingFile {
                        node: cfg.short_name,
                        role: "license".to_string(),
                        path: resolved.display().to_string(),
                    });
                }
                // fall back to the common startup-config existence check
                self.base_verify(topo_dir)
            }
        }
    }
}

impl VrnetNode {
    fn base_verify(&self, topo_dir: &std::path::Path) -> LabResult<()> {
        let cfg = self.config();
        if let Some(path) = &cfg.startup_config {
            let resolved = crate::node::resolve_path(path, topo_dir);
            if !resolved.exists() {
                return Err(LabError::MissingFile {
                    node: cfg.short_name,
                    role: "startup-config".to_string(),
                    path: resolved.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn host_has_virt() -> bool {
    std::fs::read_to_string("/proc/cpuinfo")
        .map(|info| info.contains("vmx") || info.contains("svm"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn node_with_license(license: Option<String>) -> VrnetNode {
        VrnetNode::new(NodeConfig {
            short_name: "vr1".to_string(),
            kind: "vrnet".to_string(),
            license,
            ..Default::default()
        })
    }

    #[test]
    fn test_serial_and_virt_flags() {
        let n = node_with_license(None);
        assert!(n.requires_serial_deploy());
        assert!(n.virt_required());
    }

    #[test]
    fn test_iface_names() {
        let n = node_with_license(None);
        n.check_interface_name(&["eth1".to_string(), "eth12".to_string()])
            .unwrap();
        assert!(n.check_interface_name(&["eth0".to_string()]).is_err());
        assert!(n.check_interface_name(&["e1-1".to_string()]).is_err());
    }

    #[test]
    fn test_license_required() {
        let dir = tempfile::tempdir().unwrap();

        let err = node_with_license(None)
            .verify_startup_config(dir.path())
            .unwrap_err();
        assert!(matches!(err, LabError::MissingFile { .. }));

        let lic = dir.path().join("vr1.lic");
        writeln!(std::fs::File::create(&lic).unwrap(), "licensed").unwrap();
        node_with_license(Some(lic.display().to_string()))
            .verify_startup_config(dir.path())
            .unwrap();
    }
}
