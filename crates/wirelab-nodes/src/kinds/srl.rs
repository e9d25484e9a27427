//! Nokia SR Linux kind.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use wirelab_common::{LabError, LabResult};
use wirelab_runtime::ContainerRuntime;
use wirelab_types::NodeConfig;

use crate::kinds::delegate_node_base;
use crate::{DefaultNode, Node};

// SR Linux data interfaces are named e1-1, e1-1-1 etc.
static SRL_IFACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^e\d+-\d+(-\d+)?$").expect("invalid srl iface pattern"));

/// SR Linux container node.
///
/// Follows the default container lifecycle but enforces the `eX-Y[-Z]`
/// interface naming convention before any of its links are wired.
#[derive(Debug)]
pub struct SrlNode {
    base: DefaultNode,
}

impl SrlNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            base: DefaultNode::new(config),
        }
    }
}

#[async_trait]
impl Node for SrlNode {
    delegate_node_base!();

    async fn deploy(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.deploy(runtime).await
    }

    async fn delete(&self, runtime: &dyn ContainerRuntime) -> LabResult<()> {
        self.base.delete(runtime).await
    }

    fn check_interface_name(&self, ifaces: &[String]) -> LabResult<()> {
        for iface in ifaces {
            if !SRL_IFACE_RE.is_match(iface) {
                return Err(LabError::validation(format!(
                    "srl endpoint '{}' on node '{}' doesn't match the required pattern, \
                     srl endpoints should be named as e1-1 or e1-1-1",
                    iface,
                    self.config().short_name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> SrlNode {
        SrlNode::new(NodeConfig {
            short_name: "srl1".to_string(),
            kind: "srl".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_iface_pattern_accepted() {
        let n = node();
        n.check_interface_name(&["e1-1".to_string(), "e1-2-3".to_string()])
            .unwrap();
    }

    #[test]
    fn test_iface_pattern_rejected() {
        let n = node();
        for bad in ["eth1", "e1", "e1-1-1-1", "1-1"] {
            let err = n.check_interface_name(&[bad.to_string()]).unwrap_err();
            assert!(matches!(err, LabError::Validation { .. }), "{bad}");
        }
    }
}
