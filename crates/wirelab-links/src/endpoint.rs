//! Link endpoints.

use std::fmt;
use std::path::Path;

use wirelab_common::{LabError, LabResult};
use wirelab_nodes::{EndpointKind, NodeRef};
use wirelab_types::ifname::gen_staging_name;
use wirelab_types::{MacAddress, WIRELAB_OUI};

/// One end of a link.
///
/// Created during topology resolution and immutable afterwards. The
/// staging name is the random root-namespace name the interface carries
/// between creation and its move/rename; it is consumed exactly once
/// during wiring.
pub struct Endpoint {
    node: NodeRef,
    node_name: String,
    iface: String,
    mac: MacAddress,
    staging_name: String,
}

impl Endpoint {
    /// Creates an endpoint on `node` with a freshly generated MAC and
    /// staging name.
    pub fn new(node: NodeRef, iface: impl Into<String>) -> Self {
        Self::with_mac(node, iface, MacAddress::random_with_oui(WIRELAB_OUI))
    }

    /// Creates an endpoint with an explicit MAC (topology override).
    pub fn with_mac(node: NodeRef, iface: impl Into<String>, mac: MacAddress) -> Self {
        let node_name = node.config().short_name;
        Self {
            node,
            node_name,
            iface: iface.into(),
            mac,
            staging_name: gen_staging_name(),
        }
    }

    /// The node this endpoint terminates on.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The short name of the endpoint's node.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// The logical interface name inside the target namespace.
    pub fn iface(&self) -> &str {
        &self.iface
    }

    /// The pre-generated MAC address.
    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// The random root-namespace staging name.
    pub fn staging_name(&self) -> &str {
        &self.staging_name
    }

    /// How this endpoint is wired, as declared by its node kind.
    pub fn kind(&self) -> EndpointKind {
        self.node.endpoint_kind()
    }

    /// The name the interface is created under in the root namespace.
    ///
    /// Host endpoints never leave the root namespace so they skip the
    /// staging rename and are created under their final name directly.
    pub fn root_ns_name(&self) -> &str {
        match self.kind() {
            EndpointKind::Host => &self.iface,
            _ => &self.staging_name,
        }
    }

    /// The network namespace name the node's interfaces live in.
    ///
    /// Derived from the namespace path the runtime reported; the path is
    /// expected to sit under `/run/netns/`.
    pub(crate) fn netns_name(&self) -> LabResult<String> {
        let cfg = self.node.config();
        if cfg.is_host_namespaced() {
            return Err(LabError::wiring(
                format!("{}:{}", self.node_name, self.iface),
                format!(
                    "node '{}' lives in the root namespace, there is no netns to enter",
                    self.node_name
                ),
            ));
        }
        if cfg.ns_path.is_empty() {
            return Err(LabError::wiring(
                format!("{}:{}", self.node_name, self.iface),
                format!("node '{}' has no namespace path", self.node_name),
            ));
        }
        let name = Path::new(&cfg.ns_path)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LabError::wiring(
                    format!("{}:{}", self.node_name, self.iface),
                    format!("malformed namespace path '{}'", cfg.ns_path),
                )
            })?;
        Ok(name.to_string())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("node", &self.node_name)
            .field("iface", &self.iface)
            .field("mac", &self.mac.to_string())
            .field("staging_name", &self.staging_name)
            .finish()
    }
}

// "<node>:<iface>", the form used in topology files and error messages
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_name, self.iface)
    }
}
