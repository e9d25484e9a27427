//! Topology resolution.
//!
//! Turns the raw declarative document into a fully linked object graph:
//! nodes constructed through the kind registry, endpoints resolved to
//! live nodes, and every node back-linked to the links that touch it.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::{LinkDef, TopologyFile};
use wirelab_common::{LabError, LabResult};
use wirelab_links::{commands, Endpoint, Link, LinkRef};
use wirelab_nodes::{EndpointKind, NodeRef, NodeRegistry};
use wirelab_types::{ifname, NodeConfig, Stages};

/// Default container name prefix: `wl-<lab>-<node>`.
pub const DEFAULT_PREFIX: &str = "wl";

/// Pseudo-node representing the root network namespace.
const HOST_NODE: &str = "host";
/// Pseudo-node representing the management bridge.
const MGMT_NODE: &str = "mgmt-net";

/// A resolved topology.
#[derive(Debug)]
pub struct Topology {
    name: String,
    nodes: HashMap<String, NodeRef>,
    links: Vec<LinkRef>,
    node_links: HashMap<String, Vec<LinkRef>>,
    topo_dir: PathBuf,
}

impl Topology {
    /// The lab name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All nodes by short name.
    pub fn nodes(&self) -> &HashMap<String, NodeRef> {
        &self.nodes
    }

    /// Looks up a node by short name.
    pub fn node(&self, name: &str) -> Option<&NodeRef> {
        self.nodes.get(name)
    }

    /// All resolved links.
    pub fn links(&self) -> &[LinkRef] {
        &self.links
    }

    /// The links touching a node, for per-node fan-out during wiring.
    pub fn links_for(&self, node: &str) -> Vec<LinkRef> {
        self.node_links.get(node).cloned().unwrap_or_default()
    }

    /// The directory the topology file was loaded from; relative
    /// startup-config and license paths resolve against it.
    pub fn topo_dir(&self) -> &Path {
        &self.topo_dir
    }

    /// The per-node stage configuration, as the scheduler consumes it.
    pub fn stages_map(&self) -> HashMap<String, Stages> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.config().stages))
            .collect()
    }
}

struct ParsedEndpoint {
    node: String,
    iface: String,
}

/// Resolves a topology document against a kind registry.
///
/// Structural validation happens here, before any object is handed to
/// the deployer: endpoint syntax, interface-name length, the `eth0`
/// reservation, duplicate endpoints (all reported at once), root-namespace
/// name uniqueness, and unknown kinds.
pub fn resolve(
    file: &TopologyFile,
    registry: &NodeRegistry,
    topo_dir: &Path,
) -> LabResult<Topology> {
    let lab = &file.name;

    // parse and validate every endpoint string up front
    let mut all_endpoints: Vec<ParsedEndpoint> = Vec::new();
    for def in &file.topology.links {
        for spec in endpoint_specs(def)? {
            all_endpoints.push(parse_endpoint(&spec)?);
        }
    }
    check_duplicate_endpoints(&all_endpoints)?;

    // count endpoints per node before constructing configs
    let mut iface_counts: HashMap<&str, usize> = HashMap::new();
    for ep in &all_endpoints {
        *iface_counts.entry(ep.node.as_str()).or_default() += 1;
    }

    let mut nodes: HashMap<String, NodeRef> = HashMap::new();
    for (name, def) in &file.topology.nodes {
        let mut cfg = node_config(
            name,
            &def.kind,
            lab,
            file.prefix.as_deref(),
            iface_counts.get(name.as_str()).copied().unwrap_or(0),
            Some(def),
        );
        // kinds with factory credentials export them so bootstrap scripts
        // inside the container can log in; explicit env entries win
        if let Some((user, password)) = registry.credentials_for(&def.kind) {
            cfg.env
                .entry("WIRELAB_USERNAME".to_string())
                .or_insert_with(|| user.to_string());
            cfg.env
                .entry("WIRELAB_PASSWORD".to_string())
                .or_insert_with(|| password.to_string());
        }
        nodes.insert(name.clone(), registry.new_node(cfg)?);
    }

    // the host and mgmt-net pseudo-nodes are synthesized on demand
    for ep in &all_endpoints {
        if nodes.contains_key(&ep.node) {
            continue;
        }
        let kind = match ep.node.as_str() {
            HOST_NODE => "host",
            MGMT_NODE => "bridge",
            other => {
                return Err(LabError::validation(format!(
                    "link endpoint references undefined node '{other}'"
                )))
            }
        };
        debug!(node = %ep.node, kind, "synthesizing pseudo-node");
        let cfg = node_config(
            &ep.node,
            kind,
            lab,
            file.prefix.as_deref(),
            iface_counts.get(ep.node.as_str()).copied().unwrap_or(0),
            None,
        );
        nodes.insert(ep.node.clone(), registry.new_node(cfg)?);
    }

    let mut links: Vec<LinkRef> = Vec::new();
    for def in &file.topology.links {
        links.push(Arc::new(build_link(def, &nodes)?));
    }

    check_root_ns_uniqueness(&links)?;

    let mut node_links: HashMap<String, Vec<LinkRef>> = HashMap::new();
    for link in &links {
        for ep in link.endpoints() {
            node_links
                .entry(ep.node_name().to_string())
                .or_default()
                .push(Arc::clone(link));
        }
    }

    debug!(lab = %lab, nodes = nodes.len(), links = links.len(), "topology resolved");
    Ok(Topology {
        name: lab.clone(),
        nodes,
        links,
        node_links,
        topo_dir: topo_dir.to_path_buf(),
    })
}

fn node_config(
    name: &str,
    kind: &str,
    lab: &str,
    prefix: Option<&str>,
    iface_count: usize,
    def: Option<&crate::NodeDef>,
) -> NodeConfig {
    let long_name = match prefix {
        Some("") => name.to_string(),
        Some(p) => format!("{p}-{lab}-{name}"),
        None => format!("{DEFAULT_PREFIX}-{lab}-{name}"),
    };

    let mut labels: BTreeMap<String, String> = BTreeMap::new();
    labels.insert("wirelab".to_string(), lab.to_string());
    labels.insert("wirelab-node-name".to_string(), name.to_string());
    labels.insert("wirelab-node-kind".to_string(), kind.to_string());

    let mut env: HashMap<String, String> = def.map(|d| d.env.clone()).unwrap_or_default();
    env.insert("WIRELAB_INTFS".to_string(), iface_count.to_string());
    for (k, v) in &labels {
        let key = format!("WIRELAB_LABEL_{}", k.to_uppercase().replace('-', "_"));
        env.insert(key, v.clone());
    }

    NodeConfig {
        short_name: name.to_string(),
        long_name,
        fqdn: format!("{name}.{lab}.io"),
        kind: kind.to_string(),
        image: def.map(|d| d.image.clone()).unwrap_or_default(),
        startup_config: def.and_then(|d| d.startup_config.clone()),
        license: def.and_then(|d| d.license.clone()),
        env,
        binds: def.map(|d| d.binds.clone()).unwrap_or_default(),
        cpu: def.map(|d| d.cpu).unwrap_or(0.0),
        memory: def.map(|d| d.memory.clone()).unwrap_or_default(),
        labels: labels.into_iter().collect(),
        stages: {
            // merging into an empty set drops duplicate wait-for entries
            // written in the topology file
            let mut stages = Stages::default();
            if let Some(d) = def {
                stages.merge(&d.stages);
            }
            stages
        },
        mgmt_ipv4: def.and_then(|d| d.mgmt_ipv4.clone()).unwrap_or_default(),
        mgmt_ipv6: def.and_then(|d| d.mgmt_ipv6.clone()).unwrap_or_default(),
        ..Default::default()
    }
}

/// Returns the endpoint strings a link definition declares, checking the
/// per-type arity.
fn endpoint_specs(def: &LinkDef) -> LabResult<Vec<String>> {
    match def.link_type.as_deref() {
        None | Some("veth") => {
            if def.endpoints.len() != 2 {
                return Err(LabError::validation(format!(
                    "veth link must declare exactly two endpoints, found {:?}",
                    def.endpoints
                )));
            }
            Ok(def.endpoints.clone())
        }
        Some("macvlan") | Some("vxlan") => match &def.endpoint {
            Some(ep) => Ok(vec![ep.clone()]),
            None => Err(LabError::validation(format!(
                "{} link must declare an endpoint",
                def.link_type.as_deref().unwrap_or_default()
            ))),
        },
        Some(other) => Err(LabError::validation(format!(
            "unknown link type '{other}', supported types are veth, macvlan, vxlan"
        ))),
    }
}

fn parse_endpoint(spec: &str) -> LabResult<ParsedEndpoint> {
    let (node, iface) = spec.split_once(':').ok_or_else(|| {
        LabError::validation(format!(
            "malformed endpoint '{spec}', expected '<node>:<iface>'"
        ))
    })?;
    if node.is_empty() {
        return Err(LabError::validation(format!(
            "malformed endpoint '{spec}', node name is empty"
        )));
    }
    ifname::validate(iface)
        .and_then(|_| ifname::check_not_reserved(iface))
        .map_err(|e| LabError::validation(format!("endpoint '{spec}': {e}")))?;
    Ok(ParsedEndpoint {
        node: node.to_string(),
        iface: iface.to_string(),
    })
}

/// Rejects topologies where the same `node:iface` string appears twice,
/// reporting every duplicate at once.
fn check_duplicate_endpoints(endpoints: &[ParsedEndpoint]) -> LabResult<()> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for ep in endpoints {
        *seen.entry(format!("{}:{}", ep.node, ep.iface)).or_default() += 1;
    }
    let dups: Vec<String> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    if dups.is_empty() {
        Ok(())
    } else {
        Err(LabError::DuplicateEndpoints { endpoints: dups })
    }
}

/// Interfaces attached to bridge, ovs-bridge and host nodes all live in
/// the root namespace under their final names, so those names must be
/// unique across the whole topology.
fn check_root_ns_uniqueness(links: &[LinkRef]) -> LabResult<()> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for link in links {
        for ep in link.endpoints() {
            if ep.kind() == EndpointKind::Namespace {
                continue;
            }
            if let Some(existing) = seen.insert(ep.iface().to_string(), ep.to_string()) {
                return Err(LabError::validation(format!(
                    "root namespace interface name '{}' is used by both '{}' and '{}'",
                    ep.iface(),
                    existing,
                    ep
                )));
            }
        }
    }
    Ok(())
}

fn build_link(def: &LinkDef, nodes: &HashMap<String, NodeRef>) -> LabResult<Link> {
    let resolve_ep = |spec: &str| -> LabResult<Endpoint> {
        let parsed = parse_endpoint(spec)?;
        let node = nodes.get(&parsed.node).ok_or_else(|| {
            LabError::validation(format!(
                "link endpoint references undefined node '{}'",
                parsed.node
            ))
        })?;
        Ok(Endpoint::new(Arc::clone(node), parsed.iface))
    };

    let link = match def.link_type.as_deref() {
        None | Some("veth") => Link::veth(
            resolve_ep(&def.endpoints[0])?,
            resolve_ep(&def.endpoints[1])?,
        ),
        Some("macvlan") => {
            let parent = def.parent.as_deref().ok_or_else(|| {
                LabError::validation("macvlan link must declare a parent interface")
            })?;
            let spec = def.endpoint.as_deref().unwrap_or_default();
            Link::macvlan(resolve_ep(spec)?, parent)
        }
        Some("vxlan") => {
            let remote = def
                .remote
                .as_deref()
                .ok_or_else(|| LabError::validation("vxlan link must declare a remote address"))?;
            let vni = def
                .vni
                .ok_or_else(|| LabError::validation("vxlan link must declare a vni"))?;
            let spec = def.endpoint.as_deref().unwrap_or_default();
            Link::vxlan(
                resolve_ep(spec)?,
                remote,
                vni,
                def.udp_port.unwrap_or(commands::DEFAULT_VXLAN_PORT),
                def.parent.clone(),
            )
        }
        // unreachable after endpoint_specs, kept as a hard error
        Some(other) => {
            return Err(LabError::validation(format!("unknown link type '{other}'")))
        }
    };

    let link = match def.mtu {
        Some(mtu) => link.with_mtu(mtu),
        None => link,
    };
    Ok(link.with_labels(def.labels.clone()))
}
