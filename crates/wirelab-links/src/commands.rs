//! Shell command builders for link wiring.
//!
//! Pure string builders with no side effects. The wiring engine executes
//! them through [`NetOps`](crate::NetOps); unit tests assert on the built
//! strings directly.

use wirelab_common::shell;

/// Default UDP destination port for vxlan tunnels.
///
/// Deliberately off the IANA port so lab tunnels do not collide with a
/// host-level vxlan deployment.
pub const DEFAULT_VXLAN_PORT: u16 = 14789;

/// Builds the command creating a veth pair under two root-namespace names.
pub fn build_create_veth_cmd(a: &str, b: &str, mtu: u32) -> String {
    format!(
        "{} link add dev {} mtu {} type veth peer name {} mtu {}",
        shell::IP_CMD,
        shell::shellquote(a),
        mtu,
        shell::shellquote(b),
        mtu
    )
}

/// Builds the command disabling transmit checksum offload on an interface.
///
/// Many virtualized network OS images mishandle offloaded checksums, so
/// this runs on both ends of every veth pair right after creation.
pub fn build_tx_offload_off_cmd(iface: &str) -> String {
    format!("{} -K {} tx off", shell::ETHTOOL_CMD, shell::shellquote(iface))
}

/// Builds the command moving an interface into a named network namespace.
pub fn build_move_to_netns_cmd(iface: &str, netns: &str) -> String {
    format!(
        "{} link set dev {} netns {}",
        shell::IP_CMD,
        shell::shellquote(iface),
        shell::shellquote(netns)
    )
}

/// Builds the in-namespace command chain renaming the staging interface,
/// setting its MAC and bringing it up. The whole chain runs through the
/// shell layer's `/bin/sh -c`, so no extra wrapper is needed.
pub fn build_finalize_in_netns_cmd(netns: &str, staging: &str, iface: &str, mac: &str) -> String {
    let netns = shell::shellquote(netns);
    let staging = shell::shellquote(staging);
    let iface = shell::shellquote(iface);
    let mac = shell::shellquote(mac);
    format!(
        "{ip} netns exec {netns} {ip} link set {staging} name {iface} && \
         {ip} netns exec {netns} {ip} link set {iface} address {mac} && \
         {ip} netns exec {netns} {ip} link set {iface} up",
        ip = shell::IP_CMD,
        netns = netns,
        staging = staging,
        iface = iface,
        mac = mac
    )
}

/// Builds the in-namespace command bringing an interface up.
///
/// Used for single-ended interfaces that enter the namespace already
/// carrying their final name.
pub fn build_set_up_in_netns_cmd(netns: &str, iface: &str) -> String {
    format!(
        "{} netns exec {} {} link set {} up",
        shell::IP_CMD,
        shell::shellquote(netns),
        shell::IP_CMD,
        shell::shellquote(iface)
    )
}

/// Builds the command renaming an interface in the root namespace.
pub fn build_rename_cmd(from: &str, to: &str) -> String {
    format!(
        "{} link set dev {} name {}",
        shell::IP_CMD,
        shell::shellquote(from),
        shell::shellquote(to)
    )
}

/// Builds the command mastering an interface to a Linux bridge.
pub fn build_attach_bridge_cmd(iface: &str, bridge: &str) -> String {
    format!(
        "{} link set dev {} master {}",
        shell::IP_CMD,
        shell::shellquote(iface),
        shell::shellquote(bridge)
    )
}

/// Builds the command attaching an interface to an OVS bridge.
pub fn build_attach_ovs_cmd(iface: &str, bridge: &str) -> String {
    format!(
        "{} add-port {} {}",
        shell::OVS_VSCTL_CMD,
        shell::shellquote(bridge),
        shell::shellquote(iface)
    )
}

/// Builds the command bringing an interface up in the root namespace.
pub fn build_set_up_cmd(iface: &str) -> String {
    format!("{} link set dev {} up", shell::IP_CMD, shell::shellquote(iface))
}

/// Builds the command setting an interface MAC in the root namespace.
pub fn build_set_mac_cmd(iface: &str, mac: &str) -> String {
    format!(
        "{} link set dev {} address {}",
        shell::IP_CMD,
        shell::shellquote(iface),
        mac
    )
}

/// Builds the command deleting a root-namespace interface.
///
/// Used for mid-wiring rollback; deleting either end of a veth pair
/// removes both.
pub fn build_delete_link_cmd(iface: &str) -> String {
    format!("{} link del dev {}", shell::IP_CMD, shell::shellquote(iface))
}

/// Builds the probe checking that a root-namespace interface exists.
pub fn build_check_iface_cmd(iface: &str) -> String {
    format!(
        "{} link show dev {} 2>/dev/null",
        shell::IP_CMD,
        shell::shellquote(iface)
    )
}

/// Builds the probe checking that an OVS bridge exists.
pub fn build_check_ovs_bridge_cmd(bridge: &str) -> String {
    format!("{} br-exists {}", shell::OVS_VSCTL_CMD, shell::shellquote(bridge))
}

/// Builds the command creating a macvlan interface on a parent interface.
pub fn build_create_macvlan_cmd(iface: &str, parent: &str, mtu: u32) -> String {
    format!(
        "{} link add link {} name {} mtu {} type macvlan mode bridge",
        shell::IP_CMD,
        shell::shellquote(parent),
        shell::shellquote(iface),
        mtu
    )
}

/// Builds the command creating a vxlan tunnel interface.
pub fn build_create_vxlan_cmd(
    iface: &str,
    remote: &str,
    vni: u32,
    udp_port: u16,
    parent: Option<&str>,
    mtu: u32,
) -> String {
    let dev = match parent {
        Some(p) => format!(" dev {}", shell::shellquote(p)),
        None => String::new(),
    };
    format!(
        "{} link add name {} mtu {} type vxlan id {} remote {}{} dstport {}",
        shell::IP_CMD,
        shell::shellquote(iface),
        mtu,
        vni,
        shell::shellquote(remote),
        dev,
        udp_port
    )
}
