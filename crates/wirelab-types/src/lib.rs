//! Common types for wirelab.
//!
//! This crate provides the value types shared by the resolver, scheduler
//! and wiring engine:
//!
//! - [`MacAddress`]: 48-bit MAC with OUI-prefixed random generation
//! - [`ifname`]: interface-name validation and staging-name generation
//! - [`Stage`] / [`WaitFor`] / [`Stages`]: the node deployment stage model
//! - [`NodeConfig`]: per-node configuration and runtime-assigned fields
//! - [`NodeState`]: node lifecycle states

mod error;
pub mod ifname;
mod mac;
mod node_cfg;
mod stages;
mod state;

pub use error::ParseError;
pub use mac::MacAddress;
pub use node_cfg::{NodeConfig, HOST_NS_PATH};
pub use stages::{Stage, StageCfg, Stages, WaitFor};
pub use state::NodeState;

/// The OUI reserved for wirelab-generated MAC addresses.
pub const WIRELAB_OUI: [u8; 3] = [0xaa, 0xc1, 0xab];

/// Default MTU assigned to veth links unless the topology overrides it.
pub const DEFAULT_LINK_MTU: u32 = 9500;
