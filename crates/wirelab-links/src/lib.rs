//! Link model and the virtual wiring engine.
//!
//! A resolved topology yields [`Link`]s, each holding its [`Endpoint`]s
//! and a wiring strategy. Kernel-level realization goes through pure
//! shell command builders in [`commands`] executed behind the [`NetOps`]
//! trait, so tests assert on the exact commands instead of touching the
//! kernel.

pub mod commands;
mod endpoint;
mod link;
mod netops;
mod wire;

pub use endpoint::Endpoint;
pub use link::{Link, LinkKind, LinkRef};
pub use netops::{MockNetOps, NetOps, ShellNetOps};
pub use wire::DeployStatus;
