//! Node lifecycle contract and kind registry.
//!
//! Every node in a topology is backed by an implementation of the [`Node`]
//! trait selected by its `kind` string. Concrete kinds embed
//! [`DefaultNode`] and override only the behavior that differs, following
//! a composition-over-inheritance layout. The [`NodeRegistry`] maps kind
//! names to constructors and is built once at process start; it is an
//! owned object passed to the resolver, not global state.

mod default_node;
pub mod kinds;
mod node;
mod registry;

pub use default_node::DefaultNode;
pub use node::{EndpointKind, Node, NodeRef};
pub use registry::{NodeInitializer, NodeRegistry};
