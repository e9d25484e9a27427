//! Topology resolution, validation and deployment.
//!
//! The pipeline is: load a [`TopologyFile`] from YAML, [`resolve`] it
//! against a kind registry into a [`Topology`] object graph, run the
//! pre-deployment [`verify`] pass, then drive the nodes through their
//! stages with a [`Deployer`].

mod config;
mod deploy;
mod resolver;
mod validate;

pub use config::{LinkDef, NodeDef, TopologyFile};
pub use deploy::{DeployOptions, DeploySummary, Deployer, NodeReport};
pub use resolver::{resolve, Topology, DEFAULT_PREFIX};
pub use validate::verify;
