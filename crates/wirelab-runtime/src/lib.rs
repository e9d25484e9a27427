//! Container runtime boundary.
//!
//! The core never talks to a concrete container backend directly; node
//! lifecycle stages call through [`ContainerRuntime`] and treat any error
//! as a stage failure. [`DockerRuntime`] adapts a local docker daemon via
//! its CLI client; [`MockRuntime`] provides an in-memory backend for
//! tests.

mod docker;
mod mock;
mod runtime;

pub use docker::DockerRuntime;
pub use mock::{MockRuntime, RuntimeCall};
pub use runtime::{ContainerRuntime, ExecOutput};
