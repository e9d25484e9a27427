//! Scheduling primitives for dependency-ordered node deployment.
//!
//! - [`StageSignals`]: per-(node, stage) broadcast completion signals that
//!   any number of waiters can observe
//! - [`check_waitfor_graph`]: static cycle detection over the node x stage
//!   graph, run before any side effect
//! - [`run_pool`]: a bounded worker pool draining a closed queue

mod graph;
mod pool;
mod signal;

pub use graph::check_waitfor_graph;
pub use pool::run_pool;
pub use signal::{StageOutcome, StageSignals};
