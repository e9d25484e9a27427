//! Node lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a node.
///
/// A node is `Undeployed` after resolution, moves through `Created` /
/// `Starting` / `Deployed` as the runtime brings it up, and ends in
/// `Failed` or `Deleted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    #[default]
    Undeployed,
    Created,
    Starting,
    Deployed,
    Failed,
    Deleted,
}

impl NodeState {
    /// Returns true if the node has a network namespace that links can be
    /// wired into.
    ///
    /// Wiring against an earlier state would race with container creation,
    /// so `Link::deploy` defers until both endpoint nodes pass this check.
    pub fn is_namespace_ready(&self) -> bool {
        matches!(
            self,
            NodeState::Created | NodeState::Starting | NodeState::Deployed
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Undeployed => "undeployed",
            NodeState::Created => "created",
            NodeState::Starting => "starting",
            NodeState::Deployed => "deployed",
            NodeState::Failed => "failed",
            NodeState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_ready() {
        assert!(!NodeState::Undeployed.is_namespace_ready());
        assert!(NodeState::Created.is_namespace_ready());
        assert!(NodeState::Deployed.is_namespace_ready());
        assert!(!NodeState::Failed.is_namespace_ready());
        assert!(!NodeState::Deleted.is_namespace_ready());
    }
}
