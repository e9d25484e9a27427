//! Node deployment stages and wait-for dependencies.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The ordered deployment stages every node passes through.
///
/// Within one node the stages always execute in declaration order; the
/// derived `Ord` reflects that order and is relied upon by the scheduler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Container created (not necessarily running).
    Create,
    /// Links touching the node are wired.
    CreateLinks,
    /// Node-specific configuration applied.
    Configure,
    /// Node reported healthy.
    Healthy,
    /// Deployment of the node finished.
    Exit,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Create,
        Stage::CreateLinks,
        Stage::Configure,
        Stage::Healthy,
        Stage::Exit,
    ];

    /// Returns the stage name as used in the topology file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Create => "create",
            Stage::CreateLinks => "create-links",
            Stage::Configure => "configure",
            Stage::Healthy => "healthy",
            Stage::Exit => "exit",
        }
    }

    /// Returns the stage preceding this one, if any.
    pub fn prev(&self) -> Option<Stage> {
        let idx = Stage::ALL.iter().position(|s| s == self)?;
        idx.checked_sub(1).map(|i| Stage::ALL[i])
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Stage::Create),
            "create-links" => Ok(Stage::CreateLinks),
            "configure" => Ok(Stage::Configure),
            "healthy" => Ok(Stage::Healthy),
            "exit" => Ok(Stage::Exit),
            other => Err(ParseError::UnknownStage(other.to_string())),
        }
    }
}

/// A declared ordering dependency: the owning node's stage entry is gated
/// on `node` having completed `stage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitFor {
    /// The node that is to be waited for.
    pub node: String,
    /// The stage that node must have completed.
    pub stage: Stage,
}

/// Per-stage configuration of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCfg {
    /// Dependencies that must be satisfied before the stage is entered.
    #[serde(default, rename = "wait-for", skip_serializing_if = "Vec::is_empty")]
    pub wait_for: Vec<WaitFor>,
}

impl StageCfg {
    /// Appends wait-for entries from `other`, skipping duplicates.
    fn merge(&mut self, other: &StageCfg) {
        for wf in &other.wait_for {
            if !self.wait_for.contains(wf) {
                self.wait_for.push(wf.clone());
            }
        }
    }
}

/// The stage configuration of a node as given in the topology file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stages {
    #[serde(default)]
    pub create: StageCfg,
    #[serde(default, rename = "create-links")]
    pub create_links: StageCfg,
    #[serde(default)]
    pub configure: StageCfg,
    #[serde(default)]
    pub healthy: StageCfg,
    #[serde(default)]
    pub exit: StageCfg,
}

impl Stages {
    /// Returns the wait-for list declared for `stage`.
    pub fn wait_for(&self, stage: Stage) -> &[WaitFor] {
        match stage {
            Stage::Create => &self.create.wait_for,
            Stage::CreateLinks => &self.create_links.wait_for,
            Stage::Configure => &self.configure.wait_for,
            Stage::Healthy => &self.healthy.wait_for,
            Stage::Exit => &self.exit.wait_for,
        }
    }

    /// Merges `other` into `self` stage by stage.
    ///
    /// Wait-for lists are appended without duplicates so that kind- or
    /// group-level defaults can be augmented by node-level entries.
    pub fn merge(&mut self, other: &Stages) {
        self.create.merge(&other.create);
        self.create_links.merge(&other.create_links);
        self.configure.merge(&other.configure);
        self.healthy.merge(&other.healthy);
        self.exit.merge(&other.exit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_order() {
        assert!(Stage::Create < Stage::CreateLinks);
        assert!(Stage::CreateLinks < Stage::Configure);
        assert!(Stage::Healthy < Stage::Exit);
        assert_eq!(Stage::CreateLinks.prev(), Some(Stage::Create));
        assert_eq!(Stage::Create.prev(), None);
    }

    #[test]
    fn test_stage_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
        }
        assert!("bogus".parse::<Stage>().is_err());
    }

    #[test]
    fn test_merge_deduplicates() {
        let wf = WaitFor {
            node: "spine1".to_string(),
            stage: Stage::Healthy,
        };

        let mut a = Stages::default();
        a.create.wait_for.push(wf.clone());

        let mut b = Stages::default();
        b.create.wait_for.push(wf.clone());
        b.create.wait_for.push(WaitFor {
            node: "spine2".to_string(),
            stage: Stage::Create,
        });

        a.merge(&b);
        assert_eq!(a.create.wait_for.len(), 2);
        assert_eq!(a.create.wait_for[0], wf);
    }

    #[test]
    fn test_wait_for_accessor() {
        let mut stages = Stages::default();
        stages.healthy.wait_for.push(WaitFor {
            node: "leaf1".to_string(),
            stage: Stage::Configure,
        });

        assert!(stages.wait_for(Stage::Create).is_empty());
        assert_eq!(stages.wait_for(Stage::Healthy).len(), 1);
    }
}
