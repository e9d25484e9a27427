//! Broadcast readiness signals for node stages.

use std::collections::HashMap;
use tokio::sync::watch;

use wirelab_common::{LabError, LabResult};
use wirelab_types::Stage;

/// The observable outcome of one node stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage has not completed yet.
    Pending,
    /// The stage completed successfully.
    Done,
    /// The node failed in or before this stage; it will never complete.
    Failed,
}

/// One watch channel per (node, stage) pair.
///
/// Completion is broadcast: every waiter blocked on a pair wakes when the
/// owning node marks it done or failed, with no polling. The full channel
/// map is allocated up front for the whole topology so `wait` never races
/// with channel creation.
#[derive(Debug)]
pub struct StageSignals {
    channels: HashMap<(String, Stage), watch::Sender<StageOutcome>>,
}

impl StageSignals {
    /// Allocates signals for every stage of every named node.
    pub fn new<I, S>(node_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut channels = HashMap::new();
        for name in node_names {
            let name = name.into();
            for stage in Stage::ALL {
                let (tx, _rx) = watch::channel(StageOutcome::Pending);
                channels.insert((name.clone(), stage), tx);
            }
        }
        Self { channels }
    }

    fn sender(&self, node: &str, stage: Stage) -> LabResult<&watch::Sender<StageOutcome>> {
        self.channels
            .get(&(node.to_string(), stage))
            .ok_or_else(|| {
                LabError::internal(format!("no stage signal for {node}@{stage}"))
            })
    }

    /// Marks a stage as completed, waking all waiters.
    pub fn complete(&self, node: &str, stage: Stage) -> LabResult<()> {
        self.sender(node, stage)?.send_replace(StageOutcome::Done);
        tracing::debug!(node, stage = %stage, "stage completed");
        Ok(())
    }

    /// Marks a stage and every later stage of the node as failed.
    ///
    /// Later stages are included so that waiters on any of them observe
    /// the failure instead of blocking forever.
    pub fn fail_from(&self, node: &str, stage: Stage) -> LabResult<()> {
        for s in Stage::ALL.iter().filter(|s| **s >= stage) {
            let tx = self.sender(node, *s)?;
            // do not clobber a stage that already completed
            tx.send_if_modified(|cur| {
                if *cur == StageOutcome::Pending {
                    *cur = StageOutcome::Failed;
                    true
                } else {
                    false
                }
            });
        }
        tracing::debug!(node, stage = %stage, "stage failed");
        Ok(())
    }

    /// Returns the current outcome without blocking.
    pub fn outcome(&self, node: &str, stage: Stage) -> LabResult<StageOutcome> {
        Ok(*self.sender(node, stage)?.borrow())
    }

    /// Waits until the (node, stage) pair is no longer pending and returns
    /// the final outcome.
    pub async fn wait(&self, node: &str, stage: Stage) -> LabResult<StageOutcome> {
        let mut rx = self.sender(node, stage)?.subscribe();
        let outcome = rx
            .wait_for(|o| *o != StageOutcome::Pending)
            .await
            .map_err(|_| LabError::internal(format!("stage signal for {node}@{stage} dropped")))?;
        Ok(*outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_complete_wakes_all_waiters() {
        let signals = Arc::new(StageSignals::new(["a", "b"]));

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let s = Arc::clone(&signals);
            waiters.push(tokio::spawn(async move {
                s.wait("a", Stage::Create).await.unwrap()
            }));
        }

        // give the waiters a chance to block
        tokio::time::sleep(Duration::from_millis(10)).await;
        signals.complete("a", Stage::Create).unwrap();

        for w in waiters {
            assert_eq!(w.await.unwrap(), StageOutcome::Done);
        }
    }

    #[tokio::test]
    async fn test_wait_after_completion_returns_immediately() {
        let signals = StageSignals::new(["a"]);
        signals.complete("a", Stage::Healthy).unwrap();
        assert_eq!(
            signals.wait("a", Stage::Healthy).await.unwrap(),
            StageOutcome::Done
        );
    }

    #[tokio::test]
    async fn test_fail_from_marks_later_stages() {
        let signals = StageSignals::new(["a"]);
        signals.complete("a", Stage::Create).unwrap();
        signals.fail_from("a", Stage::Configure).unwrap();

        assert_eq!(
            signals.outcome("a", Stage::Create).unwrap(),
            StageOutcome::Done
        );
        assert_eq!(
            signals.outcome("a", Stage::CreateLinks).unwrap(),
            StageOutcome::Pending
        );
        assert_eq!(
            signals.outcome("a", Stage::Configure).unwrap(),
            StageOutcome::Failed
        );
        assert_eq!(
            signals.outcome("a", Stage::Exit).unwrap(),
            StageOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_unknown_pair_is_internal_error() {
        let signals = StageSignals::new(["a"]);
        assert!(signals.outcome("ghost", Stage::Create).is_err());
    }
}
