//! The stage deployer.
//!
//! Drives every node of a resolved topology through the Create,
//! CreateLinks, Configure, Healthy and Exit stages, honoring declared
//! wait-for dependencies through broadcast stage signals. Every node runs
//! on its own task so waiting on a dependency never occupies a worker
//! slot; the actual stage work is bounded by a semaphore sized to the
//! worker count. Kinds that cannot be created concurrently additionally
//! serialize their stage work through a dedicated gate.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{verify, Topology};
use wirelab_common::{LabError, LabResult};
use wirelab_links::{LinkRef, NetOps};
use wirelab_nodes::NodeRef;
use wirelab_runtime::ContainerRuntime;
use wirelab_sched::{run_pool, StageOutcome, StageSignals};
use wirelab_types::{NodeState, Stage};

/// Tunables of a deployment run.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Bound on concurrently executing stage work; defaults to the number
    /// of concurrently deployable nodes.
    pub max_workers: Option<usize>,
    /// Deadline for a single node's work within one stage.
    pub stage_timeout: Duration,
    /// How long a node waits after observing a failed dependency before
    /// failing itself.
    pub dependency_grace: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            max_workers: None,
            stage_timeout: Duration::from_secs(120),
            dependency_grace: Duration::from_secs(3),
        }
    }
}

/// Per-node outcome of a deployment run.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub name: String,
    pub kind: String,
    pub state: NodeState,
    pub mgmt_ipv4: String,
    pub error: Option<String>,
}

/// Outcome of a whole deployment run.
#[derive(Debug, Clone)]
pub struct DeploySummary {
    pub lab: String,
    pub nodes: Vec<NodeReport>,
}

impl DeploySummary {
    /// True if any node ended in the Failed state.
    pub fn has_failures(&self) -> bool {
        self.nodes.iter().any(|n| n.state == NodeState::Failed)
    }

    /// Renders a plain-text per-node table.
    pub fn render(&self) -> String {
        let mut widths = [4usize, 4, 5, 9]; // name, kind, state, mgmt ipv4
        let rows: Vec<[String; 4]> = self
            .nodes
            .iter()
            .map(|n| {
                [
                    n.name.clone(),
                    n.kind.clone(),
                    n.state.to_string(),
                    n.mgmt_ipv4.clone(),
                ]
            })
            .collect();
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.len());
            }
        }

        let mut out = format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {:<w3$}\n",
            "name",
            "kind",
            "state",
            "mgmt ipv4",
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3]
        );
        for (row, node) in rows.iter().zip(self.nodes.iter()) {
            out.push_str(&format!(
                "{:<w0$}  {:<w1$}  {:<w2$}  {:<w3$}",
                row[0],
                row[1],
                row[2],
                row[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3]
            ));
            if let Some(err) = &node.error {
                out.push_str(&format!("  {err}"));
            }
            out.push('\n');
        }
        out
    }
}

struct NodeWork {
    node: NodeRef,
    links: Vec<LinkRef>,
    serial: bool,
}

#[derive(Clone)]
struct StageCtx {
    signals: Arc<StageSignals>,
    runtime: Arc<dyn ContainerRuntime>,
    net: Arc<dyn NetOps>,
    opts: DeployOptions,
    errors: Arc<Mutex<HashMap<String, String>>>,
    /// Bounds concurrent stage work; never held while waiting on a
    /// dependency, so a full permit set cannot deadlock the rollout.
    stage_permits: Arc<Semaphore>,
    /// Serializes stage work of kinds that cannot deploy concurrently.
    serial_gate: Arc<AsyncMutex<()>>,
}

/// Deploys and destroys resolved topologies.
pub struct Deployer {
    runtime: Arc<dyn ContainerRuntime>,
    net: Arc<dyn NetOps>,
    opts: DeployOptions,
}

impl Deployer {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        net: Arc<dyn NetOps>,
        opts: DeployOptions,
    ) -> Self {
        Self { runtime, net, opts }
    }

    /// Runs the full deployment: verification, image pulls, then the
    /// staged rollout.
    ///
    /// Configuration and precondition errors abort before any side
    /// effect. Stage-execution errors are node-local; they appear in the
    /// returned summary instead of failing the call.
    pub async fn deploy(&self, topo: &Topology) -> LabResult<DeploySummary> {
        verify(topo, &*self.net).await?;
        self.pull_images(topo).await?;

        let runtime_serial = self.runtime.requires_serial_create();
        let mut work_items: Vec<NodeWork> = Vec::new();
        for (name, node) in topo.nodes() {
            work_items.push(NodeWork {
                node: Arc::clone(node),
                links: topo.links_for(name),
                serial: runtime_serial || node.requires_serial_deploy(),
            });
        }

        let concurrent = work_items.iter().filter(|w| !w.serial).count();
        let workers = self.opts.max_workers.unwrap_or(concurrent).max(1);
        info!(
            lab = %topo.name(),
            workers,
            serial = work_items.len() - concurrent,
            "starting deployment"
        );

        let signals = Arc::new(StageSignals::new(topo.nodes().keys().cloned()));
        let ctx = StageCtx {
            signals,
            runtime: Arc::clone(&self.runtime),
            net: Arc::clone(&self.net),
            opts: self.opts.clone(),
            errors: Arc::new(Mutex::new(HashMap::new())),
            stage_permits: Arc::new(Semaphore::new(workers)),
            serial_gate: Arc::new(AsyncMutex::new(())),
        };

        let mut tasks = Vec::new();
        for work in work_items {
            let ctx = ctx.clone();
            tasks.push(tokio::spawn(async move { run_node(work, ctx).await }));
        }
        for task in tasks {
            task.await
                .map_err(|e| LabError::internal(format!("node worker panicked: {e}")))?;
        }

        Ok(self.summarize(topo, &ctx))
    }

    /// Tears down every node of the topology on a worker pool.
    ///
    /// Deletion is best-effort per node; failures are collected and
    /// reported together after all nodes were attempted.
    pub async fn destroy(&self, topo: &Topology) -> LabResult<()> {
        let errors: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let nodes: Vec<NodeRef> = topo.nodes().values().map(Arc::clone).collect();
        let workers = self.opts.max_workers.unwrap_or(nodes.len()).max(1);

        let runtime = Arc::clone(&self.runtime);
        let errs = Arc::clone(&errors);
        run_pool("node-destroy", workers, nodes, move |node| {
            let runtime = Arc::clone(&runtime);
            let errs = Arc::clone(&errs);
            async move {
                let name = node.config().short_name;
                if let Err(e) = node.delete(&*runtime).await {
                    warn!(node = %name, error = %e, "node removal failed");
                    errs.lock()
                        .expect("destroy error lock poisoned")
                        .push(format!("{name}: {e}"));
                }
            }
        })
        .await;

        let errors = errors.lock().expect("destroy error lock poisoned");
        if errors.is_empty() {
            info!(lab = %topo.name(), "lab destroyed");
            Ok(())
        } else {
            Err(LabError::runtime("destroy", errors.join("; ")))
        }
    }

    async fn pull_images(&self, topo: &Topology) -> LabResult<()> {
        let images: BTreeSet<String> = topo
            .nodes()
            .values()
            .flat_map(|n| n.get_images())
            .collect();
        for image in images {
            self.runtime.pull_image_if_required(&image).await?;
        }
        Ok(())
    }

    fn summarize(&self, topo: &Topology, ctx: &StageCtx) -> DeploySummary {
        let errors = ctx.errors.lock().expect("deploy error lock poisoned");
        let mut nodes: Vec<NodeReport> = topo
            .nodes()
            .values()
            .map(|node| {
                let cfg = node.config();
                NodeReport {
                    error: errors.get(&cfg.short_name).cloned(),
                    name: cfg.short_name,
                    kind: cfg.kind,
                    state: node.state(),
                    mgmt_ipv4: cfg.mgmt_ipv4,
                }
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        DeploySummary {
            lab: topo.name().to_string(),
            nodes,
        }
    }
}

/// Drives one node through all five stages. Failures mark the node and
/// its remaining stage signals as failed; they never propagate out of the
/// task.
///
/// Dependency waits run outside the stage permit so that a waiting node
/// never blocks another node's stage work.
async fn run_node(work: NodeWork, ctx: StageCtx) {
    let node = Arc::clone(&work.node);
    let name = node.config().short_name;

    for stage in Stage::ALL {
        for wf in node.config().stages.wait_for(stage) {
            debug!(node = %name, stage = %stage, dep = %format!("{}@{}", wf.node, wf.stage), "waiting");
            match ctx.signals.wait(&wf.node, wf.stage).await {
                Ok(StageOutcome::Done) => {}
                Ok(_) => {
                    // cascade-fail policy: give in-flight work a short
                    // grace window, then fail with a dependency error
                    tokio::time::sleep(ctx.opts.dependency_grace).await;
                    let err = LabError::DependencyFailed {
                        node: name.clone(),
                        dependency: format!("{}@{}", wf.node, wf.stage),
                    };
                    fail_node(&node, &name, stage, err, &ctx);
                    return;
                }
                Err(e) => {
                    fail_node(&node, &name, stage, e, &ctx);
                    return;
                }
            }
        }

        let result = if work.serial {
            let _gate = ctx.serial_gate.lock().await;
            run_stage(&node, &name, stage, &work.links, &ctx).await
        } else {
            match ctx.stage_permits.acquire().await {
                Ok(_permit) => run_stage(&node, &name, stage, &work.links, &ctx).await,
                Err(_) => Err(LabError::internal("stage permit semaphore closed")),
            }
        };
        if let Err(e) = result {
            fail_node(&node, &name, stage, e, &ctx);
            return;
        }
        if let Err(e) = ctx.signals.complete(&name, stage) {
            warn!(node = %name, stage = %stage, error = %e, "stage signal lost");
        }
    }
    info!(node = %name, "node finished all stages");
}

async fn run_stage(
    node: &NodeRef,
    name: &str,
    stage: Stage,
    links: &[LinkRef],
    ctx: &StageCtx,
) -> LabResult<()> {
    match stage {
        Stage::Create => {
            let deadline = ctx.opts.stage_timeout;
            timeout(deadline, async {
                node.pre_deploy().await?;
                node.deploy(&*ctx.runtime).await
            })
            .await
            .unwrap_or_else(|_| {
                Err(LabError::StageTimeout {
                    node: name.to_string(),
                    stage: stage.to_string(),
                })
            })
        }
        Stage::CreateLinks => timeout(ctx.opts.stage_timeout, async {
            for link in links {
                // deferred links are re-triggered by the peer node when
                // it reaches its own CreateLinks stage
                let status = link.deploy(&*ctx.net).await?;
                debug!(node = %name, link = %link, ?status, "link deploy attempted");
            }
            Ok(())
        })
        .await
        .unwrap_or_else(|_| {
            Err(LabError::StageTimeout {
                node: name.to_string(),
                stage: stage.to_string(),
            })
        }),
        Stage::Configure => timeout(ctx.opts.stage_timeout, node.post_deploy(&*ctx.runtime))
            .await
            .unwrap_or_else(|_| {
                Err(LabError::StageTimeout {
                    node: name.to_string(),
                    stage: stage.to_string(),
                })
            }),
        // no built-in kind defines a health probe yet; the stage exists
        // as a wait-for anchor
        Stage::Healthy => Ok(()),
        Stage::Exit => Ok(()),
    }
}

fn fail_node(node: &NodeRef, name: &str, stage: Stage, err: LabError, ctx: &StageCtx) {
    warn!(node = %name, stage = %stage, error = %err, "node failed");
    node.set_state(NodeState::Failed);
    ctx.errors
        .lock()
        .expect("deploy error lock poisoned")
        .insert(name.to_string(), err.to_string());
    if let Err(e) = ctx.signals.fail_from(name, stage) {
        warn!(node = %name, error = %e, "failed to broadcast node failure");
    }
}

// integration-level tests live in tests/deploy_test.rs; this module only
// covers the summary rendering
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_alignment_and_errors() {
        let summary = DeploySummary {
            lab: "demo".to_string(),
            nodes: vec![
                NodeReport {
                    name: "r1".to_string(),
                    kind: "linux".to_string(),
                    state: NodeState::Deployed,
                    mgmt_ipv4: "172.20.20.11".to_string(),
                    error: None,
                },
                NodeReport {
                    name: "spine1".to_string(),
                    kind: "srl".to_string(),
                    state: NodeState::Failed,
                    mgmt_ipv4: String::new(),
                    error: Some("boom".to_string()),
                },
            ],
        };
        assert!(summary.has_failures());

        let table = summary.render();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("name"));
        assert!(lines[1].contains("172.20.20.11"));
        assert!(lines[2].ends_with("boom"));
    }
}
