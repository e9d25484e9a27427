//! Static validation of the wait-for dependency graph.

use std::collections::HashMap;

use wirelab_common::{LabError, LabResult};
use wirelab_types::{Stage, Stages};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Checks the cross-node wait-for declarations for cycles and dangling
/// targets. Must run before any container or link is created.
///
/// The graph's vertices are (node, stage) pairs. Each stage depends on the
/// node's own previous stage, plus every declared wait-for target. A cycle
/// anywhere in this graph would deadlock the scheduler, so it is rejected
/// with the offending path spelled out.
pub fn check_waitfor_graph(nodes: &HashMap<String, Stages>) -> LabResult<()> {
    // deterministic traversal order keeps error messages stable
    let mut names: Vec<&String> = nodes.keys().collect();
    names.sort();

    for (name, stages) in nodes {
        for stage in Stage::ALL {
            for wf in stages.wait_for(stage) {
                if !nodes.contains_key(&wf.node) {
                    return Err(LabError::validation(format!(
                        "node '{}' waits for unknown node '{}' at stage {}",
                        name, wf.node, stage
                    )));
                }
            }
        }
    }

    let mut colors: HashMap<(&str, Stage), Color> = HashMap::new();
    for name in &names {
        for stage in Stage::ALL {
            colors.insert((name.as_str(), stage), Color::White);
        }
    }

    for name in &names {
        for stage in Stage::ALL {
            if colors[&(name.as_str(), stage)] == Color::White {
                let mut path = Vec::new();
                visit(nodes, &mut colors, &mut path, name.as_str(), stage)?;
            }
        }
    }
    Ok(())
}

fn visit<'a>(
    nodes: &'a HashMap<String, Stages>,
    colors: &mut HashMap<(&'a str, Stage), Color>,
    path: &mut Vec<(&'a str, Stage)>,
    node: &'a str,
    stage: Stage,
) -> LabResult<()> {
    colors.insert((node, stage), Color::Gray);
    path.push((node, stage));

    let stages = nodes
        .get(node)
        .ok_or_else(|| LabError::internal(format!("node '{node}' vanished during cycle check")))?;

    let mut deps: Vec<(&str, Stage)> = Vec::new();
    if let Some(prev) = stage.prev() {
        deps.push((node, prev));
    }
    for wf in stages.wait_for(stage) {
        deps.push((wf.node.as_str(), wf.stage));
    }

    for (dep_node, dep_stage) in deps {
        match colors[&(dep_node, dep_stage)] {
            Color::Black => {}
            Color::Gray => {
                return Err(LabError::CyclicDependency {
                    cycle: format_cycle(path, dep_node, dep_stage),
                });
            }
            Color::White => visit(nodes, colors, path, dep_node, dep_stage)?,
        }
    }

    path.pop();
    colors.insert((node, stage), Color::Black);
    Ok(())
}

fn format_cycle(path: &[(&str, Stage)], node: &str, stage: Stage) -> String {
    let start = path
        .iter()
        .position(|v| *v == (node, stage))
        .unwrap_or(0);
    let mut parts: Vec<String> = path[start..]
        .iter()
        .map(|(n, s)| format!("{n}@{s}"))
        .collect();
    parts.push(format!("{node}@{stage}"));
    parts.join(" -> ")
}
