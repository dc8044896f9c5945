//! Small directed task graph with typed edges.
//!
//! Command ordering and skip semantics are expressed here, independent of
//! any single pipeline: nodes are named tasks, edges carry either
//! `OnSuccess` (depends-on) or `Always` (finalized-by) semantics, and the
//! executor decides per node whether it runs or is skipped given the
//! states of its predecessors.

use genfleet_types::run::UnitStatus;
use std::collections::HashMap;
use thiserror::Error;

/// Edge semantics from a prerequisite to a dependent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Dependent runs only when the prerequisite succeeded.
    OnSuccess,
    /// Dependent runs once the prerequisite has reached a terminal state,
    /// whatever that state is.
    Always,
}

/// What the executor should do with a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Run,
    Skip { reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate task name '{name}'")]
    DuplicateName { name: String },

    #[error("task '{name}' is ordered after unknown task '{after}'")]
    UnknownReference { name: String, after: String },

    #[error("task ordering contains a cycle involving '{name}'")]
    Cycle { name: String },
}

pub type NodeId = usize;

/// A directed acyclic graph of named tasks with typed edges.
#[derive(Debug, Default)]
pub struct TaskGraph {
    names: Vec<String>,
    edges: Vec<(NodeId, NodeId, EdgeKind)>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> Result<NodeId, GraphError> {
        let name = name.into();
        if self.names.iter().any(|n| *n == name) {
            return Err(GraphError::DuplicateName { name });
        }
        self.names.push(name);
        Ok(self.names.len() - 1)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        self.edges.push((from, to, kind));
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.iter().position(|n| n == name)
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id]
    }

    /// Stable topological order: among ready nodes, insertion order wins.
    pub fn execution_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let n = self.names.len();
        let mut indegree = vec![0usize; n];
        for (_, to, _) in &self.edges {
            indegree[*to] += 1;
        }

        let mut order = Vec::with_capacity(n);
        let mut done = vec![false; n];
        while order.len() < n {
            let next = (0..n).find(|&i| !done[i] && indegree[i] == 0);
            let Some(next) = next else {
                let stuck = (0..n)
                    .find(|&i| !done[i])
                    .map(|i| self.names[i].clone())
                    .unwrap_or_default();
                return Err(GraphError::Cycle { name: stuck });
            };
            done[next] = true;
            order.push(next);
            for (from, to, _) in &self.edges {
                if *from == next {
                    indegree[*to] -= 1;
                }
            }
        }
        Ok(order)
    }

    /// Decide whether a node runs given the terminal states of its
    /// predecessors. An `OnSuccess` predecessor that failed or was skipped
    /// skips the node; `Always` predecessors only order it.
    pub fn decide(&self, node: NodeId, states: &HashMap<NodeId, UnitStatus>) -> Decision {
        for (from, to, kind) in &self.edges {
            if *to != node || *kind != EdgeKind::OnSuccess {
                continue;
            }
            match states.get(from) {
                Some(UnitStatus::Succeeded) => {}
                Some(UnitStatus::Failed) => {
                    return Decision::Skip {
                        reason: format!("prerequisite '{}' failed", self.names[*from]),
                    };
                }
                Some(UnitStatus::Skipped) | None => {
                    return Decision::Skip {
                        reason: format!("prerequisite '{}' was skipped", self.names[*from]),
                    };
                }
            }
        }
        Decision::Run
    }
}

/// Build a task graph from an ordered command list.
///
/// A command with no `after` reference is implicitly ordered after the
/// previous command in the list, using its own trigger semantics, so
/// configuration order alone is enough for a simple linear pipeline.
pub fn from_commands(
    specs: &[genfleet_types::command::CommandSpec],
) -> Result<TaskGraph, GraphError> {
    use genfleet_types::command::Trigger;

    let mut graph = TaskGraph::new();
    for spec in specs {
        graph.add_node(spec.name.clone())?;
    }

    for (i, spec) in specs.iter().enumerate() {
        let kind = match spec.trigger {
            Trigger::OnSuccess => EdgeKind::OnSuccess,
            Trigger::Always => EdgeKind::Always,
        };
        match &spec.after {
            Some(after) => {
                let from = graph.node_id(after).ok_or_else(|| GraphError::UnknownReference {
                    name: spec.name.clone(),
                    after: after.clone(),
                })?;
                graph.add_edge(from, i, kind);
            }
            None if i > 0 => {
                graph.add_edge(i - 1, i, kind);
            }
            None => {}
        }
    }

    Ok(graph)
}
