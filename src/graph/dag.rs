use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::node::{Node, NodeId};
use crate::core::errors::{DagrunError, Result};
use crate::status::StatusCode;

/// A validated, acyclic graph. Owns every node; edges are index handles.
///
/// Built by [`GraphBuilder`](super::GraphBuilder). A graph can be run many
/// times, one run at a time; each run re-arms the dependency counters.
pub struct Graph {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
    order: Vec<NodeId>,
    running: AtomicBool,
}

impl Graph {
    pub(crate) fn new(nodes: Vec<Node>, names: HashMap<String, NodeId>, order: Vec<NodeId>) -> Self {
        Self {
            nodes,
            names,
            order,
            running: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(DagrunError::UnknownNode(id))
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.names.get(name).map(|id| &self.nodes[id.0])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Nodes without predecessors, released at the start of every run.
    pub fn sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.is_source())
            .map(|n| n.id())
            .collect()
    }

    /// A topological order computed when the graph was built.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Re-arm every dependency counter. Fails while a run is in progress.
    pub fn reset_for_run(&self) -> Result<()> {
        if self.is_running() {
            return Err(DagrunError::already_running("reset dependency counters"));
        }
        self.reset_nodes()
    }

    fn reset_nodes(&self) -> Result<()> {
        for node in &self.nodes {
            node.reset_for_run()?;
        }
        Ok(())
    }

    /// Mark the graph as running and re-arm the counters. The returned guard
    /// clears the running flag when dropped.
    pub fn begin_run(self: &Arc<Self>) -> Result<RunGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DagrunError::already_running("start graph run"));
        }
        let guard = RunGuard {
            graph: Arc::clone(self),
        };
        self.reset_nodes()?;
        debug!(nodes = self.len(), "dependency counters armed");
        Ok(guard)
    }

    /// Tear down every node once. Destroy failures are logged and returned,
    /// they never fail the call itself.
    pub fn destroy(&self) -> Result<Vec<(NodeId, StatusCode)>> {
        if self.is_running() {
            return Err(DagrunError::already_running("destroy graph"));
        }

        let mut statuses = Vec::new();
        for node in &self.nodes {
            if let Some(status) = node.destroy() {
                statuses.push((node.id(), status));
            }
        }

        let failed = statuses.iter().filter(|(_, s)| s.is_error()).count();
        if failed > 0 {
            warn!(failed, "graph teardown finished with destroy errors");
        } else {
            info!(nodes = statuses.len(), "graph torn down");
        }
        Ok(statuses)
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Clears the graph's running flag on drop.
#[must_use = "the run ends when the guard is dropped"]
pub struct RunGuard {
    graph: Arc<Graph>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.graph.running.store(false, Ordering::Release);
    }
}
