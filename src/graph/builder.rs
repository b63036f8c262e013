use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use tracing::debug;

use super::dag::Graph;
use super::element::Element;
use super::node::{Node, NodeId};
use crate::core::errors::{DagrunError, Result};

/// Single-threaded construction surface for a [`Graph`].
///
/// Nodes are added to an arena and wired by `NodeId`. Nothing here is shared
/// with workers until [`build`](GraphBuilder::build) freezes the graph.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node running `element`. Names must be unique within the graph.
    pub fn add_node<S, E>(&mut self, name: S, element: E) -> Result<NodeId>
    where
        S: Into<String>,
        E: Element,
    {
        self.add_boxed_node(name, Box::new(element))
    }

    pub fn add_boxed_node<S: Into<String>>(
        &mut self,
        name: S,
        element: Box<dyn Element>,
    ) -> Result<NodeId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DagrunError::validation("node name cannot be empty"));
        }
        if self.names.contains_key(&name) {
            return Err(DagrunError::validation(format!("duplicate node name '{}'", name))
                .with_context("node", name));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name.clone(), element));
        self.names.insert(name, id);
        Ok(id)
    }

    /// Make `node` wait for `predecessor`. Registers both directions of the
    /// edge. Adding the same edge twice is a no-op.
    pub fn add_dependency(&mut self, node: NodeId, predecessor: NodeId) -> Result<&mut Self> {
        self.check(node)?;
        self.check(predecessor)?;
        if node == predecessor {
            let name = self.nodes[node.0].name().to_string();
            return Err(DagrunError::validation(format!("node '{}' cannot depend on itself", name))
                .with_context("node", name));
        }

        if self.nodes[node.0].add_predecessor(predecessor) {
            self.nodes[predecessor.0].add_successor(node);
        }
        Ok(self)
    }

    /// Make `node` wait for every id in `predecessors`.
    pub fn depends_on<I>(&mut self, node: NodeId, predecessors: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = NodeId>,
    {
        for predecessor in predecessors {
            self.add_dependency(node, predecessor)?;
        }
        Ok(self)
    }

    pub fn set_loop_count(&mut self, node: NodeId, loop_count: u32) -> Result<&mut Self> {
        self.check(node)?;
        self.nodes[node.0].set_loop_count(loop_count)?;
        Ok(self)
    }

    pub fn set_name<S: Into<String>>(&mut self, node: NodeId, name: S) -> Result<&mut Self> {
        self.check(node)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DagrunError::validation("node name cannot be empty"));
        }
        if let Some(existing) = self.names.get(&name) {
            if *existing != node {
                return Err(DagrunError::validation(format!("duplicate node name '{}'", name))
                    .with_context("node", name));
            }
            return Ok(self);
        }
        let old = self.nodes[node.0].name().to_string();
        self.names.remove(&old);
        self.names.insert(name.clone(), node);
        self.nodes[node.0].set_name(name);
        Ok(self)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DagrunError::UnknownNode(id))
        }
    }

    /// Validate that the graph is acyclic and freeze it.
    pub fn build(self) -> Result<Graph> {
        let mut dag = DiGraph::<NodeId, ()>::with_capacity(self.nodes.len(), 0);
        let indices: Vec<_> = self.nodes.iter().map(|n| dag.add_node(n.id())).collect();
        for node in &self.nodes {
            for predecessor in node.predecessors() {
                dag.add_edge(indices[predecessor.0], indices[node.id().0], ());
            }
        }

        let order = toposort(&dag, None).map_err(|cycle| {
            let id = dag[cycle.node_id()];
            DagrunError::cycle(self.nodes[id.0].name())
        })?;
        let order: Vec<NodeId> = order.into_iter().map(|idx| dag[idx]).collect();

        debug!(
            nodes = self.nodes.len(),
            edges = dag.edge_count(),
            "graph validated"
        );
        Ok(Graph::new(self.nodes, self.names, order))
    }
}
