use crate::graph::store::CausalGraphicalModel;
use crate::types::Variable;
use petgraph::algo::all_simple_paths;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// Graph traversal utilities for causal queries
pub struct GraphTraversal;

impl GraphTraversal {
    /// Perform breadth-first search to find all reachable nodes, starting
    /// nodes included
    pub fn bfs_reachable(
        dag: &DiGraph<Variable, ()>,
        start_nodes: &[NodeIndex],
        direction: TraversalDirection,
    ) -> HashSet<NodeIndex> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();

        for &node in start_nodes {
            queue.push_back(node);
            visited.insert(node);
        }

        let direction = match direction {
            TraversalDirection::Downstream => Direction::Outgoing,
            TraversalDirection::Upstream => Direction::Incoming,
        };

        while let Some(current) = queue.pop_front() {
            for neighbor in dag.neighbors_directed(current, direction) {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited
    }

    /// Lazily enumerate every simple path between two nodes in the
    /// undirected shadow graph, edge directions ignored
    pub fn simple_paths(
        model: &CausalGraphicalModel,
        from: NodeIndex,
        to: NodeIndex,
    ) -> impl Iterator<Item = Vec<NodeIndex>> + '_ {
        all_simple_paths::<Vec<NodeIndex>, _>(model.shadow(), from, to, 0, None)
    }

    /// Lazily enumerate every directed path from `from` to `to`
    pub fn directed_paths(
        model: &CausalGraphicalModel,
        from: NodeIndex,
        to: NodeIndex,
    ) -> impl Iterator<Item = Vec<NodeIndex>> + '_ {
        all_simple_paths::<Vec<NodeIndex>, _>(model.dag(), from, to, 0, None)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TraversalDirection {
    Upstream,
    Downstream,
}
