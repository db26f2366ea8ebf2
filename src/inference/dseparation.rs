use crate::error::{CausalError, Result};
use crate::graph::classify::{classify, Structure};
use crate::graph::store::CausalGraphicalModel;
use crate::graph::traversal::GraphTraversal;
use crate::types::ConditioningSet;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::debug;

impl CausalGraphicalModel {
    /// Is `x` d-separated from `y` given `z`?
    ///
    /// Every simple path between `x` and `y` in the undirected shadow graph
    /// must be blocked. Paths are enumerated lazily and the check stops at
    /// the first open one; the number of paths grows exponentially with
    /// graph density.
    pub fn is_d_separated(&self, x: &str, y: &str, z: impl Into<ConditioningSet>) -> Result<bool> {
        let z = z.into();
        let x_index = self.observed_index(x)?;
        let y_index = self.observed_index(y)?;
        if x_index == y_index {
            return Err(CausalError::invalid_argument(format!(
                "cannot test d-separation of '{}' from itself",
                x
            )));
        }
        let conditioning = self.observed_indices(&z)?;

        let separated = self.d_separated(x_index, y_index, &conditioning)?;
        debug!("{} ⊥ {} | {}: {}", x, y, z, separated);
        Ok(separated)
    }

    /// Is the path (given by node names) blocked by `z`?
    ///
    /// Paths with fewer than three nodes are never blocked.
    pub fn is_blocked<S: AsRef<str>>(&self, path: &[S], z: impl Into<ConditioningSet>) -> Result<bool> {
        let conditioning = self.observed_indices(&z.into())?;
        let path = path
            .iter()
            .map(|node| self.node_index(node.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        self.path_is_blocked(&path, &conditioning)
    }

    pub(crate) fn d_separated(
        &self,
        x: NodeIndex,
        y: NodeIndex,
        conditioning: &HashSet<NodeIndex>,
    ) -> Result<bool> {
        for path in GraphTraversal::simple_paths(self, x, y) {
            if !self.path_is_blocked(&path, conditioning)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// A single blocking triple blocks the whole path.
    pub(crate) fn path_is_blocked(&self, path: &[NodeIndex], conditioning: &HashSet<NodeIndex>) -> Result<bool> {
        if path.len() < 3 {
            return Ok(false);
        }

        for triple in path.windows(3) {
            let (a, b, c) = (triple[0], triple[1], triple[2]);
            match classify(self.dag(), a, b, c)? {
                Structure::Chain | Structure::Fork => {
                    if conditioning.contains(&b) {
                        return Ok(true);
                    }
                }
                Structure::Collider => {
                    if !conditioning.contains(&b) && self.descendant_indices(b).is_disjoint(conditioning) {
                        return Ok(true);
                    }
                }
            }
        }

        Ok(false)
    }
}
