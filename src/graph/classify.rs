use crate::error::{CausalError, Result};
use crate::types::Variable;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local structure of three consecutive nodes on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Structure {
    /// `a -> b -> c` or `a <- b <- c`
    Chain,
    /// `a <- b -> c`
    Fork,
    /// `a -> b <- c`
    Collider,
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Structure::Chain => write!(f, "chain"),
            Structure::Fork => write!(f, "fork"),
            Structure::Collider => write!(f, "collider"),
        }
    }
}

/// Classify `(a, b, c)` by the direction of the edges `a - b` and `b - c`.
///
/// Fails with `CausalError::Classification` if the nodes are not joined by
/// two edges, which cannot happen for a path taken from the shadow graph.
pub fn classify(dag: &DiGraph<Variable, ()>, a: NodeIndex, b: NodeIndex, c: NodeIndex) -> Result<Structure> {
    let has_edge = |from: NodeIndex, to: NodeIndex| dag.find_edge(from, to).is_some();

    if has_edge(a, b) && has_edge(b, c) {
        return Ok(Structure::Chain);
    }

    if has_edge(c, b) && has_edge(b, a) {
        return Ok(Structure::Chain);
    }

    if has_edge(a, b) && has_edge(c, b) {
        return Ok(Structure::Collider);
    }

    if has_edge(b, a) && has_edge(b, c) {
        return Ok(Structure::Fork);
    }

    Err(CausalError::Classification {
        a: dag[a].name.clone(),
        b: dag[b].name.clone(),
        c: dag[c].name.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_classify_basic_structures() {
        assert_eq!(
            catalog::chain().classify_three_structure("x1", "x2", "x3").unwrap(),
            Structure::Chain
        );
        assert_eq!(
            catalog::chain().classify_three_structure("x3", "x2", "x1").unwrap(),
            Structure::Chain
        );
        assert_eq!(
            catalog::collider().classify_three_structure("x1", "x2", "x3").unwrap(),
            Structure::Collider
        );
        assert_eq!(
            catalog::fork().classify_three_structure("x1", "x2", "x3").unwrap(),
            Structure::Fork
        );
    }

    #[test]
    fn test_classify_latent_fork() {
        let model = catalog::latent_confounded();
        assert_eq!(
            model.classify_three_structure("x", "Unobserved_0", "y").unwrap(),
            Structure::Fork
        );
    }

    #[test]
    fn test_classify_rejects_non_path() {
        let model = catalog::sprinkler();
        let err = model.classify_three_structure("rain", "slippery", "season").unwrap_err();
        assert!(matches!(err, CausalError::Classification { .. }));
    }

    #[test]
    fn test_structure_display() {
        assert_eq!(Structure::Collider.to_string(), "collider");
    }
}
