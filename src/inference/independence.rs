use crate::error::Result;
use crate::graph::store::CausalGraphicalModel;
use crate::inference::powerset::PowerSet;
use crate::types::IndependenceRelation;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use tracing::debug;

impl CausalGraphicalModel {
    /// Every pairwise conditional independence implied by the graph.
    ///
    /// Visits each unordered pair of observed variables (in name order) and
    /// each subset of the remaining variables in increasing cardinality:
    /// O(n^2) pairs times O(2^n) subsets, so only small graphs are practical.
    pub fn all_independence_relationships(&self) -> Result<Vec<IndependenceRelation>> {
        let relations = self.independence_relationships().collect::<Result<Vec<_>>>()?;
        debug!("Found {} independence relationships in {}", relations.len(), self);
        Ok(relations)
    }

    /// Lazy form of [`all_independence_relationships`](Self::all_independence_relationships).
    pub fn independence_relationships(&self) -> impl Iterator<Item = Result<IndependenceRelation>> + '_ {
        let variables: Vec<NodeIndex> = self
            .observed_variables()
            .iter()
            .filter_map(|name| self.observed_index(name).ok())
            .collect();
        let count = variables.len();

        (0..count)
            .flat_map(move |i| (i + 1..count).map(move |j| (i, j)))
            .flat_map(move |(i, j)| {
                let (x, y) = (variables[i], variables[j]);
                let remaining: Vec<NodeIndex> = variables.iter().copied().filter(|&n| n != x && n != y).collect();
                PowerSet::new(remaining).filter_map(move |given| {
                    let conditioning: HashSet<NodeIndex> = given.iter().copied().collect();
                    match self.d_separated(x, y, &conditioning) {
                        Ok(true) => Some(Ok(IndependenceRelation {
                            x: self.name_of(x).to_string(),
                            y: self.name_of(y).to_string(),
                            given: self.names(given),
                        })),
                        Ok(false) => None,
                        Err(err) => Some(Err(err)),
                    }
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog;
    use crate::types::IndependenceRelation;
    use std::collections::BTreeSet;

    fn relation(x: &str, y: &str, given: &[&str]) -> IndependenceRelation {
        IndependenceRelation {
            x: x.to_string(),
            y: y.to_string(),
            given: given.iter().map(|name| name.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_chain_independencies() {
        let relations = catalog::chain().all_independence_relationships().unwrap();
        assert_eq!(relations, vec![relation("x1", "x3", &["x2"])]);
    }

    #[test]
    fn test_collider_independencies() {
        let relations = catalog::collider().all_independence_relationships().unwrap();
        assert_eq!(relations, vec![relation("x1", "x3", &[])]);
    }

    #[test]
    fn test_sprinkler_independencies() {
        let relations = catalog::sprinkler().all_independence_relationships().unwrap();

        assert!(relations.contains(&relation("rain", "sprinkler", &["season"])));
        assert!(relations.contains(&relation("season", "slippery", &["wet"])));
        assert!(!relations.contains(&relation("rain", "sprinkler", &[])));

        for r in &relations {
            assert!(catalog::sprinkler().is_d_separated(&r.x, &r.y, &r.given).unwrap());
        }
    }

    #[test]
    fn test_latent_variables_are_not_enumerated() {
        let relations = catalog::latent_confounded().all_independence_relationships().unwrap();
        assert!(relations.is_empty());
    }

    #[test]
    fn test_lazy_enumeration_stops_early() {
        let model = catalog::sprinkler();
        let first = model.independence_relationships().next().unwrap().unwrap();
        assert_eq!(first.x, "rain");
    }
}
