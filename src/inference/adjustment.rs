use crate::error::{CausalError, Result};
use crate::graph::store::CausalGraphicalModel;
use crate::graph::traversal::GraphTraversal;
use crate::inference::powerset::PowerSet;
use crate::types::{AdjustmentSets, ConditioningSet};
use petgraph::graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

/// Criterion used to judge an adjustment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentCriterion {
    Backdoor,
    Frontdoor,
}

impl fmt::Display for AdjustmentCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustmentCriterion::Backdoor => write!(f, "backdoor"),
            AdjustmentCriterion::Frontdoor => write!(f, "frontdoor"),
        }
    }
}

impl CausalGraphicalModel {
    /// All simple paths from `x` to `y` that leave `x` through one of its
    /// parents. Direct edges are not backdoor paths.
    pub fn backdoor_paths(&self, x: &str, y: &str) -> Result<impl Iterator<Item = Vec<String>> + '_> {
        let (x_index, y_index) = self.treatment_and_outcome(x, y)?;
        Ok(self
            .backdoor_path_indices(x_index, y_index)
            .map(move |path| path.into_iter().map(|index| self.name_of(index).to_string()).collect()))
    }

    /// Can `z` be adjusted for to estimate the effect of `x` on `y` via
    ///
    /// P(y|do(x)) = Σ_z P(y|x,z) P(z)
    ///
    /// `z` must not contain a descendant of `x` and must block every
    /// backdoor path from `x` to `y`.
    pub fn is_valid_backdoor_adjustment_set(&self, x: &str, y: &str, z: impl Into<ConditioningSet>) -> Result<bool> {
        let (x_index, y_index, adjustment) = self.adjustment_arguments(x, y, z.into())?;
        self.backdoor_valid(x_index, y_index, &adjustment)
    }

    /// Can `z` be used in the frontdoor formula for the effect of `x` on `y`?
    ///
    /// `z` must intercept every directed path from `x` to `y`, every
    /// backdoor path from `x` to a member of `z` must be blocked by the other
    /// members, and `{x}` must be a valid backdoor set from each member to `y`.
    pub fn is_valid_frontdoor_adjustment_set(&self, x: &str, y: &str, z: impl Into<ConditioningSet>) -> Result<bool> {
        let (x_index, y_index, adjustment) = self.adjustment_arguments(x, y, z.into())?;
        self.frontdoor_valid(x_index, y_index, &adjustment)
    }

    /// Every valid backdoor adjustment set for the effect of `x` on `y`.
    ///
    /// Candidates are all observed variables except `x`, `y` and the
    /// descendants of `x`. The search walks the full power set of the
    /// candidates.
    pub fn all_backdoor_adjustment_sets(&self, x: &str, y: &str) -> Result<AdjustmentSets> {
        self.all_adjustment_sets(x, y, AdjustmentCriterion::Backdoor)
    }

    /// Every valid frontdoor adjustment set for the effect of `x` on `y`.
    pub fn all_frontdoor_adjustment_sets(&self, x: &str, y: &str) -> Result<AdjustmentSets> {
        self.all_adjustment_sets(x, y, AdjustmentCriterion::Frontdoor)
    }

    /// Smallest valid backdoor set, stopping at the first hit.
    pub fn first_backdoor_adjustment_set(&self, x: &str, y: &str) -> Result<Option<BTreeSet<String>>> {
        self.first_adjustment_set(x, y, AdjustmentCriterion::Backdoor)
    }

    /// Smallest valid frontdoor set, stopping at the first hit.
    pub fn first_frontdoor_adjustment_set(&self, x: &str, y: &str) -> Result<Option<BTreeSet<String>>> {
        self.first_adjustment_set(x, y, AdjustmentCriterion::Frontdoor)
    }

    /// Variables the search draws subsets from, sorted by name.
    pub fn adjustment_candidates(&self, x: &str, y: &str, criterion: AdjustmentCriterion) -> Result<Vec<String>> {
        let (x_index, y_index) = self.treatment_and_outcome(x, y)?;
        Ok(self
            .candidate_indices(x_index, y_index, criterion)
            .into_iter()
            .map(|index| self.name_of(index).to_string())
            .collect())
    }

    pub fn is_valid_adjustment_set(
        &self,
        x: &str,
        y: &str,
        z: impl Into<ConditioningSet>,
        criterion: AdjustmentCriterion,
    ) -> Result<bool> {
        match criterion {
            AdjustmentCriterion::Backdoor => self.is_valid_backdoor_adjustment_set(x, y, z),
            AdjustmentCriterion::Frontdoor => self.is_valid_frontdoor_adjustment_set(x, y, z),
        }
    }

    pub fn all_adjustment_sets(&self, x: &str, y: &str, criterion: AdjustmentCriterion) -> Result<AdjustmentSets> {
        let (x_index, y_index) = self.treatment_and_outcome(x, y)?;
        let candidates = self.candidate_indices(x_index, y_index, criterion);
        debug!(
            "Searching {} adjustment sets for {} -> {} over {} candidates",
            criterion,
            x,
            y,
            candidates.len()
        );

        let mut valid_sets = AdjustmentSets::new();
        for subset in PowerSet::new(candidates) {
            let adjustment: HashSet<NodeIndex> = subset.iter().copied().collect();
            if self.satisfies(criterion, x_index, y_index, &adjustment)? {
                valid_sets.insert(self.names(subset));
            }
        }

        debug!("Found {} valid {} adjustment sets", valid_sets.len(), criterion);
        Ok(valid_sets)
    }

    pub fn first_adjustment_set(
        &self,
        x: &str,
        y: &str,
        criterion: AdjustmentCriterion,
    ) -> Result<Option<BTreeSet<String>>> {
        let (x_index, y_index) = self.treatment_and_outcome(x, y)?;
        for subset in PowerSet::new(self.candidate_indices(x_index, y_index, criterion)) {
            let adjustment: HashSet<NodeIndex> = subset.iter().copied().collect();
            if self.satisfies(criterion, x_index, y_index, &adjustment)? {
                return Ok(Some(self.names(subset)));
            }
        }
        Ok(None)
    }

    fn satisfies(
        &self,
        criterion: AdjustmentCriterion,
        x: NodeIndex,
        y: NodeIndex,
        adjustment: &HashSet<NodeIndex>,
    ) -> Result<bool> {
        match criterion {
            AdjustmentCriterion::Backdoor => self.backdoor_valid(x, y, adjustment),
            AdjustmentCriterion::Frontdoor => self.frontdoor_valid(x, y, adjustment),
        }
    }

    fn backdoor_path_indices(&self, x: NodeIndex, y: NodeIndex) -> impl Iterator<Item = Vec<NodeIndex>> + '_ {
        let parents: HashSet<NodeIndex> = self.dag().neighbors_directed(x, Direction::Incoming).collect();
        GraphTraversal::simple_paths(self, x, y).filter(move |path| path.len() > 2 && parents.contains(&path[1]))
    }

    fn backdoor_valid(&self, x: NodeIndex, y: NodeIndex, adjustment: &HashSet<NodeIndex>) -> Result<bool> {
        if !self.descendant_indices(x).is_disjoint(adjustment) {
            return Ok(false);
        }

        for path in self.backdoor_path_indices(x, y) {
            if !self.path_is_blocked(&path, adjustment)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn frontdoor_valid(&self, x: NodeIndex, y: NodeIndex, adjustment: &HashSet<NodeIndex>) -> Result<bool> {
        // Every directed path from x to y is intercepted.
        for path in GraphTraversal::directed_paths(self, x, y) {
            if !path.iter().any(|node| adjustment.contains(node)) {
                return Ok(false);
            }
        }

        // No open backdoor path from x into the mediators.
        for &mediator in adjustment {
            let others: HashSet<NodeIndex> = adjustment.iter().copied().filter(|&n| n != mediator).collect();
            for path in self.backdoor_path_indices(x, mediator) {
                if !self.path_is_blocked(&path, &others)? {
                    return Ok(false);
                }
            }
        }

        // x blocks every backdoor path from the mediators to y.
        let treatment: HashSet<NodeIndex> = std::iter::once(x).collect();
        for &mediator in adjustment {
            if !self.backdoor_valid(mediator, y, &treatment)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn candidate_indices(&self, x: NodeIndex, y: NodeIndex, criterion: AdjustmentCriterion) -> Vec<NodeIndex> {
        let descendants = self.descendant_indices(x);
        self.observed_variables()
            .iter()
            .filter_map(|name| self.observed_index(name).ok())
            .filter(|&index| index != x && index != y)
            .filter(|index| criterion == AdjustmentCriterion::Frontdoor || !descendants.contains(index))
            .collect()
    }

    fn treatment_and_outcome(&self, x: &str, y: &str) -> Result<(NodeIndex, NodeIndex)> {
        let x_index = self.observed_index(x)?;
        let y_index = self.observed_index(y)?;
        if x_index == y_index {
            return Err(CausalError::invalid_argument(format!(
                "treatment and outcome must differ, got '{}' for both",
                x
            )));
        }
        Ok((x_index, y_index))
    }

    fn adjustment_arguments(
        &self,
        x: &str,
        y: &str,
        z: ConditioningSet,
    ) -> Result<(NodeIndex, NodeIndex, HashSet<NodeIndex>)> {
        let (x_index, y_index) = self.treatment_and_outcome(x, y)?;
        for excluded in [x, y] {
            if z.contains(excluded) {
                return Err(CausalError::invalid_argument(format!(
                    "adjustment set {} must not contain '{}'",
                    z, excluded
                )));
            }
        }
        Ok((x_index, y_index, self.observed_indices(&z)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_simple_confounded_backdoor() {
        let model = catalog::simple_confounded();

        let sets = model.all_backdoor_adjustment_sets("x", "y").unwrap();
        let expected: AdjustmentSets = [set(&["z"])].into_iter().collect();
        assert_eq!(sets, expected);

        assert!(!model.is_valid_backdoor_adjustment_set("x", "y", ConditioningSet::empty()).unwrap());
        assert!(model.is_valid_backdoor_adjustment_set("x", "y", "z").unwrap());
    }

    #[test]
    fn test_latent_confounding_has_no_backdoor_set() {
        let model = catalog::latent_confounded();
        let sets = model.all_backdoor_adjustment_sets("x", "y").unwrap();

        assert!(sets.is_empty());
        assert_eq!(model.first_backdoor_adjustment_set("x", "y").unwrap(), None);
    }

    #[test]
    fn test_no_adjustment_needed_differs_from_no_valid_set() {
        let model = catalog::chain();
        let sets = model.all_backdoor_adjustment_sets("x1", "x3").unwrap();

        assert!(!sets.is_empty());
        assert!(sets.contains(&BTreeSet::new()));
        assert_eq!(model.first_backdoor_adjustment_set("x1", "x3").unwrap(), Some(BTreeSet::new()));

        let none = catalog::latent_confounded().all_backdoor_adjustment_sets("x", "y").unwrap();
        assert_ne!(sets, none);
    }

    #[test]
    fn test_backdoor_excludes_descendants() {
        let model = catalog::sprinkler();
        assert!(!model.is_valid_backdoor_adjustment_set("rain", "slippery", ["season", "wet"]).unwrap());

        let candidates = model
            .adjustment_candidates("rain", "slippery", AdjustmentCriterion::Backdoor)
            .unwrap();
        assert_eq!(candidates, vec!["season".to_string(), "sprinkler".to_string()]);
    }

    #[test]
    fn test_sprinkler_backdoor_sets() {
        let model = catalog::sprinkler();
        let sets = model.all_backdoor_adjustment_sets("rain", "wet").unwrap();

        let expected: AdjustmentSets = [set(&["season"]), set(&["sprinkler"]), set(&["season", "sprinkler"])]
            .into_iter()
            .collect();
        assert_eq!(sets, expected);
        assert_eq!(model.first_backdoor_adjustment_set("rain", "wet").unwrap(), Some(set(&["season"])));
    }

    #[test]
    fn test_backdoor_paths() {
        let model = catalog::simple_confounded();
        let paths: Vec<Vec<String>> = model.backdoor_paths("x", "y").unwrap().collect();
        assert_eq!(paths, vec![vec!["x".to_string(), "z".to_string(), "y".to_string()]]);

        let model = catalog::chain();
        assert_eq!(model.backdoor_paths("x1", "x3").unwrap().count(), 0);
    }

    #[test]
    fn test_potential_outcomes_backdoor() {
        let model = catalog::simple_confounded_potential_outcomes();
        let sets = model.all_backdoor_adjustment_sets("x", "y").unwrap();

        assert!(sets.contains(&set(&["z"])));
        assert!(sets.contains(&set(&["y_0", "y_1"])));
        assert!(!sets.contains(&BTreeSet::new()));
    }

    #[test]
    fn test_frontdoor() {
        let model = catalog::frontdoor();

        assert!(model.is_valid_frontdoor_adjustment_set("x", "y", "z").unwrap());
        assert!(!model.is_valid_frontdoor_adjustment_set("x", "y", ConditioningSet::empty()).unwrap());

        let sets = model.all_frontdoor_adjustment_sets("x", "y").unwrap();
        let expected: AdjustmentSets = [set(&["z"])].into_iter().collect();
        assert_eq!(sets, expected);

        assert!(model.all_backdoor_adjustment_sets("x", "y").unwrap().is_empty());
    }

    #[test]
    fn test_frontdoor_rejects_confounded_mediator() {
        let spec = crate::types::GraphSpec::new(["x", "z", "y"])
            .edge("x", "z")
            .edge("z", "y")
            .latent_edge("x", "y")
            .latent_edge("z", "y");
        let model = CausalGraphicalModel::from_spec(&spec).unwrap();

        assert!(!model.is_valid_frontdoor_adjustment_set("x", "y", "z").unwrap());
    }

    #[test]
    fn test_invalid_adjustment_arguments() {
        let model = catalog::simple_confounded();

        assert!(matches!(
            model.is_valid_backdoor_adjustment_set("x", "y", ["x", "z"]),
            Err(CausalError::InvalidArgument(_))
        ));
        assert!(matches!(
            model.is_valid_frontdoor_adjustment_set("x", "y", "y"),
            Err(CausalError::InvalidArgument(_))
        ));
        assert!(matches!(
            model.all_backdoor_adjustment_sets("x", "w"),
            Err(CausalError::InvalidArgument(_))
        ));
        assert!(matches!(
            model.is_valid_backdoor_adjustment_set("x", "y", "w"),
            Err(CausalError::InvalidArgument(_))
        ));
    }
}
