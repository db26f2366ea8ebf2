use crate::error::{CausalError, Result};
use crate::graph::classify::{classify, Structure};
use crate::graph::traversal::{GraphTraversal, TraversalDirection};
use crate::types::{ConditioningSet, GraphSpec, Variable};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Direction, Undirected};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, info};

const LATENT_PREFIX: &str = "Unobserved_";

/// Immutable causal DAG with latent confounders and intervened ("set") nodes.
///
/// The directed graph and its undirected shadow share node indices. Every
/// structural change (`intervene`) builds a new model.
#[derive(Debug, Clone)]
pub struct CausalGraphicalModel {
    dag: DiGraph<Variable, ()>,
    graph: UnGraph<Variable, ()>,
    node_map: HashMap<String, NodeIndex>,
    node_order: Vec<String>,
    observed: BTreeSet<String>,
    unobserved: BTreeSet<String>,
    set_nodes: BTreeSet<String>,
    latent_edges: Vec<(String, (String, String))>,
    topological_order: Vec<NodeIndex>,
    descendants: OnceLock<HashMap<NodeIndex, HashSet<NodeIndex>>>,
}

impl CausalGraphicalModel {
    /// Build a model with observed nodes and directed edges only.
    pub fn new<N, S, E, A, B>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        E: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let spec = GraphSpec::new(nodes).with_edges(edges);
        Self::from_spec(&spec)
    }

    /// Build a model from a full specification.
    pub fn from_spec(spec: &GraphSpec) -> Result<Self> {
        let mut dag = DiGraph::new();
        let mut node_map = HashMap::new();
        let mut node_order = Vec::new();

        for name in &spec.nodes {
            if node_map.contains_key(name) {
                continue;
            }
            let index = dag.add_node(Variable::observed(name.clone()));
            node_map.insert(name.clone(), index);
            node_order.push(name.clone());
        }
        let observed: BTreeSet<String> = node_order.iter().cloned().collect();

        let lookup = |name: &str, role: &str| -> Result<NodeIndex> {
            node_map.get(name).copied().ok_or_else(|| {
                CausalError::invalid_argument(format!("{} '{}' is not a declared node", role, name))
            })
        };

        let mut edge_pairs = Vec::with_capacity(spec.edges.len());
        for (from, to) in &spec.edges {
            edge_pairs.push((lookup(from.as_str(), "edge endpoint")?, lookup(to.as_str(), "edge endpoint")?));
        }
        let mut latent_pairs = Vec::with_capacity(spec.latent_edges.len());
        for (a, b) in &spec.latent_edges {
            if a == b {
                return Err(CausalError::invalid_argument(format!(
                    "latent edge must join two distinct nodes, got ({}, {})",
                    a, b
                )));
            }
            latent_pairs.push((
                lookup(a.as_str(), "latent edge endpoint")?,
                lookup(b.as_str(), "latent edge endpoint")?,
            ));
        }
        let mut set_nodes = BTreeSet::new();
        for name in &spec.set_nodes {
            lookup(name.as_str(), "set node")?;
            set_nodes.insert(name.clone());
        }

        for (from, to) in edge_pairs {
            dag.update_edge(from, to, ());
        }

        let mut unobserved = BTreeSet::new();
        let mut latent_edges = Vec::with_capacity(latent_pairs.len());
        let mut counter = 0usize;
        for ((a, b), (a_index, b_index)) in spec.latent_edges.iter().zip(latent_pairs) {
            let mut latent_name = format!("{}{}", LATENT_PREFIX, counter);
            while node_map.contains_key(&latent_name) {
                counter += 1;
                latent_name = format!("{}{}", LATENT_PREFIX, counter);
            }
            counter += 1;

            let latent_index = dag.add_node(Variable::latent(latent_name.clone()));
            dag.add_edge(latent_index, a_index, ());
            dag.add_edge(latent_index, b_index, ());
            node_map.insert(latent_name.clone(), latent_index);
            unobserved.insert(latent_name.clone());
            latent_edges.push((latent_name, (a.clone(), b.clone())));
        }

        let topological_order = toposort(&dag, None).map_err(|cycle| {
            CausalError::structure(format!(
                "graph is not acyclic: cycle through '{}'",
                dag[cycle.node_id()].name
            ))
        })?;

        for name in &set_nodes {
            let index = node_map[name];
            if let Some(parent) = dag.neighbors_directed(index, Direction::Incoming).next() {
                return Err(CausalError::structure(format!(
                    "set node '{}' cannot have parents, found '{}'",
                    name, dag[parent].name
                )));
            }
        }

        let graph = dag.clone().into_edge_type::<Undirected>();

        info!(
            "Built causal graphical model with {} observed, {} latent and {} set nodes ({} edges)",
            observed.len(),
            unobserved.len(),
            set_nodes.len(),
            dag.edge_count()
        );

        Ok(Self {
            dag,
            graph,
            node_map,
            node_order,
            observed,
            unobserved,
            set_nodes,
            latent_edges,
            topological_order,
            descendants: OnceLock::new(),
        })
    }

    /// Export the model as a specification. Latent confounders are listed
    /// by the pair they confound.
    pub fn to_spec(&self) -> GraphSpec {
        GraphSpec {
            nodes: self.node_order.clone(),
            edges: self.edges().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            latent_edges: self.latent_edges.iter().map(|(_, pair)| pair.clone()).collect(),
            set_nodes: self.set_nodes.iter().cloned().collect(),
        }
    }

    pub fn observed_variables(&self) -> &BTreeSet<String> {
        &self.observed
    }

    pub fn unobserved_variables(&self) -> &BTreeSet<String> {
        &self.unobserved
    }

    pub fn set_nodes(&self) -> &BTreeSet<String> {
        &self.set_nodes
    }

    /// Is `node` an observed variable of this model?
    pub fn contains(&self, node: &str) -> bool {
        self.observed.contains(node)
    }

    pub fn is_set(&self, node: &str) -> bool {
        self.set_nodes.contains(node)
    }

    /// Latent confounders with the observed pair each one points into.
    pub fn latent_edges(&self) -> impl Iterator<Item = (&str, (&str, &str))> + '_ {
        self.latent_edges
            .iter()
            .map(|(latent, (a, b))| (latent.as_str(), (a.as_str(), b.as_str())))
    }

    /// Directed edges between observed variables.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.dag.edge_references().filter_map(move |edge| {
            let source = &self.dag[edge.source()];
            let target = &self.dag[edge.target()];
            if source.is_latent() || target.is_latent() {
                None
            } else {
                Some((source.name.as_str(), target.name.as_str()))
            }
        })
    }

    pub fn node_count(&self) -> usize {
        self.dag.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.dag.edge_count()
    }

    /// Nodes in a topological order, latent confounders included.
    ///
    /// Ties are broken by the underlying sort, so the order is stable for a
    /// given model but not unique.
    pub fn topological_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.topological_order
            .iter()
            .map(move |&index| self.dag[index].name.as_str())
    }

    pub fn parents(&self, node: &str) -> Result<BTreeSet<String>> {
        let index = self.node_index(node)?;
        Ok(self.names(self.dag.neighbors_directed(index, Direction::Incoming)))
    }

    pub fn children(&self, node: &str) -> Result<BTreeSet<String>> {
        let index = self.node_index(node)?;
        Ok(self.names(self.dag.neighbors_directed(index, Direction::Outgoing)))
    }

    pub fn ancestors(&self, node: &str) -> Result<BTreeSet<String>> {
        let index = self.node_index(node)?;
        let mut reachable = GraphTraversal::bfs_reachable(&self.dag, &[index], TraversalDirection::Upstream);
        reachable.remove(&index);
        Ok(self.names(reachable))
    }

    pub fn descendants(&self, node: &str) -> Result<BTreeSet<String>> {
        let index = self.node_index(node)?;
        Ok(self.names(self.descendant_indices(index).iter().copied()))
    }

    /// Classify three consecutive path nodes by name.
    pub fn classify_three_structure(&self, a: &str, b: &str, c: &str) -> Result<Structure> {
        classify(&self.dag, self.node_index(a)?, self.node_index(b)?, self.node_index(c)?)
    }

    /// Apply `do(node)`: drop every edge into `node` and mark it set.
    ///
    /// Latent confounders touching a set node are dropped as well, since a
    /// fixed variable no longer responds to its hidden causes.
    pub fn intervene(&self, node: &str) -> Result<Self> {
        self.observed_index(node)?;

        let mut spec = self.to_spec();
        spec.edges.retain(|(_, to)| to != node);
        if !spec.set_nodes.iter().any(|n| n == node) {
            spec.set_nodes.push(node.to_string());
        }
        let set_nodes: HashSet<&String> = spec.set_nodes.iter().collect();
        let latent_edges = std::mem::take(&mut spec.latent_edges);
        spec.latent_edges = latent_edges
            .into_iter()
            .filter(|(a, b)| !set_nodes.contains(a) && !set_nodes.contains(b))
            .collect();

        debug!("Applying do({}) to {}", node, self);
        Self::from_spec(&spec)
    }

    /// Alias of [`intervene`](Self::intervene) named after the operator.
    pub fn do_intervention(&self, node: &str) -> Result<Self> {
        self.intervene(node)
    }

    /// The factorized distribution implied by the graph, e.g.
    /// `P(season)P(rain|season)...`. Set nodes contribute no factor and
    /// appear as `do(name)` among the parents of their children.
    pub fn factorized_distribution(&self) -> String {
        let mut products = String::new();
        for &index in &self.topological_order {
            let name = &self.dag[index].name;
            if self.is_set(name) {
                continue;
            }

            let parents: Vec<String> = self
                .names(self.dag.neighbors_directed(index, Direction::Incoming))
                .into_iter()
                .map(|parent| {
                    if self.is_set(&parent) {
                        format!("do({})", parent)
                    } else {
                        parent
                    }
                })
                .collect();

            if parents.is_empty() {
                products.push_str(&format!("P({})", name));
            } else {
                products.push_str(&format!("P({}|{})", name, parents.join(",")));
            }
        }
        products
    }

    pub(crate) fn dag(&self) -> &DiGraph<Variable, ()> {
        &self.dag
    }

    pub(crate) fn shadow(&self) -> &UnGraph<Variable, ()> {
        &self.graph
    }

    pub(crate) fn name_of(&self, index: NodeIndex) -> &str {
        &self.dag[index].name
    }

    /// Index of any node, observed or latent.
    pub(crate) fn node_index(&self, node: &str) -> Result<NodeIndex> {
        self.node_map
            .get(node)
            .copied()
            .ok_or_else(|| CausalError::invalid_argument(format!("node '{}' is not in the graph", node)))
    }

    /// Index of an observed variable.
    pub(crate) fn observed_index(&self, node: &str) -> Result<NodeIndex> {
        if !self.observed.contains(node) {
            return Err(CausalError::invalid_argument(format!(
                "'{}' is not an observed variable",
                node
            )));
        }
        self.node_index(node)
    }

    /// Resolve a conditioning or adjustment set, rejecting anything that is
    /// not an observed variable.
    pub(crate) fn observed_indices(&self, set: &ConditioningSet) -> Result<HashSet<NodeIndex>> {
        set.iter().map(|name| self.observed_index(name)).collect()
    }

    /// Strict descendants of `index`, cached for the lifetime of the model.
    pub(crate) fn descendant_indices(&self, index: NodeIndex) -> &HashSet<NodeIndex> {
        let cache = self.descendants.get_or_init(|| {
            debug!("Computing descendant sets for {} nodes", self.dag.node_count());
            self.dag
                .node_indices()
                .map(|node| {
                    let mut reachable =
                        GraphTraversal::bfs_reachable(&self.dag, &[node], TraversalDirection::Downstream);
                    reachable.remove(&node);
                    (node, reachable)
                })
                .collect()
        });
        &cache[&index]
    }

    pub(crate) fn names<I: IntoIterator<Item = NodeIndex>>(&self, indices: I) -> BTreeSet<String> {
        indices.into_iter().map(|index| self.dag[index].name.clone()).collect()
    }
}

impl fmt::Display for CausalGraphicalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variables: Vec<&str> = self.observed.iter().map(String::as_str).collect();
        write!(f, "CausalGraphicalModel({})", variables.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_construction_rejects_cycles() {
        let result = CausalGraphicalModel::new(["a", "b", "c"], [("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(matches!(result, Err(CausalError::Structure(_))));

        let result = CausalGraphicalModel::new(["a"], [("a", "a")]);
        assert!(matches!(result, Err(CausalError::Structure(_))));
    }

    #[test]
    fn test_construction_rejects_set_node_with_parents() {
        let spec = GraphSpec::new(["a", "b"]).edge("a", "b").set_node("b");
        assert!(matches!(
            CausalGraphicalModel::from_spec(&spec),
            Err(CausalError::Structure(_))
        ));

        let spec = GraphSpec::new(["a", "b"]).latent_edge("a", "b").set_node("a");
        assert!(matches!(
            CausalGraphicalModel::from_spec(&spec),
            Err(CausalError::Structure(_))
        ));
    }

    #[test]
    fn test_construction_rejects_unknown_nodes() {
        let result = CausalGraphicalModel::new(["a"], [("a", "b")]);
        assert!(matches!(result, Err(CausalError::InvalidArgument(_))));

        let spec = GraphSpec::new(["a"]).set_node("q");
        assert!(matches!(
            CausalGraphicalModel::from_spec(&spec),
            Err(CausalError::InvalidArgument(_))
        ));

        let spec = GraphSpec::new(["a"]).latent_edge("a", "a");
        assert!(matches!(
            CausalGraphicalModel::from_spec(&spec),
            Err(CausalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_latent_edges_become_synthetic_parents() {
        let model = catalog::latent_confounded();

        assert_eq!(model.observed_variables().len(), 2);
        assert_eq!(model.unobserved_variables().len(), 1);
        assert!(model.unobserved_variables().contains("Unobserved_0"));

        let parents = model.parents("x").unwrap();
        assert!(parents.contains("Unobserved_0"));

        let latent: Vec<_> = model.latent_edges().collect();
        assert_eq!(latent, vec![("Unobserved_0", ("x", "y"))]);

        // Only observed edges are reported for drawing.
        let edges: Vec<_> = model.edges().collect();
        assert_eq!(edges, vec![("x", "y")]);
    }

    #[test]
    fn test_latent_names_avoid_observed_names() {
        let spec = GraphSpec::new(["Unobserved_0", "b"]).latent_edge("Unobserved_0", "b");
        let model = CausalGraphicalModel::from_spec(&spec).unwrap();

        assert!(model.contains("Unobserved_0"));
        assert!(model.unobserved_variables().contains("Unobserved_1"));
        assert!(!model.unobserved_variables().contains("Unobserved_0"));
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let model = catalog::sprinkler();

        let descendants = model.descendants("season").unwrap();
        assert_eq!(descendants.len(), 4);
        assert!(!descendants.contains("season"));

        let ancestors = model.ancestors("wet").unwrap();
        let expected: BTreeSet<String> = ["season", "rain", "sprinkler"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ancestors, expected);

        assert!(model.descendants("slippery").unwrap().is_empty());
        assert!(model.descendants("nope").is_err());
    }

    #[test]
    fn test_topological_order() {
        let model = catalog::sprinkler();
        let order: Vec<&str> = model.topological_order().collect();
        assert_eq!(order.len(), 5);

        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();
        for (from, to) in model.edges() {
            assert!(position(from) < position(to), "{} must precede {}", from, to);
        }
    }

    #[test]
    fn test_intervene_removes_parents() {
        let model = catalog::sprinkler();
        let intervened = model.intervene("rain").unwrap();

        assert!(intervened.is_set("rain"));
        assert!(intervened.parents("rain").unwrap().is_empty());
        assert!(!model.is_set("rain"));
        assert_eq!(model.parents("rain").unwrap().len(), 1);
        assert_eq!(intervened.children("rain").unwrap(), model.children("rain").unwrap());
    }

    #[test]
    fn test_intervene_on_root_only_marks_set() {
        let model = catalog::sprinkler();
        let intervened = model.intervene("season").unwrap();

        assert!(intervened.is_set("season"));
        assert_eq!(intervened.edge_count(), model.edge_count());
    }

    #[test]
    fn test_intervene_drops_latent_confounding() {
        let model = catalog::frontdoor();
        let intervened = model.intervene("x").unwrap();

        assert!(intervened.parents("x").unwrap().is_empty());
        assert!(intervened.unobserved_variables().is_empty());
        assert_eq!(intervened.latent_edges().count(), 0);
    }

    #[test]
    fn test_intervene_requires_observed_node() {
        let model = catalog::latent_confounded();
        assert!(matches!(
            model.intervene("Unobserved_0"),
            Err(CausalError::InvalidArgument(_))
        ));
        assert!(matches!(model.intervene("q"), Err(CausalError::InvalidArgument(_))));
    }

    #[test]
    fn test_factorized_distribution() {
        let model = catalog::chain();
        assert_eq!(model.factorized_distribution(), "P(x1)P(x2|x1)P(x3|x2)");

        // x1 and x3 are unrelated once x2 is set, so either may come first.
        let distribution = model.intervene("x2").unwrap().factorized_distribution();
        assert!(distribution.contains("P(x1)"));
        assert!(distribution.contains("P(x3|do(x2))"));
        assert_eq!(distribution.len(), "P(x1)P(x3|do(x2))".len());
    }

    #[test]
    fn test_display() {
        let model = catalog::simple_confounded();
        assert_eq!(model.to_string(), "CausalGraphicalModel(x, y, z)");
    }

    #[test]
    fn test_to_spec_round_trip() {
        let model = catalog::frontdoor().intervene("z").unwrap();
        let rebuilt = CausalGraphicalModel::from_spec(&model.to_spec()).unwrap();

        assert_eq!(rebuilt.observed_variables(), model.observed_variables());
        assert_eq!(rebuilt.set_nodes(), model.set_nodes());
        assert_eq!(rebuilt.edge_count(), model.edge_count());
    }
}
