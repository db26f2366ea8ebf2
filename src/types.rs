use crate::error::{CausalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Core types shared by the graph store, the inference engines and the CLI

/// Serializable description of a causal graphical model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    #[serde(default)]
    pub latent_edges: Vec<(String, String)>,
    #[serde(default)]
    pub set_nodes: Vec<String>,
}

impl GraphSpec {
    pub fn new<N, S>(nodes: N) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    pub fn with_edges<E, A, B>(mut self, edges: E) -> Self
    where
        E: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        self.edges
            .extend(edges.into_iter().map(|(from, to)| (from.into(), to.into())));
        self
    }

    /// Declare a latent confounder between `a` and `b`.
    pub fn latent_edge(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.latent_edges.push((a.into(), b.into()));
        self
    }

    pub fn set_node(mut self, node: impl Into<String>) -> Self {
        self.set_nodes.push(node.into());
        self
    }
}

/// Whether a graph node is a user-visible variable or a synthetic latent
/// confounder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Observed,
    Latent,
}

/// Node payload stored in the directed graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

impl Variable {
    pub fn observed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Observed,
        }
    }

    pub fn latent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Latent,
        }
    }

    pub fn is_latent(&self) -> bool {
        matches!(self.kind, VariableKind::Latent)
    }
}

/// A set of variables to condition on or adjust for.
///
/// Accepts a single identifier, any collection of identifiers, an `Option`
/// of either, or nothing at all. Untyped input (e.g. JSON) goes through
/// `TryFrom<&Value>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditioningSet(BTreeSet<String>);

impl ConditioningSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }

    pub fn into_set(self) -> BTreeSet<String> {
        self.0
    }

    /// Copy of this set with `name` removed.
    pub fn without(&self, name: &str) -> Self {
        Self(self.0.iter().filter(|n| n.as_str() != name).cloned().collect())
    }
}

impl fmt::Display for ConditioningSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(String::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for ConditioningSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for ConditioningSet {
    fn from(name: &str) -> Self {
        std::iter::once(name).collect()
    }
}

impl From<String> for ConditioningSet {
    fn from(name: String) -> Self {
        std::iter::once(name).collect()
    }
}

impl From<&String> for ConditioningSet {
    fn from(name: &String) -> Self {
        std::iter::once(name.clone()).collect()
    }
}

impl<const N: usize> From<[&str; N]> for ConditioningSet {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().collect()
    }
}

impl From<&[&str]> for ConditioningSet {
    fn from(names: &[&str]) -> Self {
        names.iter().copied().collect()
    }
}

impl From<&[String]> for ConditioningSet {
    fn from(names: &[String]) -> Self {
        names.iter().cloned().collect()
    }
}

impl From<Vec<&str>> for ConditioningSet {
    fn from(names: Vec<&str>) -> Self {
        names.into_iter().collect()
    }
}

impl From<Vec<String>> for ConditioningSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<BTreeSet<String>> for ConditioningSet {
    fn from(names: BTreeSet<String>) -> Self {
        Self(names)
    }
}

impl From<&BTreeSet<String>> for ConditioningSet {
    fn from(names: &BTreeSet<String>) -> Self {
        Self(names.clone())
    }
}

impl From<HashSet<String>> for ConditioningSet {
    fn from(names: HashSet<String>) -> Self {
        names.into_iter().collect()
    }
}

impl From<HashSet<&str>> for ConditioningSet {
    fn from(names: HashSet<&str>) -> Self {
        names.into_iter().collect()
    }
}

impl<T: Into<ConditioningSet>> From<Option<T>> for ConditioningSet {
    fn from(names: Option<T>) -> Self {
        names.map(Into::into).unwrap_or_default()
    }
}

impl TryFrom<&Value> for ConditioningSet {
    type Error = CausalError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::String(name) => Ok(Self::from(name)),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        CausalError::invalid_argument(format!(
                            "conditioning set members must be strings, got {}",
                            item
                        ))
                    })
                })
                .collect(),
            other => Err(CausalError::invalid_argument(format!(
                "conditioning set must be a string, a list of strings or empty, got {}",
                other
            ))),
        }
    }
}

/// A conditional independence `x ⊥ y | given` implied by the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndependenceRelation {
    pub x: String,
    pub y: String,
    pub given: BTreeSet<String>,
}

impl fmt::Display for IndependenceRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.given.is_empty() {
            write!(f, "{} ⊥ {}", self.x, self.y)
        } else {
            let given: Vec<&str> = self.given.iter().map(String::as_str).collect();
            write!(f, "{} ⊥ {} | {}", self.x, self.y, given.join(", "))
        }
    }
}

/// Every valid adjustment set found by an exhaustive search.
///
/// An empty collection means no valid adjustment exists; a collection that
/// holds the empty set means no adjustment is needed.
pub type AdjustmentSets = BTreeSet<BTreeSet<String>>;
