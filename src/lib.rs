pub mod catalog;
pub mod config;
pub mod error;
pub mod graph;
pub mod inference;
pub mod reports;
pub mod types;

pub use error::{CausalError, Result};
pub use graph::{CausalGraphicalModel, Structure};
pub use inference::AdjustmentCriterion;
pub use types::{AdjustmentSets, ConditioningSet, GraphSpec, IndependenceRelation};
