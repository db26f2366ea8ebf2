pub mod classify;
pub mod store;
pub mod traversal;

pub use classify::Structure;
pub use store::CausalGraphicalModel;
pub use traversal::GraphTraversal;
