use thiserror::Error;

/// Errors raised by graph construction and causal queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CausalError {
    /// The graph is cyclic, or a set node has parents.
    #[error("structure error: {0}")]
    Structure(String),

    /// A referenced node is unknown, or the treatment/outcome overlaps
    /// the conditioning or adjustment set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Three consecutive path nodes match no chain, fork or collider
    /// pattern. Only reachable through a graph-construction bug.
    #[error("unsure how to classify ({a},{b},{c})")]
    Classification { a: String, b: String, c: String },
}

impl CausalError {
    pub fn structure(message: impl Into<String>) -> Self {
        CausalError::Structure(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CausalError::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CausalError>;
