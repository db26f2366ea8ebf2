pub mod adjustment;
pub mod dseparation;
pub mod independence;
pub mod powerset;

pub use adjustment::AdjustmentCriterion;
pub use powerset::PowerSet;
