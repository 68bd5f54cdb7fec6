//! Comparison engine
//!
//! - [`merge`]: resumable interactive merge sort
//! - [`grouping`]: optional per-group qualifier stage
//! - [`machine`]: session state machine tying the two together
//! - [`tiers`]: rank and tier assignment for a finished order

pub mod grouping;
pub mod machine;
pub mod merge;
pub mod tiers;

pub use grouping::{EliminationPolicy, Group, UNCATEGORISED};
pub use machine::PhaseTransition;
pub use merge::{expected_comparisons, MergeError, MergeSort};
pub use tiers::{TierBand, TierPolicy};
