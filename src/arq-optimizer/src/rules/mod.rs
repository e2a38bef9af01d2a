//! Rewrite rules for Arq query chains.
//!
//! Rules normalise a chain before classification. Every rule preserves the
//! element sequence and the set of host selector invocations.
//!
//! - **Filter Fusion**: merge consecutive declarative filters
//! - **Take Fusion**: collapse nested limits

mod filter_fusion;
mod optimizer;
mod rule;
mod take_fusion;

pub use filter_fusion::FilterFusion;
pub use optimizer::Optimizer;
pub use rule::{OptimizationRule, OptimizedQuery, RuleTrace, Transformed};
pub use take_fusion::TakeFusion;
