//! Physical operators of the in-process suffix.
//!
//! | Operator | Client plan node | Blocking |
//! |----------|------------------|----------|
//! | [`FragmentScanExec`] | `Fragment(i)` | no |
//! | [`FilterExec`] | `Filter` | no |
//! | [`ProjectExec`] | `Project` | no |
//! | [`GroupJoinExec`] | `GroupJoin` | inner side |
//! | [`JoinExec`] | `Join` | inner side |
//! | [`GroupByExec`] | `GroupBy` | yes |
//! | [`TakeExec`] | `Take` | no |

mod filter;
mod group_by;
mod join;
mod project;
mod scan;
mod take;
#[cfg(test)]
pub(crate) mod test_utils;
mod traits;

pub use filter::FilterExec;
pub use group_by::GroupByExec;
pub use join::{GroupJoinExec, JoinExec, JoinSpec};
pub use project::ProjectExec;
pub use scan::FragmentScanExec;
pub use take::TakeExec;
pub(crate) use traits::close_all;
pub use traits::{BoxedPhysicalOperator, PhysicalOperator};
