//! Execution engine for Arq.
//!
//! Runs the in-process part of a translation plan as a tree of pull-based
//! [`PhysicalOperator`]s:
//!
//! - [`LocalExecutor`]: translates a chain, plans it and hands out sequences
//! - [`LocalPhysicalPlanner`]: turns a client plan into operators
//! - [`AsyncSequence`]: the cancellable `move_next`/`current` cursor, also
//!   available as a `futures::Stream`
//! - [`metrics`]: per-operator row, selector and time counters
//!
//! Provider fragments are submitted lazily: a fragment whose scan is never
//! pulled never reaches the provider.

mod context;
mod executor;
pub mod metrics;
pub mod operators;
mod physical;
mod planner;
mod sequence;

pub use context::ExecutionContext;
pub use executor::LocalExecutor;
pub use metrics::{ExecutionTimer, MetricsSink, OperatorMetrics};
pub use operators::{BoxedPhysicalOperator, PhysicalOperator};
pub use physical::PhysicalPlan;
pub use planner::{LocalPhysicalPlanner, PhysicalPlanner};
pub use sequence::{AsyncSequence, SequenceState};
