//! Physical operator trait.

use std::fmt::Debug;
use std::sync::Arc;

use arq_core::Value;
use async_trait::async_trait;
use common_error::ArqResult;

use crate::context::ExecutionContext;

/// A pull-based operator of the in-process suffix.
///
/// # Lifecycle
///
/// ```text
/// create → open → next* → close
/// ```
///
/// - `open()` prepares state and opens children; it never contacts the
///   provider
/// - `next()` returns one element at a time until `None`
/// - `close()` releases provider handles and must be idempotent
///
/// Operators are single-use: a cursor builds a fresh tree per enumeration.
#[async_trait]
pub trait PhysicalOperator: Send + Sync + Debug {
    /// Operator name for display.
    fn name(&self) -> &'static str;

    /// Unique id within the plan, used as metrics key.
    fn id(&self) -> &str;

    /// Child operators, outer first.
    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>>;

    /// Initialize the operator and its children.
    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()>;

    /// Next element, or `None` when exhausted.
    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>>;

    /// Release resources held by this operator and its children.
    async fn close(&self) -> ArqResult<()>;

    /// Display string for explain output.
    fn display(&self) -> String {
        self.name().to_string()
    }

    /// Indented explain output.
    fn explain(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let mut output = format!("{prefix}{}\n", self.display());
        for child in self.children() {
            output.push_str(&child.explain(indent + 1));
        }
        output
    }
}

/// Shared operator handle.
pub type BoxedPhysicalOperator = Arc<dyn PhysicalOperator>;

/// Close every child, reporting the first failure after all were closed.
pub(crate) async fn close_all(children: &[&Arc<dyn PhysicalOperator>]) -> ArqResult<()> {
    let mut first_error = None;
    for child in children {
        if let Err(err) = child.close().await {
            first_error.get_or_insert(err);
        }
    }
    first_error.map_or(Ok(()), Err)
}
