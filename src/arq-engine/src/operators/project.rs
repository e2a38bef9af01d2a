//! In-process projection.

use std::sync::Arc;

use arq_core::Value;
use arq_logical::Selector;
use async_trait::async_trait;
use common_error::ArqResult;

use crate::context::ExecutionContext;
use crate::metrics::ExecutionTimer;
use crate::operators::{PhysicalOperator, close_all};

/// Applies a selector to each element.
///
/// Also evaluates the result selector of a join whose matching was pushed to
/// the provider; `role` names the selector in faults.
#[derive(Debug)]
pub struct ProjectExec {
    id: String,
    input: Arc<dyn PhysicalOperator>,
    selector: Selector,
    role: &'static str,
}

impl ProjectExec {
    /// Create a projection over `input`.
    pub fn new(
        id: impl Into<String>,
        input: Arc<dyn PhysicalOperator>,
        selector: Selector,
        role: &'static str,
    ) -> Self {
        Self {
            id: id.into(),
            input,
            selector,
            role,
        }
    }
}

#[async_trait]
impl PhysicalOperator for ProjectExec {
    fn name(&self) -> &'static str {
        "ProjectExec"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        vec![&self.input]
    }

    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()> {
        self.input.open(ctx).await
    }

    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>> {
        let timer = ExecutionTimer::start();
        let Some(row) = self.input.next(ctx).await? else {
            return Ok(None);
        };
        let projected = self.selector.invoke(self.role, row, &ctx.token).await?;

        ctx.record(&self.id, |m| {
            m.add_rows_in(1);
            m.add_rows_out(1);
            m.add_selector_calls(1);
            m.add_time(timer.stop());
        });
        Ok(Some(projected))
    }

    async fn close(&self) -> ArqResult<()> {
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!("ProjectExec({}={})", self.role, self.selector)
    }
}
