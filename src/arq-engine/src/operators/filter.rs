//! In-process filter.

use std::sync::Arc;

use arq_core::Value;
use arq_logical::Selector;
use async_trait::async_trait;
use common_error::{ArqError, ArqResult};

use crate::context::ExecutionContext;
use crate::metrics::ExecutionTimer;
use crate::operators::{PhysicalOperator, close_all};

/// Keeps elements whose predicate yields `true`; `Null` drops the element.
#[derive(Debug)]
pub struct FilterExec {
    id: String,
    input: Arc<dyn PhysicalOperator>,
    predicate: Selector,
}

impl FilterExec {
    /// Create a filter over `input`.
    pub fn new(id: impl Into<String>, input: Arc<dyn PhysicalOperator>, predicate: Selector) -> Self {
        Self {
            id: id.into(),
            input,
            predicate,
        }
    }

    async fn keep(&self, ctx: &ExecutionContext, row: &Value) -> ArqResult<bool> {
        match self.predicate.invoke("predicate", row.clone(), &ctx.token).await? {
            Value::Bool(keep) => Ok(keep),
            Value::Null => Ok(false),
            other => Err(ArqError::selector_fault(
                "predicate",
                ArqError::type_error(format!("expected Bool, got {}", other.type_name())),
            )),
        }
    }
}

#[async_trait]
impl PhysicalOperator for FilterExec {
    fn name(&self) -> &'static str {
        "FilterExec"
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
        let (mut rows_in, mut result) = (0, None);

        while let Some(row) = self.input.next(ctx).await? {
            rows_in += 1;
            if self.keep(ctx, &row).await? {
                result = Some(row);
                break;
            }
        }

        ctx.record(&self.id, |m| {
            m.add_rows_in(rows_in);
            m.add_selector_calls(rows_in);
            m.add_rows_out(usize::from(result.is_some()));
            m.add_time(timer.stop());
        });
        Ok(result)
    }

    async fn close(&self) -> ArqResult<()> {
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!("FilterExec(predicate={})", self.predicate)
    }
}
