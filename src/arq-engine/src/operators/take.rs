//! In-process limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arq_core::Value;
use async_trait::async_trait;
use common_error::ArqResult;

use crate::context::ExecutionContext;
use crate::operators::{PhysicalOperator, close_all};

/// Yields at most `count` elements and stops pulling its input afterwards.
#[derive(Debug)]
pub struct TakeExec {
    id: String,
    input: Arc<dyn PhysicalOperator>,
    count: usize,
    returned: AtomicUsize,
}

impl TakeExec {
    /// Create a limit over `input`.
    pub fn new(id: impl Into<String>, input: Arc<dyn PhysicalOperator>, count: usize) -> Self {
        Self {
            id: id.into(),
            input,
            count,
            returned: AtomicUsize::new(0),
        }
    }

    /// The limit.
    pub const fn count(&self) -> usize {
        self.count
    }
}

#[async_trait]
impl PhysicalOperator for TakeExec {
    fn name(&self) -> &'static str {
        "TakeExec"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        vec![&self.input]
    }

    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()> {
        self.returned.store(0, Ordering::SeqCst);
        self.input.open(ctx).await
    }

    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>> {
        if self.returned.load(Ordering::SeqCst) >= self.count {
            return Ok(None);
        }
        let row = self.input.next(ctx).await?;
        if row.is_some() {
            self.returned.fetch_add(1, Ordering::SeqCst);
            ctx.record(&self.id, |m| {
                m.add_rows_in(1);
                m.add_rows_out(1);
            });
        }
        Ok(row)
    }

    async fn close(&self) -> ArqResult<()> {
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!("TakeExec({})", self.count)
    }
}
