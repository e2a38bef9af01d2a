//! In-process grouping.

use std::collections::VecDeque;
use std::sync::Arc;

use arq_core::{Lookup, Value, ValueComparer};
use arq_logical::Selector;
use async_trait::async_trait;
use common_error::ArqResult;
use tokio::sync::Mutex;

use crate::context::ExecutionContext;
use crate::metrics::ExecutionTimer;
use crate::operators::{PhysicalOperator, close_all};

/// Emits `Tuple[key, List(members)]` per distinct key.
///
/// Blocking: the input is drained on the first pull. Keys keep
/// first-appearance order, members keep input order, and `Null` is an
/// ordinary key.
#[derive(Debug)]
pub struct GroupByExec {
    id: String,
    input: Arc<dyn PhysicalOperator>,
    key: Selector,
    comparer: Arc<dyn ValueComparer>,
    groups: Mutex<Option<VecDeque<Value>>>,
}

impl GroupByExec {
    /// Create a grouping over `input`.
    pub fn new(
        id: impl Into<String>,
        input: Arc<dyn PhysicalOperator>,
        key: Selector,
        comparer: Arc<dyn ValueComparer>,
    ) -> Self {
        Self {
            id: id.into(),
            input,
            key,
            comparer,
            groups: Mutex::new(None),
        }
    }

    async fn build(&self, ctx: &ExecutionContext) -> ArqResult<VecDeque<Value>> {
        let timer = ExecutionTimer::start();
        let mut lookup = Lookup::new(Arc::clone(&self.comparer));
        let mut rows = 0;
        while let Some(row) = self.input.next(ctx).await? {
            rows += 1;
            let key = self.key.invoke("key_selector", row.clone(), &ctx.token).await?;
            lookup
                .insert(key, row)
                .map_err(|e| e.into_selector_fault("comparer"))?;
        }

        let groups: VecDeque<_> = lookup
            .into_groups()
            .into_iter()
            .map(|(key, members)| Value::pair(key, Value::List(members)))
            .collect();
        ctx.record(&self.id, |m| {
            m.add_rows_in(rows);
            m.add_selector_calls(rows);
            m.add_time(timer.stop());
        });
        Ok(groups)
    }
}

#[async_trait]
impl PhysicalOperator for GroupByExec {
    fn name(&self) -> &'static str {
        "GroupByExec"
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
        let mut groups = self.groups.lock().await;
        if groups.is_none() {
            *groups = Some(self.build(ctx).await?);
        }
        let group = groups.as_mut().and_then(VecDeque::pop_front);
        if group.is_some() {
            ctx.record(&self.id, |m| m.add_rows_out(1));
        }
        Ok(group)
    }

    async fn close(&self) -> ArqResult<()> {
        self.groups.lock().await.take();
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!(
            "GroupByExec(key={}, comparer={})",
            self.key,
            self.comparer.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use arq_core::DefaultComparer;
    use arq_logical::{elem, lit};

    use super::*;
    use crate::operators::test_utils::{context_for, drain, memory_provider, numbers_scan};

    #[tokio::test]
    async fn test_groups_by_parity() {
        let ctx = context_for(memory_provider());
        let group_by = GroupByExec::new(
            "gb#0",
            numbers_scan(),
            Selector::expr(elem().rem(lit(2i32))),
            Arc::new(DefaultComparer),
        );

        let rows = drain(&group_by, &ctx).await.unwrap();
        assert_eq!(
            rows,
            vec![
                Value::pair(1i32, Value::List([1, 3, 5].map(Value::Int32).to_vec())),
                Value::pair(0i32, Value::List([2, 4].map(Value::Int32).to_vec())),
            ]
        );
    }
}
