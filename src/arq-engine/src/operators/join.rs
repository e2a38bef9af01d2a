//! In-process join operators.
//!
//! Both operators drain the inner input into a [`Lookup`] on the first outer
//! element, so an empty outer input never pulls the inner one. Groups are
//! fully materialized before the result selector sees them.

use std::collections::VecDeque;
use std::sync::Arc;

use arq_core::{Lookup, Value, ValueComparer};
use arq_logical::Selector;
use async_trait::async_trait;
use common_error::{ArqError, ArqResult};
use tokio::sync::Mutex;

use crate::context::ExecutionContext;
use crate::metrics::ExecutionTimer;
use crate::operators::{PhysicalOperator, close_all};

/// Inputs, selectors and comparer of a join.
#[derive(Debug)]
pub struct JoinSpec {
    /// Outer input.
    pub outer: Arc<dyn PhysicalOperator>,
    /// Inner input.
    pub inner: Arc<dyn PhysicalOperator>,
    /// Key of an outer element.
    pub outer_key: Selector,
    /// Key of an inner element.
    pub inner_key: Selector,
    /// Result projection over `(outer, group)` or `(outer, inner)`.
    pub result: Selector,
    /// Key equality.
    pub comparer: Arc<dyn ValueComparer>,
}

impl JoinSpec {
    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        vec![&self.outer, &self.inner]
    }

    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()> {
        self.outer.open(ctx).await?;
        self.inner.open(ctx).await
    }

    /// Drain the inner input, computing keys in inner order.
    async fn build_lookup(&self, ctx: &ExecutionContext, id: &str) -> ArqResult<Lookup> {
        let mut lookup = Lookup::new(Arc::clone(&self.comparer));
        let mut rows = 0;
        while let Some(row) = self.inner.next(ctx).await? {
            rows += 1;
            let key = self
                .inner_key
                .invoke("inner_key_selector", row.clone(), &ctx.token)
                .await?;
            lookup
                .insert_for_join(key, row)
                .map_err(|e| e.into_selector_fault("comparer"))?;
        }
        ctx.record(id, |m| {
            m.add_rows_in(rows);
            m.add_selector_calls(rows);
        });
        Ok(lookup)
    }

    /// Inner elements matching the key of `outer`.
    async fn matches(
        &self,
        ctx: &ExecutionContext,
        lookup: &Lookup,
        outer: &Value,
    ) -> ArqResult<Vec<Value>> {
        let key = self
            .outer_key
            .invoke("outer_key_selector", outer.clone(), &ctx.token)
            .await?;
        lookup
            .get(&key)
            .map(<[Value]>::to_vec)
            .map_err(|e| e.into_selector_fault("comparer"))
    }

    fn describe(&self) -> String {
        format!(
            "outer_key={}, inner_key={}, result={}, comparer={}",
            self.outer_key,
            self.inner_key,
            self.result,
            self.comparer.name()
        )
    }
}

fn missing_lookup() -> ArqError {
    ArqError::internal("join lookup was not built")
}

// ============================================================================
// GroupJoinExec
// ============================================================================

/// One output per outer element: `result(Tuple[outer, List(group)])`.
#[derive(Debug)]
pub struct GroupJoinExec {
    id: String,
    spec: JoinSpec,
    lookup: Mutex<Option<Lookup>>,
}

impl GroupJoinExec {
    /// Create a group join.
    pub fn new(id: impl Into<String>, spec: JoinSpec) -> Self {
        Self {
            id: id.into(),
            spec,
            lookup: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PhysicalOperator for GroupJoinExec {
    fn name(&self) -> &'static str {
        "GroupJoinExec"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        self.spec.children()
    }

    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()> {
        self.spec.open(ctx).await
    }

    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>> {
        let timer = ExecutionTimer::start();
        let Some(outer) = self.spec.outer.next(ctx).await? else {
            return Ok(None);
        };

        let mut lookup = self.lookup.lock().await;
        if lookup.is_none() {
            *lookup = Some(self.spec.build_lookup(ctx, &self.id).await?);
        }
        let lookup = lookup.as_ref().ok_or_else(missing_lookup)?;

        let group = self.spec.matches(ctx, lookup, &outer).await?;
        let output = self
            .spec
            .result
            .invoke("result_selector", Value::pair(outer, Value::List(group)), &ctx.token)
            .await?;

        ctx.record(&self.id, |m| {
            m.add_rows_in(1);
            m.add_rows_out(1);
            m.add_selector_calls(2);
            m.add_time(timer.stop());
        });
        Ok(Some(output))
    }

    async fn close(&self) -> ArqResult<()> {
        self.lookup.lock().await.take();
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!("GroupJoinExec({})", self.spec.describe())
    }
}

// ============================================================================
// JoinExec
// ============================================================================

#[derive(Debug, Default)]
struct JoinState {
    lookup: Option<Lookup>,
    /// Outer element being expanded and its not yet emitted matches.
    current: Option<(Value, VecDeque<Value>)>,
}

/// One output per matching pair: `result(Tuple[outer, inner])`, in outer
/// order, then inner order.
#[derive(Debug)]
pub struct JoinExec {
    id: String,
    spec: JoinSpec,
    state: Mutex<JoinState>,
}

impl JoinExec {
    /// Create an inner join.
    pub fn new(id: impl Into<String>, spec: JoinSpec) -> Self {
        Self {
            id: id.into(),
            spec,
            state: Mutex::new(JoinState::default()),
        }
    }
}

#[async_trait]
impl PhysicalOperator for JoinExec {
    fn name(&self) -> &'static str {
        "JoinExec"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        self.spec.children()
    }

    async fn open(&self, ctx: &ExecutionContext) -> ArqResult<()> {
        self.spec.open(ctx).await
    }

    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        loop {
            if let Some((outer, pending)) = state.current.as_mut() {
                if let Some(inner) = pending.pop_front() {
                    let pair = Value::pair(outer.clone(), inner);
                    let output = self
                        .spec
                        .result
                        .invoke("result_selector", pair, &ctx.token)
                        .await?;
                    ctx.record(&self.id, |m| {
                        m.add_rows_out(1);
                        m.add_selector_calls(1);
                    });
                    return Ok(Some(output));
                }
            }
            state.current = None;

            let Some(outer) = self.spec.outer.next(ctx).await? else {
                return Ok(None);
            };
            if state.lookup.is_none() {
                state.lookup = Some(self.spec.build_lookup(ctx, &self.id).await?);
            }
            let lookup = state.lookup.as_ref().ok_or_else(missing_lookup)?;
            let matches = self.spec.matches(ctx, lookup, &outer).await?;

            ctx.record(&self.id, |m| {
                m.add_rows_in(1);
                m.add_selector_calls(1);
            });
            state.current = Some((outer, matches.into()));
        }
    }

    async fn close(&self) -> ArqResult<()> {
        *self.state.lock().await = JoinState::default();
        close_all(&self.children()).await
    }

    fn display(&self) -> String {
        format!("JoinExec({})", self.spec.describe())
    }
}

#[cfg(test)]
mod tests {
    use arq_core::DefaultComparer;
    use arq_logical::{ProviderQuery, arg, elem};
    use arq_provider::{MemoryProvider, ProviderFailure};
    use common_error::{ErrorKind, GenericError};

    use super::*;
    use crate::operators::FragmentScanExec;
    use crate::operators::test_utils::{context_for, drain};

    fn scan(collection: &str) -> Arc<dyn PhysicalOperator> {
        Arc::new(FragmentScanExec::new(
            format!("scan:{collection}"),
            0,
            ProviderQuery::scan(collection),
        ))
    }

    fn provider() -> Arc<MemoryProvider> {
        Arc::new(
            MemoryProvider::new()
                .with_collection("outer", [1, 2, 3].map(Value::Int32).to_vec())
                .with_collection("inner", [3, 1, 1, 4].map(Value::Int32).to_vec())
                .with_collection("empty", vec![]),
        )
    }

    fn spec(outer: &str, inner: &str, result: Selector) -> JoinSpec {
        JoinSpec {
            outer: scan(outer),
            inner: scan(inner),
            outer_key: Selector::expr(elem()),
            inner_key: Selector::expr(elem()),
            result,
            comparer: Arc::new(DefaultComparer),
        }
    }

    #[tokio::test]
    async fn test_group_join_counts() {
        let ctx = context_for(provider());
        let join = GroupJoinExec::new(
            "gj#0",
            spec("outer", "inner", Selector::expr(arg(1).count())),
        );

        let rows = drain(&join, &ctx).await.unwrap();
        assert_eq!(rows, [2i64, 0, 1].map(Value::Int64).to_vec());
    }

    #[tokio::test]
    async fn test_empty_outer_never_pulls_inner() {
        let provider = Arc::new(
            MemoryProvider::new()
                .with_collection("empty", vec![])
                .with_failure("inner", ProviderFailure::on_submit("must not run")),
        );
        let ctx = context_for(provider.clone());
        let join = GroupJoinExec::new("gj#0", spec("empty", "inner", Selector::expr(elem())));

        assert!(drain(&join, &ctx).await.unwrap().is_empty());
        assert_eq!(provider.submissions(), 1);
    }

    #[tokio::test]
    async fn test_join_emits_pairs_in_order() {
        let ctx = context_for(provider());
        let join = JoinExec::new("j#0", spec("outer", "inner", Selector::expr(elem())));

        let rows = drain(&join, &ctx).await.unwrap();
        assert_eq!(
            rows,
            vec![
                Value::pair(1i32, 1i32),
                Value::pair(1i32, 1i32),
                Value::pair(3i32, 3i32),
            ]
        );
    }

    #[tokio::test]
    async fn test_result_fault_after_prior_elements() {
        let ctx = context_for(provider());
        let result = Selector::sync(|pair: Value| match pair.field(0) {
            Some(Value::Int32(2)) => Err::<Value, GenericError>("boom".into()),
            _ => Ok(pair),
        });
        let join = GroupJoinExec::new("gj#0", spec("outer", "inner", result));

        join.open(&ctx).await.unwrap();
        assert!(join.next(&ctx).await.unwrap().is_some());
        let err = join.next(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectorFault);
        assert_eq!(err.to_string(), "SelectorFault: result_selector failed: boom");
        join.close().await.unwrap();
        assert_eq!(ctx.bridge.stats().open_handles(), 0);
    }
}
