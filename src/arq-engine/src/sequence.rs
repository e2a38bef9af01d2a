//! Async sequence adapter over one enumeration.

use std::fmt;
use std::sync::Arc;

use arq_core::{CancellationToken, Value};
use arq_logical::QueryNode;
use common_error::{ArqError, ArqResult};
use futures::StreamExt;
use futures::stream::BoxStream;
use log::{debug, warn};

use crate::context::ExecutionContext;
use crate::executor::LocalExecutor;
use crate::metrics::MetricsSink;
use crate::operators::PhysicalOperator;

/// Lifecycle of an [`AsyncSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    /// Not pulled yet; nothing was planned or submitted.
    Pending,
    /// Operator tree open.
    Active,
    /// Exhausted or closed by the caller.
    Completed,
    /// Ended by a provider or selector fault.
    Faulted,
    /// Ended by cancellation.
    Cancelled,
}

impl SequenceState {
    /// Whether the sequence has ended.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Faulted | Self::Cancelled)
    }
}

impl fmt::Display for SequenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Faulted => "faulted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

struct Cursor {
    root: Arc<dyn PhysicalOperator>,
    ctx: ExecutionContext,
}

/// A cancellable, pull-based sequence of query results.
///
/// The chain is translated, planned and opened on the first
/// [`move_next`](Self::move_next). The first terminal transition reports its
/// outcome; every later call returns `Ok(false)`. Entering a terminal state
/// closes the operator tree, and dropping the sequence releases any provider
/// handle still open.
pub struct AsyncSequence {
    executor: Arc<LocalExecutor>,
    node: Arc<QueryNode>,
    token: CancellationToken,
    state: SequenceState,
    cursor: Option<Cursor>,
    current: Option<Value>,
    metrics: Option<MetricsSink>,
}

impl AsyncSequence {
    pub(crate) fn new(
        executor: Arc<LocalExecutor>,
        node: Arc<QueryNode>,
        token: CancellationToken,
    ) -> Self {
        Self {
            executor,
            node,
            token,
            state: SequenceState::Pending,
            cursor: None,
            current: None,
            metrics: None,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SequenceState {
        self.state
    }

    /// Element produced by the last successful `move_next`.
    pub const fn current(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    /// Take the current element out of the sequence.
    pub fn take_current(&mut self) -> Option<Value> {
        self.current.take()
    }

    /// Metrics of this enumeration, once started with metrics enabled.
    pub const fn metrics(&self) -> Option<&MetricsSink> {
        self.metrics.as_ref()
    }

    /// Advance to the next element.
    ///
    /// Returns `Ok(true)` when [`current`](Self::current) holds a new
    /// element, `Ok(false)` once the sequence has ended.
    pub async fn move_next(&mut self) -> ArqResult<bool> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        if self.token.is_cancelled() {
            return self.fail(ArqError::cancelled("enumeration cancelled")).await;
        }
        if self.cursor.is_none() {
            match self.start().await {
                Ok(cursor) => {
                    self.cursor = Some(cursor);
                    self.state = SequenceState::Active;
                }
                Err(err) => return self.fail(err).await,
            }
        }

        let pulled = match &self.cursor {
            Some(cursor) => cursor.root.next(&cursor.ctx).await,
            None => Err(ArqError::internal("sequence cursor missing")),
        };
        match pulled {
            Ok(Some(row)) => {
                self.current = Some(row);
                Ok(true)
            }
            Ok(None) => {
                self.finish(SequenceState::Completed).await;
                Ok(false)
            }
            Err(err) => self.fail(err).await,
        }
    }

    /// End the enumeration early and release its resources.
    pub async fn close(&mut self) {
        if !self.state.is_terminal() {
            self.finish(SequenceState::Completed).await;
        }
    }

    /// Fault the enumeration with an error raised by the caller.
    ///
    /// Used when an element cannot be consumed. Returns `err` unless the
    /// sequence had already ended.
    pub async fn fault(&mut self, err: ArqError) -> ArqResult<bool> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        self.fail(err).await
    }

    /// Stream view: yields each element, then the fault if one occurs.
    pub fn into_stream(self) -> BoxStream<'static, ArqResult<Value>> {
        futures::stream::unfold(self, |mut sequence| async move {
            match sequence.move_next().await {
                Ok(true) => {
                    let row = sequence.take_current()?;
                    Some((Ok(row), sequence))
                }
                Ok(false) => None,
                Err(err) => Some((Err(err), sequence)),
            }
        })
        .boxed()
    }

    async fn start(&mut self) -> ArqResult<Cursor> {
        let plan = self.executor.plan(Arc::clone(&self.node))?;
        let ctx = ExecutionContext::new(
            self.executor.bridge().clone(),
            self.executor.config().execution.clone(),
        )
        .with_cancellation(self.token.clone());
        self.metrics.clone_from(&ctx.metrics);

        debug!(
            "Starting enumeration of {} with {} operator(s)",
            self.node.name(),
            plan.operator_count()
        );
        let root = Arc::clone(plan.root());
        let cursor = Cursor { root, ctx };
        if let Err(err) = cursor.root.open(&cursor.ctx).await {
            if let Err(close_err) = cursor.root.close().await {
                warn!("Failed to close operators after open failure: {close_err}");
            }
            return Err(err);
        }
        Ok(cursor)
    }

    async fn fail(&mut self, err: ArqError) -> ArqResult<bool> {
        let state = if err.is_cancelled() {
            SequenceState::Cancelled
        } else {
            SequenceState::Faulted
        };
        self.finish(state).await;
        Err(err)
    }

    async fn finish(&mut self, state: SequenceState) {
        self.current = None;
        if let Some(cursor) = self.cursor.take() {
            if let Err(err) = cursor.root.close().await {
                warn!("Failed to close operators: {err}");
            }
        }
        self.state = state;
        debug!("Enumeration of {} {state}", self.node.name());
    }
}

impl fmt::Debug for AsyncSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSequence")
            .field("node", &self.node.name())
            .field("state", &self.state)
            .field("has_current", &self.current.is_some())
            .finish_non_exhaustive()
    }
}
