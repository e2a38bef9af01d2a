//! Provider fragment scan.

use std::sync::Arc;

use arq_core::Value;
use arq_logical::ProviderQuery;
use arq_provider::ResultHandle;
use async_trait::async_trait;
use common_error::ArqResult;
use log::debug;
use tokio::sync::Mutex;

use crate::context::ExecutionContext;
use crate::metrics::ExecutionTimer;
use crate::operators::PhysicalOperator;

#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Uninitialized,
    /// Opened; the fragment has not been submitted yet.
    Ready,
    Open(ResultHandle),
    Exhausted,
    Closed,
}

/// Rows of one provider fragment.
///
/// The fragment is submitted on the first `next()`, not on `open()`, so a
/// scan that is never pulled never reaches the provider. It is submitted at
/// most once.
#[derive(Debug)]
pub struct FragmentScanExec {
    id: String,
    index: usize,
    fragment: ProviderQuery,
    state: Mutex<ScanState>,
}

impl FragmentScanExec {
    /// Scan fragment `index` of a translation plan.
    pub fn new(id: impl Into<String>, index: usize, fragment: ProviderQuery) -> Self {
        Self {
            id: id.into(),
            index,
            fragment,
            state: Mutex::new(ScanState::Uninitialized),
        }
    }

    /// The provider query this scan submits.
    pub fn fragment(&self) -> &ProviderQuery {
        &self.fragment
    }
}

#[async_trait]
impl PhysicalOperator for FragmentScanExec {
    fn name(&self) -> &'static str {
        "FragmentScanExec"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&Arc<dyn PhysicalOperator>> {
        vec![]
    }

    async fn open(&self, _ctx: &ExecutionContext) -> ArqResult<()> {
        let mut state = self.state.lock().await;
        if matches!(*state, ScanState::Uninitialized) {
            *state = ScanState::Ready;
        }
        Ok(())
    }

    async fn next(&self, ctx: &ExecutionContext) -> ArqResult<Option<Value>> {
        ctx.ensure_not_cancelled("fragment scan")?;
        let timer = ExecutionTimer::start();
        let mut state = self.state.lock().await;

        if matches!(*state, ScanState::Ready) {
            debug!("Submitting fragment #{} ({})", self.index, self.fragment.name());
            let handle = ctx.bridge.execute(self.fragment.clone()).await?;
            *state = ScanState::Open(handle);
        }

        let row = match &mut *state {
            ScanState::Open(handle) => handle.next_row().await?,
            _ => None,
        };
        if row.is_none() && matches!(*state, ScanState::Open(_)) {
            *state = ScanState::Exhausted;
        }

        ctx.record(&self.id, |m| {
            m.add_rows_out(usize::from(row.is_some()));
            m.add_time(timer.stop());
        });
        Ok(row)
    }

    async fn close(&self) -> ArqResult<()> {
        *self.state.lock().await = ScanState::Closed;
        Ok(())
    }

    fn display(&self) -> String {
        format!("FragmentScanExec(#{}: {})", self.index, self.fragment.name())
    }
}
