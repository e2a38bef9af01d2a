//! Bridge from the synchronous provider contract to async pulls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arq_core::Value;
use arq_logical::ProviderQuery;
use common_config::CapabilityDescriptor;
use common_error::{ArqError, ArqResult, GenericError};
use log::{debug, trace};

use crate::provider::{RowSet, SourceProvider};

// ============================================================================
// BridgeStats
// ============================================================================

/// Counters shared by a bridge and the handles it opened.
#[derive(Debug, Default)]
pub struct BridgeStats {
    submissions: AtomicUsize,
    open_handles: AtomicUsize,
    rows_fetched: AtomicUsize,
}

impl BridgeStats {
    /// Queries submitted to the provider.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Result handles not yet released.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Rows pulled from the provider.
    pub fn rows_fetched(&self) -> usize {
        self.rows_fetched.load(Ordering::SeqCst)
    }
}

// ============================================================================
// ProviderBridge
// ============================================================================

/// Submits provider queries and exposes their results asynchronously.
///
/// Provider calls and row fetches run on tokio's blocking pool. Failures are
/// wrapped in [`ArqError::ProviderExecution`] and never retried.
#[derive(Debug, Clone)]
pub struct ProviderBridge {
    provider: Arc<dyn SourceProvider>,
    fetch_size: usize,
    stats: Arc<BridgeStats>,
}

impl ProviderBridge {
    /// Create a bridge fetching `fetch_size` rows per round trip.
    pub fn new(provider: Arc<dyn SourceProvider>, fetch_size: usize) -> Self {
        Self {
            provider,
            fetch_size: fetch_size.max(1),
            stats: Arc::new(BridgeStats::default()),
        }
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Capabilities of the underlying provider.
    pub fn capabilities(&self) -> CapabilityDescriptor {
        self.provider.capabilities()
    }

    /// Counters for this bridge.
    pub fn stats(&self) -> &Arc<BridgeStats> {
        &self.stats
    }

    /// Submit `query` once and return a handle over its rows.
    pub async fn execute(&self, query: ProviderQuery) -> ArqResult<ResultHandle> {
        let provider = Arc::clone(&self.provider);
        let name = provider.name().to_string();
        debug!("Submitting {} to provider '{name}'", query.name());
        self.stats.submissions.fetch_add(1, Ordering::SeqCst);

        let rows = tokio::task::spawn_blocking(move || provider.execute(&query))
            .await
            .map_err(|e| ArqError::internal(format!("provider task failed: {e}")))?
            .map_err(|e| ArqError::provider(name.clone(), e))?;

        Ok(ResultHandle::new(
            rows,
            name,
            self.fetch_size,
            Arc::clone(&self.stats),
        ))
    }
}

// ============================================================================
// ResultHandle
// ============================================================================

/// Open result set of one submitted query.
///
/// Rows are fetched in batches on the blocking pool. The handle counts as
/// open until dropped.
pub struct ResultHandle {
    rows: Option<RowSet>,
    buffer: VecDeque<Value>,
    pending_error: Option<GenericError>,
    provider: String,
    fetch_size: usize,
    stats: Arc<BridgeStats>,
}

impl ResultHandle {
    fn new(rows: RowSet, provider: String, fetch_size: usize, stats: Arc<BridgeStats>) -> Self {
        stats.open_handles.fetch_add(1, Ordering::SeqCst);
        Self {
            rows: Some(rows),
            buffer: VecDeque::new(),
            pending_error: None,
            provider,
            fetch_size,
            stats,
        }
    }

    /// Next row, or `None` once the result set is exhausted.
    ///
    /// A provider failure is reported after every row preceding it.
    pub async fn next_row(&mut self) -> ArqResult<Option<Value>> {
        if self.buffer.is_empty() && self.pending_error.is_none() {
            self.fetch_batch().await?;
        }
        if let Some(row) = self.buffer.pop_front() {
            return Ok(Some(row));
        }
        match self.pending_error.take() {
            Some(err) => Err(ArqError::provider(self.provider.clone(), err)),
            None => Ok(None),
        }
    }

    async fn fetch_batch(&mut self) -> ArqResult<()> {
        let Some(mut rows) = self.rows.take() else {
            return Ok(());
        };
        let fetch_size = self.fetch_size;

        let (rows, batch, outcome) = tokio::task::spawn_blocking(move || {
            let mut batch = Vec::with_capacity(fetch_size);
            let mut outcome = Ok(false);
            while batch.len() < fetch_size {
                match rows.next() {
                    Some(Ok(row)) => batch.push(row),
                    Some(Err(err)) => {
                        outcome = Err(err);
                        break;
                    }
                    None => {
                        outcome = Ok(true);
                        break;
                    }
                }
            }
            (rows, batch, outcome)
        })
        .await
        .map_err(|e| ArqError::internal(format!("provider fetch task failed: {e}")))?;

        trace!("Fetched {} rows from provider '{}'", batch.len(), self.provider);
        self.stats
            .rows_fetched
            .fetch_add(batch.len(), Ordering::SeqCst);
        self.buffer.extend(batch);

        match outcome {
            Ok(false) => self.rows = Some(rows),
            Ok(true) => {}
            Err(err) => self.pending_error = Some(err),
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResultHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultHandle")
            .field("provider", &self.provider)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.rows.is_none())
            .finish_non_exhaustive()
    }
}

impl Drop for ResultHandle {
    fn drop(&mut self) {
        self.stats.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
