//! Shared fixtures for operator tests.

use std::sync::Arc;

use arq_core::Value;
use arq_logical::ProviderQuery;
use arq_provider::{MemoryProvider, ProviderBridge};
use common_config::ExecutionConfig;
use common_error::{ArqError, ArqResult};

use crate::context::ExecutionContext;
use crate::operators::{FragmentScanExec, PhysicalOperator};

/// Provider holding `numbers = [1, 2, 3, 4, 5]` as `Int32`.
pub fn memory_provider() -> Arc<MemoryProvider> {
    Arc::new(
        MemoryProvider::new().with_collection("numbers", (1..=5).map(Value::Int32).collect()),
    )
}

/// Context over `provider` with a small fetch size and metrics on.
pub fn context_for(provider: Arc<MemoryProvider>) -> ExecutionContext {
    let config = ExecutionConfig::default().with_fetch_size(2);
    ExecutionContext::new(ProviderBridge::new(provider, config.fetch_size), config)
}

/// Scan of the `numbers` collection.
pub fn numbers_scan() -> Arc<dyn PhysicalOperator> {
    Arc::new(FragmentScanExec::new("scan#0", 0, ProviderQuery::scan("numbers")))
}

/// Open, pull to exhaustion and close `op`.
pub async fn drain(op: &dyn PhysicalOperator, ctx: &ExecutionContext) -> ArqResult<Vec<Value>> {
    op.open(ctx).await?;
    let mut rows = Vec::new();
    let outcome = async {
        while let Some(row) = op.next(ctx).await? {
            rows.push(row);
        }
        Ok::<(), ArqError>(())
    }
    .await;
    op.close().await?;
    outcome.map(|()| rows)
}
