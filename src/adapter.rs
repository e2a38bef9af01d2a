//! Entry point binding a source provider to the typed query surface.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arq_core::Element;
use arq_engine::LocalExecutor;
use arq_logical::QueryNode;
use arq_provider::{BridgeStats, SourceProvider};
use common_config::{ArqConfig, CapabilityDescriptor};
use common_error::ArqResult;
use log::info;

use crate::queryable::AsyncQueryable;

static NEXT_ADAPTER_ID: AtomicU64 = AtomicU64::new(1);

/// Binds one [`SourceProvider`] and configuration to the query surface.
///
/// Cheap to clone; clones share the provider bridge. Queries composed from
/// different adapters cannot be combined. The adapter does not own the
/// provider's lifecycle.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use arq::{QueryAdapter, Selector};
/// use arq::config::ArqConfig;
/// use arq::core::Value;
/// use arq::provider::MemoryProvider;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> arq::error::ArqResult<()> {
/// let provider = MemoryProvider::new()
///     .with_collection("numbers", vec![Value::Int32(1), Value::Int32(2)]);
/// let adapter = QueryAdapter::new(Arc::new(provider), ArqConfig::default())?;
///
/// let doubled = adapter
///     .source::<i32>("numbers")?
///     .select(Selector::sync(|v: i32| v * 2))?
///     .to_vec()
///     .await?;
/// assert_eq!(doubled, vec![2, 4]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueryAdapter {
    inner: Arc<AdapterInner>,
}

struct AdapterInner {
    id: u64,
    executor: Arc<LocalExecutor>,
}

impl QueryAdapter {
    /// Create an adapter after validating `config`.
    pub fn new(provider: Arc<dyn SourceProvider>, config: ArqConfig) -> ArqResult<Self> {
        config.validate()?;
        let id = NEXT_ADAPTER_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            "Query adapter #{id} over provider '{}' (fetch size {}, pushdown {:?})",
            provider.name(),
            config.execution.fetch_size,
            config.execution.pushdown
        );
        let executor = Arc::new(LocalExecutor::new(provider, config));
        Ok(Self {
            inner: Arc::new(AdapterInner { id, executor }),
        })
    }

    /// Create an adapter with the default configuration.
    pub fn with_defaults(provider: Arc<dyn SourceProvider>) -> ArqResult<Self> {
        Self::new(provider, ArqConfig::default())
    }

    /// A typed view over a provider collection.
    ///
    /// Composition only; the collection is not read until enumeration.
    pub fn source<T: Element>(&self, collection: &str) -> ArqResult<AsyncQueryable<T>> {
        let node = QueryNode::try_source(Some(collection))?;
        Ok(AsyncQueryable::from_node(self.clone(), Arc::new(node)))
    }

    /// Process-unique adapter identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The validated configuration.
    pub fn config(&self) -> &ArqConfig {
        self.inner.executor.config()
    }

    /// What the configuration and the provider both allow.
    pub fn capabilities(&self) -> &CapabilityDescriptor {
        self.inner.executor.capabilities()
    }

    /// Submission and handle counters of the provider bridge.
    pub fn stats(&self) -> &BridgeStats {
        self.inner.executor.bridge().stats()
    }

    pub(crate) fn executor(&self) -> &Arc<LocalExecutor> {
        &self.inner.executor
    }

    pub(crate) fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for QueryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryAdapter")
            .field("id", &self.inner.id)
            .field("provider", &self.inner.executor.bridge().provider_name())
            .finish()
    }
}
