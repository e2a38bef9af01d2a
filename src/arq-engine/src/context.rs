//! Execution context shared by the operators of one enumeration.

use arq_core::CancellationToken;
use arq_provider::ProviderBridge;
use common_config::ExecutionConfig;
use common_error::ArqResult;

use crate::metrics::{MetricsSink, OperatorMetrics};

/// Read-only context handed to every operator of one cursor.
///
/// Built fresh for each enumeration and never shared between two.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Bridge used to submit provider fragments.
    pub bridge: ProviderBridge,
    /// The enumeration's cancellation token.
    pub token: CancellationToken,
    /// Metrics sink, when metrics are enabled.
    pub metrics: Option<MetricsSink>,
    /// Execution settings.
    pub config: ExecutionConfig,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("provider", &self.bridge.provider_name())
            .field("config", &self.config)
            .field("cancelled", &self.token.is_cancelled())
            .field("metrics_enabled", &self.metrics.is_some())
            .finish()
    }
}

impl ExecutionContext {
    /// Create a context; metrics follow `config.collect_metrics`.
    pub fn new(bridge: ProviderBridge, config: ExecutionConfig) -> Self {
        let metrics = config.collect_metrics.then(MetricsSink::new);
        Self {
            bridge,
            token: CancellationToken::none(),
            metrics,
            config,
        }
    }

    /// Observe `token` for cancellation.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Record into `metrics` instead of a private sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsSink) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with `OperationCancelled` if cancellation was requested.
    pub fn ensure_not_cancelled(&self, context: &str) -> ArqResult<()> {
        self.token.ensure_not_cancelled(context)
    }

    /// Update an operator's metrics when metrics are enabled.
    pub fn record<F>(&self, operator_id: &str, f: F)
    where
        F: FnOnce(&mut OperatorMetrics),
    {
        if let Some(metrics) = &self.metrics {
            metrics.update(operator_id, f);
        }
    }
}
