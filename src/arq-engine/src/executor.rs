//! Local executor: translation, planning and sequence creation.

use std::sync::Arc;

use arq_core::{CancellationToken, Value};
use arq_logical::QueryNode;
use arq_optimizer::{TranslationPlan, plan_translation};
use arq_provider::{ProviderBridge, SourceProvider};
use common_config::{ArqConfig, CapabilityDescriptor};
use common_error::ArqResult;
use log::debug;

use crate::planner::{LocalPhysicalPlanner, PhysicalPlanner};
use crate::physical::PhysicalPlan;
use crate::sequence::AsyncSequence;

/// Executes query chains against one source provider.
///
/// The effective capabilities are what both the configuration and the
/// provider allow. Each enumeration translates and plans the chain anew.
#[derive(Debug)]
pub struct LocalExecutor {
    bridge: ProviderBridge,
    config: ArqConfig,
    capabilities: CapabilityDescriptor,
    planner: LocalPhysicalPlanner,
}

impl LocalExecutor {
    /// Create an executor for `provider`.
    pub fn new(provider: Arc<dyn SourceProvider>, config: ArqConfig) -> Self {
        let capabilities = config
            .provider
            .capabilities
            .intersect(&provider.capabilities());
        debug!(
            "Executor for provider '{}' with {} pushable operator(s)",
            provider.name(),
            capabilities.operators.len()
        );
        let bridge = ProviderBridge::new(provider, config.execution.fetch_size);
        Self {
            bridge,
            config,
            capabilities,
            planner: LocalPhysicalPlanner,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    /// Effective capabilities.
    pub fn capabilities(&self) -> &CapabilityDescriptor {
        &self.capabilities
    }

    /// The provider bridge, shared by every enumeration.
    pub fn bridge(&self) -> &ProviderBridge {
        &self.bridge
    }

    /// Rewrite and classify `node`.
    pub fn translate(&self, node: Arc<QueryNode>) -> ArqResult<TranslationPlan> {
        plan_translation(node, &self.config, &self.capabilities)
    }

    /// Translate and plan `node` into a fresh operator tree.
    pub fn plan(&self, node: Arc<QueryNode>) -> ArqResult<PhysicalPlan> {
        let translation = self.translate(node)?;
        self.planner.plan(&translation)
    }

    /// Logical chain, translation and physical plan, for diagnostics.
    pub fn explain(&self, node: &Arc<QueryNode>) -> ArqResult<String> {
        let translation = self.translate(Arc::clone(node))?;
        let physical = self.planner.plan(&translation)?;
        Ok(format!(
            "Logical Plan:\n{}\n{}{}",
            node.explain(),
            translation,
            physical.explain()
        ))
    }

    /// A lazy sequence over `node`; nothing runs until the first pull.
    pub fn sequence(self: &Arc<Self>, node: Arc<QueryNode>, token: CancellationToken) -> AsyncSequence {
        AsyncSequence::new(Arc::clone(self), node, token)
    }

    /// Enumerate `node` to completion.
    pub async fn collect(
        self: &Arc<Self>,
        node: Arc<QueryNode>,
        token: CancellationToken,
    ) -> ArqResult<Vec<Value>> {
        let mut sequence = self.sequence(node, token);
        let mut rows = Vec::new();
        while sequence.move_next().await? {
            if let Some(row) = sequence.take_current() {
                rows.push(row);
            }
        }
        Ok(rows)
    }
}
