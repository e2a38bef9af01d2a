//! Query rewriting and push-down classification for Arq.
//!
//! Two steps run before a query executes:
//!
//! 1. [`Optimizer`] normalises the chain with rewrite rules.
//! 2. [`CapabilityClassifier`] splits it into provider fragments and an
//!    in-process [`ClientPlan`], producing a [`TranslationPlan`].

mod classifier;
mod rules;

pub use classifier::{CapabilityClassifier, ClientJoin, ClientPlan, TranslationPlan};
pub use rules::{
    FilterFusion, OptimizationRule, OptimizedQuery, Optimizer, RuleTrace, TakeFusion,
    Transformed,
};

use std::sync::Arc;

use arq_logical::QueryNode;
use common_config::{ArqConfig, CapabilityDescriptor};
use common_error::ArqResult;

/// Rewrite `node` with the default rules, then classify it against
/// `capabilities`.
pub fn plan_translation(
    node: Arc<QueryNode>,
    config: &ArqConfig,
    capabilities: &CapabilityDescriptor,
) -> ArqResult<TranslationPlan> {
    let optimized = Optimizer::with_settings(config.optimizer.clone()).optimize(node)?;
    if config.optimizer.enable_trace {
        log::debug!("{}", optimized.format_trace());
    }
    CapabilityClassifier::new(capabilities.clone(), config.execution.pushdown)
        .classify(&optimized.node)
}
