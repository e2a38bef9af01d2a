//! Fixed-point application of rewrite rules.

use std::sync::Arc;

use arq_logical::QueryNode;
use common_config::OptimizerSettings;
use common_error::ArqResult;
use log::debug;

use super::rule::{OptimizationRule, OptimizedQuery, RuleTrace};
use super::{FilterFusion, TakeFusion};

/// Applies rules in order, repeatedly, until no rule changes the chain or
/// `max_iterations` is reached.
pub struct Optimizer {
    rules: Vec<Box<dyn OptimizationRule>>,
    settings: OptimizerSettings,
}

impl Optimizer {
    /// Create a new optimizer with the given rules.
    pub fn new(rules: Vec<Box<dyn OptimizationRule>>) -> Self {
        Self {
            rules,
            settings: OptimizerSettings::default(),
        }
    }

    /// Create the default rule set with custom settings.
    pub fn with_settings(settings: OptimizerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Add a rule to the optimizer.
    pub fn add_rule<R: OptimizationRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Rewrite a chain to a fixpoint.
    pub fn optimize(&self, node: Arc<QueryNode>) -> ArqResult<OptimizedQuery> {
        let mut current = node;
        let mut iterations = 0;
        let mut rules_applied = 0;
        let mut trace = Vec::new();

        loop {
            if iterations >= self.settings.max_iterations {
                debug!(
                    "Optimizer reached max iterations ({}), stopping",
                    self.settings.max_iterations
                );
                break;
            }

            iterations += 1;
            let mut changed_this_iteration = false;

            for rule in &self.rules {
                let before = self.settings.enable_trace.then(|| current.explain());
                let result = rule.apply(current)?;

                if result.changed {
                    changed_this_iteration = true;
                    rules_applied += 1;
                    debug!("Rule '{}' applied in iteration {}", rule.name(), iterations);

                    if let Some(before) = before {
                        trace.push(RuleTrace::new(rule.name(), before, result.node.explain()));
                    }
                }

                current = result.node;
            }

            if !changed_this_iteration {
                debug!("No changes in iteration {iterations}, reached fixpoint");
                break;
            }
        }

        Ok(OptimizedQuery {
            node: current,
            iterations,
            rules_applied,
            trace,
        })
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(vec![Box::new(FilterFusion), Box::new(TakeFusion)])
    }
}
