//! Rewrite rule trait and framework.

use std::sync::Arc;

use arq_logical::QueryNode;
use common_error::ArqResult;

/// A single rewrite rule over a query chain.
///
/// A rewrite is legal only if the rewritten chain yields the same elements
/// in the same order, invokes no host selector it would not otherwise
/// invoke, and keeps every selector fault observable.
pub trait OptimizationRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Apply this rule, returning a potentially rewritten chain.
    fn apply(&self, node: Arc<QueryNode>) -> ArqResult<Transformed>;
}

/// The result of applying a rewrite rule.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The (potentially rewritten) chain.
    pub node: Arc<QueryNode>,
    /// Whether the chain was actually changed.
    pub changed: bool,
}

impl Transformed {
    /// The chain was changed.
    pub fn yes(node: Arc<QueryNode>) -> Self {
        Self {
            node,
            changed: true,
        }
    }

    /// The chain was left as is.
    pub fn no(node: Arc<QueryNode>) -> Self {
        Self {
            node,
            changed: false,
        }
    }
}

/// A trace entry for a single rule application.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    /// The name of the rule that was applied.
    pub rule_name: String,
    /// The chain before the rule was applied (as explain string).
    pub before: String,
    /// The chain after the rule was applied (as explain string).
    pub after: String,
}

impl RuleTrace {
    /// Create a new trace entry.
    pub fn new(
        rule_name: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// The result of rewriting, with optional trace information.
#[derive(Debug, Clone)]
pub struct OptimizedQuery {
    /// The final chain.
    pub node: Arc<QueryNode>,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of rule applications that changed the chain.
    pub rules_applied: usize,
    /// Rule applications, when tracing is enabled.
    pub trace: Vec<RuleTrace>,
}

impl OptimizedQuery {
    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "Rewriting completed in {} iterations, {} rules applied\n",
            self.iterations, self.rules_applied
        );

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
        }
        for (i, entry) in self.trace.iter().enumerate() {
            output.push_str(&format!(
                "\n--- Rule {} applied: {} ---\nBefore:\n{}\nAfter:\n{}",
                i + 1,
                entry.rule_name,
                entry.before,
                entry.after
            ));
        }

        output
    }
}

/// Rebuild `node` bottom-up, replacing every node for which `f` returns a
/// rewrite. Returns the new chain and whether anything changed.
pub(crate) fn transform_up<F>(node: &Arc<QueryNode>, f: &F) -> ArqResult<(Arc<QueryNode>, bool)>
where
    F: Fn(&Arc<QueryNode>) -> ArqResult<Option<Arc<QueryNode>>>,
{
    let mut changed = false;
    let mut inputs = Vec::new();
    for input in node.inputs() {
        let (input, input_changed) = transform_up(input, f)?;
        changed |= input_changed;
        inputs.push(input);
    }

    let current = if changed {
        Arc::new(node.with_inputs(inputs)?)
    } else {
        node.clone()
    };

    match f(&current)? {
        Some(rewritten) => Ok((rewritten, true)),
        None => Ok((current, changed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_logical::QueryBuilder;

    struct NoOpRule;

    impl OptimizationRule for NoOpRule {
        fn name(&self) -> &'static str {
            "NoOp"
        }

        fn apply(&self, node: Arc<QueryNode>) -> ArqResult<Transformed> {
            Ok(Transformed::no(node))
        }
    }

    #[test]
    fn test_transformed() {
        let node = QueryBuilder::source("a").unwrap().build();
        let result = NoOpRule.apply(node.clone()).unwrap();
        assert!(!result.changed);
        assert!(Arc::ptr_eq(&result.node, &node));
        assert!(Transformed::yes(node).changed);
    }

    #[test]
    fn test_transform_up_keeps_untouched_chains() {
        let node = QueryBuilder::source("a").unwrap().take(3).build();
        let (same, changed) = transform_up(&node, &|_| Ok(None)).unwrap();
        assert!(!changed);
        assert!(Arc::ptr_eq(&same, &node));
    }

    #[test]
    fn test_format_trace() {
        let node = QueryBuilder::source("a").unwrap().build();
        let optimized = OptimizedQuery {
            node,
            iterations: 2,
            rules_applied: 1,
            trace: vec![RuleTrace::new("TakeFusion", "before", "after")],
        };
        let text = optimized.format_trace();
        assert!(text.starts_with("Rewriting completed in 2 iterations, 1 rules applied"));
        assert!(text.contains("--- Rule 1 applied: TakeFusion ---"));
    }
}
