//! Take fusion rule.

use std::sync::Arc;

use arq_logical::{QueryNode, TakeOp};
use common_error::ArqResult;

use super::rule::{OptimizationRule, Transformed, transform_up};

/// Collapse `Take(Take(x, a), b)` into `Take(x, min(a, b))`.
pub struct TakeFusion;

impl OptimizationRule for TakeFusion {
    fn name(&self) -> &'static str {
        "TakeFusion"
    }

    fn description(&self) -> &'static str {
        "Collapse nested limits"
    }

    fn apply(&self, node: Arc<QueryNode>) -> ArqResult<Transformed> {
        let (node, changed) = transform_up(&node, &|node| {
            let QueryNode::Take(upper) = node.as_ref() else {
                return Ok(None);
            };
            let QueryNode::Take(lower) = upper.input.as_ref() else {
                return Ok(None);
            };
            Ok(Some(Arc::new(QueryNode::Take(TakeOp {
                input: lower.input.clone(),
                count: upper.count.min(lower.count),
            }))))
        })?;
        Ok(Transformed { node, changed })
    }
}
