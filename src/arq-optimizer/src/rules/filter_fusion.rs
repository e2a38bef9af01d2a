//! Filter fusion rule.

use std::sync::Arc;

use arq_logical::{QueryNode, Selector, WhereOp};
use common_error::ArqResult;

use super::rule::{OptimizationRule, Transformed, transform_up};

/// Merge consecutive declarative filters into one.
///
/// # Legal When
///
/// - Both predicates are synchronous and declarative
///
/// The lower predicate becomes the left operand of a short-circuit `AND`, so
/// the upper one is still only evaluated on elements the lower one keeps.
///
/// # Example
///
/// Before:
/// ```text
/// Where (predicate=($ < 10))
/// └─ Where (predicate=($ > 0))
///    └─ Source(numbers)
/// ```
///
/// After:
/// ```text
/// Where (predicate=(($ > 0) AND ($ < 10)))
/// └─ Source(numbers)
/// ```
pub struct FilterFusion;

impl OptimizationRule for FilterFusion {
    fn name(&self) -> &'static str {
        "FilterFusion"
    }

    fn description(&self) -> &'static str {
        "Merge consecutive declarative filters"
    }

    fn apply(&self, node: Arc<QueryNode>) -> ArqResult<Transformed> {
        let (node, changed) = transform_up(&node, &|node| Ok(fuse(node)))?;
        Ok(Transformed { node, changed })
    }
}

fn fuse(node: &Arc<QueryNode>) -> Option<Arc<QueryNode>> {
    let QueryNode::Where(upper) = node.as_ref() else {
        return None;
    };
    let QueryNode::Where(lower) = upper.input.as_ref() else {
        return None;
    };

    let upper_expr = upper.predicate.declarative().filter(|_| upper.predicate.is_pushable())?;
    let lower_expr = lower.predicate.declarative().filter(|_| lower.predicate.is_pushable())?;

    Some(Arc::new(QueryNode::Where(WhereOp {
        input: lower.input.clone(),
        predicate: Selector::expr(lower_expr.clone().and(upper_expr.clone())),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_logical::{QueryBuilder, elem, lit};

    #[test]
    fn test_fuses_declarative_filters() {
        let node = QueryBuilder::source("numbers")
            .unwrap()
            .filter(Selector::expr(elem().gt(lit(0i32))))
            .filter(Selector::expr(elem().lt(lit(10i32))))
            .filter(Selector::expr(elem().not_eq(lit(5i32))))
            .build();

        let result = FilterFusion.apply(node).unwrap();
        assert!(result.changed);

        let lines: Vec<String> = result.node.explain().lines().map(String::from).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Where"));
        assert!(lines[1].ends_with("Source(numbers)"));
    }

    #[test]
    fn test_keeps_host_filters() {
        let node = QueryBuilder::source("numbers")
            .unwrap()
            .filter(Selector::sync(Ok))
            .filter(Selector::expr(elem().lt(lit(10i32))))
            .build();

        let result = FilterFusion.apply(node.clone()).unwrap();
        assert!(!result.changed);
        assert!(Arc::ptr_eq(&result.node, &node));
    }
}
