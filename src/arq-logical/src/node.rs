//! Query nodes: one operator application each.
//!
//! Nodes are immutable and share their inputs through `Arc`, so a composed
//! chain can be extended, enumerated repeatedly and used as the inner side of
//! several joins.

use std::sync::Arc;

use arq_core::ValueComparer;
use common_config::PushdownOperator;
use common_display::{DisplayTree, TreeNode};
use common_error::{ArqError, ArqResult};

use crate::selector::Selector;

/// Scan of a named provider collection.
#[derive(Debug, Clone)]
pub struct SourceOp {
    /// Collection name.
    pub collection: String,
}

/// Predicate filter.
#[derive(Debug, Clone)]
pub struct WhereOp {
    /// Input node.
    pub input: Arc<QueryNode>,
    /// Predicate returning `Bool`.
    pub predicate: Selector,
}

/// Per-element projection.
#[derive(Debug, Clone)]
pub struct SelectOp {
    /// Input node.
    pub input: Arc<QueryNode>,
    /// Projection.
    pub selector: Selector,
}

/// Key-matching operator shared by `GroupJoin` and `Join`.
///
/// For `GroupJoin` the result selector receives `Tuple[outer, List(matches)]`;
/// for `Join` it receives `Tuple[outer, inner]` once per matching pair.
#[derive(Debug, Clone)]
pub struct JoinOp {
    /// Outer input.
    pub outer: Arc<QueryNode>,
    /// Inner input.
    pub inner: Arc<QueryNode>,
    /// Key of an outer element.
    pub outer_key: Selector,
    /// Key of an inner element.
    pub inner_key: Selector,
    /// Result projection.
    pub result: Selector,
    /// Explicit key comparer; default equality when absent.
    pub comparer: Option<Arc<dyn ValueComparer>>,
}

/// Grouping by key. Emits `Tuple[key, List(members)]`.
#[derive(Debug, Clone)]
pub struct GroupByOp {
    /// Input node.
    pub input: Arc<QueryNode>,
    /// Key selector.
    pub key: Selector,
    /// Explicit key comparer; default equality when absent.
    pub comparer: Option<Arc<dyn ValueComparer>>,
}

/// Row count limit.
#[derive(Debug, Clone)]
pub struct TakeOp {
    /// Input node.
    pub input: Arc<QueryNode>,
    /// Maximum number of elements.
    pub count: usize,
}

/// One operator application in a composed query.
#[derive(Debug, Clone)]
pub enum QueryNode {
    /// Collection scan.
    Source(SourceOp),
    /// Filter.
    Where(WhereOp),
    /// Projection.
    Select(SelectOp),
    /// Correlated grouping of inner elements per outer element.
    GroupJoin(JoinOp),
    /// Inner equi-join.
    Join(JoinOp),
    /// Grouping by key.
    GroupBy(GroupByOp),
    /// Limit.
    Take(TakeOp),
}

fn require<T>(value: Option<T>, operator: &str, argument: &str) -> ArqResult<T> {
    value.ok_or_else(|| ArqError::argument_rejected(operator, argument))
}

impl QueryNode {
    /// Scan a named collection.
    pub fn try_source(collection: Option<&str>) -> ArqResult<Self> {
        let collection = require(collection, "Source", "collection")?;
        if collection.trim().is_empty() {
            return Err(ArqError::argument_rejected("Source", "collection"));
        }
        Ok(Self::Source(SourceOp {
            collection: collection.to_string(),
        }))
    }

    /// Filter `source` by `predicate`.
    pub fn try_where(source: Option<Arc<Self>>, predicate: Option<Selector>) -> ArqResult<Self> {
        Ok(Self::Where(WhereOp {
            input: require(source, "Where", "source")?,
            predicate: require(predicate, "Where", "predicate")?,
        }))
    }

    /// Project each element of `source`.
    pub fn try_select(source: Option<Arc<Self>>, selector: Option<Selector>) -> ArqResult<Self> {
        Ok(Self::Select(SelectOp {
            input: require(source, "Select", "source")?,
            selector: require(selector, "Select", "selector")?,
        }))
    }

    /// Correlate each outer element with its matching inner elements.
    ///
    /// Arguments are checked in order: `outer`, `inner`, `outer_key_selector`,
    /// `inner_key_selector`, `result_selector`. The first absent one is
    /// reported. The comparer is optional.
    pub fn try_group_join(
        outer: Option<Arc<Self>>,
        inner: Option<Arc<Self>>,
        outer_key_selector: Option<Selector>,
        inner_key_selector: Option<Selector>,
        result_selector: Option<Selector>,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> ArqResult<Self> {
        Self::try_join_op(
            "GroupJoin",
            outer,
            inner,
            outer_key_selector,
            inner_key_selector,
            result_selector,
            comparer,
        )
        .map(Self::GroupJoin)
    }

    /// Pair each outer element with every matching inner element.
    ///
    /// Arguments are checked in the same order as
    /// [`try_group_join`](Self::try_group_join).
    pub fn try_join(
        outer: Option<Arc<Self>>,
        inner: Option<Arc<Self>>,
        outer_key_selector: Option<Selector>,
        inner_key_selector: Option<Selector>,
        result_selector: Option<Selector>,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> ArqResult<Self> {
        Self::try_join_op(
            "Join",
            outer,
            inner,
            outer_key_selector,
            inner_key_selector,
            result_selector,
            comparer,
        )
        .map(Self::Join)
    }

    #[allow(clippy::too_many_arguments)]
    fn try_join_op(
        operator: &str,
        outer: Option<Arc<Self>>,
        inner: Option<Arc<Self>>,
        outer_key_selector: Option<Selector>,
        inner_key_selector: Option<Selector>,
        result_selector: Option<Selector>,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> ArqResult<JoinOp> {
        Ok(JoinOp {
            outer: require(outer, operator, "outer")?,
            inner: require(inner, operator, "inner")?,
            outer_key: require(outer_key_selector, operator, "outer_key_selector")?,
            inner_key: require(inner_key_selector, operator, "inner_key_selector")?,
            result: require(result_selector, operator, "result_selector")?,
            comparer,
        })
    }

    /// Group elements of `source` by key.
    pub fn try_group_by(
        source: Option<Arc<Self>>,
        key_selector: Option<Selector>,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> ArqResult<Self> {
        Ok(Self::GroupBy(GroupByOp {
            input: require(source, "GroupBy", "source")?,
            key: require(key_selector, "GroupBy", "key_selector")?,
            comparer,
        }))
    }

    /// Keep the first `count` elements of `source`.
    pub fn try_take(source: Option<Arc<Self>>, count: usize) -> ArqResult<Self> {
        Ok(Self::Take(TakeOp {
            input: require(source, "Take", "source")?,
            count,
        }))
    }

    /// Name of this operator.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Source(_) => "Source",
            Self::Where(_) => "Where",
            Self::Select(_) => "Select",
            Self::GroupJoin(_) => "GroupJoin",
            Self::Join(_) => "Join",
            Self::GroupBy(_) => "GroupBy",
            Self::Take(_) => "Take",
        }
    }

    /// Capability a provider needs to execute this operator natively.
    ///
    /// `None` for sources, which every provider can scan.
    pub const fn pushdown_operator(&self) -> Option<PushdownOperator> {
        match self {
            Self::Source(_) => None,
            Self::Where(_) => Some(PushdownOperator::Where),
            Self::Select(_) => Some(PushdownOperator::Select),
            Self::GroupJoin(_) => Some(PushdownOperator::GroupJoin),
            Self::Join(_) => Some(PushdownOperator::Join),
            Self::GroupBy(_) => Some(PushdownOperator::GroupBy),
            Self::Take(_) => Some(PushdownOperator::Take),
        }
    }

    /// Input nodes, outer first.
    pub fn inputs(&self) -> Vec<&Arc<Self>> {
        match self {
            Self::Source(_) => vec![],
            Self::Where(op) => vec![&op.input],
            Self::Select(op) => vec![&op.input],
            Self::GroupJoin(op) | Self::Join(op) => vec![&op.outer, &op.inner],
            Self::GroupBy(op) => vec![&op.input],
            Self::Take(op) => vec![&op.input],
        }
    }

    /// Copy of this node over new inputs, given outer first.
    pub fn with_inputs(&self, inputs: Vec<Arc<Self>>) -> ArqResult<Self> {
        let expected = self.inputs().len();
        if inputs.len() != expected {
            return Err(ArqError::internal(format!(
                "{} expects {expected} inputs, got {}",
                self.name(),
                inputs.len()
            )));
        }

        let mut inputs = inputs.into_iter();
        let mut next = || {
            inputs
                .next()
                .ok_or_else(|| ArqError::internal("input count changed"))
        };
        Ok(match self {
            Self::Source(op) => Self::Source(op.clone()),
            Self::Where(op) => Self::Where(WhereOp {
                input: next()?,
                predicate: op.predicate.clone(),
            }),
            Self::Select(op) => Self::Select(SelectOp {
                input: next()?,
                selector: op.selector.clone(),
            }),
            Self::GroupJoin(op) | Self::Join(op) => {
                let join = JoinOp {
                    outer: next()?,
                    inner: next()?,
                    ..op.clone()
                };
                if matches!(self, Self::GroupJoin(_)) {
                    Self::GroupJoin(join)
                } else {
                    Self::Join(join)
                }
            }
            Self::GroupBy(op) => Self::GroupBy(GroupByOp {
                input: next()?,
                key: op.key.clone(),
                comparer: op.comparer.clone(),
            }),
            Self::Take(op) => Self::Take(TakeOp {
                input: next()?,
                count: op.count,
            }),
        })
    }

    /// Selectors attached to this node, with their roles.
    pub fn selectors(&self) -> Vec<(&'static str, &Selector)> {
        match self {
            Self::Source(_) | Self::Take(_) => vec![],
            Self::Where(op) => vec![("predicate", &op.predicate)],
            Self::Select(op) => vec![("selector", &op.selector)],
            Self::GroupJoin(op) | Self::Join(op) => vec![
                ("outer_key_selector", &op.outer_key),
                ("inner_key_selector", &op.inner_key),
                ("result_selector", &op.result),
            ],
            Self::GroupBy(op) => vec![("key_selector", &op.key)],
        }
    }

    /// Explicit comparer, if any.
    pub fn comparer(&self) -> Option<&Arc<dyn ValueComparer>> {
        match self {
            Self::GroupJoin(op) | Self::Join(op) => op.comparer.as_ref(),
            Self::GroupBy(op) => op.comparer.as_ref(),
            _ => None,
        }
    }

    /// Collections scanned by this chain, in outer-first order.
    pub fn collections(&self) -> Vec<&str> {
        match self {
            Self::Source(op) => vec![op.collection.as_str()],
            other => other
                .inputs()
                .into_iter()
                .flat_map(|input| input.collections())
                .collect(),
        }
    }

    /// Render the chain as an indented tree.
    pub fn explain(&self) -> String {
        DisplayTree::new(self).to_string()
    }
}

impl TreeNode for QueryNode {
    fn label(&self) -> String {
        match self {
            Self::Source(op) => format!("Source({})", op.collection),
            Self::Take(op) => format!("Take({})", op.count),
            other => other.name().to_string(),
        }
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.inputs()
            .into_iter()
            .map(|input| input.as_ref() as &dyn TreeNode)
            .collect()
    }

    fn details(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .selectors()
            .into_iter()
            .map(|(role, selector)| format!("{role}={selector}"))
            .collect();
        if let Some(comparer) = self.comparer() {
            parts.push(format!("comparer={}", comparer.name()));
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Fluent builder for query chains.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    root: Arc<QueryNode>,
}

impl QueryBuilder {
    /// Start a chain with a collection scan.
    pub fn source(collection: &str) -> ArqResult<Self> {
        Ok(Self::from_node(Arc::new(QueryNode::try_source(Some(collection))?)))
    }

    /// Continue an existing chain.
    pub fn from_node(root: Arc<QueryNode>) -> Self {
        Self { root }
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(self, predicate: Selector) -> Self {
        Self::wrap(QueryNode::Where(WhereOp {
            input: self.root,
            predicate,
        }))
    }

    /// Add a projection.
    #[must_use]
    pub fn select(self, selector: Selector) -> Self {
        Self::wrap(QueryNode::Select(SelectOp {
            input: self.root,
            selector,
        }))
    }

    /// Add a group join with `inner`.
    #[must_use]
    pub fn group_join(
        self,
        inner: Arc<QueryNode>,
        outer_key: Selector,
        inner_key: Selector,
        result: Selector,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> Self {
        Self::wrap(QueryNode::GroupJoin(JoinOp {
            outer: self.root,
            inner,
            outer_key,
            inner_key,
            result,
            comparer,
        }))
    }

    /// Add an inner join with `inner`.
    #[must_use]
    pub fn join(
        self,
        inner: Arc<QueryNode>,
        outer_key: Selector,
        inner_key: Selector,
        result: Selector,
        comparer: Option<Arc<dyn ValueComparer>>,
    ) -> Self {
        Self::wrap(QueryNode::Join(JoinOp {
            outer: self.root,
            inner,
            outer_key,
            inner_key,
            result,
            comparer,
        }))
    }

    /// Add a grouping.
    #[must_use]
    pub fn group_by(self, key: Selector, comparer: Option<Arc<dyn ValueComparer>>) -> Self {
        Self::wrap(QueryNode::GroupBy(GroupByOp {
            input: self.root,
            key,
            comparer,
        }))
    }

    /// Add a limit.
    #[must_use]
    pub fn take(self, count: usize) -> Self {
        Self::wrap(QueryNode::Take(TakeOp {
            input: self.root,
            count,
        }))
    }

    fn wrap(node: QueryNode) -> Self {
        Self {
            root: Arc::new(node),
        }
    }

    /// Finish the chain.
    pub fn build(self) -> Arc<QueryNode> {
        self.root
    }
}
