//! Provider-native declarative queries.

use serde::{Deserialize, Serialize};

use common_display::{DisplayTree, TreeNode};

use crate::expr::Expr;

/// A query a source provider executes natively.
///
/// Only declarative expressions appear here; host callbacks never cross the
/// provider boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderQuery {
    /// Every element of a collection, in provider order.
    Scan { collection: String },
    /// Elements satisfying `predicate`.
    Filter {
        input: Box<ProviderQuery>,
        predicate: Expr,
    },
    /// `projection` applied to each element.
    Map {
        input: Box<ProviderQuery>,
        projection: Expr,
    },
    /// `Tuple[outer, List(matches)]` per outer element, outer order.
    GroupJoin {
        outer: Box<ProviderQuery>,
        inner: Box<ProviderQuery>,
        outer_key: Expr,
        inner_key: Expr,
    },
    /// `Tuple[outer, inner]` per matching pair, outer then inner order.
    Join {
        outer: Box<ProviderQuery>,
        inner: Box<ProviderQuery>,
        outer_key: Expr,
        inner_key: Expr,
    },
    /// `Tuple[key, List(members)]` per key, first-appearance order.
    GroupBy {
        input: Box<ProviderQuery>,
        key: Expr,
    },
    /// The first `count` elements.
    Take {
        input: Box<ProviderQuery>,
        count: usize,
    },
}

impl ProviderQuery {
    /// Scan a collection.
    pub fn scan(collection: impl Into<String>) -> Self {
        Self::Scan {
            collection: collection.into(),
        }
    }

    /// Name of the root operator.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "Scan",
            Self::Filter { .. } => "Filter",
            Self::Map { .. } => "Map",
            Self::GroupJoin { .. } => "GroupJoin",
            Self::Join { .. } => "Join",
            Self::GroupBy { .. } => "GroupBy",
            Self::Take { .. } => "Take",
        }
    }

    /// Input queries, outer first.
    pub fn inputs(&self) -> Vec<&Self> {
        match self {
            Self::Scan { .. } => vec![],
            Self::Filter { input, .. }
            | Self::Map { input, .. }
            | Self::GroupBy { input, .. }
            | Self::Take { input, .. } => vec![&**input],
            Self::GroupJoin { outer, inner, .. } | Self::Join { outer, inner, .. } => {
                vec![&**outer, &**inner]
            }
        }
    }

    /// Number of operators in this query.
    pub fn operator_count(&self) -> usize {
        1 + self
            .inputs()
            .into_iter()
            .map(Self::operator_count)
            .sum::<usize>()
    }

    /// Render as an indented tree.
    pub fn explain(&self) -> String {
        DisplayTree::new(self).to_string()
    }
}

impl TreeNode for ProviderQuery {
    fn label(&self) -> String {
        match self {
            Self::Scan { collection } => format!("Scan({collection})"),
            Self::Take { count, .. } => format!("Take({count})"),
            other => other.name().to_string(),
        }
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.inputs()
            .into_iter()
            .map(|input| input as &dyn TreeNode)
            .collect()
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::Filter { predicate, .. } => Some(format!("predicate={predicate}")),
            Self::Map { projection, .. } => Some(format!("projection={projection}")),
            Self::GroupJoin {
                outer_key,
                inner_key,
                ..
            }
            | Self::Join {
                outer_key,
                inner_key,
                ..
            } => Some(format!("outer_key={outer_key}, inner_key={inner_key}")),
            Self::GroupBy { key, .. } => Some(format!("key={key}")),
            Self::Scan { .. } | Self::Take { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{arg, elem};

    #[test]
    fn test_explain_and_count() {
        let query = ProviderQuery::Map {
            input: Box::new(ProviderQuery::GroupJoin {
                outer: Box::new(ProviderQuery::scan("a")),
                inner: Box::new(ProviderQuery::scan("b")),
                outer_key: elem(),
                inner_key: elem(),
            }),
            projection: arg(0),
        };

        assert_eq!(query.operator_count(), 4);
        let explain = query.explain();
        assert!(explain.starts_with("Map (projection=$.0)"));
        assert!(explain.contains("GroupJoin (outer_key=$, inner_key=$)"));
        assert!(explain.contains("Scan(b)"));
    }

    #[test]
    fn test_serializable() {
        let query = ProviderQuery::Take {
            input: Box::new(ProviderQuery::scan("numbers")),
            count: 3,
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["Take"]["count"], 3);
    }
}
