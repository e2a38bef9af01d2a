//! Declarative expression tree.

use std::collections::BTreeSet;

use arq_core::{DataType, Value};
use common_config::ExprFeature;
use serde::{Deserialize, Serialize};

use super::BinaryOp;

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation.
    Neg,
    /// Is null check.
    IsNull,
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Not => write!(f, "NOT"),
            Self::Neg => write!(f, "-"),
            Self::IsNull => write!(f, "IS NULL"),
        }
    }
}

/// Aggregate over a group (a `List` value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    /// Number of members, as `Int64`.
    Count,
    /// Sum of non-null members; `Null` for an empty group.
    Sum,
    /// Smallest non-null member.
    Min,
    /// Largest non-null member.
    Max,
}

impl std::fmt::Display for AggFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "COUNT"),
            Self::Sum => write!(f, "SUM"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
        }
    }
}

/// Declarative selector body, evaluated against one element.
///
/// A provider receives these inside a [`ProviderQuery`](crate::ProviderQuery);
/// the in-process fallback evaluates them with
/// [`ExprEvaluator`](super::ExprEvaluator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// The element the selector is applied to.
    Element,
    /// Field of a tuple.
    Field { expr: Box<Expr>, index: usize },
    /// Literal value.
    Literal(Value),
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Unary operation.
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Aggregate over a group.
    Aggregate { func: AggFunc, expr: Box<Expr> },
    /// Numeric cast.
    Cast { expr: Box<Expr>, to: DataType },
    /// Tuple construction.
    Tuple(Vec<Expr>),
}

impl Expr {
    /// Create a literal expression.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Create a binary expression.
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Create a unary expression.
    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    fn aggregate(self, func: AggFunc) -> Self {
        Self::Aggregate {
            func,
            expr: Box::new(self),
        }
    }

    /// Access a tuple field.
    #[must_use]
    pub fn field(self, index: usize) -> Self {
        Self::Field {
            expr: Box::new(self),
            index,
        }
    }

    /// Cast to a numeric type.
    #[must_use]
    pub fn cast(self, to: DataType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            to,
        }
    }

    // Comparison operators

    /// Equality comparison.
    #[must_use]
    pub fn eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Eq, other)
    }

    /// Inequality comparison.
    #[must_use]
    pub fn not_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::NotEq, other)
    }

    /// Less than comparison.
    #[must_use]
    pub fn lt(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Lt, other)
    }

    /// Less than or equal comparison.
    #[must_use]
    pub fn lt_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::LtEq, other)
    }

    /// Greater than comparison.
    #[must_use]
    pub fn gt(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Gt, other)
    }

    /// Greater than or equal comparison.
    #[must_use]
    pub fn gt_eq(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::GtEq, other)
    }

    // Logical operators

    /// Logical AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::And, other)
    }

    /// Logical OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Or, other)
    }

    /// Logical NOT.
    #[must_use]
    pub fn not(self) -> Self {
        Self::unary(UnaryOp::Not, self)
    }

    /// Is null check.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::unary(UnaryOp::IsNull, self)
    }

    // Arithmetic operators

    /// Addition.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Add, other)
    }

    /// Subtraction.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Subtract, other)
    }

    /// Multiplication.
    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Multiply, other)
    }

    /// Division.
    #[must_use]
    pub fn div(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Divide, other)
    }

    /// Remainder.
    #[must_use]
    pub fn rem(self, other: Self) -> Self {
        Self::binary(self, BinaryOp::Modulo, other)
    }

    /// Numeric negation.
    #[must_use]
    pub fn neg(self) -> Self {
        Self::unary(UnaryOp::Neg, self)
    }

    // Aggregates

    /// Number of members of a group.
    #[must_use]
    pub fn count(self) -> Self {
        self.aggregate(AggFunc::Count)
    }

    /// Sum of a group.
    #[must_use]
    pub fn sum(self) -> Self {
        self.aggregate(AggFunc::Sum)
    }

    /// Minimum of a group.
    #[must_use]
    pub fn min(self) -> Self {
        self.aggregate(AggFunc::Min)
    }

    /// Maximum of a group.
    #[must_use]
    pub fn max(self) -> Self {
        self.aggregate(AggFunc::Max)
    }

    /// Expression features a provider needs to evaluate this expression.
    pub fn features(&self) -> BTreeSet<ExprFeature> {
        let mut features = BTreeSet::new();
        self.collect_features(&mut features);
        features
    }

    fn collect_features(&self, features: &mut BTreeSet<ExprFeature>) {
        match self {
            Self::Element | Self::Literal(_) => {}
            Self::Field { expr, .. } => {
                features.insert(ExprFeature::Tuple);
                expr.collect_features(features);
            }
            Self::Binary { left, op, right } => {
                features.insert(op.feature());
                left.collect_features(features);
                right.collect_features(features);
            }
            Self::Unary { op, expr } => {
                features.insert(match op {
                    UnaryOp::Neg => ExprFeature::Arithmetic,
                    UnaryOp::Not | UnaryOp::IsNull => ExprFeature::Logical,
                });
                expr.collect_features(features);
            }
            Self::Aggregate { expr, .. } => {
                features.insert(ExprFeature::Aggregate);
                expr.collect_features(features);
            }
            Self::Cast { expr, .. } => {
                features.insert(ExprFeature::Cast);
                expr.collect_features(features);
            }
            Self::Tuple(items) => {
                features.insert(ExprFeature::Tuple);
                for item in items {
                    item.collect_features(features);
                }
            }
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Element => write!(f, "$"),
            Self::Field { expr, index } => write!(f, "{expr}.{index}"),
            Self::Literal(val) => write!(f, "{val}"),
            Self::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            Self::Unary {
                op: UnaryOp::IsNull,
                expr,
            } => write!(f, "{expr} IS NULL"),
            Self::Unary { op, expr } => write!(f, "{op} {expr}"),
            Self::Aggregate { func, expr } => write!(f, "{func}({expr})"),
            Self::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// The element a selector is applied to.
pub fn elem() -> Expr {
    Expr::Element
}

/// Field `index` of the element, for selectors over pairs.
pub fn arg(index: usize) -> Expr {
    Expr::Element.field(index)
}

/// A literal value.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::literal(value)
}
