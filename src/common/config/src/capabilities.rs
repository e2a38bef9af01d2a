//! Capability descriptor for source providers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Operators a provider may execute natively.
///
/// Source scans are not listed: every provider must be able to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushdownOperator {
    /// Predicate filtering.
    Where,
    /// Per-element projection.
    Select,
    /// Key matching of a group join.
    GroupJoin,
    /// Key matching of an inner join.
    Join,
    /// Key grouping.
    GroupBy,
    /// Row count limit.
    Take,
}

impl PushdownOperator {
    /// All operators, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Where,
        Self::Select,
        Self::GroupJoin,
        Self::Join,
        Self::GroupBy,
        Self::Take,
    ];
}

/// Expression constructs a provider understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprFeature {
    /// `+ - * / %` and negation.
    Arithmetic,
    /// `= <> < <= > >=`.
    Comparison,
    /// `AND OR NOT` and null tests.
    Logical,
    /// `COUNT SUM MIN MAX` over a group.
    Aggregate,
    /// Tuple construction and field access.
    Tuple,
    /// Numeric casts.
    Cast,
}

impl ExprFeature {
    /// All features, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Arithmetic,
        Self::Comparison,
        Self::Logical,
        Self::Aggregate,
        Self::Tuple,
        Self::Cast,
    ];
}

/// What a provider can execute natively.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityDescriptor {
    /// Pushable operators.
    pub operators: BTreeSet<PushdownOperator>,
    /// Supported expression constructs.
    pub expressions: BTreeSet<ExprFeature>,
}

impl CapabilityDescriptor {
    /// A provider that understands every operator and expression construct.
    pub fn full() -> Self {
        Self {
            operators: PushdownOperator::ALL.into_iter().collect(),
            expressions: ExprFeature::ALL.into_iter().collect(),
        }
    }

    /// A provider that can only scan collections.
    pub fn scan_only() -> Self {
        Self::default()
    }

    /// Add a pushable operator.
    #[must_use]
    pub fn with_operator(mut self, op: PushdownOperator) -> Self {
        self.operators.insert(op);
        self
    }

    /// Remove a pushable operator.
    #[must_use]
    pub fn without_operator(mut self, op: PushdownOperator) -> Self {
        self.operators.remove(&op);
        self
    }

    /// Add a supported expression construct.
    #[must_use]
    pub fn with_feature(mut self, feature: ExprFeature) -> Self {
        self.expressions.insert(feature);
        self
    }

    /// Remove a supported expression construct.
    #[must_use]
    pub fn without_feature(mut self, feature: ExprFeature) -> Self {
        self.expressions.remove(&feature);
        self
    }

    /// Whether `op` may be pushed down.
    pub fn supports_operator(&self, op: PushdownOperator) -> bool {
        self.operators.contains(&op)
    }

    /// Whether every feature in `features` is understood.
    pub fn supports_features<'a>(&self, features: impl IntoIterator<Item = &'a ExprFeature>) -> bool {
        features.into_iter().all(|f| self.expressions.contains(f))
    }

    /// Constructs understood by both descriptors.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            operators: self.operators.intersection(&other.operators).copied().collect(),
            expressions: self
                .expressions
                .intersection(&other.expressions)
                .copied()
                .collect(),
        }
    }
}
