//! Physical plan structure.

use std::sync::Arc;

use crate::operators::PhysicalOperator;

/// An operator tree ready to run for one enumeration.
#[derive(Debug, Clone)]
pub struct PhysicalPlan {
    root: Arc<dyn PhysicalOperator>,
    fragment_count: usize,
}

impl PhysicalPlan {
    /// Create a plan rooted at `root` scanning `fragment_count` fragments.
    pub fn new(root: Arc<dyn PhysicalOperator>, fragment_count: usize) -> Self {
        Self {
            root,
            fragment_count,
        }
    }

    /// The root operator.
    pub fn root(&self) -> &Arc<dyn PhysicalOperator> {
        &self.root
    }

    /// Number of provider fragments the plan may submit.
    pub const fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Number of operators in the plan.
    pub fn operator_count(&self) -> usize {
        fn count(op: &dyn PhysicalOperator) -> usize {
            1 + op
                .children()
                .iter()
                .map(|c| count(c.as_ref()))
                .sum::<usize>()
        }
        count(self.root.as_ref())
    }

    /// Generate EXPLAIN output.
    pub fn explain(&self) -> String {
        let mut output = String::from("Physical Plan:\n");
        output.push_str(&self.root.explain(1));
        output
    }
}
