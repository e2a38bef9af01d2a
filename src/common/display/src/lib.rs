//! Display and visualization utilities for Arq.
//!
//! Provides formatting for query chains and translation plans.

mod tree;

pub use tree::{DisplayTree, TreeNode};

/// Indent a multi-line string.
pub fn indent(s: &str, prefix: &str) -> String {
    s.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
