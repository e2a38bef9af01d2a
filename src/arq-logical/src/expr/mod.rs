//! Declarative expressions for selectors.

mod binary;
mod eval;
#[allow(clippy::module_inception)]
mod expr;

pub use binary::BinaryOp;
pub use eval::ExprEvaluator;
pub use expr::{AggFunc, Expr, UnaryOp, arg, elem, lit};
