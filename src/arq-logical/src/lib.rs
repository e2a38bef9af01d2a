//! Logical layer for Arq.
//!
//! Describes what a query does, independent of where it runs:
//!
//! - [`expr`]: declarative selector bodies and their in-process evaluator
//! - [`Selector`]: one abstraction over sync, async and cancellable selectors
//! - [`QueryNode`]: immutable operator applications forming a query chain
//! - [`ProviderQuery`]: the subset a source provider executes natively
//!
//! # Example
//!
//! ```rust
//! use arq_logical::{QueryBuilder, Selector};
//! use arq_logical::expr::{arg, elem, lit};
//!
//! let inner = QueryBuilder::source("orders").unwrap().build();
//! let query = QueryBuilder::source("customers")
//!     .unwrap()
//!     .filter(Selector::expr(elem().gt(lit(0i32))))
//!     .group_join(
//!         inner,
//!         Selector::expr(elem()),
//!         Selector::expr(elem()),
//!         Selector::expr(arg(1).count()),
//!         None,
//!     )
//!     .build();
//!
//! println!("{}", query.explain());
//! ```

pub mod expr;
mod node;
mod provider_query;
mod selector;

pub use node::{
    GroupByOp, JoinOp, QueryBuilder, QueryNode, SelectOp, SourceOp, TakeOp, WhereOp,
};
pub use provider_query::ProviderQuery;
pub use selector::{Selector, SelectorFn, SelectorFuture, SelectorShape};

pub use expr::{Expr, ExprEvaluator, arg, elem, lit};
