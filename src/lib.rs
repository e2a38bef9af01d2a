//! Arq - asynchronous query operators over synchronous, deferred query providers.
//!
//! Arq lets a caller compose `filter`, `select`, `group_join`, `join`,
//! `group_by` and `take` over a provider's collections and enumerate the
//! result asynchronously. Selectors may be synchronous, asynchronous or
//! cancellation-aware. As much of the chain as the provider supports is
//! translated into one native query; the rest runs in-process, pulling rows
//! through a bridge that keeps blocking provider calls off the async
//! executor.
//!
//! The workspace is layered:
//!
//! - [`core`]: values, typed elements, comparers, cancellation
//! - [`logical`]: selectors, expressions and the query chain
//! - [`optimizer`]: rewrites and the push-down split
//! - [`provider`]: the provider contract, bridge and in-memory provider
//! - [`engine`]: physical operators and the async sequence
//!
//! This crate adds the typed surface: [`QueryAdapter`], [`AsyncQueryable`],
//! [`Selector`], [`Comparer`] and [`Sequence`].

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod adapter;
mod comparer;
mod grouping;
pub mod queryable;
pub mod reference;
mod selector;
mod sequence;

pub use common_config as config;
pub use common_error as error;
pub use arq_core as core;
pub use arq_engine as engine;
pub use arq_logical as logical;
pub use arq_optimizer as optimizer;
pub use arq_provider as provider;

pub use adapter::QueryAdapter;
pub use comparer::{Comparer, EqualityComparer, FnComparer};
pub use grouping::Grouping;
pub use queryable::AsyncQueryable;
pub use selector::Selector;
pub use sequence::Sequence;

pub use arq_core::{CancellationHandle, CancellationToken, Element};
pub use arq_engine::SequenceState;
pub use common_error::{ArqError, ArqResult, ErrorKind};

/// Arq version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
