//! Core data model for Arq.
//!
//! This crate provides the fundamental types shared by every layer:
//! - [`Value`] and [`DataType`], the dynamically typed element representation
//! - [`Element`], conversions between typed Rust values and [`Value`]
//! - [`ValueComparer`] and [`DefaultComparer`] for key equality
//! - [`Lookup`], the keyed grouping used for joins and grouping
//! - [`CancellationHandle`] and [`CancellationToken`]

mod cancel;
mod comparer;
mod element;
mod lookup;
pub mod types;

pub use cancel::{CancellationHandle, CancellationToken, WaitForCancellationFuture};
pub use comparer::{DefaultComparer, ValueComparer};
pub use element::Element;
pub use lookup::Lookup;
pub use types::{DataType, Value};
