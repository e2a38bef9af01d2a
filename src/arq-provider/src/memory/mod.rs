//! In-memory reference provider.
//!
//! Holds named collections of [`Value`](arq_core::Value)s and executes every
//! [`ProviderQuery`](arq_logical::ProviderQuery) form natively. It records
//! what was submitted and can inject failures, which makes it the provider
//! used by Arq's own tests.
//!
//! # Usage
//!
//! ```rust
//! use arq_core::Value;
//! use arq_logical::ProviderQuery;
//! use arq_provider::{MemoryProvider, SourceProvider};
//!
//! let provider = MemoryProvider::new()
//!     .with_collection("numbers", vec![Value::Int32(1), Value::Int32(2)]);
//!
//! let rows: Vec<_> = provider
//!     .execute(&ProviderQuery::scan("numbers"))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(provider.submissions(), 1);
//! ```

mod interpret;
mod provider;

pub use provider::{MemoryError, MemoryProvider, ProviderFailure};
