//! Source provider layer for Arq.
//!
//! - [`SourceProvider`]: the synchronous, deferred query engine contract
//! - [`ProviderBridge`]: submits provider queries off the async runtime and
//!   exposes their rows through [`ResultHandle`]s
//! - [`MemoryProvider`]: an in-memory provider that executes every
//!   [`ProviderQuery`](arq_logical::ProviderQuery) form natively

mod bridge;
pub mod memory;
mod provider;

pub use bridge::{BridgeStats, ProviderBridge, ResultHandle};
pub use memory::{MemoryError, MemoryProvider, ProviderFailure};
pub use provider::{RowSet, SourceProvider};
