//! The source provider contract.

use std::fmt::Debug;

use arq_core::Value;
use arq_logical::ProviderQuery;
use common_config::CapabilityDescriptor;
use common_error::GenericError;

/// Rows produced by a provider, pulled synchronously.
///
/// A row-level `Err` ends the result set; rows before it are still
/// delivered.
pub type RowSet = Box<dyn Iterator<Item = Result<Value, GenericError>> + Send>;

/// A synchronous, deferred query engine.
///
/// Implementations are called from the blocking pool and may block freely.
/// `execute` is invoked at most once per fragment per enumeration and its
/// failures are surfaced unchanged.
pub trait SourceProvider: Send + Sync + Debug {
    /// Provider name used in logs and errors.
    fn name(&self) -> &str;

    /// What this provider executes natively.
    fn capabilities(&self) -> CapabilityDescriptor;

    /// Execute a provider-native query.
    fn execute(&self, query: &ProviderQuery) -> Result<RowSet, GenericError>;
}
