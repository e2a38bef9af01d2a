//! Async runtime utilities for Arq.
//!
//! Lets synchronous callers drive asynchronous sequences to completion.

use std::future::Future;

use common_error::{ArqError, ArqResult};
use tokio::runtime::Runtime;

/// Create a Tokio runtime for blocking operations.
fn get_runtime() -> ArqResult<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| ArqError::internal(format!("Failed to create runtime: {e}")))
}

/// Block on a future using a fresh runtime.
///
/// Must not be called from inside an async context.
pub fn block_on<F: Future>(future: F) -> ArqResult<F::Output> {
    let runtime = get_runtime()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on() {
        let value = block_on(async { 40 + 2 }).unwrap();
        assert_eq!(value, 42);
    }
}
