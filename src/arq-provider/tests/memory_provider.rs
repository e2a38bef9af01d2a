//! Bridge and in-memory provider working together.

use std::sync::Arc;

use arq_core::Value;
use arq_logical::{ProviderQuery, elem, lit};
use arq_provider::{MemoryProvider, ProviderBridge, ProviderFailure, SourceProvider};
use common_config::{CapabilityDescriptor, PushdownOperator};
use common_error::ErrorKind;

fn evens_query() -> ProviderQuery {
    ProviderQuery::Filter {
        input: Box::new(ProviderQuery::scan("numbers")),
        predicate: elem().rem(lit(2i64)).eq(lit(0i64)),
    }
}

fn numbers() -> Vec<Value> {
    (1..=10i64).map(Value::Int64).collect()
}

#[tokio::test]
async fn test_pushed_filter_through_bridge() {
    let provider = Arc::new(MemoryProvider::new().with_collection("numbers", numbers()));
    let bridge = ProviderBridge::new(provider.clone(), 3);

    let mut handle = bridge.execute(evens_query()).await.unwrap();
    let mut rows = Vec::new();
    while let Some(row) = handle.next_row().await.unwrap() {
        rows.push(row);
    }

    assert_eq!(
        rows,
        [2i64, 4, 6, 8, 10].map(Value::Int64).to_vec()
    );
    assert_eq!(provider.queries(), vec![evens_query()]);
    assert_eq!(bridge.stats().submissions(), 1);
}

#[tokio::test]
async fn test_dropping_handle_early_releases_it() {
    let provider = Arc::new(MemoryProvider::new().with_collection("numbers", numbers()));
    let bridge = ProviderBridge::new(provider, 2);

    let mut handle = bridge.execute(ProviderQuery::scan("numbers")).await.unwrap();
    assert_eq!(handle.next_row().await.unwrap(), Some(Value::Int64(1)));
    assert_eq!(bridge.stats().open_handles(), 1);

    drop(handle);
    assert_eq!(bridge.stats().open_handles(), 0);
    assert!(bridge.stats().rows_fetched() < 10);
}

#[tokio::test]
async fn test_provider_error_kind() {
    let provider = Arc::new(
        MemoryProvider::new()
            .with_collection("numbers", numbers())
            .with_failure("numbers", ProviderFailure::on_submit("connection reset")),
    );
    let bridge = ProviderBridge::new(provider, 16);

    let err = bridge.execute(evens_query()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderExecution);
    assert!(err.to_string().contains("connection reset"));
}

#[test]
fn test_advertised_capabilities() {
    let caps = CapabilityDescriptor::scan_only().with_operator(PushdownOperator::Take);
    let provider = MemoryProvider::with_capabilities(caps.clone()).with_name("archive");

    assert_eq!(provider.name(), "archive");
    assert_eq!(provider.capabilities(), caps);
}
