#![allow(dead_code)]

use std::sync::Arc;

use arq::QueryAdapter;
use arq::config::ArqConfig;
use arq::core::{Element, Value};
use arq::provider::{MemoryProvider, SourceProvider};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn values<T: Element + Clone>(items: &[T]) -> Vec<Value> {
    items.iter().cloned().map(Element::into_value).collect()
}

/// A provider holding `outer` and `inner`, plus an empty collection.
pub fn provider<T: Element + Clone, U: Element + Clone>(outer: &[T], inner: &[U]) -> Arc<MemoryProvider> {
    Arc::new(
        MemoryProvider::new()
            .with_collection("outer", values(outer))
            .with_collection("inner", values(inner))
            .with_collection("empty", vec![]),
    )
}

pub fn adapter(provider: &Arc<MemoryProvider>, config: ArqConfig) -> QueryAdapter {
    let provider: Arc<dyn SourceProvider> = provider.clone();
    QueryAdapter::new(provider, config).unwrap()
}
