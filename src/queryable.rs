//! The typed, composable query surface.
//!
//! Composition never touches the provider. Every operator validates its
//! arguments immediately and returns `ArgumentRejected` for an absent one;
//! provider and selector failures are deferred to enumeration.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use arq_core::{CancellationToken, Element, ValueComparer};
use arq_logical::QueryNode;
use common_error::{ArqError, ArqResult};
use futures::stream::BoxStream;

use crate::adapter::QueryAdapter;
use crate::comparer::Comparer;
use crate::grouping::Grouping;
use crate::selector::Selector;
use crate::sequence::Sequence;

/// A deferred query producing elements of type `T`.
///
/// Immutable: each operator returns a new queryable sharing the chain so
/// far. Enumerating the same queryable twice runs it twice.
pub struct AsyncQueryable<T> {
    adapter: QueryAdapter,
    node: Arc<QueryNode>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Element> AsyncQueryable<T> {
    pub(crate) fn from_node(adapter: QueryAdapter, node: Arc<QueryNode>) -> Self {
        Self {
            adapter,
            node,
            _type: PhantomData,
        }
    }

    fn derive<R: Element>(&self, node: QueryNode) -> AsyncQueryable<R> {
        AsyncQueryable::from_node(self.adapter.clone(), Arc::new(node))
    }

    /// The untyped chain.
    pub fn node(&self) -> &Arc<QueryNode> {
        &self.node
    }

    /// The adapter this query is bound to.
    pub fn adapter(&self) -> &QueryAdapter {
        &self.adapter
    }

    /// Keep elements for which `predicate` returns `true`.
    pub fn filter(&self, predicate: Selector<T, bool>) -> ArqResult<Self> {
        filter(Some(self), Some(predicate))
    }

    /// Project each element.
    pub fn select<R: Element>(&self, selector: Selector<T, R>) -> ArqResult<AsyncQueryable<R>> {
        select(Some(self), Some(selector))
    }

    /// Correlate each element with all matching elements of `inner`.
    ///
    /// Every element of `self` yields exactly one result, in order; an
    /// element without matches sees an empty `Vec`. Null keys never match.
    pub fn group_join<U, K, R>(
        &self,
        inner: &AsyncQueryable<U>,
        outer_key: Selector<T, K>,
        inner_key: Selector<U, K>,
        result: Selector<(T, Vec<U>), R>,
    ) -> ArqResult<AsyncQueryable<R>>
    where
        U: Element,
        K: Element,
        R: Element,
    {
        group_join(
            Some(self),
            Some(inner),
            Some(outer_key),
            Some(inner_key),
            Some(result),
            None,
        )
    }

    /// [`group_join`](Self::group_join) with an explicit key comparer.
    pub fn group_join_with_comparer<U, K, R>(
        &self,
        inner: &AsyncQueryable<U>,
        outer_key: Selector<T, K>,
        inner_key: Selector<U, K>,
        result: Selector<(T, Vec<U>), R>,
        comparer: Comparer<K>,
    ) -> ArqResult<AsyncQueryable<R>>
    where
        U: Element,
        K: Element,
        R: Element,
    {
        group_join(
            Some(self),
            Some(inner),
            Some(outer_key),
            Some(inner_key),
            Some(result),
            Some(comparer),
        )
    }

    /// Pair each element with every matching element of `inner`.
    pub fn join<U, K, R>(
        &self,
        inner: &AsyncQueryable<U>,
        outer_key: Selector<T, K>,
        inner_key: Selector<U, K>,
        result: Selector<(T, U), R>,
    ) -> ArqResult<AsyncQueryable<R>>
    where
        U: Element,
        K: Element,
        R: Element,
    {
        join(
            Some(self),
            Some(inner),
            Some(outer_key),
            Some(inner_key),
            Some(result),
            None,
        )
    }

    /// [`join`](Self::join) with an explicit key comparer.
    pub fn join_with_comparer<U, K, R>(
        &self,
        inner: &AsyncQueryable<U>,
        outer_key: Selector<T, K>,
        inner_key: Selector<U, K>,
        result: Selector<(T, U), R>,
        comparer: Comparer<K>,
    ) -> ArqResult<AsyncQueryable<R>>
    where
        U: Element,
        K: Element,
        R: Element,
    {
        join(
            Some(self),
            Some(inner),
            Some(outer_key),
            Some(inner_key),
            Some(result),
            Some(comparer),
        )
    }

    /// Group elements by key, groups ordered by first occurrence.
    pub fn group_by<K: Element>(
        &self,
        key: Selector<T, K>,
    ) -> ArqResult<AsyncQueryable<Grouping<K, T>>> {
        group_by(Some(self), Some(key), None)
    }

    /// [`group_by`](Self::group_by) with an explicit key comparer.
    pub fn group_by_with_comparer<K: Element>(
        &self,
        key: Selector<T, K>,
        comparer: Comparer<K>,
    ) -> ArqResult<AsyncQueryable<Grouping<K, T>>> {
        group_by(Some(self), Some(key), Some(comparer))
    }

    /// Keep the first `count` elements.
    pub fn take(&self, count: usize) -> ArqResult<Self> {
        let node = QueryNode::try_take(Some(Arc::clone(&self.node)), count)?;
        Ok(self.derive(node))
    }

    /// A lazy cursor; nothing runs until the first `move_next`.
    pub fn sequence(&self) -> Sequence<T> {
        self.sequence_with_cancellation(CancellationToken::none())
    }

    /// Like [`sequence`](Self::sequence), observing `token`.
    pub fn sequence_with_cancellation(&self, token: CancellationToken) -> Sequence<T> {
        let executor = self.adapter.executor();
        Sequence::new(executor.sequence(Arc::clone(&self.node), token))
    }

    /// Enumerate to completion.
    pub async fn to_vec(&self) -> ArqResult<Vec<T>> {
        self.to_vec_with_cancellation(CancellationToken::none()).await
    }

    /// Like [`to_vec`](Self::to_vec), observing `token`.
    pub async fn to_vec_with_cancellation(&self, token: CancellationToken) -> ArqResult<Vec<T>> {
        let mut sequence = self.sequence_with_cancellation(token);
        let mut out = Vec::new();
        while sequence.move_next().await? {
            if let Some(element) = sequence.take_current() {
                out.push(element);
            }
        }
        Ok(out)
    }

    /// Enumerate to completion from synchronous code.
    ///
    /// Must not be called from inside an async context.
    pub fn to_vec_blocking(&self) -> ArqResult<Vec<T>> {
        common_runtime::block_on(self.to_vec())?
    }

    /// Elements as a stream, ending after the first error.
    pub fn stream(&self) -> BoxStream<'static, ArqResult<T>> {
        self.sequence().into_stream()
    }

    /// Logical chain, push-down split and physical operators.
    pub fn explain(&self) -> ArqResult<String> {
        self.adapter.executor().explain(&self.node)
    }
}

impl<T> Clone for AsyncQueryable<T> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            node: Arc::clone(&self.node),
            _type: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AsyncQueryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueryable")
            .field("adapter", &self.adapter.id())
            .field("node", &self.node.name())
            .finish()
    }
}

/// Resolve the sources of a binary operator to one adapter.
fn binary_sources<T, U>(
    operator: &str,
    outer: Option<&AsyncQueryable<T>>,
    inner: Option<&AsyncQueryable<U>>,
) -> ArqResult<(QueryAdapter, Option<Arc<QueryNode>>, Option<Arc<QueryNode>>)> {
    let outer = outer.ok_or_else(|| ArqError::argument_rejected(operator, "outer"))?;
    if let Some(inner) = inner {
        if !outer.adapter.same_as(&inner.adapter) {
            return Err(ArqError::argument_rejected(operator, "inner"));
        }
    }
    Ok((
        outer.adapter.clone(),
        Some(Arc::clone(&outer.node)),
        inner.map(|q| Arc::clone(&q.node)),
    ))
}

fn untyped_comparer<K: Element>(comparer: Option<Comparer<K>>) -> Option<Arc<dyn ValueComparer>> {
    comparer.map(Comparer::into_value_comparer)
}

/// `Where` with every argument optional.
pub fn filter<T: Element>(
    source: Option<&AsyncQueryable<T>>,
    predicate: Option<Selector<T, bool>>,
) -> ArqResult<AsyncQueryable<T>> {
    let source = source.ok_or_else(|| ArqError::argument_rejected("Where", "source"))?;
    let node = QueryNode::try_where(
        Some(Arc::clone(&source.node)),
        predicate.map(Selector::into_untyped),
    )?;
    Ok(source.derive(node))
}

/// `Select` with every argument optional.
pub fn select<T: Element, R: Element>(
    source: Option<&AsyncQueryable<T>>,
    selector: Option<Selector<T, R>>,
) -> ArqResult<AsyncQueryable<R>> {
    let source = source.ok_or_else(|| ArqError::argument_rejected("Select", "source"))?;
    let node = QueryNode::try_select(
        Some(Arc::clone(&source.node)),
        selector.map(Selector::into_untyped),
    )?;
    Ok(source.derive(node))
}

/// `GroupJoin` with every argument optional.
///
/// Arguments are checked in order (`outer`, `inner`, `outer_key_selector`,
/// `inner_key_selector`, `result_selector`) and the first absent one is
/// reported. An `inner` bound to another adapter is rejected as `inner`.
pub fn group_join<T, U, K, R>(
    outer: Option<&AsyncQueryable<T>>,
    inner: Option<&AsyncQueryable<U>>,
    outer_key: Option<Selector<T, K>>,
    inner_key: Option<Selector<U, K>>,
    result: Option<Selector<(T, Vec<U>), R>>,
    comparer: Option<Comparer<K>>,
) -> ArqResult<AsyncQueryable<R>>
where
    T: Element,
    U: Element,
    K: Element,
    R: Element,
{
    let (adapter, outer, inner) = binary_sources("GroupJoin", outer, inner)?;
    let node = QueryNode::try_group_join(
        outer,
        inner,
        outer_key.map(Selector::into_untyped),
        inner_key.map(Selector::into_untyped),
        result.map(Selector::into_untyped),
        untyped_comparer(comparer),
    )?;
    Ok(AsyncQueryable::from_node(adapter, Arc::new(node)))
}

/// `Join` with every argument optional, checked like [`group_join`].
pub fn join<T, U, K, R>(
    outer: Option<&AsyncQueryable<T>>,
    inner: Option<&AsyncQueryable<U>>,
    outer_key: Option<Selector<T, K>>,
    inner_key: Option<Selector<U, K>>,
    result: Option<Selector<(T, U), R>>,
    comparer: Option<Comparer<K>>,
) -> ArqResult<AsyncQueryable<R>>
where
    T: Element,
    U: Element,
    K: Element,
    R: Element,
{
    let (adapter, outer, inner) = binary_sources("Join", outer, inner)?;
    let node = QueryNode::try_join(
        outer,
        inner,
        outer_key.map(Selector::into_untyped),
        inner_key.map(Selector::into_untyped),
        result.map(Selector::into_untyped),
        untyped_comparer(comparer),
    )?;
    Ok(AsyncQueryable::from_node(adapter, Arc::new(node)))
}

/// `GroupBy` with every argument optional.
pub fn group_by<T: Element, K: Element>(
    source: Option<&AsyncQueryable<T>>,
    key: Option<Selector<T, K>>,
    comparer: Option<Comparer<K>>,
) -> ArqResult<AsyncQueryable<Grouping<K, T>>> {
    let source = source.ok_or_else(|| ArqError::argument_rejected("GroupBy", "source"))?;
    let node = QueryNode::try_group_by(
        Some(Arc::clone(&source.node)),
        key.map(Selector::into_untyped),
        untyped_comparer(comparer),
    )?;
    Ok(source.derive(node))
}

#[cfg(test)]
mod tests {
    use arq_core::Value;
    use arq_provider::MemoryProvider;
    use common_error::ErrorKind;

    use super::*;

    fn adapter() -> QueryAdapter {
        let provider = MemoryProvider::new()
            .with_collection("a", vec![Value::Int32(1)])
            .with_collection("b", vec![Value::Int32(1)]);
        QueryAdapter::with_defaults(Arc::new(provider)).unwrap()
    }

    #[test]
    fn test_inner_from_other_adapter_rejected() {
        let outer = adapter().source::<i32>("a").unwrap();
        let inner = adapter().source::<i32>("b").unwrap();
        let err = outer
            .join(
                &inner,
                Selector::identity(),
                Selector::identity(),
                Selector::sync(|(o, _): (i32, i32)| o),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "ArgumentRejected: Join requires `inner`");
    }

    #[test]
    fn test_absent_predicate_rejected() {
        let source = adapter().source::<i32>("a").unwrap();
        let err = filter(Some(&source), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentRejected);
        assert!(err.to_string().contains("predicate"));
    }

    #[test]
    fn test_composition_is_immutable() {
        let source = adapter().source::<i32>("a").unwrap();
        let taken = source.take(1).unwrap();
        assert_eq!(source.node().name(), "Source");
        assert_eq!(taken.node().name(), "Take");
    }
}
