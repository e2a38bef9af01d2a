//! Typed cursor over a running query.

use std::fmt;
use std::marker::PhantomData;

use arq_core::Element;
use arq_engine::{AsyncSequence, MetricsSink, SequenceState};
use common_error::ArqResult;
use futures::StreamExt;
use futures::stream::BoxStream;

/// A cancellable, lazily started enumeration yielding `T`.
///
/// Mirrors [`AsyncSequence`]: call [`move_next`](Self::move_next) until it
/// returns `Ok(false)`. An element that cannot be converted to `T` faults the
/// sequence like any other failure.
pub struct Sequence<T> {
    inner: AsyncSequence,
    current: Option<T>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Element> Sequence<T> {
    pub(crate) fn new(inner: AsyncSequence) -> Self {
        Self {
            inner,
            current: None,
            _type: PhantomData,
        }
    }

    /// Lifecycle state of the underlying enumeration.
    pub fn state(&self) -> SequenceState {
        self.inner.state()
    }

    /// Element produced by the last successful `move_next`.
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// Move the current element out, leaving `None`.
    pub fn take_current(&mut self) -> Option<T> {
        self.current.take()
    }

    /// Operator metrics, when collection is enabled.
    pub fn metrics(&self) -> Option<&MetricsSink> {
        self.inner.metrics()
    }

    /// Advance to the next element.
    pub async fn move_next(&mut self) -> ArqResult<bool> {
        self.current = None;
        if !self.inner.move_next().await? {
            return Ok(false);
        }
        let Some(row) = self.inner.take_current() else {
            return Ok(false);
        };
        match T::from_value(row) {
            Ok(element) => {
                self.current = Some(element);
                Ok(true)
            }
            Err(err) => self.inner.fault(err).await,
        }
    }

    /// End the enumeration early and release its resources.
    pub async fn close(&mut self) {
        self.current = None;
        self.inner.close().await;
    }

    /// Stream view: yields each element, then the fault if one occurs.
    pub fn into_stream(self) -> BoxStream<'static, ArqResult<T>> {
        futures::stream::unfold(self, |mut sequence| async move {
            match sequence.move_next().await {
                Ok(true) => {
                    let element = sequence.take_current()?;
                    Some((Ok(element), sequence))
                }
                Ok(false) => None,
                Err(err) => Some((Err(err), sequence)),
            }
        })
        .boxed()
    }
}

impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
