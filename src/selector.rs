//! Typed selectors.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use arq_core::{CancellationToken, Element, Value};
use arq_logical::expr::{Expr, elem};
use common_error::{ArqResult, GenericError};

/// A selector from `T` to `R` in any of the three invocation shapes.
///
/// Wraps an untyped [`arq_logical::Selector`]; conversion between `T`/`R` and
/// [`Value`] happens at the callback boundary, so every shape and element
/// type goes through the same operator implementation.
pub struct Selector<T, R> {
    inner: arq_logical::Selector,
    _types: PhantomData<fn(T) -> R>,
}

impl<T: Element, R: Element> Selector<T, R> {
    fn wrap(inner: arq_logical::Selector) -> Self {
        Self {
            inner,
            _types: PhantomData,
        }
    }

    /// A plain synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        Self::try_sync(move |value| Ok(f(value)))
    }

    /// A synchronous function that may fail.
    pub fn try_sync<F>(f: F) -> Self
    where
        F: Fn(T) -> Result<R, GenericError> + Send + Sync + 'static,
    {
        Self::wrap(arq_logical::Selector::sync(move |value| {
            let input = T::from_value(value)?;
            f(input).map(Element::into_value)
        }))
    }

    /// A declarative selector the provider may evaluate natively.
    ///
    /// The expression is not type checked against `T` and `R`; a mismatch
    /// surfaces when results are converted.
    pub fn expr(expr: Expr) -> Self {
        Self::wrap(arq_logical::Selector::expr(expr))
    }

    /// A single-step asynchronous function.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, GenericError>> + Send + 'static,
    {
        Self::wrap(arq_logical::Selector::asynchronous(move |value: Value| {
            let pending = T::from_value(value).map(&f);
            async move {
                match pending {
                    Ok(output) => output.await.map(Element::into_value),
                    Err(err) => Err(GenericError::from(err)),
                }
            }
        }))
    }

    /// An asynchronous function observing the enumeration's cancellation.
    pub fn cancellable<F, Fut>(f: F) -> Self
    where
        F: Fn(T, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, GenericError>> + Send + 'static,
    {
        Self::wrap(arq_logical::Selector::cancellable(
            move |value: Value, token: CancellationToken| {
                let pending = T::from_value(value).map(|input| f(input, token));
                async move {
                    match pending {
                        Ok(output) => output.await.map(Element::into_value),
                        Err(err) => Err(GenericError::from(err)),
                    }
                }
            },
        ))
    }

    /// Attach a declarative form to a synchronous selector.
    ///
    /// Rejected with `ArgumentRejected` for asynchronous shapes.
    pub fn with_declarative(self, expr: Expr) -> ArqResult<Self> {
        self.inner.with_declarative(expr).map(Self::wrap)
    }

    /// The untyped selector.
    pub fn as_untyped(&self) -> &arq_logical::Selector {
        &self.inner
    }

    /// Consume into the untyped selector.
    pub fn into_untyped(self) -> arq_logical::Selector {
        self.inner
    }
}

impl<T: Element> Selector<T, T> {
    /// The element itself, pushable.
    pub fn identity() -> Self {
        Self::expr(elem())
    }
}

impl<T, R> Clone for Selector<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _types: PhantomData,
        }
    }
}

impl<T, R> fmt::Debug for Selector<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Selector").field(&self.inner).finish()
    }
}

impl<T, R> fmt::Display for Selector<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}
