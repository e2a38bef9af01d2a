//! Selector descriptors: key, result, projection and predicate functions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use arq_core::{CancellationToken, Value};
use common_error::{ArqError, ArqResult, GenericError};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::expr::{Expr, ExprEvaluator};

/// Future returned by a selector callback.
pub type SelectorFuture = BoxFuture<'static, Result<Value, GenericError>>;

/// Uniform selector callback. The token is only meaningful for
/// [`SelectorShape::AsyncCancellable`].
pub type SelectorFn = Arc<dyn Fn(Value, CancellationToken) -> SelectorFuture + Send + Sync>;

/// How a selector is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorShape {
    /// Plain function, completes immediately.
    Sync,
    /// Single-step asynchronous function.
    Async,
    /// Asynchronous function that also observes the enumeration's
    /// cancellation token.
    AsyncCancellable,
}

impl fmt::Display for SelectorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
            Self::AsyncCancellable => write!(f, "async+cancel"),
        }
    }
}

/// A selector in one of the three invocation shapes.
///
/// A `Sync` selector may carry a declarative [`Expr`] body; only such
/// selectors can be pushed down to a provider. All shapes share one
/// asynchronous contract: [`Selector::invoke`].
#[derive(Clone)]
pub struct Selector {
    shape: SelectorShape,
    declarative: Option<Expr>,
    callback: SelectorFn,
}

impl Selector {
    /// A synchronous selector with no declarative form.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, GenericError> + Send + Sync + 'static,
    {
        Self {
            shape: SelectorShape::Sync,
            declarative: None,
            callback: Arc::new(move |value, _| futures::future::ready(f(value)).boxed()),
        }
    }

    /// A synchronous selector defined by a declarative expression.
    ///
    /// The in-process fallback evaluates the same expression.
    pub fn expr(expr: Expr) -> Self {
        let body = expr.clone();
        let callback: SelectorFn = Arc::new(move |value, _| {
            let result = ExprEvaluator::new()
                .evaluate(&body, &value)
                .map_err(GenericError::from);
            futures::future::ready(result).boxed()
        });
        Self {
            shape: SelectorShape::Sync,
            declarative: Some(expr),
            callback,
        }
    }

    /// A single-step asynchronous selector.
    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, GenericError>> + Send + 'static,
    {
        Self {
            shape: SelectorShape::Async,
            declarative: None,
            callback: Arc::new(move |value, _| f(value).boxed()),
        }
    }

    /// An asynchronous selector that receives the cancellation token.
    pub fn cancellable<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, GenericError>> + Send + 'static,
    {
        Self {
            shape: SelectorShape::AsyncCancellable,
            declarative: None,
            callback: Arc::new(move |value, token| f(value, token).boxed()),
        }
    }

    /// Attach a declarative form to this selector.
    ///
    /// Only synchronous selectors may carry one.
    pub fn with_declarative(mut self, expr: Expr) -> ArqResult<Self> {
        if self.shape != SelectorShape::Sync {
            return Err(ArqError::argument_rejected(
                format!("{} selector", self.shape),
                "declarative",
            ));
        }
        self.declarative = Some(expr);
        Ok(self)
    }

    /// Invocation shape.
    pub const fn shape(&self) -> SelectorShape {
        self.shape
    }

    /// Declarative body, if any.
    pub const fn declarative(&self) -> Option<&Expr> {
        self.declarative.as_ref()
    }

    /// Whether a provider could evaluate this selector.
    pub const fn is_pushable(&self) -> bool {
        matches!(self.shape, SelectorShape::Sync) && self.declarative.is_some()
    }

    /// Invoke the selector on one element.
    ///
    /// Checks `token` first. Host failures are reported as
    /// [`ArqError::SelectorFault`] tagged with `role`; cancellation observed
    /// by a cancellable selector stays `OperationCancelled`.
    pub async fn invoke(
        &self,
        role: &str,
        value: Value,
        token: &CancellationToken,
    ) -> ArqResult<Value> {
        token.ensure_not_cancelled(role)?;
        let token = match self.shape {
            SelectorShape::AsyncCancellable => token.clone(),
            SelectorShape::Sync | SelectorShape::Async => CancellationToken::none(),
        };
        (self.callback)(value, token)
            .await
            .map_err(|err| host_fault(role, err))
    }
}

fn host_fault(role: &str, err: GenericError) -> ArqError {
    match err.downcast::<ArqError>() {
        Ok(err) => (*err).into_selector_fault(role),
        Err(err) => ArqError::selector_fault(role, err),
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("shape", &self.shape)
            .field("declarative", &self.declarative)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declarative {
            Some(expr) => write!(f, "{expr}"),
            None => write!(f, "<{} fn>", self.shape),
        }
    }
}
