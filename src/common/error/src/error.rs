//! Core error types for Arq.

use thiserror::Error;

/// Result type alias using `ArqError`.
pub type ArqResult<T> = std::result::Result<T, ArqError>;

/// Generic boxed error for external error sources.
///
/// Provider failures and host selector failures arrive in this form and are
/// carried unchanged inside [`ArqError::ProviderExecution`] and
/// [`ArqError::SelectorFault`].
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-facing error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A mandatory composition argument was absent or unusable.
    ArgumentRejected,
    /// The source provider failed while executing a pushed-down query.
    ProviderExecution,
    /// A client-side selector or comparer failed.
    SelectorFault,
    /// Cancellation was observed.
    OperationCancelled,
    /// Anything else (internal failures, conversions, configuration).
    Other,
}

/// Core error type for Arq operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArqError {
    /// A mandatory argument of an operator was absent.
    ///
    /// Raised synchronously while composing a query, never during enumeration.
    #[error("ArgumentRejected: {operator} requires `{argument}`")]
    ArgumentRejected {
        /// Operator being composed.
        operator: String,
        /// Name of the rejected argument.
        argument: String,
    },

    /// The source provider failed while executing a pushed-down query.
    #[error("ProviderExecutionError: provider '{provider}' failed: {source}")]
    ProviderExecution {
        /// Provider name.
        provider: String,
        /// The provider's native failure, unchanged.
        #[source]
        source: GenericError,
    },

    /// A client-side selector invocation failed.
    #[error("SelectorFault: {selector} failed: {source}")]
    SelectorFault {
        /// Role of the selector (e.g. `result_selector`).
        selector: String,
        /// The host failure.
        #[source]
        source: GenericError,
    },

    /// Cancellation was observed between elements or before a selector call.
    #[error("OperationCancelled: {0}")]
    OperationCancelled(String),

    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Query execution error.
    #[error("ExecutionError: {0}")]
    ExecutionError(String),

    /// Invalid configuration.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Internal error (bug in Arq).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error.
    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ArqError {
    /// Create a new `ArgumentRejected` error.
    pub fn argument_rejected(operator: impl Into<String>, argument: impl Into<String>) -> Self {
        Self::ArgumentRejected {
            operator: operator.into(),
            argument: argument.into(),
        }
    }

    /// Wrap a provider failure.
    pub fn provider(provider: impl Into<String>, source: impl Into<GenericError>) -> Self {
        Self::ProviderExecution {
            provider: provider.into(),
            source: source.into(),
        }
    }

    /// Wrap a selector failure.
    pub fn selector_fault(selector: impl Into<String>, source: impl Into<GenericError>) -> Self {
        Self::SelectorFault {
            selector: selector.into(),
            source: source.into(),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        Self::OperationCancelled(msg.into())
    }

    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ExecutionError`.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a new `ConfigError`.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Classify this error into the caller-facing taxonomy.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ArgumentRejected { .. } => ErrorKind::ArgumentRejected,
            Self::ProviderExecution { .. } => ErrorKind::ProviderExecution,
            Self::SelectorFault { .. } => ErrorKind::SelectorFault,
            Self::OperationCancelled(_) => ErrorKind::OperationCancelled,
            _ => ErrorKind::Other,
        }
    }

    /// Whether this error reports observed cancellation.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::OperationCancelled(_))
    }

    /// Re-tag an error raised inside a host callback as a selector fault.
    ///
    /// Cancellation passes through untouched so that a cancellable selector
    /// observing its token is still reported as cancellation.
    pub fn into_selector_fault(self, selector: &str) -> Self {
        match self {
            Self::OperationCancelled(_) | Self::SelectorFault { .. } => self,
            other => Self::selector_fault(selector, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArqError::argument_rejected("GroupJoin", "inner");
        assert_eq!(err.to_string(), "ArgumentRejected: GroupJoin requires `inner`");

        let err = ArqError::type_error("expected Int32, got String");
        assert_eq!(err.to_string(), "TypeError: expected Int32, got String");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ArqError::argument_rejected("Select", "selector").kind(),
            ErrorKind::ArgumentRejected
        );
        assert_eq!(
            ArqError::provider("memory", "disk gone").kind(),
            ErrorKind::ProviderExecution
        );
        assert_eq!(
            ArqError::selector_fault("result_selector", "boom").kind(),
            ErrorKind::SelectorFault
        );
        assert_eq!(ArqError::cancelled("stop").kind(), ErrorKind::OperationCancelled);
        assert_eq!(ArqError::internal("bug").kind(), ErrorKind::Other);
    }

    #[test]
    fn test_provider_error_keeps_source() {
        let native = std::io::Error::other("connection reset");
        let err = ArqError::provider("memory", native);
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_into_selector_fault() {
        let err = ArqError::type_error("bad").into_selector_fault("key_selector");
        assert_eq!(err.kind(), ErrorKind::SelectorFault);

        let err = ArqError::cancelled("stop").into_selector_fault("key_selector");
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_supporting_variants_classify_as_other() {
        let errors = [
            ArqError::type_error("expected Int8"),
            ArqError::execution("comparer failed"),
            ArqError::config("execution.fetch_size must be at least 1"),
            ArqError::internal("bug"),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Other, "{err}");
            assert!(!err.is_cancelled());
        }
        assert_eq!(
            ArqError::config("provider.name must not be empty").to_string(),
            "ConfigError: provider.name must not be empty"
        );
    }
}
