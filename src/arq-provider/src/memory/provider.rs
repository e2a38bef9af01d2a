use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use arq_core::Value;
use arq_logical::ProviderQuery;
use common_config::CapabilityDescriptor;
use common_error::{ArqError, GenericError};
use log::debug;
use thiserror::Error;

use super::interpret::Interpreter;
use crate::provider::{RowSet, SourceProvider};

/// Native failures of the in-memory provider.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The query scans a collection that was never registered.
    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    /// A failure configured with [`MemoryProvider::with_failure`].
    #[error("{0}")]
    Injected(String),

    /// A declarative expression failed to evaluate.
    #[error(transparent)]
    Evaluation(#[from] ArqError),
}

/// A failure injected into scans of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    /// Fail as soon as the collection is scanned.
    OnSubmit(String),
    /// Deliver `rows` rows, then fail.
    AfterRows { rows: usize, message: String },
}

impl ProviderFailure {
    /// Fail when a query touching the collection is executed.
    pub fn on_submit(message: impl Into<String>) -> Self {
        Self::OnSubmit(message.into())
    }

    /// Fail after delivering `rows` rows of the collection.
    pub fn after_rows(rows: usize, message: impl Into<String>) -> Self {
        Self::AfterRows {
            rows,
            message: message.into(),
        }
    }
}

/// In-memory [`SourceProvider`].
///
/// All operations use interior mutability, so a shared provider can be
/// populated while adapters hold it.
#[derive(Debug)]
pub struct MemoryProvider {
    name: String,
    capabilities: CapabilityDescriptor,
    collections: RwLock<HashMap<String, Vec<Value>>>,
    failures: RwLock<HashMap<String, ProviderFailure>>,
    queries: Mutex<Vec<ProviderQuery>>,
}

impl MemoryProvider {
    /// Create an empty provider supporting every operator and expression.
    pub fn new() -> Self {
        Self::with_capabilities(CapabilityDescriptor::full())
    }

    /// Create an empty provider advertising `capabilities`.
    pub fn with_capabilities(capabilities: CapabilityDescriptor) -> Self {
        Self {
            name: "memory".to_string(),
            capabilities,
            collections: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Rename the provider.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a collection.
    #[must_use]
    pub fn with_collection(self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.insert(name, rows);
        self
    }

    /// Inject a failure into scans of `collection`.
    #[must_use]
    pub fn with_failure(self, collection: impl Into<String>, failure: ProviderFailure) -> Self {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.into(), failure);
        self
    }

    /// Register or replace a collection.
    pub fn insert(&self, name: impl Into<String>, rows: Vec<Value>) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), rows);
    }

    /// Remove any injected failure for `collection`.
    pub fn clear_failure(&self, collection: &str) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection);
    }

    /// Number of queries executed so far.
    pub fn submissions(&self) -> usize {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every query executed so far, in submission order.
    pub fn queries(&self) -> Vec<ProviderQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently executed query.
    pub fn last_query(&self) -> Option<ProviderQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Rows of a collection, with its injected failure applied.
    pub(super) fn scan(&self, collection: &str) -> Result<RowSet, MemoryError> {
        let failure = self
            .failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned();
        if let Some(ProviderFailure::OnSubmit(message)) = &failure {
            return Err(MemoryError::Injected(message.clone()));
        }

        let rows = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .cloned()
            .ok_or_else(|| MemoryError::UnknownCollection(collection.to_string()))?;

        match failure {
            Some(ProviderFailure::AfterRows { rows: limit, message }) => {
                let failing = rows
                    .into_iter()
                    .take(limit)
                    .map(Ok::<_, GenericError>)
                    .chain(std::iter::once_with(move || {
                        Err(GenericError::from(MemoryError::Injected(message)))
                    }));
                Ok(Box::new(failing))
            }
            _ => Ok(Box::new(rows.into_iter().map(Ok::<_, GenericError>))),
        }
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> CapabilityDescriptor {
        self.capabilities.clone()
    }

    fn execute(&self, query: &ProviderQuery) -> Result<RowSet, GenericError> {
        debug!(
            "Memory provider '{}' executing {} ({} operators)",
            self.name,
            query.name(),
            query.operator_count()
        );
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());

        Interpreter::new(self).rows(query).map_err(GenericError::from)
    }
}
