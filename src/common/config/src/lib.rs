//! Configuration management for Arq.
//!
//! Provides the configuration an adapter is constructed from: execution
//! settings, rewrite settings and the description of what the source provider
//! can execute natively.

mod capabilities;

use std::path::Path;

use common_error::{ArqError, ArqResult};
use serde::{Deserialize, Serialize};

pub use capabilities::{CapabilityDescriptor, ExprFeature, PushdownOperator};

/// Global Arq configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArqConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
    /// Rewrite configuration.
    pub optimizer: OptimizerSettings,
    /// Source provider description.
    pub provider: ProviderConfig,
}

impl ArqConfig {
    /// Parse a configuration from JSON text.
    ///
    /// Missing sections fall back to their defaults.
    pub fn from_json_str(json: &str) -> ArqResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ArqResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ArqResult<()> {
        if self.execution.fetch_size == 0 {
            return Err(ArqError::config("execution.fetch_size must be at least 1"));
        }
        if self.optimizer.max_iterations == 0 {
            return Err(ArqError::config(
                "optimizer.max_iterations must be at least 1",
            ));
        }
        if self.provider.name.trim().is_empty() {
            return Err(ArqError::config("provider.name must not be empty"));
        }
        Ok(())
    }

    /// Replace the execution section.
    #[must_use]
    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    /// Replace the provider capability descriptor.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilityDescriptor) -> Self {
        self.provider.capabilities = capabilities;
        self
    }
}

/// Execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Number of provider rows fetched per blocking round trip.
    pub fetch_size: usize,
    /// Collect per-operator metrics.
    pub collect_metrics: bool,
    /// Whether any operator beyond source scans may be pushed down.
    pub pushdown: PushdownMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fetch_size: 256,
            collect_metrics: true,
            pushdown: PushdownMode::Enabled,
        }
    }
}

impl ExecutionConfig {
    /// Set the provider fetch size.
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Enable or disable metrics collection.
    #[must_use]
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.collect_metrics = enabled;
        self
    }

    /// Set the push-down mode.
    #[must_use]
    pub fn with_pushdown(mut self, pushdown: PushdownMode) -> Self {
        self.pushdown = pushdown;
        self
    }
}

/// Push-down mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushdownMode {
    /// Push down every operator the provider supports.
    #[default]
    Enabled,
    /// Only source scans reach the provider; everything else runs in-process.
    Disabled,
}

/// Rewrite configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Maximum fixed-point iterations of the rewrite rules.
    pub max_iterations: usize,
    /// Keep before/after explains of each applied rule.
    pub enable_trace: bool,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            enable_trace: false,
        }
    }
}

/// Source provider description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name used in logs and errors.
    pub name: String,
    /// Declarative constructs the provider executes natively.
    pub capabilities: CapabilityDescriptor,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "memory".to_string(),
            capabilities: CapabilityDescriptor::full(),
        }
    }
}
