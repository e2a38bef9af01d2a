//! Per-operator execution metrics.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Metrics for a single operator within one enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorMetrics {
    /// Rows pulled from inputs.
    pub rows_in: u64,
    /// Rows produced.
    pub rows_out: u64,
    /// Selector invocations.
    pub selector_calls: u64,
    /// Time spent inside the operator, inputs included.
    pub exec_time: Duration,
}

impl OperatorMetrics {
    /// Create empty metrics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows_in: 0,
            rows_out: 0,
            selector_calls: 0,
            exec_time: Duration::ZERO,
        }
    }

    /// Add rows pulled.
    pub fn add_rows_in(&mut self, count: usize) {
        self.rows_in += count as u64;
    }

    /// Add rows produced.
    pub fn add_rows_out(&mut self, count: usize) {
        self.rows_out += count as u64;
    }

    /// Count selector invocations.
    pub fn add_selector_calls(&mut self, count: usize) {
        self.selector_calls += count as u64;
    }

    /// Add execution time.
    pub fn add_time(&mut self, duration: Duration) {
        self.exec_time += duration;
    }

    /// `rows_out / rows_in`, or 1.0 before any input.
    #[allow(clippy::cast_precision_loss)]
    pub fn selectivity(&self) -> f64 {
        if self.rows_in == 0 {
            1.0
        } else {
            self.rows_out as f64 / self.rows_in as f64
        }
    }
}

impl std::fmt::Display for OperatorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows_in={}, rows_out={}, selector_calls={}, time={:?}",
            self.rows_in, self.rows_out, self.selector_calls, self.exec_time
        )
    }
}

/// Shared sink collecting operator metrics, keyed by operator id.
#[derive(Debug, Clone, Default)]
pub struct MetricsSink {
    metrics: Arc<RwLock<BTreeMap<String, OperatorMetrics>>>,
}

impl MetricsSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update metrics of an operator in place.
    pub fn update<F>(&self, operator_id: &str, f: F)
    where
        F: FnOnce(&mut OperatorMetrics),
    {
        let mut guard = self
            .metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(guard.entry(operator_id.to_string()).or_default());
    }

    /// Metrics of one operator.
    pub fn get(&self, operator_id: &str) -> Option<OperatorMetrics> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(operator_id)
            .cloned()
    }

    /// All collected metrics.
    pub fn all(&self) -> BTreeMap<String, OperatorMetrics> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total selector invocations across operators.
    pub fn total_selector_calls(&self) -> u64 {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|m| m.selector_calls)
            .sum()
    }

    /// One line per operator, for explain-analyze style output.
    pub fn format_analyze(&self) -> String {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        let mut output = String::new();
        for (op, m) in metrics.iter() {
            let _ = writeln!(output, "{op}: {m}");
        }
        if output.is_empty() {
            output.push_str("No metrics collected.\n");
        }
        output
    }
}

/// Wall-clock timer for an operator step.
#[derive(Debug)]
pub struct ExecutionTimer {
    start: Instant,
}

impl ExecutionTimer {
    /// Start timing.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop and return elapsed time.
    #[must_use]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}
