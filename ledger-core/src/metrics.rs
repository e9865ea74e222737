//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `ledger_expenses_recorded_total` - Expenses persisted
//! - `ledger_settlements_recorded_total` - Settlements persisted
//! - `ledger_summaries_total` - Group summaries recomputed
//! - `ledger_suggestions_total` - Simplified settlements emitted
//! - `ledger_recompute_duration_seconds` - Histogram of recompute latencies

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Expenses persisted
    pub expenses_recorded: IntCounter,

    /// Settlements persisted
    pub settlements_recorded: IntCounter,

    /// Summaries recomputed
    pub summaries_total: IntCounter,

    /// Suggested transfers emitted
    pub suggestions_total: IntCounter,

    /// Recompute duration histogram
    pub recompute_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let expenses_recorded = IntCounter::new(
            "ledger_expenses_recorded_total",
            "Total number of expenses recorded",
        )?;
        registry.register(Box::new(expenses_recorded.clone()))?;

        let settlements_recorded = IntCounter::new(
            "ledger_settlements_recorded_total",
            "Total number of settlements recorded",
        )?;
        registry.register(Box::new(settlements_recorded.clone()))?;

        let summaries_total = IntCounter::new(
            "ledger_summaries_total",
            "Total number of group summaries computed",
        )?;
        registry.register(Box::new(summaries_total.clone()))?;

        let suggestions_total = IntCounter::new(
            "ledger_suggestions_total",
            "Total number of simplified settlements suggested",
        )?;
        registry.register(Box::new(suggestions_total.clone()))?;

        let recompute_duration = Histogram::with_opts(
            HistogramOpts::new(
                "ledger_recompute_duration_seconds",
                "Histogram of ledger recompute latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(recompute_duration.clone()))?;

        Ok(Self {
            expenses_recorded,
            settlements_recorded,
            summaries_total,
            suggestions_total,
            recompute_duration,
            registry,
        })
    }

    /// Render all metrics in the Prometheus text format
    pub fn export(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("expenses_recorded", &self.expenses_recorded.get())
            .field("settlements_recorded", &self.settlements_recorded.get())
            .field("summaries_total", &self.summaries_total.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_independent() {
        let first = Metrics::new().unwrap();
        let second = Metrics::new().unwrap();

        first.expenses_recorded.inc();
        assert_eq!(first.expenses_recorded.get(), 1);
        assert_eq!(second.expenses_recorded.get(), 0);
    }

    #[test]
    fn test_export_contains_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.summaries_total.inc();
        metrics.recompute_duration.observe(0.002);

        let text = metrics.export();
        assert!(text.contains("ledger_summaries_total 1"));
        assert!(text.contains("ledger_recompute_duration_seconds"));
    }
}
