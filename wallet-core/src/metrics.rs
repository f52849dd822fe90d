//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the wallet.
//!
//! # Metrics
//!
//! - `wallet_mutations_total` - Total committed balance mutations
//! - `wallet_idempotent_replays_total` - Mutations absorbed by replay
//! - `wallet_insufficient_balance_total` - Debits rejected by the invariant
//! - `wallet_auto_top_ups_total` - Top-ups synthesized by the funding guard
//! - `wallet_mutation_duration_seconds` - Histogram of mutation latencies

use crate::types::EntryKind;
use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total committed mutations
    pub mutations_total: IntCounter,

    /// Mutations absorbed by idempotent replay
    pub idempotent_replays_total: IntCounter,

    /// Debits rejected for insufficient balance
    pub insufficient_balance_total: IntCounter,

    /// Auto top-ups issued by the funding guard
    pub auto_top_ups_total: IntCounter,

    /// Mutation duration histogram
    pub mutation_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    ///
    /// Registers only into the crate-local registry, so independent
    /// ledgers in one process never collide.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let mutations_total = IntCounter::new(
            "wallet_mutations_total",
            "Total committed balance mutations",
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        let idempotent_replays_total = IntCounter::new(
            "wallet_idempotent_replays_total",
            "Mutations absorbed by idempotent replay",
        )?;
        registry.register(Box::new(idempotent_replays_total.clone()))?;

        let insufficient_balance_total = IntCounter::new(
            "wallet_insufficient_balance_total",
            "Debits rejected for insufficient balance",
        )?;
        registry.register(Box::new(insufficient_balance_total.clone()))?;

        let auto_top_ups_total = IntCounter::new(
            "wallet_auto_top_ups_total",
            "Top-ups synthesized by the funding guard",
        )?;
        registry.register(Box::new(auto_top_ups_total.clone()))?;

        let mutation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "wallet_mutation_duration_seconds",
                "Histogram of mutation latencies",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100]),
        )?;
        registry.register(Box::new(mutation_duration.clone()))?;

        Ok(Self {
            mutations_total,
            idempotent_replays_total,
            insufficient_balance_total,
            auto_top_ups_total,
            mutation_duration,
            registry,
        })
    }

    /// Record a committed mutation
    pub fn record_mutation(&self, kind: EntryKind) {
        self.mutations_total.inc();
        if kind == EntryKind::AutoTopUp {
            self.auto_top_ups_total.inc();
        }
    }

    /// Record an idempotent replay
    pub fn record_idempotent_replay(&self) {
        self.idempotent_replays_total.inc();
    }

    /// Record an insufficient-balance rejection
    pub fn record_insufficient_balance(&self) {
        self.insufficient_balance_total.inc();
    }

    /// Record mutation duration
    pub fn record_mutation_duration(&self, duration_seconds: f64) {
        self.mutation_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.mutations_total.get(), 0);
        assert_eq!(metrics.idempotent_replays_total.get(), 0);
    }

    #[test]
    fn test_record_mutation_counts_auto_top_up() {
        let metrics = Metrics::new().unwrap();
        metrics.record_mutation(EntryKind::TopUp);
        metrics.record_mutation(EntryKind::AutoTopUp);

        assert_eq!(metrics.mutations_total.get(), 2);
        assert_eq!(metrics.auto_top_ups_total.get(), 1);
    }

    #[test]
    fn test_record_insufficient_balance() {
        let metrics = Metrics::new().unwrap();
        metrics.record_insufficient_balance();
        assert_eq!(metrics.insufficient_balance_total.get(), 1);
    }
}
