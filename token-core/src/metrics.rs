//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring a token deployment.
//!
//! # Metrics
//!
//! - `token_calls_total` - Mutating calls committed
//! - `token_calls_rejected_total` - Mutating calls reverted
//! - `token_minted_total` - Smallest units minted (mint and sale)
//! - `token_burned_total` - Smallest units burned
//! - `token_total_supply` - Total supply, saturated at `i64::MAX`
//! - `token_call_duration_seconds` - Histogram of call latencies

use crate::types::{Balance, ContractEvent};
use prometheus::{Counter, Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Committed calls
    pub calls_total: IntCounter,

    /// Reverted calls
    pub calls_rejected: IntCounter,

    /// Minted units
    pub minted_total: Counter,

    /// Burned units
    pub burned_total: Counter,

    /// Supply gauge
    pub total_supply: IntGauge,

    /// Call duration histogram
    pub call_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let calls_total = IntCounter::new("token_calls_total", "Mutating calls committed")?;
        registry.register(Box::new(calls_total.clone()))?;

        let calls_rejected =
            IntCounter::new("token_calls_rejected_total", "Mutating calls reverted")?;
        registry.register(Box::new(calls_rejected.clone()))?;

        let minted_total = Counter::new("token_minted_total", "Smallest units minted")?;
        registry.register(Box::new(minted_total.clone()))?;

        let burned_total = Counter::new("token_burned_total", "Smallest units burned")?;
        registry.register(Box::new(burned_total.clone()))?;

        let total_supply = IntGauge::new("token_total_supply", "Total token supply")?;
        registry.register(Box::new(total_supply.clone()))?;

        let call_duration = Histogram::with_opts(
            HistogramOpts::new("token_call_duration_seconds", "Histogram of call latencies")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500]),
        )?;
        registry.register(Box::new(call_duration.clone()))?;

        Ok(Self {
            calls_total,
            calls_rejected,
            minted_total,
            burned_total,
            total_supply,
            call_duration,
            registry,
        })
    }

    /// Record a committed call and the supply movements in its events
    pub fn record_commit(&self, events: &[ContractEvent]) {
        self.calls_total.inc();

        for event in events {
            match event {
                ContractEvent::Transfer {
                    from: None, value, ..
                } => self.minted_total.inc_by(*value as f64),
                ContractEvent::Transfer { to: None, value, .. } => {
                    self.burned_total.inc_by(*value as f64)
                }
                _ => {}
            }
        }
    }

    /// Record a reverted call
    pub fn record_rejection(&self) {
        self.calls_rejected.inc();
    }

    /// Record call duration
    pub fn record_call_duration(&self, duration_seconds: f64) {
        self.call_duration.observe(duration_seconds);
    }

    /// Update supply gauge
    pub fn update_total_supply(&self, total_supply: Balance) {
        self.total_supply
            .set(i64::try_from(total_supply).unwrap_or(i64::MAX));
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
