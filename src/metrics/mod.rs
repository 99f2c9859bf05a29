// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Duration;

use crate::domain::order::OrderError;

// Re-export for public API
pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Order placement outcomes (placed, rejected by reason)
// - Per-operation latency for place/get/list/update/delete
// - Stock units reserved by placements
// - Database health as seen by the health monitor
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_placed: IntCounter,
    pub orders_deleted: IntCounter,
    pub order_failures: IntCounterVec,
    pub operation_duration: HistogramVec,
    pub stock_units_reserved: IntCounter,

    pub database_health_status: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_placed = IntCounter::new("orders_placed_total", "Total orders placed")?;
        registry.register(Box::new(orders_placed.clone()))?;

        let orders_deleted = IntCounter::new("orders_deleted_total", "Total orders deleted")?;
        registry.register(Box::new(orders_deleted.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_failures_total", "Order operations that returned an error"),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let stock_units_reserved = IntCounter::new(
            "stock_units_reserved_total",
            "Inventory units reserved by placed orders",
        )?;
        registry.register(Box::new(stock_units_reserved.clone()))?;

        let database_health_status = IntGauge::new(
            "database_health_status",
            "Database health status (0=Unhealthy, 1=Degraded, 2=Healthy)",
        )?;
        registry.register(Box::new(database_health_status.clone()))?;

        Ok(Self {
            registry,
            orders_placed,
            orders_deleted,
            order_failures,
            operation_duration,
            stock_units_reserved,
            database_health_status,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record latency of one operation and, when it failed, the failure reason.
    pub fn record_operation(&self, operation: &str, elapsed: Duration, error: Option<&OrderError>) {
        self.operation_duration
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());

        if let Some(error) = error {
            self.order_failures
                .with_label_values(&[operation, error.kind()])
                .inc();
        }
    }

    pub fn record_order_placed(&self, units: u64) {
        self.orders_placed.inc();
        self.stock_units_reserved.inc_by(units);
    }

    pub fn record_order_deleted(&self) {
        self.orders_deleted.inc();
    }

    pub fn set_database_health(&self, level: i64) {
        self.database_health_status.set(level);
    }
}
