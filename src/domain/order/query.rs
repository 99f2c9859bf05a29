use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::aggregate::OrderAggregate;
use super::deadline::with_deadline;
use super::errors::OrderError;
use crate::metrics::Metrics;
use crate::store::{OrderFilter, OrderStore, Page};

/// One page of orders plus the total number matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPage {
    pub count: i64,
    pub orders: Vec<OrderAggregate>,
}

/// Page size limits applied to listings.
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl PageLimits {
    /// Resolve caller-supplied pagination. Missing values fall back to
    /// offset 0 and the default limit; a limit above the maximum is clamped.
    pub fn resolve(&self, offset: Option<i64>, limit: Option<i64>) -> Result<Page, OrderError> {
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(OrderError::validation("offset must not be negative"));
        }

        let limit = limit.unwrap_or(self.default_limit);
        if limit <= 0 {
            return Err(OrderError::validation("limit must be positive"));
        }

        Ok(Page {
            offset,
            limit: limit.min(self.max_limit),
        })
    }
}

/// Read side of the order core. Each read sees one committed snapshot and
/// is bounded by the same deadline as the write path.
#[derive(Clone)]
pub struct OrderQueryService {
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
    limits: PageLimits,
    request_timeout: Duration,
}

impl OrderQueryService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        metrics: Arc<Metrics>,
        limits: PageLimits,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            metrics,
            limits,
            request_timeout,
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderAggregate, OrderError> {
        let started = Instant::now();
        let result = with_deadline(self.request_timeout, self.store.find_order(order_id))
            .await
            .and_then(|found| found.ok_or_else(|| OrderError::order_not_found(order_id)));

        self.metrics
            .record_operation("get_order", started.elapsed(), result.as_ref().err());
        if let Err(e) = &result {
            tracing::debug!(order_id = %order_id, error = %e, "Order lookup failed");
        }
        result
    }

    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<OrderPage, OrderError> {
        let started = Instant::now();
        let result = with_deadline(
            self.request_timeout,
            self.list_orders_inner(&filter, offset, limit),
        )
        .await;
        self.metrics
            .record_operation("list_orders", started.elapsed(), result.as_ref().err());
        result
    }

    async fn list_orders_inner(
        &self,
        filter: &OrderFilter,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<OrderPage, OrderError> {
        let page = self.limits.resolve(offset, limit)?;
        let (orders, count) = self.store.list_orders(filter, page).await?;

        tracing::debug!(
            customer_id = ?filter.customer_id,
            offset = page.offset,
            limit = page.limit,
            returned = orders.len(),
            count,
            "Listed orders"
        );

        Ok(OrderPage { count, orders })
    }
}
