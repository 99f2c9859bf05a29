use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::aggregate::{
    check_money, new_order_header, validate_place_order, validate_update, OrderAggregate, OrderItem,
};
use super::commands::{NewOrderHeader, OrderHeaderUpdate, PlaceOrder, ValidatedLine};
use super::deadline::with_deadline;
use super::errors::OrderError;
use super::inventory::InventoryLedger;
use super::pricing::PricingResolver;
use crate::metrics::Metrics;
use crate::store::{OrderStore, StoreTransaction};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// The only place that decides commit vs. rollback for order writes.
//
// place:  validate → begin → (price → reserve → line total)* → header
//         → items → commit
// update: begin → lock header → replace fields → commit
// delete: begin → lock header → [restock] → delete items → delete header
//         → commit
//
// Any error after `begin` rolls the whole transaction back before it is
// returned. Nothing is retried.
//
// ============================================================================

/// Tunables for write operations.
#[derive(Debug, Clone, Copy)]
pub struct CommandSettings {
    /// Deadline for one whole operation, transaction included.
    pub request_timeout: Duration,
    /// Give deleted items' quantities back to their variants.
    pub restock_on_delete: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            restock_on_delete: false,
        }
    }
}

#[derive(Clone)]
pub struct OrderCommandHandler {
    store: Arc<dyn OrderStore>,
    ledger: InventoryLedger,
    pricing: PricingResolver,
    metrics: Arc<Metrics>,
    settings: CommandSettings,
}

impl OrderCommandHandler {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<Metrics>, settings: CommandSettings) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
            pricing: PricingResolver::new(),
            metrics,
            settings,
        }
    }

    // ------------------------------------------------------------------------
    // Place
    // ------------------------------------------------------------------------

    pub async fn place_order(&self, command: PlaceOrder) -> Result<OrderAggregate, OrderError> {
        let started = Instant::now();
        let result = self.with_deadline(self.place_order_inner(command)).await;
        self.metrics
            .record_operation("place_order", started.elapsed(), result.as_ref().err());

        if let Ok(aggregate) = &result {
            let units: i64 = aggregate.order_items.iter().map(|i| i64::from(i.quantity)).sum();
            self.metrics.record_order_placed(units.max(0) as u64);
        }
        result
    }

    async fn place_order_inner(&self, command: PlaceOrder) -> Result<OrderAggregate, OrderError> {
        let (customer_id, lines) = validate_place_order(&command)?;

        tracing::info!(
            customer_id = %customer_id,
            item_count = lines.len(),
            "Placing order"
        );

        let mut tx = self.store.begin().await?;
        match self
            .place_in_transaction(tx.as_mut(), customer_id, &command.header, &lines)
            .await
        {
            Ok(aggregate) => {
                tx.commit().await?;
                tracing::info!(
                    order_id = %aggregate.id(),
                    customer_id = %customer_id,
                    total_price = %aggregate.order.total_price,
                    "✅ Order placed"
                );
                Ok(aggregate)
            }
            Err(error) => {
                abort(tx, "place_order", &error).await;
                Err(error)
            }
        }
    }

    async fn place_in_transaction(
        &self,
        tx: &mut dyn StoreTransaction,
        customer_id: Uuid,
        header: &NewOrderHeader,
        lines: &[ValidatedLine],
    ) -> Result<OrderAggregate, OrderError> {
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let mut items = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;

        for line in lines {
            let unit_price = self.pricing.resolve_price(tx, line.product_id).await?;
            self.ledger.try_reserve(tx, line).await?;

            let item = OrderItem::priced(order_id, *line, unit_price, now);
            check_money("item total", item.total)?;
            total += item.total;
            items.push(item);
        }
        check_money("total_price", total)?;

        let order = new_order_header(order_id, customer_id, header, total, now);
        tx.insert_order(&order).await?;

        for (position, item) in items.iter().enumerate() {
            tx.insert_order_item(position as i32, item).await?;
        }

        Ok(OrderAggregate::new(order, items))
    }

    // ------------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------------

    pub async fn update_order(
        &self,
        order_id: Uuid,
        update: OrderHeaderUpdate,
    ) -> Result<OrderAggregate, OrderError> {
        let started = Instant::now();
        let result = self.with_deadline(self.update_order_inner(order_id, update)).await;
        self.metrics
            .record_operation("update_order", started.elapsed(), result.as_ref().err());
        result
    }

    async fn update_order_inner(
        &self,
        order_id: Uuid,
        update: OrderHeaderUpdate,
    ) -> Result<OrderAggregate, OrderError> {
        validate_update(&update)?;

        let mut tx = self.store.begin().await?;
        match update_in_transaction(tx.as_mut(), order_id, &update).await {
            Ok(aggregate) => {
                tx.commit().await?;
                tracing::info!(order_id = %order_id, status = %aggregate.order.status, "Order updated");
                Ok(aggregate)
            }
            Err(error) => {
                abort(tx, "update_order", &error).await;
                Err(error)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------------

    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), OrderError> {
        let started = Instant::now();
        let result = self.with_deadline(self.delete_order_inner(order_id)).await;
        self.metrics
            .record_operation("delete_order", started.elapsed(), result.as_ref().err());

        if result.is_ok() {
            self.metrics.record_order_deleted();
        }
        result
    }

    async fn delete_order_inner(&self, order_id: Uuid) -> Result<(), OrderError> {
        let mut tx = self.store.begin().await?;
        match self.delete_in_transaction(tx.as_mut(), order_id).await {
            Ok(removed_items) => {
                tx.commit().await?;
                tracing::info!(
                    order_id = %order_id,
                    removed_items,
                    restocked = self.settings.restock_on_delete,
                    "Order deleted"
                );
                Ok(())
            }
            Err(error) => {
                abort(tx, "delete_order", &error).await;
                Err(error)
            }
        }
    }

    async fn delete_in_transaction(
        &self,
        tx: &mut dyn StoreTransaction,
        order_id: Uuid,
    ) -> Result<u64, OrderError> {
        if tx.lock_order(order_id).await?.is_none() {
            return Err(OrderError::order_not_found(order_id));
        }

        if self.settings.restock_on_delete {
            for item in tx.order_items(order_id).await? {
                self.ledger
                    .release(tx, item.product_id, item.color_id, item.quantity)
                    .await?;
            }
        }

        let removed_items = tx.delete_order_items(order_id).await?;
        if !tx.delete_order(order_id).await? {
            return Err(OrderError::order_not_found(order_id));
        }

        Ok(removed_items)
    }

    async fn with_deadline<T>(
        &self,
        operation: impl Future<Output = Result<T, OrderError>>,
    ) -> Result<T, OrderError> {
        with_deadline(self.settings.request_timeout, operation).await
    }
}

async fn update_in_transaction(
    tx: &mut dyn StoreTransaction,
    order_id: Uuid,
    update: &OrderHeaderUpdate,
) -> Result<OrderAggregate, OrderError> {
    let mut order = tx
        .lock_order(order_id)
        .await?
        .ok_or_else(|| OrderError::order_not_found(order_id))?;

    order.apply_update(update, Utc::now());
    tx.save_order(&order).await?;

    let items = tx.order_items(order_id).await?;
    Ok(OrderAggregate::new(order, items))
}

/// Roll back after a failed step and log the cause. A failing rollback is
/// only logged: the original error is what the caller needs, and the
/// driver discards the transaction either way.
async fn abort(tx: Box<dyn StoreTransaction>, operation: &str, error: &OrderError) {
    if error.is_persistence() {
        tracing::error!(operation, error = %error, "Rolling back order transaction");
    } else {
        tracing::warn!(operation, error = %error, "Rolling back order transaction");
    }

    if let Err(rollback_error) = tx.rollback().await {
        tracing::error!(operation, error = %rollback_error, "Rollback failed");
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
