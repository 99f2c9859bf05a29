// ============================================================================
// Order Store - Persistence Abstraction
// ============================================================================
//
// The order core only talks to storage through these two traits:
//
// - `OrderStore`: pool-level reads and the entry point for transactions
// - `StoreTransaction`: every write, scoped to one all-or-nothing unit
//
// A transaction that is dropped without `commit` must leave the store
// exactly as it was before `begin`.
//
// Implementations:
// - postgres: sqlx / PostgreSQL, row locks via SELECT ... FOR UPDATE
// - memory:   in-process tables for the test-suite
//
// ============================================================================

mod postgres;
#[cfg(test)]
pub mod memory;

pub use postgres::PgOrderStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::order::{Order, OrderAggregate, OrderError, OrderItem};

/// Filter applied to order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
}

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Open a transaction. Every write in the order core happens inside one.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, OrderError>;

    /// Load an order header and all of its items.
    async fn find_order(&self, id: Uuid) -> Result<Option<OrderAggregate>, OrderError>;

    /// Load one page of orders, newest first, plus the number of orders
    /// matching `filter` regardless of the page window.
    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<(Vec<OrderAggregate>, i64), OrderError>;

    /// Cheap round-trip used by the health monitor.
    async fn ping(&self) -> Result<(), OrderError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    /// Current catalog price of a product.
    async fn product_price(&mut self, product_id: Uuid) -> Result<Option<Decimal>, OrderError>;

    /// Read the available count of a product variant, locking the row
    /// until the transaction ends.
    async fn lock_variant_stock(
        &mut self,
        product_id: Uuid,
        color_id: Uuid,
    ) -> Result<Option<i32>, OrderError>;

    async fn set_variant_stock(&mut self, color_id: Uuid, count: i32) -> Result<(), OrderError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), OrderError>;

    /// Insert one line; `position` preserves the order lines were requested in.
    async fn insert_order_item(&mut self, position: i32, item: &OrderItem) -> Result<(), OrderError>;

    /// Read an order header, locking the row until the transaction ends.
    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, OrderError>;

    async fn save_order(&mut self, order: &Order) -> Result<(), OrderError>;

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError>;

    async fn delete_order_items(&mut self, order_id: Uuid) -> Result<u64, OrderError>;

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, OrderError>;

    async fn commit(self: Box<Self>) -> Result<(), OrderError>;

    async fn rollback(self: Box<Self>) -> Result<(), OrderError>;
}
