use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{OrderFilter, OrderStore, Page, StoreTransaction};
use crate::domain::order::{Order, OrderAggregate, OrderError, OrderItem};

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// A transaction holds the table lock from `begin` to `commit`/drop and
// works on a private copy, so transactions are fully serialized and an
// abandoned transaction leaves nothing behind.
//
// Fault injection knobs let tests break a transaction part-way through.
//
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Variant {
    product_id: Uuid,
    count: i32,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    prices: HashMap<Uuid, Decimal>,
    variants: HashMap<Uuid, Variant>,
    orders: HashMap<Uuid, Order>,
    items: Vec<(i32, OrderItem)>,
}

impl Tables {
    fn live_order(&self, id: Uuid) -> Option<&Order> {
        self.orders.get(&id).filter(|order| order.deleted_at.is_none())
    }

    fn aggregate(&self, order: &Order) -> OrderAggregate {
        let mut lines: Vec<&(i32, OrderItem)> = self
            .items
            .iter()
            .filter(|(_, item)| item.order_id == order.id)
            .collect();
        lines.sort_by_key(|(position, _)| *position);
        OrderAggregate::new(
            order.clone(),
            lines.into_iter().map(|(_, item)| item.clone()).collect(),
        )
    }
}

/// Sentinel for "never fail".
const NO_FAULT: usize = usize::MAX;

#[derive(Debug)]
struct Faults {
    /// Zero-based index of the item insert (within one transaction) that fails.
    fail_item_insert_at: AtomicUsize,
    /// Artificial latency applied to every price lookup, in milliseconds.
    price_latency_ms: AtomicUsize,
    /// Artificial latency applied to `find_order` and `list_orders`.
    read_latency_ms: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            fail_item_insert_at: AtomicUsize::new(NO_FAULT),
            price_latency_ms: AtomicUsize::new(0),
            read_latency_ms: AtomicUsize::new(0),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, price: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().await.prices.insert(id, price);
        id
    }

    pub async fn set_price(&self, product_id: Uuid, price: Decimal) {
        self.tables.lock().await.prices.insert(product_id, price);
    }

    pub async fn add_variant(&self, product_id: Uuid, count: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.tables
            .lock()
            .await
            .variants
            .insert(id, Variant { product_id, count });
        id
    }

    pub async fn stock(&self, color_id: Uuid) -> Option<i32> {
        self.tables.lock().await.variants.get(&color_id).map(|v| v.count)
    }

    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn item_count(&self) -> usize {
        self.tables.lock().await.items.len()
    }

    pub fn fail_item_insert_at(&self, index: usize) {
        self.faults.fail_item_insert_at.store(index, Ordering::SeqCst);
    }

    pub fn set_price_latency(&self, latency: Duration) {
        self.faults
            .price_latency_ms
            .store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn set_read_latency(&self, latency: Duration) {
        self.faults
            .read_latency_ms
            .store(latency.as_millis() as usize, Ordering::SeqCst);
    }

    async fn read_delay(&self) {
        let latency = self.faults.read_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, OrderError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            faults: self.faults.clone(),
            item_inserts: 0,
        }))
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderAggregate>, OrderError> {
        self.read_delay().await;
        let tables = self.tables.lock().await;
        Ok(tables.live_order(id).map(|order| tables.aggregate(order)))
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<(Vec<OrderAggregate>, i64), OrderError> {
        self.read_delay().await;
        let tables = self.tables.lock().await;
        let mut matching: Vec<&Order> = tables
            .orders
            .values()
            .filter(|order| order.deleted_at.is_none())
            .filter(|order| filter.customer_id.map_or(true, |c| order.customer_id == c))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let count = matching.len() as i64;
        let orders = matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|order| tables.aggregate(order))
            .collect();

        Ok((orders, count))
    }

    async fn ping(&self) -> Result<(), OrderError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Faults>,
    item_inserts: usize,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn product_price(&mut self, product_id: Uuid) -> Result<Option<Decimal>, OrderError> {
        let latency = self.faults.price_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency as u64)).await;
        }
        Ok(self.working.prices.get(&product_id).copied())
    }

    async fn lock_variant_stock(
        &mut self,
        product_id: Uuid,
        color_id: Uuid,
    ) -> Result<Option<i32>, OrderError> {
        Ok(self
            .working
            .variants
            .get(&color_id)
            .filter(|variant| variant.product_id == product_id)
            .map(|variant| variant.count))
    }

    async fn set_variant_stock(&mut self, color_id: Uuid, count: i32) -> Result<(), OrderError> {
        if let Some(variant) = self.working.variants.get_mut(&color_id) {
            variant.count = count;
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), OrderError> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_item(&mut self, position: i32, item: &OrderItem) -> Result<(), OrderError> {
        let index = self.item_inserts;
        self.item_inserts += 1;
        if index == self.faults.fail_item_insert_at.load(Ordering::SeqCst) {
            return Err(OrderError::Persistence(sqlx::Error::PoolClosed));
        }
        self.working.items.push((position, item.clone()));
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, OrderError> {
        Ok(self.working.live_order(id).cloned())
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), OrderError> {
        self.working.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let mut lines: Vec<&(i32, OrderItem)> = self
            .working
            .items
            .iter()
            .filter(|(_, item)| item.order_id == order_id)
            .collect();
        lines.sort_by_key(|(position, _)| *position);
        Ok(lines.into_iter().map(|(_, item)| item.clone()).collect())
    }

    async fn delete_order_items(&mut self, order_id: Uuid) -> Result<u64, OrderError> {
        let before = self.working.items.len();
        self.working.items.retain(|(_, item)| item.order_id != order_id);
        Ok((before - self.working.items.len()) as u64)
    }

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, OrderError> {
        Ok(self.working.orders.remove(&order_id).is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), OrderError> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), OrderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{new_order_header, NewOrderHeader};

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = MemoryStore::new();
        let product_id = store.add_product(Decimal::new(500, 2)).await;
        let color_id = store.add_variant(product_id, 4).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.set_variant_stock(color_id, 0).await.unwrap();
        }
        assert_eq!(store.stock(color_id).await, Some(4));

        let mut tx = store.begin().await.unwrap();
        tx.set_variant_stock(color_id, 1).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.stock(color_id).await, Some(1));
    }

    #[tokio::test]
    async fn test_soft_deleted_orders_are_invisible() {
        let store = MemoryStore::new();
        let customer_id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let mut order = new_order_header(
            Uuid::new_v4(),
            customer_id,
            &NewOrderHeader::default(),
            Decimal::new(1000, 2),
            now,
        );
        order.deleted_at = Some(now);

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.order_count().await, 1);

        assert!(store.find_order(order.id).await.unwrap().is_none());
        let filter = OrderFilter { customer_id: Some(customer_id) };
        let (orders, count) = store
            .list_orders(&filter, Page { offset: 0, limit: 10 })
            .await
            .unwrap();
        assert!(orders.is_empty());
        assert_eq!(count, 0);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.lock_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_variant_lock_checks_owning_product() {
        let store = MemoryStore::new();
        let product_id = store.add_product(Decimal::ONE).await;
        let color_id = store.add_variant(product_id, 2).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.lock_variant_stock(product_id, color_id).await.unwrap(), Some(2));
        assert_eq!(tx.lock_variant_stock(Uuid::new_v4(), color_id).await.unwrap(), None);
    }
}
