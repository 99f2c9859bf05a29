use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{OrderFilter, OrderStore, Page, StoreTransaction};
use crate::domain::order::{
    Coordinates, DeliveryStatus, Order, OrderAggregate, OrderError, OrderItem, OrderStatus,
};

// ============================================================================
// PostgreSQL Order Store
// ============================================================================
//
// Tables (see migrations/):
// - products     catalog price source
// - color        per-variant stock, `count` is the available quantity
// - orders       order headers
// - order_items  lines, ON DELETE CASCADE from orders
//
// All values are bound as parameters; no SQL is built from input.
//
// Reads that span several statements run in one REPEATABLE READ, READ ONLY
// transaction so a header and its items come from the same snapshot.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, customer_id, address_name, longitude, latitude, total_price, \
     status, delivery_status, delivery_cost, payment_method, payment_status, \
     created_at, updated_at, deleted_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, color_id, quantity, price, total, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    address_name: String,
    longitude: f64,
    latitude: f64,
    total_price: Decimal,
    status: String,
    delivery_status: String,
    delivery_cost: Decimal,
    payment_method: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = sqlx::Error;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Order {
            id: row.id,
            customer_id: row.customer_id,
            address_name: row.address_name,
            coordinates: Coordinates {
                longitude: row.longitude,
                latitude: row.latitude,
            },
            total_price: row.total_price,
            status,
            delivery_status: DeliveryStatus(row.delivery_status),
            delivery_cost: row.delivery_cost,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    color_id: Uuid,
    quantity: i32,
    price: Decimal,
    total: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            color_id: row.color_id,
            quantity: row.quantity,
            price: row.price,
            total: row.total,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, OrderError> {
    rows.into_iter()
        .map(|row| Order::try_from(row).map_err(OrderError::from))
        .collect()
}

// ============================================================================
// Read Statements
// ============================================================================

async fn fetch_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, OrderError> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Order::try_from).transpose().map_err(OrderError::from)
}

/// Items of the given orders, grouped by order and kept in line order.
async fn fetch_items(
    conn: &mut PgConnection,
    order_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<OrderItem>>, OrderError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_no"
    ))
    .bind(order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        items_by_order
            .entry(row.order_id)
            .or_default()
            .push(OrderItem::from(row));
    }
    Ok(items_by_order)
}

async fn count_orders(conn: &mut PgConnection, filter: &OrderFilter) -> Result<i64, OrderError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders
         WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR customer_id = $1)",
    )
    .bind(filter.customer_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

async fn fetch_order_page(
    conn: &mut PgConnection,
    filter: &OrderFilter,
    page: Page,
) -> Result<Vec<Order>, OrderError> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders
         WHERE deleted_at IS NULL AND ($1::uuid IS NULL OR customer_id = $1)
         ORDER BY created_at DESC, id DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(filter.customer_id)
    .bind(page.offset)
    .bind(page.limit)
    .fetch_all(&mut *conn)
    .await?;

    into_orders(rows)
}

// ============================================================================
// Store
// ============================================================================

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a read-only transaction pinned to one snapshot. Nothing is
    /// written through it, so commit and rollback are equivalent.
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, OrderError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, OrderError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<OrderAggregate>, OrderError> {
        let mut tx = self.begin_snapshot().await?;

        let Some(order) = fetch_order(&mut tx, id).await? else {
            tx.commit().await?;
            return Ok(None);
        };
        let mut items = fetch_items(&mut tx, &[id]).await?;
        tx.commit().await?;

        let items = items.remove(&id).unwrap_or_default();
        Ok(Some(OrderAggregate::new(order, items)))
    }

    async fn list_orders(
        &self,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<(Vec<OrderAggregate>, i64), OrderError> {
        let mut tx = self.begin_snapshot().await?;

        let count = count_orders(&mut tx, filter).await?;
        let orders = fetch_order_page(&mut tx, filter, page).await?;
        if orders.is_empty() {
            tx.commit().await?;
            return Ok((Vec::new(), count));
        }

        let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let mut items_by_order = fetch_items(&mut tx, &ids).await?;
        tx.commit().await?;

        let aggregates = orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderAggregate::new(order, items)
            })
            .collect();

        Ok((aggregates, count))
    }

    async fn ping(&self) -> Result<(), OrderError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// Wraps a sqlx transaction. Dropping it without `commit` rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn product_price(&mut self, product_id: Uuid) -> Result<Option<Decimal>, OrderError> {
        let row: Option<(Decimal,)> = sqlx::query_as("SELECT price FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(|(price,)| price))
    }

    async fn lock_variant_stock(
        &mut self,
        product_id: Uuid,
        color_id: Uuid,
    ) -> Result<Option<i32>, OrderError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT count FROM color WHERE id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(color_id)
        .bind(product_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(|(count,)| count))
    }

    async fn set_variant_stock(&mut self, color_id: Uuid, count: i32) -> Result<(), OrderError> {
        sqlx::query("UPDATE color SET count = $2, updated_at = NOW() WHERE id = $1")
            .bind(color_id)
            .bind(count)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), OrderError> {
        sqlx::query(
            "INSERT INTO orders (
                id, customer_id, address_name, longitude, latitude, total_price,
                status, delivery_status, delivery_cost, payment_method, payment_status,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(order.id)
        .bind(order.customer_id)
        .bind(&order.address_name)
        .bind(order.coordinates.longitude)
        .bind(order.coordinates.latitude)
        .bind(order.total_price)
        .bind(order.status.as_str())
        .bind(order.delivery_status.as_str())
        .bind(order.delivery_cost)
        .bind(&order.payment_method)
        .bind(&order.payment_status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order_item(&mut self, position: i32, item: &OrderItem) -> Result<(), OrderError> {
        sqlx::query(
            "INSERT INTO order_items (
                id, order_id, line_no, product_id, color_id, quantity, price, total,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(position)
        .bind(item.product_id)
        .bind(item.color_id)
        .bind(item.quantity)
        .bind(item.price)
        .bind(item.total)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, OrderError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Order::try_from).transpose().map_err(OrderError::from)
    }

    async fn save_order(&mut self, order: &Order) -> Result<(), OrderError> {
        sqlx::query(
            "UPDATE orders SET
                address_name = $2,
                longitude = $3,
                latitude = $4,
                total_price = $5,
                status = $6,
                delivery_status = $7,
                delivery_cost = $8,
                payment_method = $9,
                payment_status = $10,
                updated_at = $11
             WHERE id = $1",
        )
        .bind(order.id)
        .bind(&order.address_name)
        .bind(order.coordinates.longitude)
        .bind(order.coordinates.latitude)
        .bind(order.total_price)
        .bind(order.status.as_str())
        .bind(order.delivery_status.as_str())
        .bind(order.delivery_cost)
        .bind(&order.payment_method)
        .bind(&order.payment_status)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, OrderError> {
        let mut items = fetch_items(&mut self.tx, &[order_id]).await?;
        Ok(items.remove(&order_id).unwrap_or_default())
    }

    async fn delete_order_items(&mut self, order_id: Uuid) -> Result<u64, OrderError> {
        let result = sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_order(&mut self, order_id: Uuid) -> Result<bool, OrderError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), OrderError> {
        let PgTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), OrderError> {
        let PgTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

// ============================================================================
// Database Tests
// ============================================================================
//
// These need a disposable PostgreSQL database:
//   TEST_DATABASE_URL=postgres://... cargo test -- --ignored
//
// ============================================================================
