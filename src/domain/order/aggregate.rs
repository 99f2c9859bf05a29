use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::{LineItemRequest, NewOrderHeader, OrderHeaderUpdate, PlaceOrder, ValidatedLine};
use super::errors::OrderError;
use super::value_objects::{Coordinates, DeliveryStatus, OrderStatus};

// ============================================================================
// Order Aggregate
// ============================================================================
//
// The order header plus the line items it owns. Built once by the command
// handler during placement, and rebuilt by the store on every read.
//
// ============================================================================

/// Persisted order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub address_name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub delivery_status: DeliveryStatus,
    pub delivery_cost: Decimal,
    pub payment_method: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Apply replacement header values in place.
    pub fn apply_update(&mut self, update: &OrderHeaderUpdate, now: DateTime<Utc>) {
        self.address_name = update.address_name.clone();
        self.coordinates = update.coordinates;
        self.total_price = update.total_price;
        self.status = update.status;
        self.delivery_cost = effective_delivery_cost(&update.delivery_status, update.delivery_cost);
        self.delivery_status = update.delivery_status.clone();
        self.payment_method = update.payment_method.clone();
        self.payment_status = update.payment_status.clone();
        self.updated_at = now;
    }
}

/// One line of an order. `price` is the catalog price copied at placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn priced(order_id: Uuid, line: ValidatedLine, unit_price: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            color_id: line.color_id,
            quantity: line.quantity,
            price: unit_price,
            total: line_total(unit_price, line.quantity),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAggregate {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

impl OrderAggregate {
    pub fn new(order: Order, order_items: Vec<OrderItem>) -> Self {
        Self { order, order_items }
    }

    pub fn id(&self) -> Uuid {
        self.order.id
    }

    /// Sum of the line totals. Equal to `order.total_price` for every order
    /// that has not been edited through an update.
    pub fn items_total(&self) -> Decimal {
        sum_line_totals(&self.order_items)
    }
}

// ============================================================================
// Business Rules
// ============================================================================

pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

pub fn sum_line_totals(items: &[OrderItem]) -> Decimal {
    items.iter().map(|item| item.total).sum()
}

/// Largest magnitude a stored money column holds: NUMERIC(14, 2).
pub fn max_money() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Reject amounts the store could not hold, so an oversized total is a
/// validation failure instead of a database error at insert time.
pub fn check_money(field: &str, value: Decimal) -> Result<(), OrderError> {
    if value.abs() > max_money() {
        return Err(OrderError::validation(format!(
            "{field} {value} exceeds the largest storable amount {}",
            max_money()
        )));
    }
    Ok(())
}

/// Postal orders never carry a delivery cost, whatever the client sent.
pub fn effective_delivery_cost(status: &DeliveryStatus, requested: Decimal) -> Decimal {
    if status.is_postal() {
        Decimal::ZERO
    } else {
        requested
    }
}

/// Build the header row for a new order from the client header and the
/// server-computed total.
pub fn new_order_header(
    id: Uuid,
    customer_id: Uuid,
    header: &NewOrderHeader,
    total_price: Decimal,
    now: DateTime<Utc>,
) -> Order {
    Order {
        id,
        customer_id,
        address_name: header.address_name.clone(),
        coordinates: header.coordinates,
        total_price,
        status: OrderStatus::Pending,
        delivery_status: header.delivery_status.clone(),
        delivery_cost: effective_delivery_cost(&header.delivery_status, header.delivery_cost),
        payment_method: header.payment_method.clone(),
        payment_status: header.payment_status.clone(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

/// Validate a placement request before any transaction is opened.
/// Returns the customer id and the validated lines in request order.
pub fn validate_place_order(command: &PlaceOrder) -> Result<(Uuid, Vec<ValidatedLine>), OrderError> {
    let customer_id = command
        .header
        .customer_id
        .ok_or_else(|| OrderError::validation("customer_id is required"))?;

    if command.header.delivery_cost < Decimal::ZERO {
        return Err(OrderError::validation("delivery_cost cannot be negative"));
    }
    check_money("delivery_cost", command.header.delivery_cost)?;

    if command.items.is_empty() {
        return Err(OrderError::validation("order must contain at least one item"));
    }

    command
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_line(index, item))
        .collect::<Result<Vec<_>, _>>()
        .map(|lines| (customer_id, lines))
}

fn validate_line(index: usize, item: &LineItemRequest) -> Result<ValidatedLine, OrderError> {
    let product_id = item
        .product_id
        .ok_or_else(|| OrderError::validation(format!("items[{index}]: product_id is required")))?;
    let color_id = item
        .color_id
        .ok_or_else(|| OrderError::validation(format!("items[{index}]: color_id is required")))?;

    if item.quantity <= 0 {
        return Err(OrderError::validation(format!(
            "items[{index}]: quantity must be positive, got {}",
            item.quantity
        )));
    }

    Ok(ValidatedLine {
        product_id,
        color_id,
        quantity: item.quantity,
    })
}

pub fn validate_update(update: &OrderHeaderUpdate) -> Result<(), OrderError> {
    if update.total_price < Decimal::ZERO {
        return Err(OrderError::validation("total_price cannot be negative"));
    }
    if update.delivery_cost < Decimal::ZERO {
        return Err(OrderError::validation("delivery_cost cannot be negative"));
    }
    check_money("total_price", update.total_price)?;
    check_money("delivery_cost", update.delivery_cost)
}

// ============================================================================
// Unit Tests
// ============================================================================
