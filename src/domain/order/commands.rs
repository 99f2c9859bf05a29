use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_objects::{Coordinates, DeliveryStatus, OrderStatus};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================
//
// Identifiers are optional here because they arrive straight from client
// input; the command handler rejects missing ones before touching the store.
//
// ============================================================================

/// Header fields a client may supply when placing an order. There is no
/// total: the total is always computed from the line items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrderHeader {
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub address_name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub delivery_cost: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: String,
}

/// One requested line. Price is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Option<Uuid>,
    pub color_id: Option<Uuid>,
    pub quantity: i32,
}

impl LineItemRequest {
    pub fn new(product_id: Uuid, color_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id: Some(product_id),
            color_id: Some(color_id),
            quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub header: NewOrderHeader,
    pub items: Vec<LineItemRequest>,
}

/// Replacement values for the mutable header fields. The total is taken
/// as given; no re-pricing happens on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHeaderUpdate {
    #[serde(default)]
    pub address_name: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub total_price: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub delivery_cost: Decimal,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub payment_status: String,
}

/// A line that passed validation; every identifier is present and the
/// quantity is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: Uuid,
    pub color_id: Uuid,
    pub quantity: i32,
}
