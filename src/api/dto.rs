use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{LineItemRequest, NewOrderHeader, PlaceOrder};

/// Body of `POST /order`. Any `total_price` or per-item `price` sent by the
/// client is not part of this shape and is dropped during decoding.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub order: NewOrderHeader,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(request: CreateOrderRequest) -> Self {
        PlaceOrder {
            header: request.order,
            items: request.items,
        }
    }
}

/// Query string of `GET /order`.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<Uuid>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

/// Success envelope shared by every JSON response.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}
