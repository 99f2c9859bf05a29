use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Order Errors
// ============================================================================
//
// Every failure the order core can report. Callers match on the variant,
// never on the rendered message.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// Malformed or semantically invalid input, rejected before any
    /// transaction is opened.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock {
        variant_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Operation exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn order_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Order", id }
    }

    pub fn product_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Product", id }
    }

    pub fn variant_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Variant", id }
    }

    /// Short machine-readable label, used for metrics and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::Persistence(_) => "persistence",
            Self::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }

    /// Store failures and deadline expiry are both reported as internal errors.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::DeadlineExceeded(_))
    }
}
