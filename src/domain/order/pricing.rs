use rust_decimal::Decimal;
use uuid::Uuid;

use super::errors::OrderError;
use crate::store::StoreTransaction;

/// Looks up the authoritative unit price of a product. The read happens
/// inside the caller's transaction and is never cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingResolver;

impl PricingResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve_price(
        &self,
        tx: &mut dyn StoreTransaction,
        product_id: Uuid,
    ) -> Result<Decimal, OrderError> {
        let price = tx
            .product_price(product_id)
            .await?
            .ok_or_else(|| OrderError::product_not_found(product_id))?;

        tracing::debug!(product_id = %product_id, price = %price, "Resolved unit price");
        Ok(price)
    }
}
