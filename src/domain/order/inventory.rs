use uuid::Uuid;

use super::commands::ValidatedLine;
use super::errors::OrderError;
use crate::store::StoreTransaction;

// ============================================================================
// Inventory Ledger
// ============================================================================
//
// Per-variant stock, always read under the caller's row lock and written
// back inside the same transaction. The count never goes below zero: a
// reservation that does not fit fails and leaves the count untouched.
//
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Check and decrement the stock of `line.color_id` by `line.quantity`.
    /// Returns the count left after the reservation.
    pub async fn try_reserve(
        &self,
        tx: &mut dyn StoreTransaction,
        line: &ValidatedLine,
    ) -> Result<i32, OrderError> {
        let available = tx
            .lock_variant_stock(line.product_id, line.color_id)
            .await?
            .ok_or_else(|| OrderError::variant_not_found(line.color_id))?;

        if available < line.quantity {
            tracing::warn!(
                color_id = %line.color_id,
                requested = line.quantity,
                available = available,
                "Stock reservation rejected"
            );
            return Err(OrderError::InsufficientStock {
                variant_id: line.color_id,
                requested: line.quantity,
                available,
            });
        }

        let remaining = available - line.quantity;
        tx.set_variant_stock(line.color_id, remaining).await?;

        tracing::debug!(
            color_id = %line.color_id,
            reserved = line.quantity,
            remaining = remaining,
            "Reserved stock"
        );

        Ok(remaining)
    }

    /// Give `quantity` units back to a variant. A variant that no longer
    /// exists is skipped; inventory rows are never created here.
    pub async fn release(
        &self,
        tx: &mut dyn StoreTransaction,
        product_id: Uuid,
        color_id: Uuid,
        quantity: i32,
    ) -> Result<(), OrderError> {
        let Some(available) = tx.lock_variant_stock(product_id, color_id).await? else {
            tracing::warn!(color_id = %color_id, quantity, "Variant missing, stock not restored");
            return Ok(());
        };

        tx.set_variant_stock(color_id, available.saturating_add(quantity))
            .await?;

        tracing::debug!(color_id = %color_id, released = quantity, "Released stock");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::OrderStore;
    use rust_decimal::Decimal;

    async fn variant(count: i32) -> (MemoryStore, ValidatedLine) {
        let store = MemoryStore::new();
        let product_id = store.add_product(Decimal::TEN).await;
        let color_id = store.add_variant(product_id, count).await;
        let line = ValidatedLine {
            product_id,
            color_id,
            quantity: 2,
        };
        (store, line)
    }

    #[tokio::test]
    async fn test_reserve_decrements_within_transaction() {
        let (store, line) = variant(5).await;
        let ledger = InventoryLedger::new();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(ledger.try_reserve(tx.as_mut(), &line).await.unwrap(), 3);
        tx.commit().await.unwrap();

        assert_eq!(store.stock(line.color_id).await, Some(3));
    }

    #[tokio::test]
    async fn test_reserve_exact_stock_reaches_zero() {
        let (store, line) = variant(2).await;
        let ledger = InventoryLedger::new();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(ledger.try_reserve(tx.as_mut(), &line).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reserve_rejects_when_short() {
        let (store, line) = variant(1).await;
        let ledger = InventoryLedger::new();

        let mut tx = store.begin().await.unwrap();
        let err = ledger.try_reserve(tx.as_mut(), &line).await.unwrap_err();
        match err {
            OrderError::InsufficientStock {
                variant_id,
                requested,
                available,
            } => {
                assert_eq!(variant_id, line.color_id);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        tx.commit().await.unwrap();
        assert_eq!(store.stock(line.color_id).await, Some(1));
    }

    #[tokio::test]
    async fn test_reserve_unknown_variant_is_not_found() {
        let (store, mut line) = variant(5).await;
        line.color_id = Uuid::new_v4();

        let mut tx = store.begin().await.unwrap();
        let err = InventoryLedger::new()
            .try_reserve(tx.as_mut(), &line)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::NotFound { entity: "Variant", .. }));
    }

    #[tokio::test]
    async fn test_release_restores_count() {
        let (store, line) = variant(1).await;

        let mut tx = store.begin().await.unwrap();
        InventoryLedger::new()
            .release(tx.as_mut(), line.product_id, line.color_id, 4)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock(line.color_id).await, Some(5));
    }

    #[tokio::test]
    async fn test_release_skips_missing_variant() {
        let (store, line) = variant(1).await;

        let mut tx = store.begin().await.unwrap();
        InventoryLedger::new()
            .release(tx.as_mut(), line.product_id, Uuid::new_v4(), 4)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.stock(line.color_id).await, Some(1));
    }
}
