//! # Stock Repository
//!
//! Writes `products.stock_quantity` and the matching `stock_history` row in
//! one transaction. The movement itself is planned by `kopi_core::stock`.
//!
//! ## One Movement
//! ```text
//! BEGIN
//!   UPDATE products SET updated_at = now     ← take the write lock first
//!   SELECT stock_quantity                    ← previous
//!   kopi_core::stock::movement(previous, …)  ← sign + floor rules
//!   UPDATE products SET stock_quantity = new
//!   INSERT INTO stock_history (…)
//! COMMIT
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kopi_core::stock::{movement, sale_deduction, StockMovement};
use kopi_core::{StockChangeType, StockHistory};

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Records a restock, adjustment, waste, return or initial count.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such product
    /// * `Err(DbError::Domain(InvalidStockMovement))` - wrong sign or would go negative
    pub async fn record_movement(
        &self,
        product_id: &str,
        quantity_change: i64,
        change_type: StockChangeType,
        reason: Option<String>,
    ) -> DbResult<StockHistory> {
        let mut tx = self.pool.begin().await?;
        let previous = lock_quantity(&mut tx, product_id).await?;

        let planned = movement(product_id, previous, quantity_change, change_type, reason)?;
        let history = apply(&mut tx, planned).await?;

        tx.commit().await?;
        debug!(
            product_id = %product_id,
            change = history.quantity_change,
            new_quantity = history.new_quantity,
            "Stock movement recorded"
        );
        Ok(history)
    }

    /// Deducts units sold by `order_id`, floored at zero.
    pub async fn deduct_for_sale(&self, product_id: &str, quantity: i64, order_id: &str) -> DbResult<StockHistory> {
        let mut tx = self.pool.begin().await?;
        let previous = lock_quantity(&mut tx, product_id).await?;

        let planned = sale_deduction(product_id, previous, quantity, order_id);
        let history = apply(&mut tx, planned).await?;

        tx.commit().await?;
        debug!(
            product_id = %product_id,
            order_id = %order_id,
            sold = quantity,
            new_quantity = history.new_quantity,
            "Sale deducted from stock"
        );
        Ok(history)
    }

    /// Ledger rows for a product, newest first.
    pub async fn history(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT id, product_id, change_type, quantity_change, previous_quantity,
                   new_quantity, reason, reference_id, created_at
            FROM stock_history
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Touches the product row so this transaction holds the write lock, then
/// reads the current quantity.
async fn lock_quantity(tx: &mut Transaction<'_, Sqlite>, product_id: &str) -> DbResult<i64> {
    let touched = sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
        .bind(product_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
    if touched.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }

    let quantity: i64 = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(&mut **tx)
        .await?;
    Ok(quantity)
}

async fn apply(tx: &mut Transaction<'_, Sqlite>, planned: StockMovement) -> DbResult<StockHistory> {
    let history = planned.into_history(Uuid::new_v4().to_string(), Utc::now());

    sqlx::query("UPDATE products SET stock_quantity = ?2 WHERE id = ?1")
        .bind(&history.product_id)
        .bind(history.new_quantity)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_history (
            id, product_id, change_type, quantity_change, previous_quantity,
            new_quantity, reason, reference_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&history.id)
    .bind(&history.product_id)
    .bind(history.change_type)
    .bind(history.quantity_change)
    .bind(history.previous_quantity)
    .bind(history.new_quantity)
    .bind(&history.reason)
    .bind(&history.reference_id)
    .bind(history.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(history)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{db, product};
    use kopi_core::CoreError;

    #[tokio::test]
    async fn test_sale_deduction_floors_and_logs() {
        let db = db().await;
        db.products().insert(&product("kaya-toast", 550, 3, true)).await.unwrap();

        let row = db.stock().deduct_for_sale("kaya-toast", 5, "order-1").await.unwrap();
        assert_eq!(row.previous_quantity, 3);
        assert_eq!(row.quantity_change, -3);
        assert_eq!(row.new_quantity, 0);
        assert_eq!(row.change_type, StockChangeType::Sale);

        let product = db.products().require("kaya-toast").await.unwrap();
        assert_eq!(product.stock_quantity, 0);

        let history = db.stock().history("kaya-toast", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reference_id.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn test_restock_then_waste() {
        let db = db().await;
        db.products().insert(&product("croissant", 800, 2, true)).await.unwrap();

        db.stock()
            .record_movement("croissant", 10, StockChangeType::Restock, Some("morning delivery".to_string()))
            .await
            .unwrap();
        let waste = db
            .stock()
            .record_movement("croissant", -4, StockChangeType::Waste, Some("stale".to_string()))
            .await
            .unwrap();
        assert_eq!(waste.previous_quantity, 12);
        assert_eq!(waste.new_quantity, 8);

        let history = db.stock().history("croissant", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change_type, StockChangeType::Waste);
        for row in &history {
            assert_eq!(row.previous_quantity + row.quantity_change, row.new_quantity);
        }
    }

    #[tokio::test]
    async fn test_rejected_movement_leaves_stock_untouched() {
        let db = db().await;
        db.products().insert(&product("croissant", 800, 2, true)).await.unwrap();

        let err = db
            .stock()
            .record_movement("croissant", -5, StockChangeType::Adjustment, None)
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::InvalidStockMovement { .. }))
        ));
        assert_eq!(db.products().require("croissant").await.unwrap().stock_quantity, 2);
        assert!(db.stock().history("croissant", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = db().await;
        let err = db.stock().deduct_for_sale("ghost", 1, "order-1").await;
        assert!(matches!(err, Err(DbError::NotFound { .. })));
    }
}
