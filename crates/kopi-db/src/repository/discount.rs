//! # Discount Code Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use kopi_core::{DiningType, DiscountCode, DiscountType};

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: String,
    code: String,
    discount_type: DiscountType,
    value: i64,
    min_order_sen: i64,
    usage_limit: Option<i64>,
    usage_count: i64,
    expires_at: Option<DateTime<Utc>>,
    applies_to: String,
    active: bool,
}

impl TryFrom<DiscountRow> for DiscountCode {
    type Error = DbError;

    fn try_from(row: DiscountRow) -> DbResult<Self> {
        let applies_to: Vec<DiningType> = from_json(&row.applies_to)?;
        Ok(DiscountCode {
            id: row.id,
            code: row.code,
            discount_type: row.discount_type,
            value: row.value,
            min_order_sen: row.min_order_sen,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            expires_at: row.expires_at,
            applies_to,
            active: row.active,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Looks up a code. Codes are stored upper-case; `code` must already be
    /// normalized.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<DiscountCode>> {
        let row: Option<DiscountRow> = sqlx::query_as(
            r#"
            SELECT id, code, discount_type, value, min_order_sen, usage_limit,
                   usage_count, expires_at, applies_to, active
            FROM discount_codes
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DiscountCode::try_from).transpose()
    }

    pub async fn insert(&self, discount: &DiscountCode) -> DbResult<()> {
        debug!(code = %discount.code, "Inserting discount code");

        sqlx::query(
            r#"
            INSERT INTO discount_codes (
                id, code, discount_type, value, min_order_sen, usage_limit,
                usage_count, expires_at, applies_to, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(discount.discount_type)
        .bind(discount.value)
        .bind(discount.min_order_sen)
        .bind(discount.usage_limit)
        .bind(discount.usage_count)
        .bind(discount.expires_at)
        .bind(to_json(&discount.applies_to)?)
        .bind(discount.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Counts one more use of `code`.
    pub async fn increment_usage(&self, code: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE discount_codes SET usage_count = usage_count + 1 WHERE code = ?1")
            .bind(code)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount code", code));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;

    fn code(value: &str) -> DiscountCode {
        DiscountCode {
            id: format!("dc-{}", value),
            code: value.to_string(),
            discount_type: DiscountType::Percentage,
            value: 1000,
            min_order_sen: 5000,
            usage_limit: Some(100),
            usage_count: 0,
            expires_at: None,
            applies_to: vec![DiningType::Takeaway],
            active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_get_and_increment() {
        let db = db().await;
        db.discounts().insert(&code("KOPI10")).await.unwrap();

        db.discounts().increment_usage("KOPI10").await.unwrap();
        let loaded = db.discounts().get_by_code("KOPI10").await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 1);
        assert_eq!(loaded.applies_to, vec![DiningType::Takeaway]);
        assert!(db.discounts().get_by_code("NOPE").await.unwrap().is_none());
        assert!(matches!(
            db.discounts().increment_usage("NOPE").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
