//! # Fee Repository
//!
//! Service charges, SST and packaging fees. List order is the compounding
//! order, so fees come back oldest first.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use kopi_core::Fee;

#[derive(Debug, Clone)]
pub struct FeeRepository {
    pool: SqlitePool,
}

impl FeeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeeRepository { pool }
    }

    /// Active fees in application order.
    pub async fn list_active(&self) -> DbResult<Vec<Fee>> {
        let fees = sqlx::query_as::<_, Fee>(
            r#"
            SELECT id, name, fee_type, amount, applies_to, active, created_at
            FROM fees
            WHERE active = 1
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(fees)
    }

    pub async fn insert(&self, fee: &Fee) -> DbResult<()> {
        debug!(name = %fee.name, "Inserting fee");

        sqlx::query(
            r#"
            INSERT INTO fees (id, name, fee_type, amount, applies_to, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&fee.id)
        .bind(&fee.name)
        .bind(fee.fee_type)
        .bind(fee.amount)
        .bind(fee.applies_to)
        .bind(fee.active)
        .bind(fee.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;
    use chrono::{Duration, Utc};
    use kopi_core::{FeeScope, FeeType};

    #[tokio::test]
    async fn test_list_active_in_creation_order() {
        let db = db().await;
        let now = Utc::now();
        let fees = [
            ("service", FeeType::Percentage, 1000, true, now),
            ("packaging", FeeType::Fixed, 200, true, now + Duration::seconds(1)),
            ("old-tax", FeeType::Percentage, 600, false, now + Duration::seconds(2)),
        ];
        for (id, fee_type, amount, active, created_at) in fees {
            db.fees()
                .insert(&Fee {
                    id: id.to_string(),
                    name: id.to_string(),
                    fee_type,
                    amount,
                    applies_to: FeeScope::Both,
                    active,
                    created_at,
                })
                .await
                .unwrap();
        }

        let active = db.fees().list_active().await.unwrap();
        let ids: Vec<&str> = active.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["service", "packaging"]);
    }
}
