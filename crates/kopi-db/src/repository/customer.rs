//! # Customer Repository
//!
//! Returning customers keyed by normalized phone number. Each submitted
//! order with a phone adds to the running totals.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kopi_core::{Customer, Money};

const CUSTOMER_COLUMNS: &str = "id, name, phone, total_spent_sen, total_orders, last_order_at, created_at";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Records an order against the customer with this phone, creating the
    /// customer on first order. Totals accumulate; the latest name wins.
    pub async fn record_order(
        &self,
        name: &str,
        phone: &str,
        order_total: Money,
        ordered_at: DateTime<Utc>,
    ) -> DbResult<Customer> {
        debug!(phone = %phone, total = %order_total, "Recording customer order");

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (id, name, phone, total_spent_sen, total_orders, last_order_at, created_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            ON CONFLICT(phone) DO UPDATE SET
                name = excluded.name,
                total_spent_sen = customers.total_spent_sen + excluded.total_spent_sen,
                total_orders = customers.total_orders + 1,
                last_order_at = excluded.last_order_at
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(phone)
        .bind(order_total.sen())
        .bind(ordered_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Creates the customer if the phone is new; never touches totals.
    ///
    /// ## Returns
    /// `true` when a row was inserted.
    pub async fn ensure(&self, name: &str, phone: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, total_spent_sen, total_orders, created_at)
            VALUES (?1, ?2, ?3, 0, 0, ?4)
            ON CONFLICT(phone) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(phone)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer =
            sqlx::query_as::<_, Customer>(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"))
                .bind(phone)
                .fetch_optional(&self.pool)
                .await?;
        Ok(customer)
    }

    pub async fn require_by_phone(&self, phone: &str) -> DbResult<Customer> {
        self.get_by_phone(phone)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", phone))
    }

    /// Best customers first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY total_spent_sen DESC, name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::db;

    #[tokio::test]
    async fn test_record_order_accumulates() {
        let db = db().await;
        let repo = db.customers();

        repo.record_order("Aisyah", "0123456789", Money::from_sen(1460), Utc::now())
            .await
            .unwrap();
        let customer = repo
            .record_order("Aisyah R.", "0123456789", Money::from_sen(2000), Utc::now())
            .await
            .unwrap();

        assert_eq!(customer.total_orders, 2);
        assert_eq!(customer.total_spent_sen, 3460);
        assert_eq!(customer.name, "Aisyah R.");
        assert_eq!(repo.list(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = db().await;
        let repo = db.customers();

        assert!(repo.ensure("Walk-in", "0100000000").await.unwrap());
        assert!(!repo.ensure("Walk-in again", "0100000000").await.unwrap());

        let customer = repo.require_by_phone("0100000000").await.unwrap();
        assert_eq!(customer.name, "Walk-in");
        assert_eq!(customer.total_orders, 0);
    }
}
