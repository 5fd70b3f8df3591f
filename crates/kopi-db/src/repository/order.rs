//! # Order Repository
//!
//! Orders are written once at submission; afterwards only the status and
//! `updated_at` change.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. INSERT                                                              │
//! │     └── insert(&order)  items + split payments as JSON snapshots        │
//! │                                                                         │
//! │  2. STATUS CHANGES (kitchen, cashier)                                   │
//! │     └── update_status(id, from, to)                                     │
//! │         compare-and-set on the current status, so two screens racing    │
//! │         on the same order cannot both win                               │
//! │                                                                         │
//! │  3. READS                                                               │
//! │     ├── get_by_id / list_by_status (kitchen, tracking)                  │
//! │     └── most_frequent_tables (table picker)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use kopi_core::{DiningType, Order, OrderSource, OrderStatus, PaymentMethod};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    source: OrderSource,
    table_number: Option<String>,
    dining_type: DiningType,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    items: String,
    subtotal_sen: i64,
    fees_total_sen: i64,
    discount_sen: i64,
    discount_code: Option<String>,
    discount_reason: Option<String>,
    total_sen: i64,
    status: OrderStatus,
    payment_method: PaymentMethod,
    payment_proof_url: Option<String>,
    cash_received_sen: Option<i64>,
    change_sen: Option<i64>,
    split_payments: String,
    notes: Option<String>,
    reservation_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            source: row.source,
            table_number: row.table_number,
            dining_type: row.dining_type,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            items: from_json(&row.items)?,
            subtotal_sen: row.subtotal_sen,
            fees_total_sen: row.fees_total_sen,
            discount_sen: row.discount_sen,
            discount_code: row.discount_code,
            discount_reason: row.discount_reason,
            total_sen: row.total_sen,
            status: row.status,
            payment_method: row.payment_method,
            payment_proof_url: row.payment_proof_url,
            cash_received_sen: row.cash_received_sen,
            change_sen: row.change_sen,
            split_payments: from_json(&row.split_payments)?,
            notes: row.notes,
            reservation_at: row.reservation_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, order_number, source, table_number, dining_type, customer_name, \
     customer_phone, items, subtotal_sen, fees_total_sen, discount_sen, discount_code, discount_reason, \
     total_sen, status, payment_method, payment_proof_url, cash_received_sen, change_sen, split_payments, \
     notes, reservation_at, created_at, updated_at";

/// How often a table shows up in past dine-in orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TableFrequency {
    pub table_number: String,
    pub order_count: i64,
}

/// Name and phone taken from an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a new order.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - order number already taken
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, order_number = %order.order_number, "Inserting order");

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
        ))
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.source)
        .bind(&order.table_number)
        .bind(order.dining_type)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(to_json(&order.items)?)
        .bind(order.subtotal_sen)
        .bind(order.fees_total_sen)
        .bind(order.discount_sen)
        .bind(&order.discount_code)
        .bind(&order.discount_reason)
        .bind(order.total_sen)
        .bind(order.status)
        .bind(order.payment_method)
        .bind(&order.payment_proof_url)
        .bind(order.cash_received_sen)
        .bind(order.change_sen)
        .bind(to_json(&order.split_payments)?)
        .bind(&order.notes)
        .bind(order.reservation_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    pub async fn require(&self, id: &str) -> DbResult<Order> {
        self.get_by_id(id).await?.ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Orders currently in any of `statuses`, oldest first.
    pub async fn list_by_status(&self, statuses: &[OrderStatus]) -> DbResult<Vec<Order>> {
        let wanted: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status IN (SELECT value FROM json_each(?1)) \
             ORDER BY created_at ASC"
        ))
        .bind(to_json(&wanted)?)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// The `limit` newest orders in any of `statuses`, newest first.
    pub async fn list_by_status_recent(&self, statuses: &[OrderStatus], limit: u32) -> DbResult<Vec<Order>> {
        let wanted: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status IN (SELECT value FROM json_each(?1)) \
             ORDER BY created_at DESC LIMIT ?2"
        ))
        .bind(to_json(&wanted)?)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Most recent orders first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Moves an order from `from` to `to`.
    ///
    /// The update only applies while the stored status is still `from`;
    /// the caller validates the transition itself.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such order
    /// * `Err(DbError::ConstraintViolation)` - status changed since it was read
    pub async fn update_status(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, from = %from, to = %to, "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(from)
            .bind(to)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                None => Err(DbError::not_found("Order", id)),
                Some(current) => Err(DbError::ConstraintViolation(format!(
                    "order {} is now {}, expected {}",
                    id, current.status, from
                ))),
            };
        }

        Ok(())
    }

    /// Tables ordered from most, for the quick-pick buttons on the POS.
    pub async fn most_frequent_tables(&self, limit: u32) -> DbResult<Vec<TableFrequency>> {
        let tables = sqlx::query_as::<_, TableFrequency>(
            r#"
            SELECT table_number, COUNT(*) AS order_count
            FROM orders
            WHERE table_number IS NOT NULL AND table_number != ''
            GROUP BY table_number
            ORDER BY order_count DESC, table_number ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    /// Distinct customer contacts found on past orders, with the name from
    /// each phone's most recent order.
    pub async fn customer_contacts(&self) -> DbResult<Vec<CustomerContact>> {
        let contacts = sqlx::query_as::<_, CustomerContact>(
            r#"
            SELECT o.customer_name AS name, o.customer_phone AS phone
            FROM orders o
            WHERE o.customer_phone IS NOT NULL
              AND o.customer_name IS NOT NULL
              AND o.created_at = (
                  SELECT MAX(created_at) FROM orders WHERE customer_phone = o.customer_phone
              )
            GROUP BY o.customer_phone
            ORDER BY o.customer_phone
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
