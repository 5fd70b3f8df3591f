//! # Menu Promo Repository
//!
//! Banners at the top of the customer menu. Image files live in external
//! storage; only their public URLs are stored here.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use kopi_core::MenuPromo;

const PROMO_COLUMNS: &str =
    "id, title, description, image_url, active, sort_order, starts_at, ends_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

impl PromoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    /// Every promo in display order. Filtering by schedule is the caller's job
    /// (see `MenuPromo::is_live`).
    pub async fn list(&self) -> DbResult<Vec<MenuPromo>> {
        let promos = sqlx::query_as::<_, MenuPromo>(&format!(
            "SELECT {PROMO_COLUMNS} FROM menu_promos ORDER BY sort_order, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(promos)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuPromo>> {
        let promo = sqlx::query_as::<_, MenuPromo>(&format!("SELECT {PROMO_COLUMNS} FROM menu_promos WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(promo)
    }

    pub async fn insert(&self, promo: &MenuPromo) -> DbResult<()> {
        debug!(id = %promo.id, title = %promo.title, "Inserting menu promo");

        sqlx::query(&format!(
            "INSERT INTO menu_promos ({PROMO_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ))
        .bind(&promo.id)
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(&promo.image_url)
        .bind(promo.active)
        .bind(promo.sort_order)
        .bind(promo.starts_at)
        .bind(promo.ends_at)
        .bind(promo.created_at)
        .bind(promo.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overwrites every editable field and bumps `updated_at`.
    pub async fn update(&self, promo: &MenuPromo) -> DbResult<MenuPromo> {
        debug!(id = %promo.id, "Updating menu promo");

        let updated = sqlx::query_as::<_, MenuPromo>(&format!(
            r#"
            UPDATE menu_promos SET
                title = ?2, description = ?3, image_url = ?4, active = ?5,
                sort_order = ?6, starts_at = ?7, ends_at = ?8, updated_at = ?9
            WHERE id = ?1
            RETURNING {PROMO_COLUMNS}
            "#
        ))
        .bind(&promo.id)
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(&promo.image_url)
        .bind(promo.active)
        .bind(promo.sort_order)
        .bind(promo.starts_at)
        .bind(promo.ends_at)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("Menu promo", &promo.id))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM menu_promos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Menu promo", id));
        }
        Ok(())
    }
}
