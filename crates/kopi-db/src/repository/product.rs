//! # Product Repository
//!
//! Menu catalog: categories, products, sizes and add-ons.
//!
//! ## Menu Assembly
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products (active)        product_sizes           product_add_ons       │
//! │  ┌──────────────┐         ┌──────────────┐        ┌──────────────┐      │
//! │  │ latte  RM10  │◄────────│ latte  L 1.2×│        │ latte  +shot │      │
//! │  │ croissant RM8│         │ latte  M 1.0×│        │ latte  +oat  │      │
//! │  └──────────────┘         └──────────────┘        └──────────────┘      │
//! │          │                        │                       │             │
//! │          └───────────── grouped by product_id ────────────┘             │
//! │                                   ▼                                     │
//! │                          Vec<MenuEntry>                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{from_json, to_json};
use kopi_core::{AddOn, Category, Product, ProductSize, SizeName};

/// A product with the sizes and add-ons a customer can choose from.
#[derive(Debug, Clone, Serialize)]
pub struct MenuEntry {
    #[serde(flatten)]
    pub product: Product,
    pub sizes: Vec<ProductSize>,
    pub add_ons: Vec<AddOn>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: Option<String>,
    price_sen: i64,
    category_id: Option<String>,
    tags: String,
    allergens: String,
    stock_quantity: i64,
    track_stock: bool,
    show_in_kitchen: bool,
    active: bool,
    rating: Option<f64>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            id: row.id,
            name: row.name,
            description: row.description,
            price_sen: row.price_sen,
            category_id: row.category_id,
            tags: from_json(&row.tags)?,
            allergens: from_json(&row.allergens)?,
            stock_quantity: row.stock_quantity,
            track_stock: row.track_stock,
            show_in_kitchen: row.show_in_kitchen,
            active: row.active,
            rating: row.rating,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, price_sen, category_id, tags, allergens, \
     stock_quantity, track_stock, show_in_kitchen, active, rating, image_url, created_at, updated_at";

/// Repository for catalog reads and writes.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Active products, sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Gets a product by id, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Like [`get_by_id`](Self::get_by_id) but missing is an error.
    pub async fn require(&self, id: &str) -> DbResult<Product> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_sen, category_id, tags, allergens,
                stock_quantity, track_stock, show_in_kitchen, active, rating, image_url,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_sen)
        .bind(&product.category_id)
        .bind(to_json(&product.tags)?)
        .bind(to_json(&product.allergens)?)
        .bind(product.stock_quantity)
        .bind(product.track_stock)
        .bind(product.show_in_kitchen)
        .bind(product.active)
        .bind(product.rating)
        .bind(&product.image_url)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Ids of products the kitchen display should list.
    pub async fn kitchen_product_ids(&self) -> DbResult<HashSet<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM products WHERE show_in_kitchen = 1")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Sizes & Add-ons
    // =========================================================================

    /// Every size row of a product, active or not, oldest first.
    pub async fn sizes_for(&self, product_id: &str) -> DbResult<Vec<ProductSize>> {
        let sizes = sqlx::query_as::<_, ProductSize>(
            r#"
            SELECT id, product_id, size_name, price_multiplier_bps, price_override_sen, active
            FROM product_sizes
            WHERE product_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sizes)
    }

    /// Sizes a customer can pick: one active row per size name, cheapest first.
    pub async fn active_sizes_for(&self, product_id: &str) -> DbResult<Vec<ProductSize>> {
        Ok(first_active_per_name(self.sizes_for(product_id).await?))
    }

    /// The row behind a chosen size name.
    ///
    /// Duplicate names are not prevented by the schema; the oldest active row
    /// wins. Falls back to an inactive row so the caller can report the size
    /// as unavailable rather than unknown.
    pub async fn size_by_name(&self, product_id: &str, size_name: SizeName) -> DbResult<Option<ProductSize>> {
        let matching: Vec<ProductSize> = self
            .sizes_for(product_id)
            .await?
            .into_iter()
            .filter(|s| s.size_name == size_name)
            .collect();
        Ok(matching.iter().find(|s| s.active).or(matching.first()).cloned())
    }

    pub async fn add_ons_for(&self, product_id: &str) -> DbResult<Vec<AddOn>> {
        let add_ons = sqlx::query_as::<_, AddOn>(
            "SELECT id, product_id, name, price_sen, active FROM product_add_ons WHERE product_id = ?1 ORDER BY name",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(add_ons)
    }

    pub async fn insert_size(&self, size: &ProductSize) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_sizes (id, product_id, size_name, price_multiplier_bps, price_override_sen, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&size.id)
        .bind(&size.product_id)
        .bind(size.size_name)
        .bind(size.price_multiplier_bps)
        .bind(size.price_override_sen)
        .bind(size.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_add_on(&self, add_on: &AddOn) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO product_add_ons (id, product_id, name, price_sen, active) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&add_on.id)
        .bind(&add_on.product_id)
        .bind(&add_on.name)
        .bind(add_on.price_sen)
        .bind(add_on.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The full customer menu: every active product with its active sizes and
    /// add-ons. Three queries, grouped in memory.
    pub async fn menu(&self) -> DbResult<Vec<MenuEntry>> {
        let products = self.list_active().await?;

        let sizes = sqlx::query_as::<_, ProductSize>(
            r#"
            SELECT id, product_id, size_name, price_multiplier_bps, price_override_sen, active
            FROM product_sizes
            WHERE active = 1
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let add_ons = sqlx::query_as::<_, AddOn>(
            "SELECT id, product_id, name, price_sen, active FROM product_add_ons WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut sizes_by_product: HashMap<String, Vec<ProductSize>> = HashMap::new();
        for size in sizes {
            sizes_by_product.entry(size.product_id.clone()).or_default().push(size);
        }
        let mut add_ons_by_product: HashMap<String, Vec<AddOn>> = HashMap::new();
        for add_on in add_ons {
            add_ons_by_product.entry(add_on.product_id.clone()).or_default().push(add_on);
        }

        debug!(count = products.len(), "Menu loaded");

        Ok(products
            .into_iter()
            .map(|product| MenuEntry {
                sizes: first_active_per_name(sizes_by_product.remove(&product.id).unwrap_or_default()),
                add_ons: add_ons_by_product.remove(&product.id).unwrap_or_default(),
                product,
            })
            .collect())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, sort_order, active FROM categories WHERE active = 1 ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        sqlx::query("INSERT INTO categories (id, name, sort_order, active) VALUES (?1, ?2, ?3, ?4)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(category.sort_order)
            .bind(category.active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

/// Keeps the first active row of each size name, then orders by multiplier.
fn first_active_per_name(sizes: Vec<ProductSize>) -> Vec<ProductSize> {
    let mut chosen: Vec<ProductSize> = Vec::new();
    for size in sizes.into_iter().filter(|s| s.active) {
        if !chosen.iter().any(|c| c.size_name == size.size_name) {
            chosen.push(size);
        }
    }
    chosen.sort_by_key(|s| s.price_multiplier_bps);
    chosen
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{db, product, size};

    #[tokio::test]
    async fn test_insert_and_get_round_trips_json_columns() {
        let db = db().await;
        let mut latte = product("latte", 1000, 0, false);
        latte.allergens = vec!["milk".to_string()];
        db.products().insert(&latte).await.unwrap();

        let loaded = db.products().require("latte").await.unwrap();
        assert_eq!(loaded.price_sen, 1000);
        assert_eq!(loaded.tags, vec!["signature".to_string()]);
        assert_eq!(loaded.allergens, vec!["milk".to_string()]);
        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_menu_groups_sizes_and_add_ons() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&product("latte", 1000, 0, false)).await.unwrap();
        repo.insert(&product("croissant", 800, 10, true)).await.unwrap();
        repo.insert_size(&size("latte", SizeName::M, 10_000)).await.unwrap();
        repo.insert_size(&size("latte", SizeName::L, 12_000)).await.unwrap();
        repo.insert_add_on(&AddOn {
            id: "latte-shot".to_string(),
            product_id: "latte".to_string(),
            name: "Extra shot".to_string(),
            price_sen: 200,
            active: true,
        })
        .await
        .unwrap();

        let menu = repo.menu().await.unwrap();
        assert_eq!(menu.len(), 2);
        let latte = menu.iter().find(|m| m.product.id == "latte").unwrap();
        assert_eq!(latte.sizes.len(), 2);
        assert_eq!(latte.sizes[1].size_name, SizeName::L);
        assert_eq!(latte.add_ons.len(), 1);
        let croissant = menu.iter().find(|m| m.product.id == "croissant").unwrap();
        assert!(croissant.sizes.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_size_names_keep_first_active_row() {
        let db = db().await;
        let repo = db.products();
        repo.insert(&product("latte", 1000, 0, false)).await.unwrap();

        let mut retired = size("latte", SizeName::M, 9_000);
        retired.id = "latte-m-retired".to_string();
        retired.active = false;
        let mut second = size("latte", SizeName::M, 15_000);
        second.id = "latte-m-second".to_string();
        repo.insert_size(&retired).await.unwrap();
        repo.insert_size(&size("latte", SizeName::M, 10_000)).await.unwrap();
        repo.insert_size(&second).await.unwrap();
        repo.insert_size(&size("latte", SizeName::S, 8_000)).await.unwrap();

        let chosen = repo.size_by_name("latte", SizeName::M).await.unwrap().unwrap();
        assert_eq!(chosen.id, "latte-M");

        let menu = repo.menu().await.unwrap();
        let sizes: Vec<(SizeName, u32)> = menu[0].sizes.iter().map(|s| (s.size_name, s.price_multiplier_bps)).collect();
        assert_eq!(sizes, vec![(SizeName::S, 8_000), (SizeName::M, 10_000)]);
        assert_eq!(repo.active_sizes_for("latte").await.unwrap().len(), 2);

        assert!(repo.size_by_name("latte", SizeName::Xl).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kitchen_product_ids() {
        let db = db().await;
        let mut napkin = product("napkin-pack", 0, 0, false);
        napkin.show_in_kitchen = false;
        db.products().insert(&napkin).await.unwrap();
        db.products().insert(&product("latte", 1000, 0, false)).await.unwrap();

        let ids = db.products().kitchen_product_ids().await.unwrap();
        assert!(ids.contains("latte"));
        assert!(!ids.contains("napkin-pack"));
    }

    #[tokio::test]
    async fn test_categories() {
        let db = db().await;
        db.products()
            .insert_category(&Category {
                id: "coffee".to_string(),
                name: "Coffee".to_string(),
                sort_order: 1,
                active: true,
            })
            .await
            .unwrap();
        let categories = db.products().list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
    }
}
