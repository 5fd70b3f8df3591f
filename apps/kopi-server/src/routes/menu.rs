//! Customer menu.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use kopi_core::{Category, MenuPromo};
use kopi_db::MenuEntry;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/menu", get(menu))
        .route("/products/{id}", get(product))
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub store_name: String,
    pub currency_symbol: String,
    pub categories: Vec<Category>,
    pub items: Vec<MenuEntry>,
    /// Promos currently inside their schedule.
    pub promos: Vec<MenuPromo>,
}

#[tracing::instrument(name = "GET /api/menu", skip(state))]
async fn menu(State(state): State<AppState>) -> ApiResult<Json<MenuResponse>> {
    let now = Utc::now();
    let categories = state.db.products().list_categories().await?;
    let items = state.db.products().menu().await?;
    let promos = state
        .db
        .promos()
        .list()
        .await?
        .into_iter()
        .filter(|p| p.is_live(now))
        .collect();

    Ok(Json(MenuResponse {
        store_name: state.config.store.name.clone(),
        currency_symbol: state.config.store.currency_symbol.clone(),
        categories,
        items,
        promos,
    }))
}

/// One product with its active sizes and add-ons. Inactive products are
/// reported as not found.
#[tracing::instrument(name = "GET /api/products/{id}", skip(state))]
async fn product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<MenuEntry>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .filter(|p| p.active)
        .ok_or_else(|| ApiError::not_found("Product", &id))?;

    let sizes = state.db.products().active_sizes_for(&id).await?;
    let add_ons = state.db.products().add_ons_for(&id).await?.into_iter().filter(|a| a.active).collect();

    Ok(Json(MenuEntry { product, sizes, add_ons }))
}
