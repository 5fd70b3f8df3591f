//! Manual stock movements and the per-product ledger.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kopi_core::{StockChangeType, StockHistory};
use serde::Deserialize;
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_HISTORY_LIMIT: u32 = 50;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/{id}/stock", post(record_movement))
        .route("/products/{id}/stock-history", get(history))
}

#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub change_type: StockChangeType,
    pub quantity_change: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

#[tracing::instrument(name = "POST /api/products/{id}/stock", skip(state))]
async fn record_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<MovementRequest>,
) -> ApiResult<(StatusCode, Json<StockHistory>)> {
    let reason = request
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let row = state
        .db
        .stock()
        .record_movement(&id, request.quantity_change, request.change_type, reason)
        .await?;

    info!(
        product_id = %id,
        change_type = ?row.change_type,
        change = row.quantity_change,
        new_quantity = row.new_quantity,
        "Stock movement recorded"
    );
    Ok((StatusCode::CREATED, Json(row)))
}

#[tracing::instrument(name = "GET /api/products/{id}/stock-history", skip(state))]
async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<StockHistory>>> {
    // 404 for unknown products rather than an empty ledger
    state.db.products().require(&id).await?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, 500);
    Ok(Json(state.db.stock().history(&id, limit).await?))
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_movements_and_ledger() {
        let state = testing::state().await;
        testing::product(&state, "croissant", 800, Some(10)).await;
        let app = crate::router(state);

        let (status, row) = send(
            &app,
            Method::POST,
            "/api/products/croissant/stock",
            Some(json!({ "change_type": "waste", "quantity_change": -4, "reason": "Burnt tray" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(row["previous_quantity"], 10);
        assert_eq!(row["new_quantity"], 6);

        // cannot remove more than is on hand
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/products/croissant/stock",
            Some(json!({ "change_type": "adjustment", "quantity_change": -7 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "BUSINESS_LOGIC");

        // sales only come from orders
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/products/croissant/stock",
            Some(json!({ "change_type": "sale", "quantity_change": -1 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, ledger) = send(&app, Method::GET, "/api/products/croissant/stock-history", None).await;
        assert_eq!(status, StatusCode::OK);
        let ledger = ledger.as_array().unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0]["change_type"], "waste");
        assert_eq!(ledger[1]["change_type"], "initial");

        let (status, _) = send(&app, Method::GET, "/api/products/ghost/stock-history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
