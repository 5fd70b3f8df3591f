//! # Table Routes
//!
//! ```text
//! GET  /api/tables/most-frequent?limit=N   quick-pick buttons on the POS
//! POST /api/tables/scan                    QR payload ─► table number
//! POST /api/tables/camera-error            browser error ─► guidance text
//! ```
//!
//! Scanning is optional. When the camera fails the customer menu falls back
//! to typing the number, so every camera error answers `manual_entry: true`.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use kopi_core::table::{parse_table_code, CameraError};
use kopi_db::TableFrequency;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::state::AppState;

const DEFAULT_QUICK_PICKS: u32 = 8;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tables/most-frequent", get(most_frequent))
        .route("/tables/scan", post(scan))
        .route("/tables/camera-error", post(camera_error))
}

#[derive(Debug, Default, Deserialize)]
pub struct FrequentParams {
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub payload: String,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub table_number: String,
}

#[derive(Debug, Deserialize)]
pub struct CameraErrorRequest {
    /// `DOMException.name` reported by the browser.
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CameraErrorResponse {
    pub error: CameraError,
    pub guidance: &'static str,
    pub manual_entry: bool,
}

#[tracing::instrument(name = "GET /api/tables/most-frequent", skip(state))]
async fn most_frequent(
    State(state): State<AppState>,
    Query(params): Query<FrequentParams>,
) -> ApiResult<Json<Vec<TableFrequency>>> {
    let limit = params.limit.unwrap_or(DEFAULT_QUICK_PICKS).clamp(1, 50);
    Ok(Json(state.db.orders().most_frequent_tables(limit).await?))
}

#[tracing::instrument(name = "POST /api/tables/scan", skip(request))]
async fn scan(Json(request): Json<ScanRequest>) -> ApiResult<Json<ScanResponse>> {
    let table_number = parse_table_code(&request.payload)?;
    debug!(table = %table_number, "Table code scanned");
    Ok(Json(ScanResponse { table_number }))
}

#[tracing::instrument(name = "POST /api/tables/camera-error", skip(request))]
async fn camera_error(Json(request): Json<CameraErrorRequest>) -> Json<CameraErrorResponse> {
    let error = CameraError::from_browser_name(&request.name);
    warn!(browser_error = %request.name, kind = ?error, "Table scanner could not start");
    Json(CameraErrorResponse {
        error,
        guidance: error.guidance(),
        manual_entry: true,
    })
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_scan_accepts_urls_and_prefixes() {
        let app = crate::router(testing::state().await);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/tables/scan",
            Some(json!({ "payload": "https://kopi.my/menu?table=12" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table_number"], "12");

        let (_, body) = send(&app, Method::POST, "/api/tables/scan", Some(json!({ "payload": "T-04" }))).await;
        assert_eq!(body["table_number"], "4");

        let (status, body) = send(&app, Method::POST, "/api/tables/scan", Some(json!({ "payload": "bar" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_camera_error_points_to_manual_entry() {
        let app = crate::router(testing::state().await);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/tables/camera-error",
            Some(json!({ "name": "NotAllowedError" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["error"], "permission_denied");
        assert_eq!(body["manual_entry"], true);
        assert!(body["guidance"].as_str().unwrap().contains("type your table number"));
    }

    #[tokio::test]
    async fn test_most_frequent_tables() {
        let state = testing::state().await;
        testing::product(&state, "kopi", 350, None).await;
        let app = crate::router(state);

        for table in ["5", "5", "2"] {
            send(
                &app,
                Method::POST,
                "/api/orders",
                Some(json!({
                    "dining_type": "dine_in",
                    "items": [{ "product_id": "kopi" }],
                    "table_number": table,
                    "tender": { "method": "card" }
                })),
            )
            .await;
        }

        let (_, picks) = send(&app, Method::GET, "/api/tables/most-frequent", None).await;
        assert_eq!(picks[0]["table_number"], "5");
        assert_eq!(picks[0]["order_count"], 2);
        assert_eq!(picks[1]["table_number"], "2");
    }
}
