//! # Order Routes
//!
//! Customer self-ordering, order lookup, tracking and status changes.
//!
//! ## Endpoints
//! ```text
//! POST /api/orders                        customer self-order (201)
//! GET  /api/orders?status=a,b&limit=N     recent orders, optionally by status
//! GET  /api/orders/{id}                   full order
//! GET  /api/orders/{id}/track             tracking view for the customer
//! POST /api/orders/{id}/status            move along the status machine
//! POST /api/orders/{id}/verify-payment    accept or reject a QR proof
//! ```
//!
//! Status changes are validated against the transition table, then written
//! with a compare-and-set on the stored status so two screens racing on the
//! same order cannot both win.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use kopi_core::checkout::CheckoutRequest;
use kopi_core::pricing::apply_discount_code;
use kopi_core::status::TrackingView;
use kopi_core::validation::validate_discount_code;
use kopi_core::{DiningType, Order, OrderSource, OrderStatus};
use serde::Deserialize;
use tracing::info;

use crate::catalog::{cart_from_selections, Selection};
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::state::{AppState, OrderEvent};
use crate::submission::{submit, SubmissionResult};

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 500;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/track", get(track_order))
        .route("/orders/{id}/status", post(change_status))
        .route("/orders/{id}/verify-payment", post(verify_payment))
}

/// A self-order from the customer menu.
#[derive(Debug, Deserialize)]
pub struct CustomerOrderRequest {
    pub dining_type: DiningType,
    pub items: Vec<Selection>,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(flatten)]
    pub checkout: CheckoutRequest,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Comma-separated status names.
    pub status: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub approved: bool,
}

#[tracing::instrument(name = "POST /api/orders", skip(state, request))]
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CustomerOrderRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionResult>)> {
    let mut cart = cart_from_selections(&state.db, request.dining_type, &request.items).await?;

    if let Some(raw) = request.discount_code.as_deref().filter(|c| !c.trim().is_empty()) {
        let code = validate_discount_code(raw)?;
        let discount = state
            .db
            .discounts()
            .get_by_code(&code)
            .await?
            .ok_or_else(|| ApiError::not_found("Discount code", &code))?;
        let fees = state.db.fees().list_active().await?;
        apply_discount_code(&mut cart, discount, &fees, Utc::now())?;
    }

    let result = submit(&state, &cart, &request.checkout, OrderSource::Customer).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[tracing::instrument(name = "GET /api/orders", skip(state))]
async fn list_orders(State(state): State<AppState>, Query(params): Query<ListParams>) -> ApiResult<Json<Vec<Order>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let orders = match params.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => {
            let statuses = raw
                .split(',')
                .map(|s| s.trim().parse::<OrderStatus>())
                .collect::<Result<Vec<_>, _>>()?;
            state.db.orders().list_by_status_recent(&statuses, limit).await?
        }
        None => state.db.orders().list_recent(limit).await?,
    };

    Ok(Json(orders))
}

#[tracing::instrument(name = "GET /api/orders/{id}", skip(state))]
async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().require(&id).await?))
}

#[tracing::instrument(name = "GET /api/orders/{id}/track", skip(state))]
async fn track_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<TrackingView>> {
    let order = state.db.orders().require(&id).await?;
    Ok(Json(TrackingView::for_order(&order)))
}

#[tracing::instrument(name = "POST /api/orders/{id}/status", skip(state))]
async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Json<Order>> {
    let order = move_order(&state, &id, |_| Ok(request.status)).await?;
    Ok(Json(order))
}

/// Cashier decision on an uploaded QR payment proof.
#[tracing::instrument(name = "POST /api/orders/{id}/verify-payment", skip(state))]
async fn verify_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VerifyPaymentRequest>,
) -> ApiResult<Json<Order>> {
    let order = move_order(&state, &id, |order| {
        if order.status != OrderStatus::PaymentVerification {
            return Err(ApiError::new(
                ErrorCode::InvalidTransition,
                format!("Order {} is not awaiting payment verification", order.order_number),
            ));
        }
        Ok(if request.approved {
            OrderStatus::after_payment_verified(order.dining_type)
        } else {
            OrderStatus::Cancelled
        })
    })
    .await?;
    Ok(Json(order))
}

/// Loads the order, picks the target with `next`, checks the transition,
/// writes it and publishes the change.
async fn move_order<F>(state: &AppState, id: &str, next: F) -> ApiResult<Order>
where
    F: FnOnce(&Order) -> ApiResult<OrderStatus>,
{
    let mut order = state.db.orders().require(id).await?;
    let previous = order.status;
    let target = previous.transition_to(next(&order)?)?;
    let now = Utc::now();

    state.db.orders().update_status(id, previous, target, now).await?;
    order.status = target;
    order.updated_at = now;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        from = %previous,
        to = %target,
        "Order status changed"
    );
    state.events.publish(OrderEvent::status_changed(&order, previous));

    Ok(order)
}

#[cfg(test)]
mod tests {
    use crate::state::OrderEventKind;
    use crate::testing::{self, send};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn place(app: &axum::Router, body: Value) -> Value {
        let (status, body) = send(app, Method::POST, "/api/orders", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["order"].clone()
    }

    #[tokio::test]
    async fn test_status_progression_publishes_events() {
        let state = testing::state().await;
        testing::product(&state, "latte", 1000, None).await;
        let mut events = state.events.subscribe();
        let app = crate::router(state);

        let order = place(
            &app,
            json!({
                "dining_type": "dine_in",
                "items": [{ "product_id": "latte", "quantity": 2 }],
                "table_number": "table-3",
                "tender": { "method": "card" }
            }),
        )
        .await;
        assert_eq!(order["source"], "customer");
        assert_eq!(order["table_number"], "3");
        let id = order["id"].as_str().unwrap().to_string();
        assert_eq!(events.recv().await.unwrap().kind, OrderEventKind::Created);

        let uri = format!("/api/orders/{id}/status");
        let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "status": "preparing" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "preparing");
        let event = events.recv().await.unwrap();
        assert_eq!(event.kind, OrderEventKind::StatusChanged);
        assert_eq!(event.progress_index, Some(2));

        send(&app, Method::POST, &uri, Some(json!({ "status": "ready" }))).await;
        let event = events.recv().await.unwrap();
        assert_eq!(event.progress_index, Some(3));

        let (_, track) = send(&app, Method::GET, &format!("/api/orders/{id}/track"), None).await;
        assert_eq!(track["status"], "ready");
        assert_eq!(track["progress_index"], 3);
        assert_eq!(track["cancelled"], false);
    }

    #[tokio::test]
    async fn test_invalid_transition_conflicts() {
        let state = testing::state().await;
        testing::product(&state, "latte", 1000, None).await;
        let app = crate::router(state);

        let order = place(
            &app,
            json!({
                "dining_type": "dine_in",
                "items": [{ "product_id": "latte" }],
                "tender": { "method": "cash", "cash_received_sen": 1000 }
            }),
        )
        .await;
        let uri = format!("/api/orders/{}/status", order["id"].as_str().unwrap());

        let (status, body) = send(&app, Method::POST, &uri, Some(json!({ "status": "completed" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");

        let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "status": "cancelled" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::POST, &uri, Some(json!({ "status": "preparing" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_qr_order_awaits_verification() {
        let state = testing::state().await;
        testing::product(&state, "latte", 1000, None).await;
        let app = crate::router(state);

        let order = place(
            &app,
            json!({
                "dining_type": "reservation",
                "items": [{ "product_id": "latte" }],
                "customer": { "name": "Mei Ling", "phone": "0123456789" },
                "reservation_at": "2030-01-01T10:00:00Z",
                "tender": { "method": "qr", "payment_proof_url": "https://cdn.kopi.my/proof.jpg" }
            }),
        )
        .await;
        assert_eq!(order["status"], "payment_verification");
        let id = order["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            &format!("/api/orders/{id}/verify-payment"),
            Some(json!({ "approved": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "reservation_confirmed");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/orders/{id}/verify-payment"),
            Some(json!({ "approved": true })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let state = testing::state().await;
        testing::product(&state, "kopi", 350, None).await;
        let app = crate::router(state);

        let body = json!({
            "dining_type": "dine_in",
            "items": [{ "product_id": "kopi" }],
            "tender": { "method": "card" }
        });
        let first = place(&app, body.clone()).await;
        place(&app, body).await;
        let uri = format!("/api/orders/{}/status", first["id"].as_str().unwrap());
        send(&app, Method::POST, &uri, Some(json!({ "status": "preparing" }))).await;

        let (_, all) = send(&app, Method::GET, "/api/orders", None).await;
        assert_eq!(all.as_array().unwrap().len(), 2);

        let (_, preparing) = send(&app, Method::GET, "/api/orders?status=preparing,ready", None).await;
        let preparing = preparing.as_array().unwrap();
        assert_eq!(preparing.len(), 1);
        assert_eq!(preparing[0]["id"], first["id"]);

        let (status, _) = send(&app, Method::GET, "/api/orders?status=eaten", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/api/orders/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status_filter_returns_newest_within_limit() {
        let state = testing::state().await;
        testing::product(&state, "kopi", 350, None).await;
        let app = crate::router(state);

        let body = json!({
            "dining_type": "dine_in",
            "items": [{ "product_id": "kopi" }],
            "tender": { "method": "card" }
        });
        place(&app, body.clone()).await;
        place(&app, body.clone()).await;
        let newest = place(&app, body).await;

        let (_, unfiltered) = send(&app, Method::GET, "/api/orders?limit=1", None).await;
        let (_, filtered) = send(&app, Method::GET, "/api/orders?status=pending&limit=1", None).await;
        assert_eq!(unfiltered[0]["id"], newest["id"]);
        assert_eq!(filtered.as_array().unwrap().len(), 1);
        assert_eq!(filtered[0]["id"], newest["id"]);
    }
}
