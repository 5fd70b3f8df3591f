//! Kitchen display queue.
//!
//! Screens without a live socket poll this every
//! `kitchen.poll_interval_secs`; the rest refresh on `/ws/orders` events.

use std::collections::HashSet;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use kopi_core::status::{kitchen_queue, KitchenTicket};
use kopi_core::{DiningType, OrderStatus};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/kitchen", get(queue))
}

#[derive(Debug, Default, Deserialize)]
pub struct KitchenParams {
    pub dining_type: Option<DiningType>,
}

#[tracing::instrument(name = "GET /api/kitchen", skip(state))]
async fn queue(
    State(state): State<AppState>,
    Query(params): Query<KitchenParams>,
) -> ApiResult<Json<Vec<KitchenTicket>>> {
    let visible: Vec<OrderStatus> = OrderStatus::ALL
        .into_iter()
        .filter(OrderStatus::is_kitchen_visible)
        .collect();

    let orders = state.db.orders().list_by_status(&visible).await?;
    let kitchen_products: HashSet<String> = state.db.products().kitchen_product_ids().await?;

    let tickets = kitchen_queue(
        &orders,
        params.dining_type,
        &kitchen_products,
        Utc::now(),
        state.config.kitchen.urgent_after_minutes,
    );
    Ok(Json(tickets))
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, send};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_filters_by_dining_type_and_status() {
        let state = testing::state().await;
        testing::product(&state, "latte", 1000, None).await;
        let app = crate::router(state);

        let dine_in = json!({
            "dining_type": "dine_in",
            "items": [{ "product_id": "latte" }],
            "tender": { "method": "card" }
        });
        let takeaway = json!({
            "dining_type": "takeaway",
            "items": [{ "product_id": "latte", "quantity": 2 }],
            "customer": { "name": "Ravi", "phone": "019-888 1234" },
            "tender": { "method": "qr", "payment_proof_url": "https://cdn.kopi.my/p.jpg" }
        });
        send(&app, Method::POST, "/api/orders", Some(dine_in)).await;
        // awaiting payment verification, hidden from the kitchen
        send(&app, Method::POST, "/api/orders", Some(takeaway)).await;

        let (status, queue) = send(&app, Method::GET, "/api/kitchen", None).await;
        assert_eq!(status, StatusCode::OK);
        let queue = queue.as_array().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0]["dining_type"], "dine_in");
        assert_eq!(queue[0]["urgent"], false);

        let (_, queue) = send(&app, Method::GET, "/api/kitchen?dining_type=takeaway", None).await;
        assert!(queue.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verified_order_waits_for_preparing() {
        let state = testing::state().await;
        testing::product(&state, "latte", 1000, None).await;
        let app = crate::router(state);

        let (_, placed) = send(
            &app,
            Method::POST,
            "/api/orders",
            Some(json!({
                "dining_type": "takeaway",
                "items": [{ "product_id": "latte" }],
                "customer": { "name": "Mei Ling", "phone": "012-345 6789" },
                "tender": { "method": "qr", "payment_proof_url": "https://cdn.kopi.my/p.jpg" }
            })),
        )
        .await;
        let id = placed["order"]["id"].as_str().unwrap().to_string();

        let (status, verified) = send(
            &app,
            Method::POST,
            &format!("/api/orders/{id}/verify-payment"),
            Some(json!({ "approved": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(verified["status"], "payment_verified");

        let (_, queue) = send(&app, Method::GET, "/api/kitchen", None).await;
        assert!(queue.as_array().unwrap().is_empty());

        send(
            &app,
            Method::POST,
            &format!("/api/orders/{id}/status"),
            Some(json!({ "status": "preparing" })),
        )
        .await;
        let (_, queue) = send(&app, Method::GET, "/api/kitchen", None).await;
        assert_eq!(queue.as_array().unwrap().len(), 1);
        assert_eq!(queue[0]["status"], "preparing");
    }
}
