//! # Routes
//!
//! ```text
//! routes/
//! ├── mod.rs      ◄─── You are here (router assembly, /health)
//! ├── menu.rs     ◄─── Customer menu and product detail
//! ├── pos.rs      ◄─── Terminal cart, discounts, checkout, parked orders, session
//! ├── orders.rs   ◄─── Self-order, listing, tracking, status changes
//! ├── kitchen.rs  ◄─── Kitchen display queue
//! ├── stock.rs    ◄─── Stock movements and ledger
//! ├── tables.rs   ◄─── Table quick-picks, QR scan, camera errors
//! ├── admin.rs    ◄─── Customer setup, menu promos, staff accounts
//! └── ws.rs       ◄─── /ws/orders live updates
//! ```
//!
//! Every module exposes `routes() -> Router<AppState>`; [`api`] nests them
//! under `/api`.

pub mod admin;
pub mod kitchen;
pub mod menu;
pub mod orders;
pub mod pos;
pub mod stock;
pub mod tables;
pub mod ws;

use axum::extract::State;
use axum::Json;
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Every `/api/...` route.
pub fn api() -> Router<AppState> {
    Router::new()
        .merge(menu::routes())
        .merge(pos::routes())
        .merge(orders::routes())
        .merge(kitchen::routes())
        .merge(stock::routes())
        .merge(tables::routes())
        .merge(admin::routes())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store_name: String,
    pub database: bool,
    /// Refresh interval for screens without a live socket.
    pub poll_interval_secs: u64,
    pub live_subscribers: usize,
    pub open_terminals: usize,
}

#[tracing::instrument(name = "GET /health", skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store_name: state.config.store.name.clone(),
        database,
        poll_interval_secs: state.config.kitchen.poll_interval_secs,
        live_subscribers: state.events.subscriber_count(),
        open_terminals: state.sessions.terminal_count(),
    })
}
