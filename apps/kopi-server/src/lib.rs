//! # kopi-server: HTTP and WebSocket Server for Kopi POS
//!
//! Serves the cashier terminals, the customer self-order menu, the kitchen
//! display and the order tracking page from one process.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         kopi-server                                     │
//! │                                                                         │
//! │  POS terminal ──► /api/pos/{terminal}/...  ──┐                          │
//! │  Customer     ──► /api/menu, /api/orders   ──┤                          │
//! │  Kitchen      ──► /api/kitchen             ──┼──► routes ──► kopi-core  │
//! │  Admin        ──► /api/users, promos, ...  ──┘        │       rules     │
//! │                                                       ▼                 │
//! │                                                   kopi-db (SQLite)      │
//! │                                                       │                 │
//! │  Kitchen / tracking ◄── /ws/orders ◄── OrderEvents ◄──┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`config`] - `kopi.toml` + `KOPI_*` environment settings
//! - [`error`] - `ApiError` and HTTP status mapping
//! - [`state`] - Shared state: database, terminal sessions, order events
//! - [`catalog`] - Menu selections to catalog rows
//! - [`submission`] - Cart + checkout form to stored order
//! - [`routes`] - HTTP handlers

pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod submission;

use axum::routing::get;
use axum::Router;
use kopi_db::Database;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Builds the full router around `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/ws/orders", get(routes::ws::orders_socket))
        .nest("/api", routes::api())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Opens the database and serves until Ctrl-C or SIGTERM.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let db = Database::new(config.db_config()).await?;
    info!(path = %config.database.path.display(), "Database ready");

    let addr = config.server.bind_address();
    let state = AppState::new(db.clone(), config);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Kopi POS server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kopi=debug,sqlx=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

// =============================================================================
// Test Helpers
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use kopi_core::{
        AddOn, DiscountCode, DiscountType, Fee, FeeScope, FeeType, Product, ProductSize, SizeName, StockChangeType,
    };
    use kopi_db::{Database, DbConfig};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::state::AppState;

    pub async fn state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, ServerConfig::default())
    }

    pub async fn state_with_service_key(key: &str) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut config = ServerConfig::default();
        config.security.service_key = Some(key.to_string());
        AppState::new(db, config)
    }

    /// Inserts an active product. `Some(n)` turns on stock tracking with an
    /// initial count of `n`.
    pub async fn product(state: &AppState, id: &str, price_sen: i64, stock: Option<i64>) {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            name: id.replace('-', " "),
            description: None,
            price_sen,
            category_id: None,
            tags: vec![],
            allergens: vec![],
            stock_quantity: 0,
            track_stock: stock.is_some(),
            show_in_kitchen: true,
            active: true,
            rating: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        state.db.products().insert(&product).await.unwrap();

        if let Some(count) = stock {
            state
                .db
                .stock()
                .record_movement(id, count, StockChangeType::Initial, None)
                .await
                .unwrap();
        }
    }

    pub async fn size(state: &AppState, product_id: &str, size_name: SizeName, bps: u32) {
        let size = ProductSize {
            id: format!("{}-{}", product_id, size_name),
            product_id: product_id.to_string(),
            size_name,
            price_multiplier_bps: bps,
            price_override_sen: None,
            active: true,
        };
        state.db.products().insert_size(&size).await.unwrap();
    }

    pub async fn add_on(state: &AppState, product_id: &str, id: &str, price_sen: i64) {
        let add_on = AddOn {
            id: id.to_string(),
            product_id: product_id.to_string(),
            name: id.to_string(),
            price_sen,
            active: true,
        };
        state.db.products().insert_add_on(&add_on).await.unwrap();
    }

    /// Inserts an active fee for every dining type. `order` spaces creation
    /// times so fees apply in the order given.
    pub async fn fee(state: &AppState, id: &str, fee_type: FeeType, amount: i64, order: i64) {
        let fee = Fee {
            id: id.to_string(),
            name: id.to_string(),
            fee_type,
            amount,
            applies_to: FeeScope::Both,
            active: true,
            created_at: Utc::now() - Duration::hours(1) + Duration::seconds(order),
        };
        state.db.fees().insert(&fee).await.unwrap();
    }

    /// Inserts an active percentage code with no usage limit or expiry.
    pub async fn discount(state: &AppState, code: &str, value_bps: i64, min_order_sen: i64) {
        let discount = DiscountCode {
            id: format!("dc-{}", code.to_lowercase()),
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            value: value_bps,
            min_order_sen,
            usage_limit: None,
            usage_count: 0,
            expires_at: None,
            applies_to: vec![],
            active: true,
        };
        state.db.discounts().insert(&discount).await.unwrap();
    }

    pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_with_headers(app, method, uri, &[], body).await
    }

    /// Runs one request through the router and parses the JSON response.
    /// Empty bodies come back as `Value::Null`.
    pub async fn send_with_headers(
        app: &Router,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{self, send};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_health() {
        let app = super::router(testing::state().await);
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["database"], true);
        assert_eq!(body["store_name"], "Kopi POS");
    }

    #[tokio::test]
    async fn test_menu_lists_active_products() {
        let state = testing::state().await;
        testing::product(&state, "kopi-o", 250, None).await;
        let app = super::router(state);

        let (status, body) = send(&app, Method::GET, "/api/menu", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["currency_symbol"], "RM");
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, Method::GET, "/api/products/kopi-o", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, "/api/products/teh-tarik", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fees_compound_in_order() {
        let state = testing::state().await;
        testing::product(&state, "set-lunch", 10_000, None).await;
        testing::fee(&state, "service", kopi_core::FeeType::Percentage, 1000, 0).await;
        testing::fee(&state, "packaging", kopi_core::FeeType::Fixed, 200, 1).await;
        let app = super::router(state);

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/pos/t9/cart/items",
            Some(serde_json::json!({ "product_id": "set-lunch" })),
        )
        .await;
        assert_eq!(body["summary"]["fees_total_sen"], 1200);
        assert_eq!(body["summary"]["subtotal_with_fees_sen"], 11_200);
    }
}
