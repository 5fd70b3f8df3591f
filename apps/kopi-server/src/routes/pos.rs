//! # POS Terminal Routes
//!
//! Cart, discounts, checkout and parked orders for one cashier terminal.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Terminal Cart Lifecycle                              │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│  Order   │       │
//! │  │  Cart    │     │          │     │          │     │  stored  │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │       ▲                │  ▲                              │              │
//! │       │       POST/PATCH/DELETE items                    │              │
//! │       │       POST discount/code|manual                  │              │
//! │       │                │  │                              │              │
//! │       │         park   ▼  │ resume                       │              │
//! │       │          ┌──────────────┐                        │              │
//! │       │          │ Parked list  │                        │              │
//! │       │          └──────────────┘                        │              │
//! │       └──────────────────────────────────────────────────┘              │
//! │                        cart cleared on success                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cart response carries the price summary computed with the fees
//! active at that moment.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use kopi_core::cart::Cart;
use kopi_core::checkout::CheckoutRequest;
use kopi_core::parked::ParkedOrder;
use kopi_core::pricing::{apply_discount_code, price};
use kopi_core::validation::validate_discount_code;
use kopi_core::{Discount, DiningType, Fee, LineKey, Money, OrderSource, PriceSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{reprice, resolve, Selection};
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, TerminalSession};
use crate::submission::{submit, SubmissionResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pos/{terminal}/cart", get(get_cart).delete(clear_cart))
        .route(
            "/pos/{terminal}/cart/items",
            post(add_item).patch(update_item).delete(remove_item),
        )
        .route("/pos/{terminal}/cart/dining-type", put(set_dining_type))
        .route("/pos/{terminal}/cart/discount", delete(remove_discount))
        .route("/pos/{terminal}/cart/discount/code", post(apply_code))
        .route("/pos/{terminal}/cart/discount/manual", post(apply_manual))
        .route("/pos/{terminal}/checkout", post(checkout))
        .route("/pos/{terminal}/parked", get(list_parked).post(park))
        .route("/pos/{terminal}/parked/{id}/resume", post(resume_parked))
        .route("/pos/{terminal}/parked/{id}", delete(discard_parked))
        .route("/pos/{terminal}/session", get(export_session).put(import_session))
}

// =============================================================================
// DTOs
// =============================================================================

/// Cart contents plus totals, as the cashier screen shows them.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub summary: PriceSummary,
    pub item_count: i64,
}

impl CartView {
    fn new(cart: &Cart, fees: &[Fee]) -> Self {
        CartView {
            cart: cart.clone(),
            summary: price(cart, fees),
            item_count: cart.item_count(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub key: LineKey,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub key: LineKey,
}

#[derive(Debug, Deserialize)]
pub struct DiningTypeRequest {
    pub dining_type: DiningType,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ManualDiscountRequest {
    pub amount_sen: i64,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParkRequest {
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResumeParams {
    /// Parks the cart in progress under this label before resuming.
    pub park_current_as: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParkedSummary {
    pub id: String,
    pub label: String,
    pub line_count: usize,
    pub total_sen: i64,
    pub parked_at: chrono::DateTime<Utc>,
}

impl From<&ParkedOrder> for ParkedSummary {
    fn from(parked: &ParkedOrder) -> Self {
        ParkedSummary {
            id: parked.id.clone(),
            label: parked.label.clone(),
            line_count: parked.cart.line_count(),
            total_sen: parked.total().sen(),
            parked_at: parked.parked_at,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[tracing::instrument(name = "GET /api/pos/{terminal}/cart", skip(state))]
async fn get_cart(State(state): State<AppState>, Path(terminal): Path<String>) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let view = state.sessions.read(&terminal, |s| CartView::new(&s.cart, &fees));
    Ok(Json(view))
}

#[tracing::instrument(name = "POST /api/pos/{terminal}/cart/items", skip(state, selection))]
async fn add_item(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(selection): Json<Selection>,
) -> ApiResult<Json<CartView>> {
    let rows = resolve(&state.db, &selection).await?;
    let fees = state.db.fees().list_active().await?;

    let view = state.sessions.with_session(&terminal, |s| -> ApiResult<CartView> {
        s.cart.add(
            &rows.product,
            rows.size.as_ref(),
            &rows.add_ons,
            &selection.notes,
            selection.quantity,
        )?;
        Ok(CartView::new(&s.cart, &fees))
    })?;

    debug!(terminal = %terminal, product_id = %selection.product_id, "Item added to cart");
    Ok(Json(view))
}

#[tracing::instrument(name = "PATCH /api/pos/{terminal}/cart/items", skip(state, request))]
async fn update_item(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let key = normalize_key(request.key);
    let view = state.sessions.with_session(&terminal, |s| -> ApiResult<CartView> {
        s.cart.update_quantity(&key, request.quantity)?;
        Ok(CartView::new(&s.cart, &fees))
    })?;
    Ok(Json(view))
}

#[tracing::instrument(name = "DELETE /api/pos/{terminal}/cart/items", skip(state, request))]
async fn remove_item(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<RemoveItemRequest>,
) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let key = normalize_key(request.key);
    let view = state.sessions.with_session(&terminal, |s| -> ApiResult<CartView> {
        s.cart.remove(&key)?;
        Ok(CartView::new(&s.cart, &fees))
    })?;
    Ok(Json(view))
}

/// Keys sent back by clients may list add-ons in any order.
fn normalize_key(key: LineKey) -> LineKey {
    LineKey::new(key.product_id, key.size, key.notes, key.add_on_ids)
}

#[tracing::instrument(name = "DELETE /api/pos/{terminal}/cart", skip(state))]
async fn clear_cart(State(state): State<AppState>, Path(terminal): Path<String>) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let view = state.sessions.with_session(&terminal, |s| {
        s.cart.clear();
        CartView::new(&s.cart, &fees)
    });
    Ok(Json(view))
}

#[tracing::instrument(name = "PUT /api/pos/{terminal}/cart/dining-type", skip(state))]
async fn set_dining_type(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<DiningTypeRequest>,
) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let view = state.sessions.with_session(&terminal, |s| {
        s.cart.dining_type = request.dining_type;
        CartView::new(&s.cart, &fees)
    });
    Ok(Json(view))
}

// =============================================================================
// Discounts
// =============================================================================

#[tracing::instrument(name = "POST /api/pos/{terminal}/cart/discount/code", skip(state, request))]
async fn apply_code(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<CodeRequest>,
) -> ApiResult<Json<CartView>> {
    let code = validate_discount_code(&request.code)?;
    let discount = state
        .db
        .discounts()
        .get_by_code(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Discount code", &code))?;
    let fees = state.db.fees().list_active().await?;
    let now = Utc::now();

    let view = state.sessions.with_session(&terminal, |s| -> ApiResult<CartView> {
        apply_discount_code(&mut s.cart, discount, &fees, now)?;
        Ok(CartView::new(&s.cart, &fees))
    })?;

    info!(terminal = %terminal, code = %code, "Discount code applied");
    Ok(Json(view))
}

#[tracing::instrument(name = "POST /api/pos/{terminal}/cart/discount/manual", skip(state, request))]
async fn apply_manual(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<ManualDiscountRequest>,
) -> ApiResult<Json<CartView>> {
    let discount = Discount::manual(Money::from_sen(request.amount_sen), &request.reason)?;
    let fees = state.db.fees().list_active().await?;

    let view = state.sessions.with_session(&terminal, |s| {
        s.cart.set_discount(discount);
        CartView::new(&s.cart, &fees)
    });

    info!(
        terminal = %terminal,
        amount = %Money::from_sen(request.amount_sen),
        reason = %request.reason.trim(),
        "Manual discount applied"
    );
    Ok(Json(view))
}

#[tracing::instrument(name = "DELETE /api/pos/{terminal}/cart/discount", skip(state))]
async fn remove_discount(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;
    let view = state.sessions.with_session(&terminal, |s| {
        s.cart.clear_discount();
        CartView::new(&s.cart, &fees)
    });
    Ok(Json(view))
}

// =============================================================================
// Checkout
// =============================================================================

/// Submits the terminal's cart. The cart is cleared only when the order
/// was stored.
#[tracing::instrument(name = "POST /api/pos/{terminal}/checkout", skip(state, request))]
async fn checkout(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<SubmissionResult>)> {
    let cart = state.sessions.snapshot(&terminal).cart;
    let result = submit(&state, &cart, &request, OrderSource::Pos).await?;

    state.sessions.with_session(&terminal, |s| s.cart.settle_submitted(&cart));
    info!(terminal = %terminal, order_number = %result.order.order_number, "Terminal checkout complete");

    Ok((StatusCode::CREATED, Json(result)))
}

// =============================================================================
// Parked Orders
// =============================================================================

#[tracing::instrument(name = "GET /api/pos/{terminal}/parked", skip(state))]
async fn list_parked(State(state): State<AppState>, Path(terminal): Path<String>) -> Json<Vec<ParkedSummary>> {
    let parked: Vec<ParkedSummary> = state
        .sessions
        .read(&terminal, |s| s.parked.list().iter().map(ParkedSummary::from).collect());
    Json(parked)
}

/// Moves the current cart into the parked list and starts an empty one.
#[tracing::instrument(name = "POST /api/pos/{terminal}/parked", skip(state, request))]
async fn park(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(request): Json<ParkRequest>,
) -> ApiResult<(StatusCode, Json<ParkedSummary>)> {
    let summary = state.sessions.with_session(&terminal, |s| -> ApiResult<ParkedSummary> {
        let summary = ParkedSummary::from(s.parked.park(&request.label, s.cart.clone())?);
        s.cart.clear();
        Ok(summary)
    })?;

    info!(terminal = %terminal, parked_id = %summary.id, label = %summary.label, "Cart parked");
    Ok((StatusCode::CREATED, Json(summary)))
}

#[tracing::instrument(name = "POST /api/pos/{terminal}/parked/{id}/resume", skip(state))]
async fn resume_parked(
    State(state): State<AppState>,
    Path((terminal, id)): Path<(String, String)>,
    Query(params): Query<ResumeParams>,
) -> ApiResult<Json<CartView>> {
    let fees = state.db.fees().list_active().await?;

    let view = state.sessions.with_session(&terminal, |s| -> ApiResult<CartView> {
        let parked_current = match params.park_current_as.as_deref() {
            Some(label) if !s.cart.is_empty() => Some(s.parked.park(label, s.cart.clone())?.id.clone()),
            _ => None,
        };
        match s.parked.resume(&id) {
            Ok(cart) => {
                s.cart = cart;
                Ok(CartView::new(&s.cart, &fees))
            }
            Err(e) => {
                if let Some(parked_id) = parked_current {
                    let _ = s.parked.discard(&parked_id);
                }
                Err(e.into())
            }
        }
    })?;

    info!(terminal = %terminal, parked_id = %id, "Parked cart resumed");
    Ok(Json(view))
}

#[tracing::instrument(name = "DELETE /api/pos/{terminal}/parked/{id}", skip(state))]
async fn discard_parked(
    State(state): State<AppState>,
    Path((terminal, id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.sessions.with_session(&terminal, |s| s.parked.discard(&id))?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Session Export
// =============================================================================

/// The terminal's cart and parked list, for a till to save before a restart.
#[tracing::instrument(name = "GET /api/pos/{terminal}/session", skip(state))]
async fn export_session(State(state): State<AppState>, Path(terminal): Path<String>) -> Json<TerminalSession> {
    Json(state.sessions.snapshot(&terminal))
}

/// Replaces the terminal's session with a previously exported one.
///
/// Every cart is checked, then repriced from the current catalog before it
/// is stored. A rejected session leaves the terminal as it was.
#[tracing::instrument(name = "PUT /api/pos/{terminal}/session", skip(state, session))]
async fn import_session(
    State(state): State<AppState>,
    Path(terminal): Path<String>,
    Json(mut session): Json<TerminalSession>,
) -> ApiResult<StatusCode> {
    session.cart.check_integrity()?;
    session.parked.check_integrity()?;

    session.cart = reprice(&state.db, &session.cart).await?;
    for cart in session.parked.carts_mut() {
        *cart = reprice(&state.db, cart).await?;
    }

    let parked = session.parked.len();
    state.sessions.restore(&terminal, session);
    info!(terminal = %terminal, parked, "Terminal session restored");
    Ok(StatusCode::NO_CONTENT)
}
