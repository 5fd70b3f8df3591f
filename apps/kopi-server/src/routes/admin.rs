//! # Admin Routes
//!
//! Store setup and back-office records.
//!
//! ```text
//! POST             /api/setup-customers     migrations + customer backfill
//! GET|POST         /api/menu-promos         banners on the customer menu
//! GET|PUT|DELETE   /api/menu-promos/{id}
//! GET|POST         /api/users               staff accounts   ┐ x-service-key
//! GET|PUT|DELETE   /api/users/{id}                           ┘ required
//! ```
//!
//! Staff routes are closed when no `security.service_key` is configured.

use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use kopi_core::validation::{
    validate_customer_name, validate_email, validate_password, validate_phone, validate_public_url,
};
use kopi_core::{MenuPromo, StaffProfile, StaffRole, ValidationError};
use kopi_db::StaffUpdate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const SERVICE_KEY_HEADER: &str = "x-service-key";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/setup-customers", post(setup_customers))
        .route("/menu-promos", get(list_promos).post(create_promo))
        .route(
            "/menu-promos/{id}",
            get(get_promo).put(update_promo).delete(delete_promo),
        )
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
}

// =============================================================================
// Service Key Guard
// =============================================================================

/// Proof that the request carried the configured service key.
#[derive(Debug, Clone, Copy)]
pub struct ServiceKey;

impl FromRequestParts<AppState> for ServiceKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.security.service_key.as_deref() else {
            return Err(ApiError::unauthorized("Staff management is disabled: no service key configured"));
        };

        let provided = parts
            .headers
            .get(SERVICE_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing service key"))?;

        if !keys_match(provided, expected) {
            warn!(path = %parts.uri.path(), "Rejected request with wrong service key");
            return Err(ApiError::unauthorized("Invalid service key"));
        }
        Ok(ServiceKey)
    }
}

/// Compares SHA-256 digests in constant time, so neither the content nor the
/// length of the configured key shows in response timing.
fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.ct_eq(&expected).into()
}

// =============================================================================
// Customer Setup
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SetupCustomersRequest {
    #[serde(default)]
    pub customers: Vec<CustomerSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerSeed {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SetupCustomersResponse {
    pub created: usize,
    pub existing: usize,
}

/// Makes sure the schema is current and every phone seen on an order (plus
/// any listed in the body) has a customer row. Totals are never changed.
#[tracing::instrument(name = "POST /api/setup-customers", skip(state, body))]
async fn setup_customers(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<SetupCustomersResponse>> {
    let request: SetupCustomersRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SetupCustomersRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::validation(format!("Invalid request body: {}", e)))?
    };

    let mut contacts = Vec::with_capacity(request.customers.len());
    for seed in &request.customers {
        validate_customer_name(&seed.name)?;
        contacts.push((seed.name.trim().to_string(), validate_phone(&seed.phone)?));
    }

    state.db.run_migrations().await?;

    let from_orders = state.db.orders().customer_contacts().await?;
    contacts.extend(from_orders.into_iter().map(|c| (c.name, c.phone)));

    let mut response = SetupCustomersResponse::default();
    for (name, phone) in &contacts {
        if state.db.customers().ensure(name, phone).await? {
            response.created += 1;
        } else {
            response.existing += 1;
        }
    }

    info!(created = response.created, existing = response.existing, "Customer setup complete");
    Ok(Json(response))
}

// =============================================================================
// Menu Promos
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct PromoInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl PromoInput {
    fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Required {
                field: "title".to_string(),
            });
        }
        if title.chars().count() > 120 {
            return Err(ValidationError::TooLong {
                field: "title".to_string(),
                max: 120,
            });
        }
        if let Some(url) = self.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
            validate_public_url("image_url", url)?;
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end <= start {
                return Err(ValidationError::InvalidFormat {
                    field: "ends_at".to_string(),
                    reason: "must be after starts_at".to_string(),
                });
            }
        }
        Ok(())
    }

    fn into_promo(self, id: String, created_at: DateTime<Utc>) -> MenuPromo {
        let blank_to_none = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        MenuPromo {
            id,
            title: self.title.trim().to_string(),
            description: blank_to_none(self.description),
            image_url: blank_to_none(self.image_url),
            active: self.active,
            sort_order: self.sort_order,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            created_at,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PromoParams {
    /// Only promos inside their schedule.
    #[serde(default)]
    pub live: bool,
}

#[tracing::instrument(name = "GET /api/menu-promos", skip(state))]
async fn list_promos(State(state): State<AppState>, Query(params): Query<PromoParams>) -> ApiResult<Json<Vec<MenuPromo>>> {
    let mut promos = state.db.promos().list().await?;
    if params.live {
        let now = Utc::now();
        promos.retain(|p| p.is_live(now));
    }
    Ok(Json(promos))
}

#[tracing::instrument(name = "POST /api/menu-promos", skip(state, input))]
async fn create_promo(
    State(state): State<AppState>,
    Json(input): Json<PromoInput>,
) -> ApiResult<(StatusCode, Json<MenuPromo>)> {
    input.validate()?;
    let promo = input.into_promo(Uuid::new_v4().to_string(), Utc::now());
    state.db.promos().insert(&promo).await?;
    info!(promo_id = %promo.id, title = %promo.title, "Menu promo created");
    Ok((StatusCode::CREATED, Json(promo)))
}

#[tracing::instrument(name = "GET /api/menu-promos/{id}", skip(state))]
async fn get_promo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<MenuPromo>> {
    let promo = state
        .db
        .promos()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu promo", &id))?;
    Ok(Json(promo))
}

#[tracing::instrument(name = "PUT /api/menu-promos/{id}", skip(state, input))]
async fn update_promo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<PromoInput>,
) -> ApiResult<Json<MenuPromo>> {
    input.validate()?;
    let existing = state
        .db
        .promos()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Menu promo", &id))?;
    let promo = state
        .db
        .promos()
        .update(&input.into_promo(id, existing.created_at))
        .await?;
    Ok(Json(promo))
}

#[tracing::instrument(name = "DELETE /api/menu-promos/{id}", skip(state))]
async fn delete_promo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.promos().delete(&id).await?;
    info!(promo_id = %id, "Menu promo deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Staff Accounts
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<StaffRole>,
    pub active: Option<bool>,
    pub password: Option<String>,
}

impl UpdateUserRequest {
    fn into_update(self) -> Result<StaffUpdate, ValidationError> {
        if self.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ValidationError::Required {
                field: "full_name".to_string(),
            });
        }
        if let Some(password) = self.password.as_deref() {
            validate_password(password)?;
        }
        Ok(StaffUpdate {
            full_name: self.full_name,
            role: self.role,
            active: self.active,
            password: self.password,
        })
    }
}

#[tracing::instrument(name = "GET /api/users", skip(state))]
async fn list_users(_key: ServiceKey, State(state): State<AppState>) -> ApiResult<Json<Vec<StaffProfile>>> {
    Ok(Json(state.db.staff().list().await?))
}

#[tracing::instrument(name = "POST /api/users", skip(state, request))]
async fn create_user(
    _key: ServiceKey,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<StaffProfile>)> {
    validate_email(&request.email)?;
    validate_password(&request.password)?;
    if request.full_name.trim().is_empty() {
        return Err(ApiError::validation("full_name is required"));
    }

    let profile = state
        .db
        .staff()
        .create(&request.email, request.full_name.trim(), request.role, &request.password)
        .await?;
    info!(staff_id = %profile.id, role = ?profile.role, "Staff account created");
    Ok((StatusCode::CREATED, Json(profile)))
}

#[tracing::instrument(name = "GET /api/users/{id}", skip(state))]
async fn get_user(
    _key: ServiceKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StaffProfile>> {
    let profile = state
        .db
        .staff()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff", &id))?;
    Ok(Json(profile))
}

#[tracing::instrument(name = "PUT /api/users/{id}", skip(state, request))]
async fn update_user(
    _key: ServiceKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<Json<StaffProfile>> {
    let update = request.into_update()?;
    let profile = state.db.staff().update(&id, &update).await?;
    info!(staff_id = %id, "Staff account updated");
    Ok(Json(profile))
}

#[tracing::instrument(name = "DELETE /api/users/{id}", skip(state))]
async fn delete_user(
    _key: ServiceKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.staff().delete(&id).await?;
    info!(staff_id = %id, "Staff account deleted");
    Ok(StatusCode::NO_CONTENT)
}
