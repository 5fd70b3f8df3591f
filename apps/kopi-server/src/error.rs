//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Conversion Flow                                │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► ApiError ──► HTTP status + JSON   │
//! │  sqlx::Error ─────► DbError ─────┘                                      │
//! │                                                                         │
//! │  Database internals are logged here and replaced by a generic message. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Body
//! ```json
//! { "code": "DISCOUNT_REJECTED", "message": "Discount code NASI50 rejected: ..." }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kopi_core::{CoreError, ValidationError};
use kopi_db::DbError;
use serde::Serialize;

/// API error returned from handlers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Database operation failed (500)
    DatabaseError,

    /// Business rule refused the request (422)
    BusinessLogic,

    /// Cart operation failed (422)
    CartError,

    /// Discount code failed one of its conditions (422)
    DiscountRejected,

    /// Tender does not cover the order (422)
    PaymentError,

    /// Status change not allowed from the current status (409)
    InvalidTransition,

    /// Missing or wrong service key (401)
    Unauthorized,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::BusinessLogic
            | ErrorCode::CartError
            | ErrorCode::DiscountRejected
            | ErrorCode::PaymentError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidTransition => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Domain(core) => ApiError::from(core),
            DbError::ConstraintViolation(message) => {
                tracing::warn!("Constraint violated: {}", message);
                ApiError::new(ErrorCode::BusinessLogic, message)
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::ConnectionFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database connection failed"),
            DbError::MigrationFailed(_) => ApiError::new(ErrorCode::DatabaseError, "Database migration failed"),
            DbError::PoolExhausted => ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted"),
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::Serialization(e) => {
                tracing::error!("Stored JSON could not be read: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(id) => return ApiError::not_found("Product", id),
            CoreError::ParkedOrderNotFound(id) => return ApiError::not_found("Parked order", id),
            CoreError::ProductUnavailable(_)
            | CoreError::SizeUnavailable { .. }
            | CoreError::AddOnUnavailable { .. }
            | CoreError::LineNotInCart
            | CoreError::CartTooLarge { .. }
            | CoreError::InvalidCartLine { .. }
            | CoreError::EmptyCart => ErrorCode::CartError,
            CoreError::DiscountRejected { .. } | CoreError::InvalidManualDiscount { .. } => {
                ErrorCode::DiscountRejected
            }
            CoreError::PaymentProofRequired
            | CoreError::InsufficientCash { .. }
            | CoreError::SplitPaymentIncomplete { .. }
            | CoreError::InvalidPaymentAmount { .. } => ErrorCode::PaymentError,
            CoreError::InvalidStatusTransition { .. } => ErrorCode::InvalidTransition,
            CoreError::InvalidStockMovement { .. } => ErrorCode::BusinessLogic,
            CoreError::QuantityTooLarge { .. }
            | CoreError::CustomerDetailsRequired { .. }
            | CoreError::InvalidTableCode(_)
            | CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use kopi_core::{DiscountRejection, Money, OrderStatus};

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = ApiError::from(CoreError::DiscountRejected {
            code: "NASI50".to_string(),
            reason: DiscountRejection::Expired,
        });
        assert_eq!(err.code, ErrorCode::DiscountRejected);
        assert_eq!(err.code.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(CoreError::SplitPaymentIncomplete {
            remaining: Money::from_sen(500),
        });
        assert_eq!(err.code, ErrorCode::PaymentError);
        assert_eq!(err.message, "Split payments leave RM5.00 unpaid");

        let err = ApiError::from(CoreError::InvalidStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Preparing,
        });
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_db_errors_hide_internals() {
        let err = ApiError::from(DbError::QueryFailed("no such column: secret".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");

        let err = ApiError::from(DbError::not_found("Order", "abc"));
        assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Order not found: abc");

        let err = ApiError::from(DbError::Domain(CoreError::EmptyCart));
        assert_eq!(err.code, ErrorCode::CartError);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(ApiError::unauthorized("Missing service key")).unwrap();
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["message"], "Missing service key");
    }
}
