//! # Error Types
//!
//! Domain-specific error types for kopi-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kopi-core errors (this file)                                          │
//! │  ├── CoreError         - Cart, pricing, checkout, status rules         │
//! │  ├── DiscountRejection - Why a discount code was refused               │
//! │  └── ValidationError   - Input validation failures                     │
//! │                                                                         │
//! │  kopi-db errors                                                        │
//! │  └── DbError           - Database operation failures                   │
//! │                                                                         │
//! │  kopi-server errors                                                    │
//! │  └── ApiError          - JSON body + HTTP status the client sees       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → HTTP response          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::status::OrderStatus;
use crate::types::DiningType;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the cart engine, pricing calculator,
/// checkout rules, status machine and stock ledger.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id is unknown to the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is switched off on the menu.
    #[error("{0} is not available right now")]
    ProductUnavailable(String),

    /// Requested size is not an active size of the product.
    #[error("Size {size} is not available for {product}")]
    SizeUnavailable { product: String, size: String },

    /// Requested add-on does not belong to the product or is inactive.
    #[error("Add-on {add_on} is not available for {product}")]
    AddOnUnavailable { product: String, add_on: String },

    /// No cart line matches the given key.
    #[error("Item is not in the cart")]
    LineNotInCart,

    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    /// A restored cart line is not one the cart engine could have built.
    #[error("Invalid cart line for {product_id}: {reason}")]
    InvalidCartLine { product_id: String, reason: String },

    /// A discount code failed one of its conditions.
    #[error("Discount code {code} rejected: {reason}")]
    DiscountRejected {
        code: String,
        reason: DiscountRejection,
    },

    /// Manual discount amount is negative or the reason is blank.
    #[error("Invalid manual discount: {reason}")]
    InvalidManualDiscount { reason: String },

    /// Takeaway and reservation orders need customer name and phone.
    #[error("{field} is required for {dining_type} orders")]
    CustomerDetailsRequired {
        field: &'static str,
        dining_type: DiningType,
    },

    /// QR payment submitted without the uploaded transfer screenshot.
    #[error("Payment proof image is required for QR payments")]
    PaymentProofRequired,

    #[error("Cash received {received} is less than total {total}")]
    InsufficientCash { received: Money, total: Money },

    /// Split payments do not yet cover the total.
    #[error("Split payments leave {remaining} unpaid")]
    SplitPaymentIncomplete { remaining: Money },

    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    #[error("Order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// A stock movement would break the ledger rules.
    #[error("Invalid stock movement for {product_id}: {reason}")]
    InvalidStockMovement { product_id: String, reason: String },

    #[error("Parked order not found: {0}")]
    ParkedOrderNotFound(String),

    /// Scanned payload or typed text does not name a table.
    #[error("Unrecognised table code: {0}")]
    InvalidTableCode(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Why a discount code was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountRejection {
    #[error("code is not active")]
    Inactive,

    #[error("code has expired")]
    Expired,

    #[error("usage limit reached")]
    UsageLimitReached,

    #[error("not valid for {0} orders")]
    NotApplicable(DiningType),

    #[error("minimum order is {required}, current total is {actual}")]
    MinimumOrderNotMet { required: Money, actual: Money },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_order_message() {
        let err = CoreError::DiscountRejected {
            code: "NASI50".to_string(),
            reason: DiscountRejection::MinimumOrderNotMet {
                required: Money::from_sen(5000),
                actual: Money::from_sen(4000),
            },
        };
        assert_eq!(
            err.to_string(),
            "Discount code NASI50 rejected: minimum order is RM50.00, current total is RM40.00"
        );
    }

    #[test]
    fn test_customer_details_message() {
        let err = CoreError::CustomerDetailsRequired {
            field: "phone",
            dining_type: DiningType::Takeaway,
        };
        assert_eq!(err.to_string(), "phone is required for takeaway orders");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
