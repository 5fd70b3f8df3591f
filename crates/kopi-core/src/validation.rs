//! # Validation Module
//!
//! Input checks run at the HTTP boundary before business logic.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Frontend form checks (immediate feedback)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: kopi-server handler                                          │
//! │  ├── JSON deserialization (types, enums)                               │
//! │  └── THIS MODULE: field rules (names, phones, codes, URLs)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite constraints (NOT NULL, UNIQUE, CHECK, FK)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NOTES_LEN: usize = 200;

// =============================================================================
// String Validators
// =============================================================================

/// Product names: 1-200 characters after trimming.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required_within(name, "name", 200)
}

/// Customer names for takeaway and reservation orders.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    required_within(name, "customer_name", 100)
}

/// Malaysian-style phone numbers.
///
/// ## Rules
/// - Digits, spaces, hyphens and a leading `+` only
/// - 9 to 15 digits
///
/// ## Returns
/// The number with spaces and hyphens removed, the form customers are keyed by.
///
/// ```rust
/// use kopi_core::validation::validate_phone;
///
/// assert_eq!(validate_phone("012-345 6789").unwrap(), "0123456789");
/// assert_eq!(validate_phone("+60 12-345 6789").unwrap(), "+60123456789");
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "customer_phone".to_string(),
        });
    }

    let mut normalized = String::with_capacity(phone.len());
    for (i, c) in phone.chars().enumerate() {
        match c {
            '0'..='9' => normalized.push(c),
            '+' if i == 0 => normalized.push(c),
            ' ' | '-' => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "customer_phone".to_string(),
                    reason: "may only contain digits, spaces, hyphens and a leading +".to_string(),
                })
            }
        }
    }

    let digits = normalized.chars().filter(char::is_ascii_digit).count();
    if !(9..=15).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "customer_phone digits".to_string(),
            min: 9,
            max: 15,
        });
    }

    Ok(normalized)
}

/// Discount codes: 3-32 letters, digits, `-` or `_`.
///
/// ## Returns
/// The code upper-cased; codes are matched case-insensitively.
pub fn validate_discount_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }
    if code.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: 3,
        });
    }
    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }
    Ok(code.to_ascii_uppercase())
}

/// Line notes ("less sugar", "no ice"). Kept verbatim, only length-checked.
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    if notes.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

/// Free-text reason for a manual discount.
pub fn validate_discount_reason(reason: &str) -> ValidationResult<()> {
    required_within(reason, "discount_reason", 200)
}

/// Staff login emails. Deliberately loose: one `@`, something on both sides.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        }),
    }
}

/// Staff passwords: at least 8 characters.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    Ok(())
}

/// Public URLs of uploaded images (payment proofs, promo banners).
pub fn validate_public_url(field: &str, value: &str) -> ValidationResult<()> {
    let parsed = url::Url::parse(value.trim()).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Quantities: 1 to 999.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Prices in sen. Zero is allowed (free refill).
pub fn validate_price_sen(sen: i64) -> ValidationResult<()> {
    if sen < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Percentages in basis points, 0% to 100%.
pub fn validate_rate_bps(field: &str, bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

/// Size multipliers in basis points, 0.10× to 10×.
pub fn validate_multiplier_bps(bps: u32) -> ValidationResult<()> {
    if !(1_000..=100_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "price_multiplier".to_string(),
            min: 1_000,
            max: 100_000,
        });
    }
    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use kopi_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

fn required_within(value: &str, field: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("0123456789").unwrap(), "0123456789");
        assert_eq!(validate_phone(" 03-7890 1234 ").unwrap(), "0378901234");
        assert!(validate_phone("").is_err());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("01+23456789").is_err());
    }

    #[test]
    fn test_validate_discount_code() {
        assert_eq!(validate_discount_code(" kopi10 ").unwrap(), "KOPI10");
        assert!(validate_discount_code("AB").is_err());
        assert!(validate_discount_code("HAS SPACE").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_email_and_password() {
        assert!(validate_email("barista@kopi.my").is_ok());
        assert!(validate_email("barista").is_err());
        assert!(validate_email("@kopi.my").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_validate_public_url() {
        assert!(validate_public_url("payment_proof_url", "https://cdn.kopi.my/proofs/1.jpg").is_ok());
        assert!(validate_public_url("payment_proof_url", "file:///etc/passwd").is_err());
        assert!(validate_public_url("payment_proof_url", "not a url").is_err());
    }

    #[test]
    fn test_validate_rates() {
        assert!(validate_rate_bps("value", 1000).is_ok());
        assert!(validate_rate_bps("value", 10_001).is_err());
        assert!(validate_multiplier_bps(12_000).is_ok());
        assert!(validate_multiplier_bps(0).is_err());
    }

    #[test]
    fn test_validate_names_and_notes() {
        assert!(validate_customer_name("Aisyah").is_ok());
        assert!(validate_customer_name("   ").is_err());
        assert!(validate_notes("").is_ok());
        assert!(validate_notes(&"x".repeat(201)).is_err());
        assert!(validate_product_name("Kopi O Kosong").is_ok());
    }
}
