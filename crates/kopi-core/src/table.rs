//! # Table Codes
//!
//! Customers identify their table either by typing the number or by scanning
//! the QR sticker on the table. Manual entry always works; the scanner is a
//! convenience that may fail on camera permissions or hardware.
//!
//! ## Accepted Forms
//! ```text
//!   "12"                                   → 12
//!   "table-12", "Table 12", "T12", "t-12"  → 12
//!   "https://kopi.my/menu?table=12"        → 12
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

const MAX_TABLE_NUMBER: u32 = 999;

/// Turns a scanned or typed code into a table number string.
pub fn parse_table_code(raw: &str) -> CoreResult<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::InvalidTableCode(raw.to_string()));
    }

    if raw.contains("://") {
        let url = url::Url::parse(raw).map_err(|_| CoreError::InvalidTableCode(raw.to_string()))?;
        let table = url
            .query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case("table"))
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| CoreError::InvalidTableCode(raw.to_string()))?;
        return normalize_table_number(&table);
    }

    normalize_table_number(raw)
}

/// Strips an optional `table`/`t` prefix and checks the number.
///
/// ```rust
/// use kopi_core::table::normalize_table_number;
///
/// assert_eq!(normalize_table_number("Table 07").unwrap(), "7");
/// assert!(normalize_table_number("bar").is_err());
/// ```
pub fn normalize_table_number(raw: &str) -> CoreResult<String> {
    let invalid = || CoreError::InvalidTableCode(raw.to_string());

    let lower = raw.trim().to_ascii_lowercase();
    let digits = lower
        .strip_prefix("table")
        .or_else(|| lower.strip_prefix('t'))
        .unwrap_or(&lower)
        .trim_start_matches(['-', '_', ' ', '#']);

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let number: u32 = digits.parse().map_err(|_| invalid())?;
    if number == 0 || number > MAX_TABLE_NUMBER {
        return Err(invalid());
    }
    Ok(number.to_string())
}

// =============================================================================
// Camera Errors
// =============================================================================

/// Why the browser could not open the camera for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CameraError {
    PermissionDenied,
    NoCamera,
    CameraInUse,
    Unsupported,
    InsecureContext,
    Aborted,
    Unknown,
}

impl CameraError {
    /// Classifies a browser `DOMException` name.
    pub fn from_browser_name(name: &str) -> Self {
        match name.trim() {
            "NotAllowedError" | "PermissionDeniedError" => CameraError::PermissionDenied,
            "NotFoundError" | "DevicesNotFoundError" => CameraError::NoCamera,
            "NotReadableError" | "TrackStartError" => CameraError::CameraInUse,
            "OverconstrainedError" | "ConstraintNotSatisfiedError" => CameraError::Unsupported,
            "SecurityError" => CameraError::InsecureContext,
            "AbortError" => CameraError::Aborted,
            _ => CameraError::Unknown,
        }
    }

    /// Message shown to the customer. Always ends by pointing at manual entry.
    pub fn guidance(&self) -> &'static str {
        match self {
            CameraError::PermissionDenied => {
                "Camera access was blocked. Allow camera access in your browser settings, or type your table number instead."
            }
            CameraError::NoCamera => "No camera was found on this device. Please type your table number instead.",
            CameraError::CameraInUse => {
                "Your camera is being used by another app. Close it and try again, or type your table number instead."
            }
            CameraError::Unsupported => {
                "Your camera does not support scanning. Please type your table number instead."
            }
            CameraError::InsecureContext => {
                "Scanning needs a secure (https) connection. Please type your table number instead."
            }
            CameraError::Aborted => "Scanning was interrupted. Try again, or type your table number instead.",
            CameraError::Unknown => "The scanner could not start. Please type your table number instead.",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
