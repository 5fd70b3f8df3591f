//! # Checkout
//!
//! Rules that turn a priced cart plus customer and payment details into an
//! [`Order`] ready to be persisted.
//!
//! ## Submission Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart not empty                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  takeaway / reservation? ── yes ──► name + phone required               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tender                                                                 │
//! │   ├── cash   cash_received >= total, change = received - total          │
//! │   ├── qr     payment proof URL required                                 │
//! │   ├── card   nothing to check (external terminal)                       │
//! │   └── split  Σ amounts == total; remaining > 0 blocks submission        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Order { items snapshot, totals, initial status }                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::PriceSummary;
use crate::status::OrderStatus;
use crate::table::normalize_table_number;
use crate::types::{DiningType, Order, OrderSource, PaymentMethod, SplitPayment};
use crate::validation::{validate_customer_name, validate_notes, validate_phone, validate_public_url};

// =============================================================================
// Customer Details
// =============================================================================

/// Customer details as typed into the checkout form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// Customer details after validation. Phone numbers are normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedCustomer {
    pub name: Option<String>,
    pub phone: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Applies the dining-type rules to the customer form.
///
/// Dine-in orders may leave both fields blank; anything provided is still
/// validated.
pub fn validate_customer(dining: DiningType, details: &CustomerDetails) -> CoreResult<ValidatedCustomer> {
    let name = non_blank(&details.name);
    let phone = non_blank(&details.phone);

    if dining.requires_contact() {
        if name.is_none() {
            return Err(CoreError::CustomerDetailsRequired {
                field: "customer_name",
                dining_type: dining,
            });
        }
        if phone.is_none() {
            return Err(CoreError::CustomerDetailsRequired {
                field: "customer_phone",
                dining_type: dining,
            });
        }
    }

    if let Some(name) = name {
        validate_customer_name(name)?;
    }
    let phone = phone.map(validate_phone).transpose()?;

    Ok(ValidatedCustomer {
        name: name.map(str::to_string),
        phone,
    })
}

// =============================================================================
// Tender
// =============================================================================

/// How the customer pays.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Tender {
    Cash { cash_received_sen: i64 },
    Qr { payment_proof_url: Option<String> },
    Card,
    Split {
        payments: Vec<SplitPayment>,
        /// Needed when any portion is paid by QR.
        payment_proof_url: Option<String>,
    },
}

impl Tender {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::Qr { .. } => PaymentMethod::Qr,
            Tender::Card => PaymentMethod::Card,
            Tender::Split { .. } => PaymentMethod::Split,
        }
    }
}

/// Payment fields recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub cash_received_sen: Option<i64>,
    pub change_sen: Option<i64>,
    pub split_payments: Vec<SplitPayment>,
}

/// What is still owed after the split payments entered so far.
pub fn remaining_amount(payments: &[SplitPayment], total: Money) -> Money {
    let paid: Money = payments.iter().map(SplitPayment::amount).sum();
    (total - paid).floor_zero()
}

fn require_proof(proof: &Option<String>) -> CoreResult<String> {
    let proof = non_blank(proof).ok_or(CoreError::PaymentProofRequired)?;
    validate_public_url("payment_proof_url", proof)?;
    Ok(proof.to_string())
}

/// Checks a tender against the final total and works out change.
pub fn settle(tender: &Tender, total: Money) -> CoreResult<Settlement> {
    match tender {
        Tender::Cash { cash_received_sen } => {
            let received = Money::from_sen(*cash_received_sen);
            if received < total {
                return Err(CoreError::InsufficientCash { received, total });
            }
            Ok(Settlement {
                method: PaymentMethod::Cash,
                payment_proof_url: None,
                cash_received_sen: Some(received.sen()),
                change_sen: Some((received - total).sen()),
                split_payments: Vec::new(),
            })
        }
        Tender::Qr { payment_proof_url } => Ok(Settlement {
            method: PaymentMethod::Qr,
            payment_proof_url: Some(require_proof(payment_proof_url)?),
            cash_received_sen: None,
            change_sen: None,
            split_payments: Vec::new(),
        }),
        Tender::Card => Ok(Settlement {
            method: PaymentMethod::Card,
            payment_proof_url: None,
            cash_received_sen: None,
            change_sen: None,
            split_payments: Vec::new(),
        }),
        Tender::Split {
            payments,
            payment_proof_url,
        } => settle_split(payments, payment_proof_url, total),
    }
}

fn settle_split(
    payments: &[SplitPayment],
    payment_proof_url: &Option<String>,
    total: Money,
) -> CoreResult<Settlement> {
    if payments.is_empty() {
        return Err(CoreError::SplitPaymentIncomplete { remaining: total });
    }

    let mut change = Money::zero();
    let mut cash_received = Money::zero();
    let mut has_cash = false;
    for payment in payments {
        if payment.method == PaymentMethod::Split {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "a split portion cannot itself be split".to_string(),
            });
        }
        if !payment.amount().is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "split payment amount".to_string(),
            }
            .into());
        }
        if let Some(received) = payment.cash_received_sen {
            if payment.method != PaymentMethod::Cash {
                return Err(CoreError::InvalidPaymentAmount {
                    reason: "cash received is only valid for cash portions".to_string(),
                });
            }
            let received = Money::from_sen(received);
            if received < payment.amount() {
                return Err(CoreError::InsufficientCash {
                    received,
                    total: payment.amount(),
                });
            }
            change += received - payment.amount();
            cash_received += received;
            has_cash = true;
        }
    }

    let remaining = remaining_amount(payments, total);
    if remaining.is_positive() {
        return Err(CoreError::SplitPaymentIncomplete { remaining });
    }
    let paid: Money = payments.iter().map(SplitPayment::amount).sum();
    if paid > total {
        return Err(CoreError::InvalidPaymentAmount {
            reason: format!("split payments total {} exceeds order total {}", paid, total),
        });
    }

    let proof = if payments.iter().any(|p| p.method == PaymentMethod::Qr) {
        Some(require_proof(payment_proof_url)?)
    } else {
        None
    };

    Ok(Settlement {
        method: PaymentMethod::Split,
        payment_proof_url: proof,
        cash_received_sen: has_cash.then_some(cash_received.sen()),
        change_sen: has_cash.then_some(change.sen()),
        split_payments: payments.to_vec(),
    })
}

// =============================================================================
// Order Assembly
// =============================================================================

/// Everything the checkout form submits besides the cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    pub table_number: Option<String>,
    #[serde(default)]
    pub customer: CustomerDetails,
    pub tender: Tender,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub reservation_at: Option<DateTime<Utc>>,
}

/// Order numbers shown to customers: `YYMMDD-HHMMSS-NNNN`.
///
/// `NNNN` is random so two terminals submitting in the same second do not
/// collide in practice; the database enforces uniqueness.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().as_u128() % 10_000;
    format!("{}-{:04}", now.format("%y%m%d-%H%M%S"), suffix)
}

/// Builds the order record for a priced cart.
///
/// `summary` must come from [`crate::pricing::price`] on the same cart.
pub fn build_order(
    cart: &Cart,
    summary: &PriceSummary,
    request: &CheckoutRequest,
    source: OrderSource,
    now: DateTime<Utc>,
) -> CoreResult<Order> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let customer = validate_customer(cart.dining_type, &request.customer)?;
    let settlement = settle(&request.tender, summary.total())?;

    let table_number = match non_blank(&request.table_number) {
        Some(table) => Some(normalize_table_number(table)?),
        None => None,
    };
    let notes = non_blank(&request.notes).map(str::to_string);
    if let Some(ref notes) = notes {
        validate_notes(notes)?;
    }

    let status = OrderStatus::initial(source, settlement.method, cart.dining_type);

    Ok(Order {
        id: Uuid::new_v4().to_string(),
        order_number: generate_order_number(now),
        source,
        table_number,
        dining_type: cart.dining_type,
        customer_name: customer.name,
        customer_phone: customer.phone,
        items: cart.snapshot_items(),
        subtotal_sen: summary.subtotal_sen,
        fees_total_sen: summary.fees_total_sen,
        discount_sen: summary.discount_sen,
        discount_code: summary.discount_code.clone(),
        discount_reason: summary.discount_reason.clone(),
        total_sen: summary.total_sen,
        status,
        payment_method: settlement.method,
        payment_proof_url: settlement.payment_proof_url,
        cash_received_sen: settlement.cash_received_sen,
        change_sen: settlement.change_sen,
        split_payments: settlement.split_payments,
        notes,
        reservation_at: request.reservation_at,
        created_at: now,
        updated_at: now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::pricing::price;

    fn split(method: PaymentMethod, amount_sen: i64, cash: Option<i64>) -> SplitPayment {
        SplitPayment {
            method,
            amount_sen,
            cash_received_sen: cash,
        }
    }

    fn request(tender: Tender) -> CheckoutRequest {
        CheckoutRequest {
            table_number: Some("7".to_string()),
            customer: CustomerDetails::default(),
            tender,
            notes: None,
            reservation_at: None,
        }
    }

    #[test]
    fn test_dine_in_needs_no_contact() {
        let customer = validate_customer(DiningType::DineIn, &CustomerDetails::default()).unwrap();
        assert_eq!(customer, ValidatedCustomer::default());
    }

    #[test]
    fn test_takeaway_requires_name_and_phone() {
        let missing_phone = CustomerDetails {
            name: Some("Aisyah".to_string()),
            phone: Some("  ".to_string()),
        };
        assert!(matches!(
            validate_customer(DiningType::Takeaway, &missing_phone),
            Err(CoreError::CustomerDetailsRequired {
                field: "customer_phone",
                ..
            })
        ));

        let ok = CustomerDetails {
            name: Some("Aisyah".to_string()),
            phone: Some("012-345 6789".to_string()),
        };
        let customer = validate_customer(DiningType::Reservation, &ok).unwrap();
        assert_eq!(customer.phone.as_deref(), Some("0123456789"));
    }

    #[test]
    fn test_cash_change() {
        let settlement = settle(&Tender::Cash { cash_received_sen: 2000 }, Money::from_sen(1460)).unwrap();
        assert_eq!(settlement.change_sen, Some(540));

        assert!(matches!(
            settle(&Tender::Cash { cash_received_sen: 1000 }, Money::from_sen(1460)),
            Err(CoreError::InsufficientCash { .. })
        ));
    }

    #[test]
    fn test_qr_requires_proof() {
        assert!(matches!(
            settle(&Tender::Qr { payment_proof_url: None }, Money::from_sen(1000)),
            Err(CoreError::PaymentProofRequired)
        ));
        let settlement = settle(
            &Tender::Qr {
                payment_proof_url: Some("https://cdn.kopi.my/proof/abc.png".to_string()),
            },
            Money::from_sen(1000),
        )
        .unwrap();
        assert_eq!(settlement.method, PaymentMethod::Qr);
    }

    #[test]
    fn test_split_blocked_until_fully_covered() {
        let total = Money::from_sen(5000);
        let partial = vec![split(PaymentMethod::Card, 3000, None)];
        assert_eq!(remaining_amount(&partial, total).sen(), 2000);
        assert!(matches!(
            settle(
                &Tender::Split {
                    payments: partial,
                    payment_proof_url: None
                },
                total
            ),
            Err(CoreError::SplitPaymentIncomplete { .. })
        ));

        let full = vec![
            split(PaymentMethod::Card, 3000, None),
            split(PaymentMethod::Cash, 2000, Some(5000)),
        ];
        assert!(remaining_amount(&full, total).is_zero());
        let settlement = settle(
            &Tender::Split {
                payments: full,
                payment_proof_url: None,
            },
            total,
        )
        .unwrap();
        assert_eq!(settlement.method, PaymentMethod::Split);
        assert_eq!(settlement.change_sen, Some(3000));
    }

    #[test]
    fn test_split_overpayment_rejected() {
        let payments = vec![
            split(PaymentMethod::Card, 3000, None),
            split(PaymentMethod::Card, 3000, None),
        ];
        assert!(matches!(
            settle(
                &Tender::Split {
                    payments,
                    payment_proof_url: None
                },
                Money::from_sen(5000)
            ),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));
    }

    #[test]
    fn test_split_with_qr_portion_needs_proof() {
        let payments = vec![
            split(PaymentMethod::Qr, 2500, None),
            split(PaymentMethod::Card, 2500, None),
        ];
        assert!(matches!(
            settle(
                &Tender::Split {
                    payments,
                    payment_proof_url: None
                },
                Money::from_sen(5000)
            ),
            Err(CoreError::PaymentProofRequired)
        ));
    }

    #[test]
    fn test_build_order_snapshots_cart() {
        let mut cart = Cart::new(DiningType::DineIn);
        cart.add(&product("nasi-lemak", 1250), None, &[], "extra sambal", 2).unwrap();
        let summary = price(&cart, &[]);

        let order = build_order(
            &cart,
            &summary,
            &request(Tender::Cash { cash_received_sen: 3000 }),
            OrderSource::Pos,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].notes, "extra sambal");
        assert_eq!(order.items[0].item_total_sen, 2500);
        assert_eq!(order.total_sen, 2500);
        assert_eq!(order.change_sen, Some(500));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.table_number.as_deref(), Some("7"));
    }

    #[test]
    fn test_build_order_rejects_empty_cart() {
        let cart = Cart::new(DiningType::DineIn);
        let summary = price(&cart, &[]);
        assert!(matches!(
            build_order(&cart, &summary, &request(Tender::Card), OrderSource::Pos, Utc::now()),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number(Utc::now());
        assert_eq!(number.len(), "260101-120000-0001".len());
        assert_eq!(number.matches('-').count(), 2);
    }
}
