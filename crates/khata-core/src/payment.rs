//! # Payment Methods
//!
//! How an invoice was settled, and how a customer paid down their balance.
//!
//! ## Compatibility Mapping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Incoming value        Parsed as                 Stored as              │
//! │  ──────────────        ─────────                 ─────────              │
//! │  "cash"           ──►  PaymentMethod::Cash   ──► cash                   │
//! │  "online"/"upi"   ──►  PaymentMethod::Online ──► online                 │
//! │  "card"           ──►  PaymentMethod::Card   ──► card                   │
//! │  "due"            ──►  PaymentMethod::Due    ──► due                    │
//! │  "credit"  (old)  ──►  LegacyPaymentMethod::Credit ──► due              │
//! │  "mixed"   (old)  ──►  LegacyPaymentMethod::Mixed  ──► due              │
//! │                                                                         │
//! │  Legacy values are accepted at the edge and never written back.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Older clients sent "credit" for fully unpaid invoices and "mixed" for
//! partly paid ones. Both mean "part or all of the total is owed", which is
//! exactly `Due` with an `amount_paid` for the collected portion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Invoice Payment Method
// =============================================================================

/// How an invoice was paid at invoice time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash.
    #[default]
    Cash,
    /// UPI / bank transfer.
    Online,
    /// Card on an external terminal.
    Card,
    /// Some or all of the total is owed by the customer.
    Due,
}

impl PaymentMethod {
    /// Every method the engine stores.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Online,
        PaymentMethod::Card,
        PaymentMethod::Due,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Online => "online",
            PaymentMethod::Card => "card",
            PaymentMethod::Due => "due",
        }
    }

    /// Whether invoices with this method can carry a due amount.
    #[inline]
    pub const fn is_due(&self) -> bool {
        matches!(self, PaymentMethod::Due)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Legacy Methods
// =============================================================================

/// Payment method values still sent by older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyPaymentMethod {
    /// Nothing collected; the full total is owed.
    Credit,
    /// Part collected, the rest owed.
    Mixed,
}

impl From<LegacyPaymentMethod> for PaymentMethod {
    fn from(legacy: LegacyPaymentMethod) -> Self {
        match legacy {
            LegacyPaymentMethod::Credit | LegacyPaymentMethod::Mixed => PaymentMethod::Due,
        }
    }
}

/// Parses any accepted payment method string, mapping legacy values.
///
/// ## Example
/// ```rust
/// use khata_core::payment::PaymentMethod;
///
/// assert_eq!("credit".parse::<PaymentMethod>().unwrap(), PaymentMethod::Due);
/// assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Online);
/// assert!("barter".parse::<PaymentMethod>().is_err());
/// ```
impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "online" | "upi" => Ok(PaymentMethod::Online),
            "card" => Ok(PaymentMethod::Card),
            "due" => Ok(PaymentMethod::Due),
            "credit" => Ok(LegacyPaymentMethod::Credit.into()),
            "mixed" => Ok(LegacyPaymentMethod::Mixed.into()),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Customer Payment Mode
// =============================================================================

/// How a customer paid money into their account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Cash,
    Online,
    Card,
    Cheque,
}

impl PaymentMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cash",
            PaymentMode::Online => "online",
            PaymentMode::Card => "card",
            PaymentMode::Cheque => "cheque",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
