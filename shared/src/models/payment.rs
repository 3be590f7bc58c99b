//! Supplier payment models and the QR confirmation status machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Status of a supplier payment collection.
///
/// Advances forward only: Pending -> QR Generated -> Paid. A Paid record is
/// immutable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    #[serde(rename = "QR Generated")]
    QrGenerated,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::QrGenerated => "QR Generated",
            PaymentStatus::Paid => "Paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(PaymentStatus::Pending),
            "QR Generated" => Some(PaymentStatus::QrGenerated),
            "Paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }

    /// Paid is terminal; no transition leaves it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A supplier's weighed delivery awaiting (or having received) payment.
///
/// The signed QR token is deliberately absent from this model: clients only
/// ever see the bare transaction id, the cryptographic proof stays
/// server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierPayment {
    pub transaction_id: String,
    pub supplier_id: Uuid,
    pub collector_id: Uuid,
    pub weight_kg: Decimal,
    pub rate: Decimal,
    pub total: Decimal,
    pub status: PaymentStatus,
    pub qr_expires_at: Option<DateTime<Utc>>,
    pub date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Compute the payable total for a delivery, rounded to 2 decimal places.
///
/// Always recomputed from the authoritative weight and rate, never trusted
/// from a client at confirmation time.
pub fn compute_total(weight_kg: Decimal, rate: Decimal) -> Decimal {
    (weight_kg * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Generate a collection transaction id (e.g. "PAY-9F2C41D0A6B34E").
pub fn generate_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("PAY-{}", &hex[..14])
}

/// Why a confirmation attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfirmationError {
    #[error("payment belongs to a different supplier")]
    NotOwner,
    #[error("Invalid or Expired QR")]
    QrExpired,
    #[error("Already paid")]
    AlreadyPaid,
}

/// Ordered confirmation preconditions for an existing payment record.
///
/// The first failing check determines the error: ownership, then QR
/// validity window, then terminal status. Token signature verification is a
/// separate, later step (the token never leaves the server, so it cannot be
/// checked here).
pub fn check_confirmation(
    record_supplier_id: Uuid,
    qr_expires_at: Option<DateTime<Utc>>,
    status: PaymentStatus,
    requesting_supplier_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), ConfirmationError> {
    if record_supplier_id != requesting_supplier_id {
        return Err(ConfirmationError::NotOwner);
    }

    match qr_expires_at {
        Some(exp) if now < exp => {}
        _ => return Err(ConfirmationError::QrExpired),
    }

    if status.is_terminal() {
        return Err(ConfirmationError::AlreadyPaid);
    }

    Ok(())
}
